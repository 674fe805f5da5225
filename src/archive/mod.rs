//! Snapshot archives
//!
//! - [`Archive`] - An immutable, serialized `multipart/related` document
//! - [`ArchiveBuilder`] - Fetches a document's resources and assembles the archive
//!
//! The serialized form is MHTML: a header block, one `text/html` part holding
//! the rewritten markup, one base64 part per fetched resource, and a closing
//! boundary. Lines are separated by CRLF.

mod builder;
mod encoding;


pub use builder::ArchiveBuilder;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Boundary separating the parts of every archive
pub const BOUNDARY: &str = "----MultipartBoundary--snapshot--";

const CRLF: &str = "\r\n";

/// One part of an archive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchivePart {
    content_type: String,
    content_location: String,
    body: Vec<u8>,
    base64: bool,
}

impl ArchivePart {
    /// The document part; `markup` must already be ASCII-only
    pub(crate) fn document(location: &str, markup: String) -> Self {
        Self {
            content_type: "text/html".to_string(),
            content_location: location.to_string(),
            body: markup.into_bytes(),
            base64: false,
        }
    }

    /// A binary resource part, base64-encoded when serialized
    pub(crate) fn resource(content_type: String, location: String, body: Vec<u8>) -> Self {
        Self {
            content_type,
            content_location: location,
            body,
            base64: true,
        }
    }

    /// Declared media type of the part
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// URL the part was captured from
    pub fn content_location(&self) -> &str {
        &self.content_location
    }

    /// Unencoded part content
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Value of the part's `Content-Transfer-Encoding` header, if any
    pub fn transfer_encoding(&self) -> Option<&'static str> {
        self.base64.then_some("base64")
    }

    fn write_to(&self, lines: &mut Vec<String>) {
        lines.push(format!("--{BOUNDARY}"));
        lines.push(format!("Content-Type: {}", self.content_type));
        if let Some(encoding) = self.transfer_encoding() {
            lines.push(format!("Content-Transfer-Encoding: {encoding}"));
        }
        lines.push(format!("Content-Location: {}", self.content_location));
        lines.push(String::new());
        if self.base64 {
            lines.push(BASE64.encode(&self.body));
        } else {
            lines.push(String::from_utf8_lossy(&self.body).into_owned());
        }
    }
}

/// A serialized snapshot
///
/// The first part is always the document; resource parts follow in the order
/// the resources were discovered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Archive {
    source_url: String,
    parts: Vec<ArchivePart>,
    bytes: Vec<u8>,
}

impl Archive {
    /// Media type of every archive
    pub const MEDIA_TYPE: &'static str = "multipart/related";

    pub(crate) fn new(source_url: &str, parts: Vec<ArchivePart>) -> Self {
        let mut lines = vec![
            format!("Snapshot-Content-Location: {source_url}"),
            "MIME-Version: 1.0".to_string(),
            format!(
                "Content-Type: {}; type=\"text/html\"; boundary=\"{BOUNDARY}\"",
                Self::MEDIA_TYPE
            ),
            String::new(),
        ];
        for part in &parts {
            part.write_to(&mut lines);
        }
        lines.push(format!("--{BOUNDARY}--"));

        Self {
            source_url: source_url.to_string(),
            parts,
            bytes: lines.join(CRLF).into_bytes(),
        }
    }

    /// URL of the archived document
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Document part followed by resource parts
    pub fn parts(&self) -> &[ArchivePart] {
        &self.parts
    }

    /// Declared media type, for whoever stores the bytes
    pub fn media_type(&self) -> &'static str {
        Self::MEDIA_TYPE
    }

    /// Serialized archive
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the serialized archive
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
