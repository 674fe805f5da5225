//! Resource discovery: finds media references in document markup and decides
//! which URL variant of each one to fetch.
//!
//! Discovery is behind the [`ResourceResolver`] trait so the pattern-based
//! [`PatternResolver`] can be swapped for a structural parser without touching
//! the task pool or the archive builder.

use crate::config::Config;
use crate::types::ImageQuality;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Optional wrapping hyperlink (which declares the full-quality source) followed by a media element
#[allow(clippy::expect_used)]
static MEDIA_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:<a\b[^>]*?\shref="(?P<href>[^"]*)"[^>]*>\s*)?<(?:img|video)\b(?P<attrs>[^>]*)>"#,
    )
    .expect("media element pattern is valid")
});

#[allow(clippy::expect_used)]
static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)src="(?P<value>[^"]*)""#).expect("src pattern is valid")
});

#[allow(clippy::expect_used)]
static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)class="(?P<value>[^"]*)""#).expect("class pattern is valid")
});

/// One media resource referenced by the document
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Reference exactly as it appears in the markup; the deduplication key
    pub raw: String,
    /// Absolute URL of the cheap variant
    pub preview: String,
    /// Absolute URL of the full-quality variant (equals `preview` when none is declared)
    pub original: String,
    /// URL selected for fetching
    pub rendering: String,
    /// Whether the element carries a low-fidelity marker class
    pub preview_only: bool,
}

impl ResourceDescriptor {
    /// Whether a failed fetch of `rendering` can fall back to `preview`
    pub fn has_fallback(&self) -> bool {
        self.rendering != self.preview
    }
}

/// Finds the media resources of a document
pub trait ResourceResolver: Send + Sync {
    /// Discover resources in `markup`, resolving references against `base`
    ///
    /// Returns descriptors in first-occurrence order with duplicate raw keys removed.
    fn extract(&self, markup: &str, base: &Url, quality: ImageQuality) -> Vec<ResourceDescriptor>;
}

/// Targeted pattern-matching resolver for `<img>` / `<video>` references
#[derive(Clone, Debug)]
pub struct PatternResolver {
    preview_only_classes: Vec<String>,
}

impl PatternResolver {
    /// Create a resolver that treats elements with any of `preview_only_classes` as always-preview
    pub fn new(preview_only_classes: Vec<String>) -> Self {
        Self {
            preview_only_classes,
        }
    }

    /// Create a resolver from the builder configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.preview_only_classes.clone())
    }

    fn is_preview_only(&self, attrs: &str) -> bool {
        CLASS_ATTR
            .captures(attrs)
            .map(|caps| {
                caps["value"].split_whitespace().any(|class| {
                    self.preview_only_classes
                        .iter()
                        .any(|marker| marker.as_str() == class)
                })
            })
            .unwrap_or(false)
    }
}

impl Default for PatternResolver {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ResourceResolver for PatternResolver {
    fn extract(&self, markup: &str, base: &Url, quality: ImageQuality) -> Vec<ResourceDescriptor> {
        let mut seen = HashSet::new();
        let mut resources = Vec::new();

        for caps in MEDIA_ELEMENT.captures_iter(markup) {
            let attrs = caps.name("attrs").map_or("", |m| m.as_str());
            let Some(src) = SRC_ATTR.captures(attrs).and_then(|c| c.name("value")) else {
                continue;
            };
            let raw = src.as_str();
            if raw.is_empty() || is_inline_data(raw) || !seen.insert(raw.to_string()) {
                continue;
            }

            let Some(preview) = make_url_explicit(raw, base) else {
                tracing::warn!(raw, "skipping unresolvable media reference");
                continue;
            };
            let original = caps
                .name("href")
                .map(|m| m.as_str())
                .filter(|href| !href.is_empty())
                .and_then(|href| make_url_explicit(href, base))
                .unwrap_or_else(|| preview.clone());

            let preview_only = self.is_preview_only(attrs);
            let rendering = if preview_only || quality == ImageQuality::Preview {
                preview.clone()
            } else {
                original.clone()
            };

            resources.push(ResourceDescriptor {
                raw: raw.to_string(),
                preview,
                original,
                rendering,
                preview_only,
            });
        }

        tracing::debug!(count = resources.len(), %quality, "resolved media resources");
        resources
    }
}

fn is_inline_data(reference: &str) -> bool {
    reference
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Turn a markup reference into an absolute URL
///
/// - `//host/path` takes the base URL's scheme
/// - `/path` takes the base URL's origin
/// - absolute URLs are kept
/// - anything else is joined against the base URL
///
/// `&amp;` entities are decoded, since the markup is attribute-escaped text.
/// The result is the URL parser's serialization: tabs and line breaks are
/// stripped and unsafe characters percent-encoded, so it is always safe to
/// place in an archive header.
pub fn make_url_explicit(reference: &str, base: &Url) -> Option<String> {
    let reference = reference.replace("&amp;", "&");
    base.join(&reference).ok().map(String::from)
}
