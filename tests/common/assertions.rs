//! Custom test assertions for archive contents and progress

use snapshot_archiver::archive::BOUNDARY;
use snapshot_archiver::{Archive, ProgressSink};
use std::sync::Mutex;

/// Progress sink that records every call in order
#[derive(Debug, Default)]
pub struct RecordedProgress {
    calls: Mutex<Vec<ProgressCall>>,
}

/// One call made on a [`RecordedProgress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressCall {
    /// `init(total)`
    Init(usize),
    /// `finish_resource()`
    Finish,
}

impl RecordedProgress {
    /// All calls so far, in order
    pub fn calls(&self) -> Vec<ProgressCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `finish_resource` calls
    pub fn finished(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == ProgressCall::Finish)
            .count()
    }
}

impl ProgressSink for RecordedProgress {
    fn init(&self, total: usize) {
        self.calls.lock().unwrap().push(ProgressCall::Init(total));
    }

    fn finish_resource(&self) {
        self.calls.lock().unwrap().push(ProgressCall::Finish);
    }
}

/// Serialized archive as text (archives are ASCII-only)
pub fn archive_text(archive: &Archive) -> String {
    String::from_utf8(archive.as_bytes().to_vec()).expect("archive is ASCII")
}

/// Split a serialized archive into its part sections, without the header block
/// or the closing boundary
pub fn serialized_parts(archive: &Archive) -> Vec<String> {
    let text = archive_text(archive);
    let body = text
        .strip_suffix(&format!("\r\n--{BOUNDARY}--"))
        .expect("archive ends with the closing boundary");
    body.split(&format!("\r\n--{BOUNDARY}\r\n"))
        .skip(1)
        .map(str::to_string)
        .collect()
}

/// Assert the archive has one document part followed by `resources` resource parts
pub fn assert_part_counts(archive: &Archive, resources: usize) {
    assert_eq!(
        archive.parts().len(),
        resources + 1,
        "expected document plus {resources} resources"
    );
    assert_eq!(archive.parts()[0].content_type(), "text/html");
    assert_eq!(serialized_parts(archive).len(), resources + 1);
    for part in &archive.parts()[1..] {
        assert_eq!(part.transfer_encoding(), Some("base64"));
    }
}
