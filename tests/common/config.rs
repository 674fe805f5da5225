//! Test configuration helpers for creating builders

use snapshot_archiver::{ArchiveBuilder, Config};
use std::time::Duration;

/// Page URL used as the snapshot source in integration tests
pub const PAGE_URL: &str = "https://arca.live/b/test/100";

/// Configuration suited to tests against a local mock server
pub fn test_config(max_concurrent_fetches: usize, tolerate_gone_resources: bool) -> Config {
    Config {
        max_concurrent_fetches,
        tolerate_gone_resources,
        user_agent: "snapshot-archiver-tests".to_string(),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

/// Create an HTTP-backed builder with the given capacity and gone-resource policy
pub fn create_test_builder(
    max_concurrent_fetches: usize,
    tolerate_gone_resources: bool,
) -> ArchiveBuilder {
    ArchiveBuilder::new(test_config(max_concurrent_fetches, tolerate_gone_resources))
        .expect("test config is valid")
}
