//! Configuration types for snapshot-archiver

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for [`ArchiveBuilder`](crate::ArchiveBuilder)
///
/// Every field has a default, so `Config::default()` (or `{}` as JSON) is a
/// working configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of resource fetches in flight at once (default: 250)
    ///
    /// This is the task pool capacity. It can be changed while a build is
    /// running via [`ConfigUpdate`].
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Silently drop resources the server reports as gone (HTTP 410) (default: true)
    #[serde(default = "default_true")]
    pub tolerate_gone_resources: bool,

    /// Element classes whose media always resolves to the preview URL
    ///
    /// Emoticons and decorative icons have no meaningful full-quality variant.
    #[serde(default = "default_preview_only_classes")]
    pub preview_only_classes: Vec<String>,

    /// User-Agent header sent with every resource request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout for resource fetches (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            tolerate_gone_resources: true,
            preview_only_classes: default_preview_only_classes(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Config {
    /// Check settings that would make the builder unusable
    pub fn validate(&self) -> Result<()> {
        validate_capacity(self.max_concurrent_fetches)
    }
}

/// Configuration updates that can be applied at runtime
///
/// Only settings that are safe to change while fetches are in flight are
/// included. A `None` field leaves the current value untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// New task pool capacity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_fetches: Option<usize>,

    /// New gone-resource tolerance, read at the start of the next build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerate_gone_resources: Option<bool>,
}

/// Reject pool capacities below one
pub(crate) fn validate_capacity(size: usize) -> Result<()> {
    if size == 0 {
        return Err(Error::config(
            "max_concurrent_fetches",
            "pool capacity must be at least 1",
        ));
    }
    Ok(())
}

fn default_max_concurrent_fetches() -> usize {
    250
}

fn default_true() -> bool {
    true
}

fn default_preview_only_classes() -> Vec<String> {
    vec![
        "arca-emoticon".to_string(),
        "emoticon".to_string(),
        "icon".to_string(),
    ]
}

fn default_user_agent() -> String {
    format!("snapshot-archiver/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
