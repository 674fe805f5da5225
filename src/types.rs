//! Core types for snapshot-archiver

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which variant of each media resource to fetch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    /// Cheap, downscaled variant referenced by the element itself
    Preview,
    /// Full-quality variant declared by a wrapping hyperlink
    #[default]
    Original,
}

impl std::fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageQuality::Preview => write!(f, "preview"),
            ImageQuality::Original => write!(f, "original"),
        }
    }
}

impl std::str::FromStr for ImageQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preview" => Ok(ImageQuality::Preview),
            "original" => Ok(ImageQuality::Original),
            other => Err(format!("unknown image quality '{other}'")),
        }
    }
}

/// Unique identifier for a snapshot tracked on a [`StatusBoard`](crate::StatusBoard)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SnapshotId(pub u64);

impl SnapshotId {
    /// Get the inner value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress of one in-flight snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStatus {
    /// Snapshot ID
    pub id: SnapshotId,
    /// Name the finished archive will be saved under
    pub file_name: String,
    /// Resources fetched or dropped so far
    pub done_count: usize,
    /// Resources discovered in the document (0 until resolution finishes)
    pub total_count: usize,
    /// When the snapshot was registered
    pub started_at: DateTime<Utc>,
}

/// Event emitted during a snapshot's lifecycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Resources resolved, fetching is about to start
    SnapshotStarted {
        /// Snapshot ID
        id: SnapshotId,
        /// Name the finished archive will be saved under
        file_name: String,
        /// Number of resources that will be fetched
        total: usize,
    },

    /// One resource was fetched or dropped
    ResourceFinished {
        /// Snapshot ID
        id: SnapshotId,
        /// Resources finished so far
        done: usize,
        /// Total resources in this snapshot
        total: usize,
    },

    /// The archive was assembled
    SnapshotFinished {
        /// Snapshot ID
        id: SnapshotId,
    },

    /// The snapshot failed; no archive was produced
    SnapshotFailed {
        /// Snapshot ID
        id: SnapshotId,
        /// Error message
        error: String,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_quality_parses_lowercase_names() {
        assert_eq!("preview".parse::<ImageQuality>().unwrap(), ImageQuality::Preview);
        assert_eq!("original".parse::<ImageQuality>().unwrap(), ImageQuality::Original);
        assert!("thumbnail".parse::<ImageQuality>().is_err());
    }

    #[test]
    fn image_quality_serde_matches_display() {
        for quality in [ImageQuality::Preview, ImageQuality::Original] {
            let json = serde_json::to_string(&quality).unwrap();
            assert_eq!(json, format!("\"{quality}\""));
        }
    }

    #[test]
    fn event_is_internally_tagged() {
        let event = Event::ResourceFinished {
            id: SnapshotId(3),
            done: 1,
            total: 4,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "resource_finished");
        assert_eq!(json["id"], 3);
        assert_eq!(json["done"], 1);
    }
}
