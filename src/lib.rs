//! # snapshot-archiver
//!
//! Snapshots a web document into a single self-contained MHTML archive.
//!
//! ## Design Philosophy
//!
//! snapshot-archiver is designed to be:
//! - **Bounded** - Every resource fetch runs through a resizable pool of lanes
//! - **All-or-nothing** - A build returns a complete archive or one error, never a partial file
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Observable** - Progress is reported per resource, and a [`StatusBoard`] broadcasts events
//!
//! ## Quick Start
//!
//! ```no_run
//! use snapshot_archiver::{ArchiveBuilder, Config, ImageQuality, StatusBoard};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         max_concurrent_fetches: 8,
//!         ..Default::default()
//!     };
//!     let builder = ArchiveBuilder::new(config)?;
//!
//!     // Subscribe to events
//!     let board = StatusBoard::new();
//!     let mut events = board.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let progress = board.begin("post.mhtml");
//!     let archive = builder
//!         .build(
//!             "https://example.com/post/1",
//!             r#"<img src="//cdn.example.com/a.png">"#,
//!             ImageQuality::Original,
//!             &progress,
//!         )
//!         .await?;
//!     board.finish(progress.id());
//!
//!     std::fs::write("post.mhtml", archive.as_bytes())?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive assembly and serialization
pub mod archive;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Single-tier fetch fallback
pub mod fallback;
/// HTTP resource fetching
pub mod fetcher;
/// Build progress and snapshot status tracking
pub mod progress;
/// Media resource discovery
pub mod resolver;
/// Bounded, resizable task pool
pub mod task_pool;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use archive::{Archive, ArchiveBuilder, ArchivePart};
pub use config::{Config, ConfigUpdate};
pub use error::{Error, FetchError, Result};
pub use fallback::FetchOutcome;
pub use fetcher::{FetchedResource, HttpFetcher, ResourceFetcher};
pub use progress::{BoardProgress, NoopProgress, ProgressSink, StatusBoard};
pub use resolver::{PatternResolver, ResourceDescriptor, ResourceResolver};
pub use task_pool::{LaneStats, PoolStats, TaskContext, TaskHandle, TaskId, TaskPool};
pub use types::{Event, ImageQuality, SnapshotId, SnapshotStatus};
