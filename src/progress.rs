//! Progress reporting for archive builds
//!
//! [`ArchiveBuilder::build`](crate::ArchiveBuilder::build) reports through a
//! [`ProgressSink`]: `init` once with the resource count, then
//! `finish_resource` once per resource in completion order.
//!
//! [`StatusBoard`] is a sink factory that keeps a registry of every snapshot
//! in flight and broadcasts each transition as an [`Event`].

use crate::error::Error;
use crate::types::{Event, SnapshotId, SnapshotStatus};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Buffer size of the event channel; slow subscribers lag instead of blocking builds
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Receives progress of a single archive build
pub trait ProgressSink: Send + Sync {
    /// Called once, before any fetch starts, with the number of resources
    fn init(&self, total: usize);

    /// Called once per resource as soon as it is fetched or dropped
    fn finish_resource(&self);
}

/// Sink that ignores all progress
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn init(&self, _total: usize) {}

    fn finish_resource(&self) {}
}

struct BoardInner {
    snapshots: Mutex<BTreeMap<SnapshotId, SnapshotStatus>>,
    next_id: AtomicU64,
    event_tx: broadcast::Sender<Event>,
}

impl BoardInner {
    fn emit(&self, event: Event) {
        // send() only fails when nobody is subscribed
        self.event_tx.send(event).ok();
    }
}

/// Registry of in-progress snapshots
///
/// Cloning yields another handle to the same registry.
///
/// # Example
///
/// ```no_run
/// use snapshot_archiver::{ArchiveBuilder, Config, ImageQuality, StatusBoard};
///
/// # async fn example() -> snapshot_archiver::Result<()> {
/// let builder = ArchiveBuilder::new(Config::default())?;
/// let board = StatusBoard::new();
/// let mut events = board.subscribe();
///
/// let progress = board.begin("post-12345.mhtml");
/// let id = progress.id();
/// match builder
///     .build("https://example.com/post/12345", "<p>hello</p>", ImageQuality::Original, &progress)
///     .await
/// {
///     Ok(_archive) => board.finish(id),
///     Err(e) => board.fail(id, &e),
/// }
///
/// while let Ok(event) = events.try_recv() {
///     println!("{event:?}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<BoardInner>,
}

impl StatusBoard {
    /// Create an empty board
    pub fn new() -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(BoardInner {
                snapshots: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
                event_tx,
            }),
        }
    }

    /// Register a new snapshot and return the sink its build should report to
    ///
    /// The entry starts at `0 / 0` until the build calls [`ProgressSink::init`].
    pub fn begin(&self, file_name: impl Into<String>) -> BoardProgress {
        let id = SnapshotId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let status = SnapshotStatus {
            id,
            file_name: file_name.into(),
            done_count: 0,
            total_count: 0,
            started_at: chrono::Utc::now(),
        };
        tracing::debug!(snapshot_id = id.get(), file_name = %status.file_name, "snapshot registered");
        self.inner.snapshots.lock().insert(id, status);

        BoardProgress {
            board: Arc::clone(&self.inner),
            id,
        }
    }

    /// Remove a completed snapshot from the board
    pub fn finish(&self, id: SnapshotId) {
        if self.inner.snapshots.lock().remove(&id).is_some() {
            tracing::info!(snapshot_id = id.get(), "snapshot finished");
            self.inner.emit(Event::SnapshotFinished { id });
        }
    }

    /// Remove a failed snapshot from the board
    pub fn fail(&self, id: SnapshotId, error: &Error) {
        if self.inner.snapshots.lock().remove(&id).is_some() {
            tracing::warn!(snapshot_id = id.get(), error = %error, "snapshot failed");
            self.inner.emit(Event::SnapshotFailed {
                id,
                error: error.to_string(),
            });
        }
    }

    /// Status of one snapshot, if it is still in progress
    pub fn get(&self, id: SnapshotId) -> Option<SnapshotStatus> {
        self.inner.snapshots.lock().get(&id).cloned()
    }

    /// All snapshots in progress, ordered by id
    pub fn list(&self) -> Vec<SnapshotStatus> {
        self.inner.snapshots.lock().values().cloned().collect()
    }

    /// Subscribe to snapshot events
    ///
    /// Events sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.event_tx.subscribe()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBoard")
            .field("in_progress", &self.inner.snapshots.lock().len())
            .finish()
    }
}

/// [`ProgressSink`] that updates one entry of a [`StatusBoard`]
pub struct BoardProgress {
    board: Arc<BoardInner>,
    id: SnapshotId,
}

impl BoardProgress {
    /// ID of the snapshot this sink reports for
    pub fn id(&self) -> SnapshotId {
        self.id
    }
}

impl ProgressSink for BoardProgress {
    fn init(&self, total: usize) {
        let file_name = {
            let mut snapshots = self.board.snapshots.lock();
            let Some(status) = snapshots.get_mut(&self.id) else {
                return;
            };
            status.total_count = total;
            status.done_count = 0;
            status.file_name.clone()
        };
        self.board.emit(Event::SnapshotStarted {
            id: self.id,
            file_name,
            total,
        });
    }

    fn finish_resource(&self) {
        let (done, total) = {
            let mut snapshots = self.board.snapshots.lock();
            let Some(status) = snapshots.get_mut(&self.id) else {
                return;
            };
            status.done_count += 1;
            (status.done_count, status.total_count)
        };
        self.board.emit(Event::ResourceFinished {
            id: self.id,
            done,
            total,
        });
    }
}

impl std::fmt::Debug for BoardProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardProgress").field("id", &self.id).finish()
    }
}
