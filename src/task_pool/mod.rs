//! Bounded task pool: lanes, placement and live resizing
//!
//! Split into focused submodules:
//! - [`context`] - Batch-wide cancellation context
//! - [`lane`] - Single-concurrency FIFO lane and task handles
//!
//! The pool owns up to `size` lanes. Each lane runs at most one task at a
//! time, so the lane count is the only throttle on concurrent operations.
//! New work goes to an idle lane if there is one, otherwise to a fresh lane
//! while below capacity, otherwise to the least-loaded lane.
//!
//! # Resizing
//!
//! [`TaskPool::resize`] drains every lane's backlog (lane by lane, FIFO order
//! kept) and redistributes it over the new lane set in two passes:
//!
//! 1. Walk lanes `0..size` once and start one drained task on every lane that
//!    has no running task.
//! 2. Append whatever is left round-robin across lanes `0..size`, starting
//!    again from lane 0.
//!
//! Running tasks are never interrupted. When shrinking, lanes past the new
//! size that are still running a task are retired: they accept no new work and
//! disappear once their task settles. Growing again reclaims retired lanes
//! before creating new ones.

mod context;
mod lane;


pub use context::TaskContext;
pub use lane::{TaskHandle, TaskId};

use crate::config::validate_capacity;
use crate::error::Result;
use futures::FutureExt;
use lane::{Lane, LaneId, QueuedTask};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Load snapshot of a single lane
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaneStats {
    /// Whether the lane is running a task
    pub running: bool,
    /// Tasks waiting in the lane's backlog
    pub queued: usize,
}

/// Point-in-time view of the pool's bookkeeping
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Configured capacity
    pub size: usize,
    /// Active lanes, in index order
    pub lanes: Vec<LaneStats>,
    /// Lanes removed by a shrink that are still finishing their running task
    pub retiring: usize,
}

impl PoolStats {
    /// Tasks currently running, including those on retiring lanes
    pub fn running(&self) -> usize {
        self.lanes.iter().filter(|lane| lane.running).count() + self.retiring
    }

    /// Tasks waiting to start
    pub fn queued(&self) -> usize {
        self.lanes.iter().map(|lane| lane.queued).sum()
    }
}

struct PoolState {
    size: usize,
    lanes: Vec<Lane>,
    retiring: Vec<Lane>,
    next_lane_id: u64,
    next_task_id: u64,
}

impl PoolState {
    fn push_lane(&mut self) -> usize {
        let id = LaneId(self.next_lane_id);
        self.next_lane_id += 1;
        self.lanes.push(Lane::new(id));
        self.lanes.len() - 1
    }

    fn allocate_task_id(&mut self) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        id
    }

    /// Pick the lane index for a new task
    fn select_lane(&mut self) -> usize {
        if let Some(index) = self.lanes.iter().position(Lane::is_idle) {
            return index;
        }
        if self.lanes.len() < self.size {
            return self.push_lane();
        }
        // min_by_key keeps the first minimum, so ties go to the lowest index
        match self
            .lanes
            .iter()
            .enumerate()
            .min_by_key(|(_, lane)| lane.load())
        {
            Some((index, _)) => index,
            None => self.push_lane(),
        }
    }

    fn place(&mut self, task: QueuedTask) -> (LaneId, Option<QueuedTask>) {
        let index = self.select_lane();
        let lane = &mut self.lanes[index];
        tracing::debug!(
            task_id = task.id.0,
            lane = index,
            load = lane.load(),
            "placing task"
        );
        (lane.id, lane.enqueue_or_run(task))
    }

    /// Clear the running task of `lane_id` and return the next task it should run
    fn finish(&mut self, lane_id: LaneId) -> Option<QueuedTask> {
        if let Some(lane) = self.lanes.iter_mut().find(|lane| lane.id == lane_id) {
            return lane.finish_running();
        }

        let position = self.retiring.iter().position(|lane| lane.id == lane_id)?;
        let next = self.retiring[position].finish_running();
        if next.is_none() {
            self.retiring.swap_remove(position);
        }
        next
    }

    /// Apply a new capacity and return the tasks that must start now
    fn redistribute(&mut self, new_size: usize) -> Vec<(LaneId, QueuedTask)> {
        self.size = new_size;

        let mut drained: VecDeque<QueuedTask> = VecDeque::new();
        for lane in &mut self.lanes {
            drained.extend(lane.drain_queued());
        }

        if self.lanes.len() > new_size {
            let removed = self.lanes.split_off(new_size);
            self.retiring
                .extend(removed.into_iter().filter(|lane| !lane.is_free()));
        } else {
            while self.lanes.len() < new_size {
                match self.retiring.pop() {
                    Some(lane) => self.lanes.push(lane),
                    None => break,
                }
            }
        }

        // Phase 1: give every free lane one task to run
        let mut dispatches = Vec::new();
        for index in 0..new_size {
            if drained.is_empty() {
                break;
            }
            if index == self.lanes.len() {
                self.push_lane();
            }
            let lane = &mut self.lanes[index];
            if lane.is_free()
                && let Some(task) = drained.pop_front()
            {
                let task = lane.start(task);
                dispatches.push((lane.id, task));
            }
        }

        // Phase 2: spread the remaining backlog round-robin from lane 0
        let lane_count = self.lanes.len();
        if lane_count > 0 {
            for (offset, task) in drained.into_iter().enumerate() {
                self.lanes[offset % lane_count].push_queued(task);
            }
        }

        dispatches
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.size,
            lanes: self
                .lanes
                .iter()
                .map(|lane| LaneStats {
                    running: !lane.is_free(),
                    queued: lane.queued_len(),
                })
                .collect(),
            retiring: self.retiring.len(),
        }
    }
}

/// Bounded pool of single-concurrency lanes
///
/// Cloning yields another handle to the same pool. Submitting and resizing
/// require a Tokio runtime, since each busy lane is driven by a spawned task.
///
/// # Example
///
/// ```no_run
/// use snapshot_archiver::{TaskContext, TaskPool};
///
/// # async fn example() -> snapshot_archiver::Result<()> {
/// let pool = TaskPool::new(4)?;
/// let ctx = TaskContext::new();
///
/// let handle = pool.submit(|| async { Ok(21 * 2) }, &ctx);
/// assert_eq!(handle.await?, 42);
///
/// // Capacity can change while work is in flight
/// pool.resize(8)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TaskPool {
    state: Arc<Mutex<PoolState>>,
}

impl TaskPool {
    /// Create a pool that runs at most `size` tasks at once
    ///
    /// Lanes are created lazily. Returns a configuration error if `size` is 0.
    pub fn new(size: usize) -> Result<Self> {
        validate_capacity(size)?;
        Ok(Self {
            state: Arc::new(Mutex::new(PoolState {
                size,
                lanes: Vec::with_capacity(size),
                retiring: Vec::new(),
                next_lane_id: 0,
                next_task_id: 0,
            })),
        })
    }

    /// Configured capacity
    pub fn size(&self) -> usize {
        self.state.lock().size
    }

    /// Submit `operation` to run on a lane
    ///
    /// The operation is not invoked at all if `ctx` is interrupted before the
    /// task is dispatched. Tasks sharing one `ctx` form a batch that can be
    /// cancelled together; the pool never creates contexts itself.
    pub fn submit<F, Fut, T>(&self, operation: F, ctx: &TaskContext) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (lane_id, dispatch, handle) = {
            let mut state = self.state.lock();
            let id = state.allocate_task_id();
            let (task, handle) = QueuedTask::new(id, operation, ctx.clone());
            let (lane_id, dispatch) = state.place(task);
            (lane_id, dispatch, handle)
        };

        if let Some(task) = dispatch {
            self.drive_lane(lane_id, task);
        }
        handle
    }

    /// Change the capacity while tasks are queued or running
    ///
    /// No-op if `new_size` equals the current size. Returns a configuration
    /// error if `new_size` is 0. Queued tasks are redistributed as described
    /// in the [module docs](self); running tasks are left alone.
    pub fn resize(&self, new_size: usize) -> Result<()> {
        validate_capacity(new_size)?;

        let (old_size, dispatches, stats) = {
            let mut state = self.state.lock();
            if state.size == new_size {
                return Ok(());
            }
            let old_size = state.size;
            let dispatches = state.redistribute(new_size);
            (old_size, dispatches, state.stats())
        };

        tracing::info!(
            old_size,
            new_size,
            started = dispatches.len(),
            queued = stats.queued(),
            retiring = stats.retiring,
            "task pool resized"
        );

        for (lane_id, task) in dispatches {
            self.drive_lane(lane_id, task);
        }
        Ok(())
    }

    /// Current lane bookkeeping
    pub fn stats(&self) -> PoolStats {
        self.state.lock().stats()
    }

    /// Run `first` and then keep draining the lane's backlog until it is empty
    fn drive_lane(&self, lane_id: LaneId, first: QueuedTask) {
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let mut current = Some(first);
            while let Some(task) = current.take() {
                let task_id = task.id;
                if AssertUnwindSafe(task.execute()).catch_unwind().await.is_err() {
                    tracing::error!(task_id = task_id.0, "pooled task panicked");
                }
                current = state.lock().finish(lane_id);
            }
        });
    }
}

impl std::fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("stats", &self.stats())
            .finish()
    }
}
