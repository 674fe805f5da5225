//! Single-concurrency FIFO lanes and the tasks they carry

use super::context::TaskContext;
use crate::error::{Error, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Identifier of a submitted task, unique within its pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

/// Identifier of a lane, stable across pool resizes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct LaneId(pub(crate) u64);

/// Type-erased unit of work that settles its own result channel
trait Job: Send {
    /// Run the operation and deliver its result
    fn run(self: Box<Self>) -> BoxFuture<'static, ()>;

    /// Deliver `error` without running the operation
    fn reject(self: Box<Self>, error: Error);
}

struct PendingJob<F, T> {
    operation: F,
    result_tx: oneshot::Sender<Result<T>>,
}

impl<F, Fut, T> Job for PendingJob<F, T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let PendingJob {
            operation,
            result_tx,
        } = *self;

        async move {
            let result = operation().await;
            // The submitter may have dropped its handle
            let _ = result_tx.send(result);
        }
        .boxed()
    }

    fn reject(self: Box<Self>, error: Error) {
        let _ = self.result_tx.send(Err(error));
    }
}

/// A task waiting in (or dispatched from) a lane
pub(crate) struct QueuedTask {
    pub(crate) id: TaskId,
    ctx: TaskContext,
    job: Box<dyn Job>,
}

impl QueuedTask {
    /// Wrap `operation` into a task bound to `ctx`, returning it with its result handle
    pub(crate) fn new<F, Fut, T>(id: TaskId, operation: F, ctx: TaskContext) -> (Self, TaskHandle<T>)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let task = Self {
            id,
            ctx,
            job: Box::new(PendingJob {
                operation,
                result_tx,
            }),
        };
        (task, TaskHandle { id, result_rx })
    }

    /// Run the task, or settle it as interrupted if its batch was cancelled before dispatch
    pub(crate) async fn execute(self) {
        if self.ctx.is_interrupted() {
            tracing::debug!(task_id = self.id.0, "batch interrupted, task rejected before start");
            self.job.reject(Error::Interrupted);
            return;
        }
        self.job.run().await;
    }
}

/// Eventual result of a pooled task
///
/// Resolves exactly once: with the operation's output, with
/// [`Error::Interrupted`] if the batch was cancelled before the task started,
/// or with [`Error::TaskAbandoned`] if the operation panicked. Dropping the
/// handle does not cancel the task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    result_rx: oneshot::Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// ID of the task this handle belongs to
    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.result_rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Error::TaskAbandoned)))
    }
}

/// Single-concurrency FIFO execution unit
///
/// Holds at most one running task plus an ordered backlog. The lane only does
/// bookkeeping; the pool drives execution.
pub(crate) struct Lane {
    pub(crate) id: LaneId,
    running: Option<TaskId>,
    queue: VecDeque<QueuedTask>,
}

impl Lane {
    pub(crate) fn new(id: LaneId) -> Self {
        Self {
            id,
            running: None,
            queue: VecDeque::new(),
        }
    }

    /// Nothing running and nothing queued
    pub(crate) fn is_idle(&self) -> bool {
        self.running.is_none() && self.queue.is_empty()
    }

    /// No running task, so new work would start immediately
    pub(crate) fn is_free(&self) -> bool {
        self.running.is_none()
    }

    /// Queued plus running task count
    pub(crate) fn load(&self) -> usize {
        self.queue.len() + usize::from(self.running.is_some())
    }

    pub(crate) fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Start `task` if the lane is free, otherwise append it to the backlog
    ///
    /// Returns the task when it must be dispatched now.
    pub(crate) fn enqueue_or_run(&mut self, task: QueuedTask) -> Option<QueuedTask> {
        if self.is_free() {
            Some(self.start(task))
        } else {
            self.queue.push_back(task);
            None
        }
    }

    /// Mark `task` as the running task and hand it back for dispatch
    pub(crate) fn start(&mut self, task: QueuedTask) -> QueuedTask {
        debug_assert!(self.running.is_none(), "lane already has a running task");
        self.running = Some(task.id);
        task
    }

    /// Append `task` to the backlog without starting it
    pub(crate) fn push_queued(&mut self, task: QueuedTask) {
        self.queue.push_back(task);
    }

    /// Detach the entire not-yet-started backlog, leaving any running task alone
    pub(crate) fn drain_queued(&mut self) -> VecDeque<QueuedTask> {
        std::mem::take(&mut self.queue)
    }

    /// Clear the running task and dispatch the backlog head, if any
    pub(crate) fn finish_running(&mut self) -> Option<QueuedTask> {
        self.running = None;
        let next = self.queue.pop_front()?;
        Some(self.start(next))
    }
}
