//! Cancellation, progress reporting and background job supervision.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::error::{PipelineError, Result};

/// Shared cancellation flag, polled by long-running work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Units done.
    pub current: usize,
    /// Units in total.
    pub total: usize,
    /// Human-readable status.
    pub message: String,
}

/// Sending half of a progress channel. Reporting never blocks, and events
/// are dropped when nobody listens.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl Progress {
    /// A reporter that discards every event.
    pub fn silent() -> Self {
        Self::default()
    }

    /// A reporter and the receiver its events arrive on.
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Send an event.
    pub fn report(&self, current: usize, total: usize, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressEvent {
                current,
                total,
                message: message.into(),
            });
        }
    }
}

/// Kind of background operation, one in flight per model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Slicing and section grouping.
    Slice,
    /// Contour reconstruction and hatching.
    Hatch,
}

type JobKey = (usize, OperationKind);

#[derive(Debug)]
struct Slot {
    generation: u64,
    cancel: CancelToken,
}

#[derive(Debug, Default)]
struct Jobs {
    next_generation: u64,
    slots: HashMap<JobKey, Slot>,
}

/// Runs blocking pipeline work on the Tokio blocking pool, at most one job
/// per `(model_index, OperationKind)`.
///
/// Submitting a job cancels any older job under the same key, and the older
/// job's result is discarded as [`PipelineError::Superseded`] even if it ran
/// to completion.
#[derive(Debug, Clone, Default)]
pub struct JobSupervisor {
    jobs: Arc<Mutex<Jobs>>,
}

impl JobSupervisor {
    /// An idle supervisor.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Jobs> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start `work` for a model, superseding any job under the same key.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit<T, F>(&self, model_index: usize, kind: OperationKind, work: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(CancelToken) -> Result<T> + Send + 'static,
    {
        let key = (model_index, kind);
        let cancel = CancelToken::new();
        let generation = {
            let mut jobs = self.lock();
            jobs.next_generation += 1;
            let generation = jobs.next_generation;
            let previous = jobs.slots.insert(
                key,
                Slot {
                    generation,
                    cancel: cancel.clone(),
                },
            );
            if let Some(previous) = previous {
                previous.cancel.cancel();
                tracing::debug!(model_index, ?kind, superseded = previous.generation, "superseding job");
            }
            generation
        };

        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || work(token));
        JobHandle {
            key,
            generation,
            cancel,
            supervisor: self.clone(),
            task,
        }
    }

    /// Cancel the job under a key, if any.
    pub fn cancel(&self, model_index: usize, kind: OperationKind) -> bool {
        match self.lock().slots.get(&(model_index, kind)) {
            Some(slot) => {
                slot.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every job.
    pub fn cancel_all(&self) {
        for slot in self.lock().slots.values() {
            slot.cancel.cancel();
        }
    }

    /// Number of jobs that have not been joined yet.
    pub fn in_flight(&self) -> usize {
        self.lock().slots.len()
    }

    /// Release the slot if `generation` still owns it. Returns false when a
    /// newer job has taken the key.
    fn finish(&self, key: JobKey, generation: u64) -> bool {
        let mut jobs = self.lock();
        match jobs.slots.get(&key) {
            Some(slot) if slot.generation == generation => {
                jobs.slots.remove(&key);
                true
            }
            _ => false,
        }
    }
}

/// A submitted job.
///
/// Dropping the handle without joining cancels the job and frees its slot.
#[derive(Debug)]
pub struct JobHandle<T> {
    key: JobKey,
    generation: u64,
    cancel: CancelToken,
    supervisor: JobSupervisor,
    task: JoinHandle<Result<T>>,
}

impl<T> JobHandle<T> {
    /// Generation number assigned at submission; later jobs get larger ones.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the job. A result from a superseded job is discarded.
    pub async fn join(mut self) -> Result<T> {
        let outcome = (&mut self.task).await;
        if !self.supervisor.finish(self.key, self.generation) {
            return Err(PipelineError::Superseded);
        }
        match outcome {
            Ok(result) => result,
            Err(e) => Err(PipelineError::JobFailed(e.to_string())),
        }
    }
}

impl<T> Drop for JobHandle<T> {
    fn drop(&mut self) {
        // No-op after `join`, or once a newer job owns the key.
        if self.supervisor.finish(self.key, self.generation) {
            self.cancel.cancel();
        }
    }
}
