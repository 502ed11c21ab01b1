//! Background tasks and their completions.
//!
//! The controller owns all state on one thread. Blocking work (catalog
//! fetch, generate request, typesetting) runs as a task; each task reports
//! back exactly one [`Completion`] carrying its own typed `Result`.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use tracing::warn;
use uuid::Uuid;

use crate::backend::MoaResponse;
use crate::error::{CatalogFetchError, RequestError, TypesetError};
use crate::render::SafeMarkup;

/// Where rendered markup was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// A model's output slot, by key.
    Slot(String),
    /// The fixed aggregate region.
    Aggregate,
}

/// Result of one background task.
#[derive(Debug)]
pub enum Completion {
    /// `GET /models` finished.
    Catalog(Result<Vec<String>, CatalogFetchError>),
    /// `POST /moa` finished for the given render cycle.
    Generate {
        /// Cycle that issued the request.
        cycle: Uuid,
        /// Response or failure.
        result: Result<MoaResponse, RequestError>,
    },
    /// Typesetting finished for markup written at `revision`.
    Typeset {
        /// Node the markup was written to.
        target: RenderTarget,
        /// Revision of the content that was typeset.
        revision: u64,
        /// Typeset markup or failure.
        result: Result<SafeMarkup, TypesetError>,
    },
}

/// A unit of blocking work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes jobs.
pub trait TaskRunner: Send + Sync {
    /// Run `job`, now or later.
    ///
    /// # Errors
    ///
    /// Returns an error if the job could not be scheduled. The job is
    /// dropped without running.
    fn spawn(&self, job: Job) -> io::Result<()>;
}

/// Runs every job on its own named thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRunner;

impl TaskRunner for ThreadRunner {
    fn spawn(&self, job: Job) -> io::Result<()> {
        thread::Builder::new()
            .name("moa-task".to_string())
            .spawn(job)
            .map(drop)
    }
}

/// Runs every job immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineRunner;

impl TaskRunner for InlineRunner {
    fn spawn(&self, job: Job) -> io::Result<()> {
        job();
        Ok(())
    }
}

/// Submits tasks and collects their completions.
pub struct Tasks {
    runner: Arc<dyn TaskRunner>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl std::fmt::Debug for Tasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tasks").finish_non_exhaustive()
    }
}

impl Tasks {
    /// Task queue over `runner`.
    #[must_use]
    pub fn new(runner: Arc<dyn TaskRunner>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { runner, tx, rx }
    }

    /// Run `work` and queue what it returns.
    ///
    /// When the runner cannot schedule `work`, `lost` turns the spawn error
    /// into the completion instead, so every submit yields exactly one.
    pub fn submit<F, L>(&self, work: F, lost: L)
    where
        F: FnOnce() -> Completion + Send + 'static,
        L: FnOnce(io::Error) -> Completion,
    {
        let tx = self.tx.clone();
        let job: Job = Box::new(move || {
            // The receiver only goes away when the controller does.
            let _ = tx.send(work());
        });
        if let Err(e) = self.runner.spawn(job) {
            warn!("Failed to schedule task: {e}");
            let _ = self.tx.send(lost(e));
        }
    }

    /// Take every completion queued so far, without blocking.
    pub fn drain(&self) -> Vec<Completion> {
        self.rx.try_iter().collect()
    }
}
