//! Sequential background runner for external download jobs.
//!
//! A [`JobRunner`] owns a snapshot of the job list for one run. `start`
//! moves it onto a dedicated worker thread and returns a [`RunHandle`]
//! immediately; the worker invokes the tool once per job, strictly in
//! order, and reports through a [`NotificationSink`]. Cancellation is
//! cooperative: the flag is checked before each job, a job that already
//! started runs to completion.

mod launcher;
mod notify;
mod stamp;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;

use crate::config::DEFAULT_TOOL;
use crate::job::Job;

pub use launcher::{LaunchError, Launcher, ProcessExit, RunningProcess, SystemLauncher};
pub use notify::{Notification, NotificationSink};
pub use stamp::{stamp_template, Stamper};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("could not start run worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("run worker panicked")]
    WorkerPanicked,
}

/// Success/failure counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: u32,
    pub failed: u32,
}

impl Tally {
    pub fn total(&self) -> u32 {
        self.succeeded + self.failed
    }
}

/// Per-run values resolved by the caller.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Program name or path of the external tool.
    pub program: String,
    /// Emit the tool's stdout as `OutputLine` notifications.
    pub stream_output: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            program: DEFAULT_TOOL.to_string(),
            stream_output: true,
        }
    }
}

/// Cloneable cancellation switch for a run.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that no further job is started. Idempotent.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }
}

/// One run: the job snapshot plus how to execute it.
pub struct JobRunner {
    jobs: Arc<[Job]>,
    launcher: Arc<dyn Launcher>,
    options: RunOptions,
    stop: StopHandle,
}

impl JobRunner {
    pub fn new(jobs: Vec<Job>, launcher: Arc<dyn Launcher>, options: RunOptions) -> Self {
        Self {
            jobs: jobs.into(),
            launcher,
            options,
            stop: StopHandle::new(),
        }
    }

    /// Runner that launches real processes.
    pub fn with_system_launcher(jobs: Vec<Job>, options: RunOptions) -> Self {
        Self::new(jobs, Arc::new(SystemLauncher), options)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Stop switch usable before the run is started.
    pub fn stopper(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Hand the queue to a worker thread and return at once.
    ///
    /// An empty queue spawns nothing and emits nothing; the returned handle
    /// is already finished.
    pub fn start<S: NotificationSink>(self, sink: S) -> Result<RunHandle, RunnerError> {
        if self.jobs.is_empty() {
            tracing::debug!("empty job list; nothing to run");
            return Ok(RunHandle {
                stop: self.stop,
                worker: None,
            });
        }

        let stop = self.stop.clone();
        let worker = std::thread::Builder::new()
            .name("replica-run".to_string())
            .spawn(move || worker::run_queue(&self, &sink))
            .map_err(RunnerError::Spawn)?;
        Ok(RunHandle {
            stop,
            worker: Some(worker),
        })
    }
}

/// Handle to a started run.
#[derive(Debug)]
pub struct RunHandle {
    stop: StopHandle,
    worker: Option<JoinHandle<Tally>>,
}

impl RunHandle {
    /// Request cooperative cancellation. Safe to call repeatedly or after the run ended.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stopper(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, |w| w.is_finished())
    }

    /// Block until the worker exits and return the final tally.
    /// After a stop this is the tally of the jobs that did run.
    pub fn join(mut self) -> Result<Tally, RunnerError> {
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| RunnerError::WorkerPanicked),
            None => Ok(Tally::default()),
        }
    }
}
