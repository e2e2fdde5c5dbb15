//! Concurrency engine - one job per directory, bounded by a worker cap
//!
//! With a cap of 1 jobs run strictly in input order on the calling thread.
//! Otherwise a dedicated rayon pool with exactly `cap` threads runs them, so
//! no more than `cap` children are ever alive at once. A failing job never
//! stops the others; only the cancellation signal does, by abandoning jobs
//! that have not started yet.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::options::RunOptions;
use crate::runner::{JobOutcome, JobRunner};

/// Aggregate result of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Jobs that succeeded
    pub succeeded: usize,
    /// Jobs that failed or were interrupted, in completion order
    pub failed: Vec<PathBuf>,
    /// Jobs abandoned before starting because of cancellation
    pub skipped: Vec<PathBuf>,
    /// Whether the cancellation signal was raised during the batch
    pub cancelled: bool,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Jobs that actually ran
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

#[derive(Default)]
struct Tally {
    succeeded: usize,
    failed: Vec<PathBuf>,
    skipped: Vec<PathBuf>,
}

/// Runs one command across many directories
#[derive(Debug)]
pub struct Engine<R> {
    runner: R,
    workers: usize,
}

impl<R: JobRunner> Engine<R> {
    pub fn new(options: &RunOptions, runner: R) -> Self {
        Self {
            runner,
            workers: options.worker_limit(),
        }
    }

    /// Effective concurrency cap
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run `command` in every directory of `dirs`
    pub fn execute(
        &self,
        cancel: &CancelToken,
        dirs: &[PathBuf],
        command: &[String],
    ) -> Result<ExecutionReport> {
        if command.is_empty() {
            return Err(Error::EmptyCommand);
        }

        let tally = Mutex::new(Tally::default());
        let job = |dir: &PathBuf| {
            if cancel.is_cancelled() {
                log::debug!("skipping {}: cancelled", dir.display());
                record(&tally, dir, &JobOutcome::Skipped);
                return;
            }
            let outcome = self.runner.run(cancel, dir, command);
            log::debug!("{}: {:?}", dir.display(), outcome);
            record(&tally, dir, &outcome);
        };

        let workers = self.workers.min(dirs.len()).max(1);
        if workers == 1 {
            dirs.iter().for_each(&job);
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("fanout-worker-{i}"))
                .build()
                .map_err(|e| Error::ThreadPool(e.to_string()))?;
            pool.install(|| dirs.par_iter().for_each(&job));
        }

        let tally = into_tally(tally);
        Ok(ExecutionReport {
            succeeded: tally.succeeded,
            failed: tally.failed,
            skipped: tally.skipped,
            cancelled: cancel.is_cancelled(),
        })
    }
}

fn record(tally: &Mutex<Tally>, dir: &Path, outcome: &JobOutcome) {
    let mut locked = match tally.lock() {
        Ok(locked) => locked,
        Err(poisoned) => poisoned.into_inner(),
    };
    match outcome {
        JobOutcome::Succeeded => locked.succeeded += 1,
        JobOutcome::Failed { .. } | JobOutcome::Interrupted => {
            locked.failed.push(dir.to_path_buf());
        }
        JobOutcome::Skipped => locked.skipped.push(dir.to_path_buf()),
    }
}

fn into_tally(tally: Mutex<Tally>) -> Tally {
    match tally.into_inner() {
        Ok(tally) => tally,
        Err(poisoned) => poisoned.into_inner(),
    }
}
