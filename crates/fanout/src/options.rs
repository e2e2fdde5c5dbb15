//! Runtime options shared by the runner and the engine

/// Immutable settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Run jobs concurrently
    pub parallel: bool,
    /// Maximum number of concurrent jobs when `parallel` is set
    pub jobs: usize,
    /// Print what would run without spawning anything
    pub dry_run: bool,
    /// Join the command and hand it to the platform shell
    pub shell: bool,
    /// Suppress status lines, keep child output
    pub quiet: bool,
    /// Colorize directory tags
    pub color: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            jobs: default_jobs(),
            dry_run: false,
            shell: false,
            quiet: false,
            color: true,
        }
    }
}

impl RunOptions {
    /// Effective concurrency cap: 1 in sequential mode, otherwise `jobs` (at least 1)
    pub fn worker_limit(&self) -> usize {
        if self.parallel { self.jobs.max(1) } else { 1 }
    }

    /// Short description used in the "running in N dirs" header
    pub fn mode_label(&self) -> String {
        if self.parallel {
            format!("parallel, {} workers", self.worker_limit())
        } else {
            "seq".to_string()
        }
    }
}

/// Number of logical CPUs, falling back to 1
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}
