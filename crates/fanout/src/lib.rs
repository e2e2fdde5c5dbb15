//! # fanout
//!
//! Run one command in many directories, optionally in parallel, with every
//! output line prefixed by the directory it came from.
//!
//! ## Pipeline
//!
//! 1. **Resolve** target patterns (paths, globs, `group:name`) into an ordered,
//!    deduplicated list of absolute directories ([`resolver`])
//! 2. **Filter** (optional) down to repositories with local work ([`dirty`])
//! 3. **Execute** the command in each directory under a worker cap and a shared
//!    cancellation signal ([`engine`], [`runner`])
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fanout::{CancelToken, Engine, GroupTable, OutputSink, ProcessRunner, RunOptions, resolve};
//!
//! let groups = GroupTable::new();
//! let dirs = resolve(&["~/src/*"], &groups);
//!
//! let options = RunOptions { parallel: true, jobs: 4, ..Default::default() };
//! let runner = ProcessRunner::new(options.clone(), Arc::new(OutputSink::stdio()));
//! let engine = Engine::new(&options, runner);
//!
//! let command = vec!["git".to_string(), "pull".to_string()];
//! let report = engine.execute(&CancelToken::new(), &dirs, &command)?;
//! println!("{} ok, {} failed", report.succeeded, report.failed.len());
//! # Ok::<(), fanout::Error>(())
//! ```
//!
//! ## Traits
//!
//! - [`JobRunner`]: runs one command in one directory ([`ProcessRunner`] spawns
//!   real processes)
//! - [`VcsProbe`]: answers "has local changes" / "diverges from upstream"
//!   ([`GitProbe`] asks git)

pub mod cancel;
pub mod dirty;
pub mod engine;
pub mod error;
pub mod options;
pub mod output;
pub mod resolver;
pub mod runner;

pub use cancel::{CancelToken, install_interrupt_handler};
pub use dirty::{GitProbe, VcsProbe, filter_dirty};
pub use engine::{Engine, ExecutionReport};
pub use error::{Error, Result};
pub use options::{RunOptions, default_jobs};
pub use output::OutputSink;
pub use resolver::{GroupTable, Resolution, ResolveWarning, Resolver, resolve};
pub use runner::{JobOutcome, JobRunner, ProcessRunner};
