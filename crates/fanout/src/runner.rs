//! Process runner - one command in one directory
//!
//! The child's stdout and stderr are drained by two reader threads, each line
//! forwarded to the shared [`OutputSink`] behind the directory's tag. The
//! owning thread meanwhile polls the child for exit and kills it once the
//! cancellation signal is raised. Output already produced is still drained.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::options::RunOptions;
use crate::output::{OutputSink, tag_for};

/// First wait between exit/cancellation checks; doubles up to [`MAX_POLL`]
const FIRST_POLL: Duration = Duration::from_millis(1);

/// Longest wait between exit/cancellation checks
const MAX_POLL: Duration = Duration::from_millis(20);

/// Result of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Exited with status 0 (or dry run)
    Succeeded,
    /// Could not start, or exited unsuccessfully
    Failed { reason: String },
    /// Killed by cancellation while running
    Interrupted,
    /// Never started because cancellation came first
    Skipped,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Runs a command in a directory.
///
/// The engine calls this from worker threads, so implementations must be
/// shareable between threads.
pub trait JobRunner: Sync {
    fn run(&self, cancel: &CancelToken, dir: &Path, command: &[String]) -> JobOutcome;
}

/// [`JobRunner`] that spawns real child processes
#[derive(Debug)]
pub struct ProcessRunner {
    options: RunOptions,
    sink: Arc<OutputSink>,
}

impl ProcessRunner {
    pub fn new(options: RunOptions, sink: Arc<OutputSink>) -> Self {
        Self { options, sink }
    }

    fn status(&self, tag: &str, text: &str) {
        if !self.options.quiet {
            self.sink.tagged(tag, text);
        }
    }

    fn start_failed(&self, tag: &str, err: &Error) -> JobOutcome {
        self.sink.tagged_error(tag, &format!("start failed: {err}"));
        JobOutcome::Failed {
            reason: err.to_string(),
        }
    }
}

impl JobRunner for ProcessRunner {
    fn run(&self, cancel: &CancelToken, dir: &Path, command: &[String]) -> JobOutcome {
        let tag = tag_for(dir, self.options.color);

        if self.options.dry_run {
            self.sink.tagged(&tag, &command.join(" "));
            return JobOutcome::Succeeded;
        }

        if cancel.is_cancelled() {
            log::debug!("not starting {}: cancelled", dir.display());
            return JobOutcome::Skipped;
        }

        let mut cmd = match build_command(command, self.options.shell) {
            Ok(cmd) => cmd,
            Err(e) => return self.start_failed(&tag, &e),
        };
        cmd.current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        self.status(&tag, "starting");

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = Error::Spawn {
                    program: cmd.get_program().to_string_lossy().into_owned(),
                    source,
                };
                return self.start_failed(&tag, &err);
            }
        };
        log::debug!("spawned pid {} in {}", child.id(), dir.display());

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            let err = Error::Io(std::io::Error::other("child output pipes unavailable"));
            return self.start_failed(&tag, &err);
        };

        let sink = self.sink.as_ref();
        let tag_ref = tag.as_str();
        let waited = thread::scope(|scope| {
            scope.spawn(move || drain(stdout, tag_ref, sink));
            scope.spawn(move || drain(stderr, tag_ref, sink));
            supervise(&mut child, cancel)
        });

        let outcome = match waited {
            Ok(status) if status.success() => JobOutcome::Succeeded,
            _ if cancel.is_cancelled() => JobOutcome::Interrupted,
            Ok(status) => JobOutcome::Failed {
                reason: status.to_string(),
            },
            Err(e) => JobOutcome::Failed {
                reason: format!("wait failed: {e}"),
            },
        };

        match &outcome {
            JobOutcome::Succeeded => self.status(&tag, "done"),
            JobOutcome::Interrupted => self.status(&tag, "interrupted"),
            JobOutcome::Failed { reason } => self.status(&tag, &format!("failed: {reason}")),
            JobOutcome::Skipped => {}
        }
        outcome
    }
}

/// Build the child command, direct or through the platform shell
pub fn build_command(command: &[String], shell: bool) -> Result<Command> {
    let (program, args) = command.split_first().ok_or(Error::EmptyCommand)?;

    if shell {
        let (sh, flag) = shell_program();
        let mut cmd = Command::new(sh);
        cmd.arg(flag).arg(command.join(" "));
        Ok(cmd)
    } else {
        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }
}

/// Shell and its "run this string" flag
pub fn shell_program() -> (&'static str, &'static str) {
    if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") }
}

/// Wait for `child`, killing it once `cancel` is raised
fn supervise(child: &mut Child, cancel: &CancelToken) -> std::io::Result<ExitStatus> {
    let mut killed = false;
    let mut pause = FIRST_POLL;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if !killed && cancel.is_cancelled() {
            log::debug!("killing pid {}", child.id());
            if let Err(e) = child.kill() {
                log::debug!("kill failed for pid {}: {e}", child.id());
            }
            killed = true;
        }
        thread::sleep(pause);
        pause = next_poll(pause);
    }
}

/// Double the pause, capped at [`MAX_POLL`]
fn next_poll(pause: Duration) -> Duration {
    (pause * 2).min(MAX_POLL)
}

/// Forward every line of `reader` to the sink, tagged
fn drain(reader: impl Read, tag: &str, sink: &OutputSink) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                sink.tagged(tag, line.trim_end_matches(['\n', '\r']));
            }
            Err(e) => {
                log::debug!("stopped reading child output for {tag}: {e}");
                break;
            }
        }
    }
}
