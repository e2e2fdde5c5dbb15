//! Process-wide cancellation signal
//!
//! A [`CancelToken`] is a cheap, cloneable handle on one shared flag. It is set
//! at most once (normally by the first Ctrl-C) and never reset. Every job in a
//! batch holds a clone: jobs that have not started yet are abandoned, and jobs
//! that are running kill their child process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Idempotent.
    pub fn cancel(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            log::debug!("cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Flag the SIGINT handler writes to. Only one handler per process.
static INTERRUPT_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Route the first interrupt (Ctrl-C) to `token`.
///
/// After the first interrupt the default disposition is restored, so a second
/// Ctrl-C terminates the process outright.
#[cfg(unix)]
pub fn install_interrupt_handler(token: &CancelToken) -> Result<()> {
    if INTERRUPT_FLAG.set(Arc::clone(&token.flag)).is_err() {
        return Err(Error::Signal("handler already installed".to_string()));
    }

    let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only performs an atomic store and resets the
    // disposition, both async-signal-safe.
    let previous = unsafe { libc::signal(libc::SIGINT, handler) };
    if previous == libc::SIG_ERR {
        return Err(Error::Signal(std::io::Error::last_os_error().to_string()));
    }

    log::debug!("interrupt handler installed");
    Ok(())
}

#[cfg(not(unix))]
pub fn install_interrupt_handler(token: &CancelToken) -> Result<()> {
    if INTERRUPT_FLAG.set(Arc::clone(&token.flag)).is_err() {
        return Err(Error::Signal("handler already installed".to_string()));
    }
    log::debug!("no interrupt handler on this platform; Ctrl-C terminates immediately");
    Ok(())
}

#[cfg(unix)]
extern "C" fn on_interrupt(_signal: libc::c_int) {
    if let Some(flag) = INTERRUPT_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
    // SAFETY: signal(2) is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}
