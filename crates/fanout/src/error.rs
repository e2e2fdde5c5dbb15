//! Error types for the fanout crate

use thiserror::Error;

/// Errors that can occur while preparing or running a batch
#[derive(Error, Debug)]
pub enum Error {
    /// No command was given to run
    #[error("no command given")]
    EmptyCommand,

    /// The worker pool could not be created
    #[error("failed to create worker pool: {0}")]
    ThreadPool(String),

    /// A child process could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The interrupt handler could not be installed
    #[error("failed to install interrupt handler: {0}")]
    Signal(String),
}

/// Result type for fanout operations
pub type Result<T> = std::result::Result<T, Error>;
