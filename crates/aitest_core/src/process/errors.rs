//! Process lifecycle error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while launching or stopping external processes.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Executable not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to launch {executable}: {source}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to signal process {pid}: {message}")]
    Signal { pid: u32, message: String },

    #[error("Failed to wait for process {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    /// Create a spawn error for an executable.
    pub fn spawn(executable: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Spawn {
            executable: executable.into(),
            source,
        }
    }

    /// Create a signal delivery error.
    pub fn signal(pid: u32, message: impl Into<String>) -> Self {
        Self::Signal {
            pid,
            message: message.into(),
        }
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = Result<T, ProcessError>;
