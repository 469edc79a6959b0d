//! Error types for the console.

use bridge::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

/// Bad `%` command input. Reported inline, nothing is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: %{0}. Type 'help' for a list of commands.")]
    Unknown(String),

    /// Argument parsing failed; carries the rendered usage message
    #[error("{0}")]
    Usage(String),
}

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Command(#[from] CommandError),

    /// A playback file could not be read
    #[error("Cannot read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConsoleError {
    /// True when the session has to end.
    pub fn is_fatal(&self) -> bool {
        match self {
            ConsoleError::Bridge(e) => e.is_fatal(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
