//! Error types for session operations.

use std::path::PathBuf;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The driver could not open or initialize the database file.
    #[error("Cannot connect to database \"{}\": {source}", .path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The driver refused to close the connection.
    #[error("Cannot disconnect from database \"{}\": {source}", .path.display())]
    Disconnect {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Did not connect to database")]
    NotConnected,

    #[error("Operation in progress, wait until it is done")]
    Busy,

    /// The engine rejected a command.
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// A command could not be built from the given arguments.
    #[error("Invalid command: {message}")]
    InvalidCommand { message: String },

    #[error("Cannot create parent directory \"{}\": {source}", .path.display())]
    ParentDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a new invalid command error.
    pub fn invalid_command<S: Into<String>>(message: S) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }

    /// Whether the error came from the engine rejecting a command.
    pub fn is_sql(&self) -> bool {
        matches!(self, Self::Sql(_))
    }
}
