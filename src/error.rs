use std::io;
use thiserror::Error;

/// Error type for pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// A task was submitted after shutdown began.
    #[error("Thread pool is stopped")]
    PoolStopped,

    /// A pool was requested with zero worker threads.
    #[error("Thread count must be at least 1")]
    InvalidThreadCount,

    /// The OS refused to create a worker thread.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// A raw priority value outside the host OS's valid range.
    #[error("Invalid priority value {value} (valid range {min}~{max})")]
    InvalidPriorityValue {
        /// The rejected value.
        value: i32,
        /// Lowest accepted value.
        min: i32,
        /// Highest accepted value.
        max: i32,
    },

    /// The OS rejected an affinity or priority request.
    #[error("Failed to {action}: {source}")]
    Scheduling {
        /// What was being attempted, e.g. "pin thread to core 3".
        action: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The submitted task panicked.
    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    /// The task was dropped without producing a result.
    #[error("Task was dropped before completing")]
    TaskLost,

    /// A priority string that is neither a level name nor an integer.
    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed configuration file.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
