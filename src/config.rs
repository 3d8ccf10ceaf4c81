use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{PoolError, Result};

/// Symbolic scheduling level for worker threads.
///
/// Levels are ordered: `Low < Normal < High < Realtime`. Each supported OS
/// maps them onto its own native priority space, preserving that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    /// Below the OS default.
    Low,
    /// The OS default; applying it is a no-op.
    #[default]
    Normal,
    /// Above the OS default.
    High,
    /// The highest class the OS offers. Usually requires privileges.
    Realtime,
}

/// How worker priority is requested: a symbolic level or a raw OS value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Priority {
    /// A symbolic level, translated per OS.
    Level(PriorityLevel),
    /// A native priority value, passed to the OS as-is after range checking.
    Raw(i32),
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Level(PriorityLevel::Normal)
    }
}

impl From<PriorityLevel> for Priority {
    fn from(level: PriorityLevel) -> Self {
        Priority::Level(level)
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Priority::Raw(value)
    }
}

impl FromStr for PriorityLevel {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(PriorityLevel::Low),
            "normal" => Ok(PriorityLevel::Normal),
            "high" => Ok(PriorityLevel::High),
            "realtime" => Ok(PriorityLevel::Realtime),
            _ => Err(PoolError::InvalidPriority(s.to_owned())),
        }
    }
}

impl FromStr for Priority {
    type Err = PoolError;

    /// Parses either a level name (`low`, `normal`, `high`, `realtime`)
    /// or a signed integer.
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(level) = s.parse::<PriorityLevel>() {
            return Ok(Priority::Level(level));
        }
        s.trim()
            .parse::<i32>()
            .map(Priority::Raw)
            .map_err(|_| PoolError::InvalidPriority(s.to_owned()))
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriorityLevel::Low => "low",
            PriorityLevel::Normal => "normal",
            PriorityLevel::High => "high",
            PriorityLevel::Realtime => "realtime",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Level(level) => fmt::Display::fmt(level, f),
            Priority::Raw(value) => write!(f, "{value}"),
        }
    }
}

/// Construction parameters for a [`ThreadPool`](crate::ThreadPool).
///
/// Can be built in code or loaded from JSON:
///
/// ```json
/// { "threads": 4, "cores": [0, 1], "priority": "high" }
/// ```
///
/// Missing fields fall back to [`PoolConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads. Must be positive.
    pub threads: usize,
    /// Logical cores to pin workers to, assigned round-robin by worker index.
    /// Empty means no pinning.
    pub cores: Vec<usize>,
    /// Priority requested for every worker.
    pub priority: Priority,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl PoolConfig {
    /// Creates a config with `threads` workers, no pinning and normal priority.
    pub fn new(threads: usize) -> Self {
        Self {
            threads,
            cores: Vec::new(),
            priority: Priority::default(),
        }
    }

    /// Sets the core list used for pinning.
    pub fn with_cores(mut self, cores: impl IntoIterator<Item = usize>) -> Self {
        self.cores = cores.into_iter().collect();
        self
    }

    /// Sets the worker priority.
    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Reads a JSON config.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Reads a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Returns the settings for worker `index`.
    ///
    /// Cores are reused round-robin when there are more workers than cores.
    pub fn worker_config(&self, index: usize) -> WorkerConfig {
        let core = if self.cores.is_empty() {
            None
        } else {
            Some(self.cores[index % self.cores.len()])
        };
        WorkerConfig {
            index,
            core,
            priority: self.priority,
        }
    }
}

/// Per-worker scheduling settings, fixed at pool construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Position of the worker in the pool.
    pub index: usize,
    /// Core to pin to, if any.
    pub core: Option<usize>,
    /// Requested priority.
    pub priority: Priority,
}
