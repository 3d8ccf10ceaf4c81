#![deny(missing_docs)]

//! A fixed-size thread pool with per-worker CPU pinning and OS priority.
//!
//! Tasks go into a single FIFO queue and are run by a fixed set of worker
//! threads. Each worker can be pinned to a logical core (assigned
//! round-robin from a core list) and can request a symbolic or raw OS
//! scheduling priority. Besides submit and shutdown, the pool offers
//! [`ThreadPool::drain`], which waits for all submitted work without
//! stopping the pool.
//!
//! ```
//! use pinpool::ThreadPool;
//!
//! let pool = ThreadPool::new(4).unwrap();
//! let handles: Vec<_> = (0..8u64).map(|i| pool.submit(move || i * i).unwrap()).collect();
//! pool.drain();
//! let squares: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
//! assert_eq!(squares, [0, 1, 4, 9, 16, 25, 36, 49]);
//! ```

mod config;
mod error;
mod pool;
mod queue;
/// OS scheduling controls applied by workers at startup.
pub mod sched;
mod task;
mod worker;

pub use config::{PoolConfig, Priority, PriorityLevel, WorkerConfig};
pub use error::{PoolError, Result};
pub use pool::ThreadPool;
pub use sched::{NativePolicy, NoopPolicy, SchedulingPolicy};
pub use task::ResultHandle;
pub use worker::WorkerState;
