use std::mem;
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::config::PoolConfig;
use crate::queue::TaskQueue;
use crate::sched::{NativePolicy, SchedulingPolicy};
use crate::task::{self, ResultHandle};
use crate::worker::{Worker, WorkerState};
use crate::{PoolError, Result};

/// A fixed-size pool of worker threads fed from one FIFO queue.
///
/// Each worker can be pinned to a core and run at a requested OS priority,
/// both applied once when the worker starts. Tasks are taken in submission
/// order but may finish in any order.
///
/// Dropping the pool shuts it down: queued tasks still run, then all
/// workers are joined.
pub struct ThreadPool {
    queue: Arc<TaskQueue>,
    workers: Mutex<Vec<Worker>>,
    config: PoolConfig,
}

impl ThreadPool {
    /// Creates a pool of `threads` workers without pinning, at normal priority.
    ///
    /// # Errors
    ///
    /// Returns an error if `threads` is zero or a thread cannot be spawned.
    pub fn new(threads: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(threads))
    }

    /// Creates a pool using the build target's native scheduling calls.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        Self::with_policy(config, Arc::new(NativePolicy::default()))
    }

    /// Creates a pool that applies worker scheduling through `policy`.
    pub fn with_policy(config: PoolConfig, policy: Arc<dyn SchedulingPolicy>) -> Result<Self> {
        if config.threads == 0 {
            return Err(PoolError::InvalidThreadCount);
        }

        let queue = Arc::new(TaskQueue::new());
        let mut workers = Vec::with_capacity(config.threads);
        for index in 0..config.threads {
            match Worker::spawn(config.worker_config(index), queue.clone(), policy.clone()) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    queue.request_stop();
                    workers.iter_mut().for_each(Worker::join);
                    return Err(e);
                }
            }
        }

        debug!(
            "Started pool with {} workers, cores {:?}, priority {}",
            config.threads, config.cores, config.priority
        );
        Ok(Self {
            queue,
            workers: Mutex::new(workers),
            config,
        })
    }

    /// Queues `f` and returns a handle to its eventual result.
    ///
    /// Does not wait for `f` to run. A panic in `f` is delivered through the
    /// handle and does not affect the pool or other tasks.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::PoolStopped` once shutdown has begun; nothing is
    /// queued in that case.
    pub fn submit<F, T>(&self, f: F) -> Result<ResultHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (job, handle) = task::bind(f);
        self.queue.push(job)?;
        Ok(handle)
    }

    /// Queues a job whose result is not needed.
    ///
    /// If the job panics, the panic is logged and the worker carries on.
    pub fn spawn<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.push(Box::new(job)).map(|_| ())
    }

    /// Blocks until every task submitted so far has finished.
    ///
    /// The pool keeps accepting work. Tasks submitted by other threads while
    /// this call is waiting may or may not be waited for.
    pub fn drain(&self) {
        self.queue.await_empty();
    }

    /// Stops accepting tasks, runs everything already queued and joins all
    /// workers. Later calls return immediately.
    pub fn shutdown(&self) {
        self.queue.request_stop();
        let mut workers = mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        if workers.is_empty() {
            return;
        }
        debug!("Shutting down pool, {} tasks still queued", self.queue.len());
        workers.iter_mut().for_each(Worker::join);
    }

    /// Number of worker threads the pool was built with.
    pub fn threads(&self) -> usize {
        self.config.threads
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Tasks submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.queue.in_flight()
    }

    /// Tasks submitted but not yet picked up by a worker.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Whether shutdown has begun.
    pub fn is_stopped(&self) -> bool {
        self.queue.is_stopped()
    }

    /// Current lifecycle state of each worker, by index.
    ///
    /// Empty after shutdown has joined the workers.
    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(Worker::state)
            .collect()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
