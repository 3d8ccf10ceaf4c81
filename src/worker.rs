use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, error};

use crate::config::WorkerConfig;
use crate::queue::TaskQueue;
use crate::sched::{configure_current_thread, SchedulingPolicy};
use crate::task::panic_message;
use crate::{PoolError, Result};

/// Lifecycle of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Applying affinity and priority; no task taken yet.
    Starting,
    /// Taking tasks from the queue.
    Running,
    /// The queue is stopped and empty; the thread is about to exit.
    Draining,
    /// The thread has exited.
    Stopped,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Starting,
            1 => WorkerState::Running,
            2 => WorkerState::Draining,
            _ => WorkerState::Stopped,
        }
    }
}

/// One pool thread and the means to join it.
pub(crate) struct Worker {
    index: usize,
    state: Arc<AtomicU8>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Starts a worker thread that serves `queue` until it is stopped and empty.
    ///
    /// The configuration is moved into the thread, so the worker never looks
    /// at the pool's worker list while it is still being built.
    pub(crate) fn spawn(
        config: WorkerConfig,
        queue: Arc<TaskQueue>,
        policy: Arc<dyn SchedulingPolicy>,
    ) -> Result<Self> {
        let index = config.index;
        let state = Arc::new(AtomicU8::new(WorkerState::Starting as u8));
        let thread_state = state.clone();

        let handle = thread::Builder::new()
            .name(format!("pinpool-worker-{index}"))
            .spawn(move || run(&config, &queue, policy.as_ref(), &thread_state))
            .map_err(PoolError::Spawn)?;

        Ok(Self {
            index,
            state,
            handle: Some(handle),
        })
    }

    pub(crate) fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Waits for the thread to exit. Does nothing if already joined.
    pub(crate) fn join(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        if handle.thread().id() == thread::current().id() {
            error!(
                "Worker {} cannot join itself, leaving it to exit on its own",
                self.index
            );
            return;
        }

        if handle.join().is_err() {
            error!("Worker {} thread panicked", self.index);
        }
    }
}

fn run(config: &WorkerConfig, queue: &TaskQueue, policy: &dyn SchedulingPolicy, state: &AtomicU8) {
    let id = config.index;
    configure_current_thread(policy, config);
    state.store(WorkerState::Running as u8, Ordering::Release);
    debug!("Worker {id} running");

    while let Some(task) = queue.pop() {
        let seq = task.seq();
        debug!("Worker {id} executing task #{seq}");
        // Catch panics so the worker loop continues
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            error!(
                "Worker {id} task #{seq} panicked: {}, continuing",
                panic_message(payload.as_ref())
            );
        }
        queue.mark_done();
    }

    state.store(WorkerState::Draining as u8, Ordering::Release);
    debug!("Worker {id}: queue stopped and empty, shutting down");
    state.store(WorkerState::Stopped as u8, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::config::PoolConfig;
    use crate::sched::NoopPolicy;

    #[test]
    fn worker_drains_queue_then_stops() {
        let queue = Arc::new(TaskQueue::new());
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = counter.clone();
            queue
                .push(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }
        queue.request_stop();

        let mut worker = Worker::spawn(
            PoolConfig::new(1).worker_config(0),
            queue.clone(),
            Arc::new(NoopPolicy),
        )
        .unwrap();
        worker.join();

        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(queue.in_flight(), 0);
        assert_eq!(worker.state(), WorkerState::Stopped);
    }

    #[test]
    fn panicking_job_is_counted_done() {
        let queue = Arc::new(TaskQueue::new());
        queue.push(Box::new(|| panic!("job failure"))).unwrap();
        queue.push(Box::new(|| {})).unwrap();

        let mut worker = Worker::spawn(
            PoolConfig::new(1).worker_config(0),
            queue.clone(),
            Arc::new(NoopPolicy),
        )
        .unwrap();
        queue.await_empty();
        queue.request_stop();
        worker.join();

        assert_eq!(queue.in_flight(), 0);
    }

    #[test]
    fn join_twice_is_harmless() {
        let queue = Arc::new(TaskQueue::new());
        queue.request_stop();
        let mut worker = Worker::spawn(
            PoolConfig::new(1).worker_config(0),
            queue,
            Arc::new(NoopPolicy),
        )
        .unwrap();
        worker.join();
        worker.join();
    }
}
