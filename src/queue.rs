use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crossbeam::channel::{self, Receiver, Sender};
use log::error;

use crate::task::{Job, Task};
use crate::{PoolError, Result};

/// Producer side of the queue. `tx` is `None` once the queue is stopped.
struct Producer {
    tx: Option<Sender<Task>>,
    next_seq: u64,
}

/// FIFO of pending tasks shared by the pool and its workers.
///
/// Tasks travel through an unbounded MPMC channel. Stopping drops the only
/// sender, so consumers keep receiving what is already queued and then see
/// the channel disconnect. A separate counter tracks tasks that were pushed
/// but have not finished running.
pub(crate) struct TaskQueue {
    producer: Mutex<Producer>,
    rx: Receiver<Task>,
    in_flight: Mutex<usize>,
    idle: Condvar,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            producer: Mutex::new(Producer {
                tx: Some(tx),
                next_seq: 0,
            }),
            rx,
            in_flight: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    /// Appends a job and wakes one waiting consumer.
    ///
    /// Returns the task's sequence number, or `PoolError::PoolStopped` if
    /// the queue no longer accepts work.
    pub(crate) fn push(&self, job: Job) -> Result<u64> {
        let mut producer = lock(&self.producer);
        let seq = producer.next_seq;
        let tx = producer.tx.as_ref().ok_or(PoolError::PoolStopped)?;

        // Count before sending so a fast consumer cannot finish it first.
        *lock(&self.in_flight) += 1;
        if tx.send(Task::new(seq, job)).is_err() {
            self.mark_done();
            return Err(PoolError::PoolStopped);
        }

        producer.next_seq += 1;
        Ok(seq)
    }

    /// Blocks until a task is available or the queue is stopped and empty.
    ///
    /// `None` means there is no more work, ever.
    pub(crate) fn pop(&self) -> Option<Task> {
        self.rx.recv().ok()
    }

    /// Records that a popped task has finished running.
    pub(crate) fn mark_done(&self) {
        let mut in_flight = lock(&self.in_flight);
        match in_flight.checked_sub(1) {
            Some(n) => *in_flight = n,
            None => {
                error!("Task completion reported with nothing in flight");
                return;
            }
        }
        if *in_flight == 0 {
            self.idle.notify_all();
        }
    }

    /// Blocks until no pushed task is left unfinished.
    pub(crate) fn await_empty(&self) {
        let in_flight = lock(&self.in_flight);
        let _idle = self
            .idle
            .wait_while(in_flight, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Stops accepting work and wakes every blocked consumer. Idempotent.
    pub(crate) fn request_stop(&self) {
        lock(&self.producer).tx.take();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        lock(&self.producer).tx.is_none()
    }

    /// Tasks pushed but not yet finished.
    pub(crate) fn in_flight(&self) -> usize {
        *lock(&self.in_flight)
    }

    /// Tasks pushed but not yet popped.
    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}

/// No user code runs while these locks are held, so poisoning carries no
/// broken invariant and is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
