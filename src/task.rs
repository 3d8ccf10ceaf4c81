use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam::channel::{self, Receiver, TryRecvError};

use crate::{PoolError, Result};

/// Type-erased unit of work as stored in the queue.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A queued job tagged with its submission sequence number.
pub(crate) struct Task {
    seq: u64,
    job: Job,
}

impl Task {
    pub(crate) fn new(seq: u64, job: Job) -> Self {
        Self { seq, job }
    }

    /// Position of this task in submission order, starting at 0.
    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn run(self) {
        (self.job)()
    }
}

/// Wraps `f` into a job that writes its outcome into a fresh handle.
///
/// Panics inside `f` are caught and delivered through the handle.
pub(crate) fn bind<F, T>(f: F) -> (Job, ResultHandle<T>)
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = channel::bounded(1);
    let job = Box::new(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        // Nobody may be listening; the task still counts as done.
        let _ = tx.send(outcome);
    });
    (job, ResultHandle { rx })
}

/// The eventual result of a submitted task.
///
/// Written once by the worker that runs the task and read once by the
/// caller. Outlives the pool: a handle can be joined after the pool is gone.
pub struct ResultHandle<T> {
    rx: Receiver<thread::Result<T>>,
}

impl<T> ResultHandle<T> {
    /// Blocks until the task has finished and returns its value.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::TaskPanicked` if the task panicked, or
    /// `PoolError::TaskLost` if it was dropped without running.
    pub fn join(self) -> Result<T> {
        match self.rx.recv() {
            Ok(outcome) => into_result(outcome),
            Err(_) => Err(PoolError::TaskLost),
        }
    }

    /// Returns the result if the task has finished, or gives the handle back.
    pub fn try_join(self) -> std::result::Result<Result<T>, Self> {
        match self.rx.try_recv() {
            Ok(outcome) => Ok(into_result(outcome)),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Disconnected) => Ok(Err(PoolError::TaskLost)),
        }
    }

    /// Whether the task's result is available without blocking.
    pub fn is_ready(&self) -> bool {
        !self.rx.is_empty()
    }
}

impl<T> fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

fn into_result<T>(outcome: thread::Result<T>) -> Result<T> {
    outcome.map_err(|payload| PoolError::TaskPanicked(panic_message(payload.as_ref())))
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_reaches_handle() {
        let (job, handle) = bind(|| 6 * 7);
        assert!(!handle.is_ready());
        job();
        assert!(handle.is_ready());
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn panic_is_captured() {
        let (job, handle) = bind(|| -> u32 { panic!("boom {}", 7) });
        job();
        match handle.join() {
            Err(PoolError::TaskPanicked(msg)) => assert_eq!(msg, "boom 7"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn static_str_panic_message() {
        let (job, handle) = bind(|| -> () { panic!("static") });
        job();
        assert!(matches!(handle.join(), Err(PoolError::TaskPanicked(m)) if m == "static"));
    }

    #[test]
    fn dropped_job_is_lost() {
        let (job, handle) = bind(|| 1);
        drop(job);
        assert!(matches!(handle.join(), Err(PoolError::TaskLost)));
    }

    #[test]
    fn try_join_hands_back_pending_handle() {
        let (job, handle) = bind(|| "done");
        let handle = handle.try_join().unwrap_err();
        job();
        assert_eq!(handle.try_join().unwrap().unwrap(), "done");
    }

    #[test]
    fn dropped_handle_does_not_break_job() {
        let (job, handle) = bind(|| 5);
        drop(handle);
        job();
    }

    #[test]
    fn task_runs_and_keeps_seq() {
        let (job, handle) = bind(|| 3);
        let task = Task::new(9, job);
        assert_eq!(task.seq(), 9);
        task.run();
        assert_eq!(handle.join().unwrap(), 3);
    }
}
