//! Background task execution with a progress queue.
//!
//! Long deconvolutions run on a worker thread. The worker reports progress through a
//! [`ProgressSender`], which implements [`ProgressSink`] and pushes each message onto a
//! channel drained by the single owner of the [`TaskHandle`].

use std::any::Any;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use deconv::ProgressSink;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Worker thread panicked: {0}")]
    Panicked(String),
}

/// A progress message emitted by a running task
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub message: String,
    /// Time since the task was submitted
    pub elapsed: Duration,
}

/// Worker-side end of the progress queue
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Sender<ProgressEvent>,
    started: Instant,
}

impl ProgressSink for ProgressSender {
    fn info(&self, message: &str) {
        // The receiver may already be gone if the host stopped listening
        let _ = self.tx.send(ProgressEvent {
            message: message.to_string(),
            elapsed: self.started.elapsed(),
        });
    }
}

/// What the host sees when it polls a task
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    Progress(ProgressEvent),
    /// No event within the timeout; the task is still running
    Pending,
    /// The worker has finished and every event has been drained
    Done,
}

/// Owner-side handle to a submitted task
#[derive(Debug)]
pub struct TaskHandle<T> {
    events: Receiver<ProgressEvent>,
    thread: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    /// Wait up to `timeout` for the next progress event
    pub fn poll(&self, timeout: Duration) -> Poll {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Poll::Progress(event),
            Err(RecvTimeoutError::Timeout) => Poll::Pending,
            Err(RecvTimeoutError::Disconnected) => Poll::Done,
        }
    }

    /// All events queued so far, without blocking
    pub fn drain(&self) -> Vec<ProgressEvent> {
        self.events.try_iter().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the worker returns
    pub fn join(self) -> Result<T, TaskError> {
        self.thread
            .join()
            .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Spawns named worker threads for long-running work
#[derive(Debug, Clone)]
pub struct TaskRunner {
    name: String,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new("deconv-worker")
    }
}

impl TaskRunner {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Run `work` on a new thread, handing it the worker end of the progress queue
    pub fn submit<T, F>(&self, work: F) -> Result<TaskHandle<T>, TaskError>
    where
        T: Send + 'static,
        F: FnOnce(&ProgressSender) -> T + Send + 'static,
    {
        let (tx, rx) = unbounded();
        let sender = ProgressSender {
            tx,
            started: Instant::now(),
        };

        let thread = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || work(&sender))?;

        Ok(TaskHandle { events: rx, thread })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_before_completion() {
        let runner = TaskRunner::default();
        let handle = runner
            .submit(|progress| {
                for i in 1..=3 {
                    progress.info(&format!("step {i}"));
                }
                42
            })
            .unwrap();

        let mut messages = Vec::new();
        loop {
            match handle.poll(Duration::from_secs(5)) {
                Poll::Progress(event) => messages.push(event.message),
                Poll::Pending => panic!("worker stalled"),
                Poll::Done => break,
            }
        }

        assert_eq!(messages, vec!["step 1", "step 2", "step 3"]);
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn test_panic_is_reported() {
        let handle = TaskRunner::new("panicking")
            .submit(|_progress| -> u32 { panic!("deliberate failure") })
            .unwrap();

        match handle.join() {
            Err(TaskError::Panicked(message)) => assert_eq!(message, "deliberate failure"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_drain_after_join_point() {
        let handle = TaskRunner::default()
            .submit(|progress| {
                progress.info("only");
            })
            .unwrap();

        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }

        let events = handle.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "only");
        assert_eq!(handle.poll(Duration::from_millis(10)), Poll::Done);
        handle.join().unwrap();
    }
}
