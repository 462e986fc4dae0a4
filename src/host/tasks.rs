//! Supervised background tasks
//!
//! Best-effort work (the post-connect hook, anything touching the network)
//! runs on its own named thread with a deadline and a cancel flag. Threads
//! cannot be killed, so both are cooperative: the task body calls
//! [`TaskContext::checkpoint`], [`TaskContext::sleep`] or
//! [`TaskContext::wait_ready`], which return an error once the task should
//! stop.
//!
//! Errors and panics never leave the task thread. They are logged and the
//! player gets one generic notification through the message queue.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::messages::MessageSender;
use super::readiness::Readiness;
use crate::core::constants::TASK_POLL_INTERVAL;

/// Notification shown when a background task fails
pub const TASK_FAILURE_MESSAGE: &str = "An error has occurred. See logs for more details.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task was cancelled")]
    Cancelled,
    #[error("task exceeded its {0:?} deadline")]
    TimedOut(Duration),
    #[error("task failed: {0}")]
    Failed(String),
}

/// Result a task finished with
pub type TaskOutcome = Result<(), TaskError>;

// =============================================================================
// TASK CONTEXT
// =============================================================================

/// Handed to the task body: deadline and cancellation checks
pub struct TaskContext {
    name: String,
    cancel: Arc<AtomicBool>,
    timeout: Duration,
    /// None when the timeout is too large to represent
    deadline: Option<Instant>,
}

impl TaskContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Time left before the deadline
    pub fn remaining(&self) -> Duration {
        self.deadline
            .map_or(Duration::MAX, |d| d.saturating_duration_since(Instant::now()))
    }

    /// Err once the task is cancelled or past its deadline
    pub fn checkpoint(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            return Err(TaskError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(TaskError::TimedOut(self.timeout));
        }
        Ok(())
    }

    /// Sleep for `duration`, waking early on cancellation or the deadline
    pub fn sleep(&self, duration: Duration) -> Result<(), TaskError> {
        let until = Instant::now().checked_add(duration);
        loop {
            self.checkpoint()?;
            let left = until.map_or(Duration::MAX, |u| u.saturating_duration_since(Instant::now()));
            if left.is_zero() {
                return Ok(());
            }
            thread::sleep(left.min(self.remaining()).min(TASK_POLL_INTERVAL));
        }
    }

    /// Wait for a readiness event, bounded by cancellation and the deadline
    pub fn wait_ready<T: Clone>(&self, ready: &Readiness<T>) -> Result<T, TaskError> {
        loop {
            self.checkpoint()?;
            let slice = self.remaining().min(TASK_POLL_INTERVAL);
            if let Some(value) = ready.wait_timeout(slice) {
                return Ok(value);
            }
        }
    }
}

// =============================================================================
// TASK HANDLE
// =============================================================================

/// Supervisor side of a running task
pub struct TaskHandle {
    name: String,
    cancel: Arc<AtomicBool>,
    outcome: Arc<Readiness<TaskOutcome>>,
    thread: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the task to stop at its next checkpoint
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_set()
    }

    /// Outcome, if the task already finished
    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.outcome.get()
    }

    /// Wait up to `timeout` for the task to finish
    pub fn wait_timeout(&self, timeout: Duration) -> Option<TaskOutcome> {
        self.outcome.wait_timeout(timeout)
    }

    /// Cancel and wait up to `timeout` for the thread to exit
    pub fn shutdown(mut self, timeout: Duration) -> Option<TaskOutcome> {
        self.cancel();
        let outcome = self.wait_timeout(timeout);
        if outcome.is_some() {
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
        } else {
            warn!(task = %self.name, "[TASK] Did not stop in time, detaching");
        }
        outcome
    }
}

// =============================================================================
// SPAWN
// =============================================================================

/// Run `body` on a named thread under a deadline.
///
/// Failures, timeouts and panics are logged and reported once through
/// `messages`. Cancellation is only logged.
pub fn spawn_supervised<F>(
    name: &str,
    timeout: Duration,
    messages: MessageSender,
    body: F,
) -> TaskHandle
where
    F: FnOnce(&TaskContext) -> Result<(), TaskError> + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let outcome = Arc::new(Readiness::new());
    let ctx = TaskContext {
        name: name.to_string(),
        cancel: Arc::clone(&cancel),
        timeout,
        deadline: Instant::now().checked_add(timeout),
    };

    info!(task = %name, timeout_ms = timeout.as_millis() as u64, "[TASK] Started");
    let thread_outcome = Arc::clone(&outcome);
    let thread_messages = messages.clone();
    let spawned = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| body(&ctx)));
            let result = match result {
                Ok(result) => result,
                Err(payload) => Err(TaskError::Failed(panic_message(payload.as_ref()))),
            };
            report(&ctx.name, &result, &thread_messages);
            thread_outcome.set(result);
        });

    let thread = match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            let result = Err(TaskError::Failed(format!("could not spawn thread: {e}")));
            report(name, &result, &messages);
            outcome.set(result);
            None
        }
    };

    TaskHandle {
        name: name.to_string(),
        cancel,
        outcome,
        thread,
    }
}

fn report(name: &str, result: &TaskOutcome, messages: &MessageSender) {
    match result {
        Ok(()) => debug!(task = %name, "[TASK] Finished"),
        Err(TaskError::Cancelled) => debug!(task = %name, "[TASK] Cancelled"),
        Err(e) => {
            error!(task = %name, error = %e, "[TASK] Failed");
            messages.error(TASK_FAILURE_MESSAGE);
        }
    }
}

/// Human-readable payload of a caught panic
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
