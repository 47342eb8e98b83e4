//! Polling of asynchronous cluster tasks.
//!
//! The ML plugin answers long-running requests (model registration,
//! deployment) with a task id. This crate repeatedly asks a [`TaskSource`]
//! for that task's status until it completes, fails, or the retry budget in
//! [`PollPolicy`] runs out.
//!
//! # Example
//!
//! ```no_run
//! use qa_task_poller::{wait_for_task, PollPolicy, TaskSource, TaskStatus};
//!
//! fn wait<S: TaskSource>(source: &S) -> Result<TaskStatus, qa_task_poller::PollError<S::Error>> {
//!     wait_for_task(source, "Ps1f0ZMBJvC7vZsNtGQ3", &PollPolicy::default())
//! }
//! ```

mod poller;
mod status;

pub use poller::{wait_for_task, PollPolicy, TaskSource};
pub use status::{TaskState, TaskStatus};

use thiserror::Error;

/// Errors that end polling.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PollError<E> {
    /// The task reached a failure state. Carries the payload that reported it.
    #[error("Task failed: {status}")]
    Failed {
        task_id: String,
        status: Box<TaskStatus>,
    },

    /// Every attempt saw a non-terminal state.
    #[error("Timeout waiting for task {task_id} to complete after {attempts} attempts")]
    Timeout { task_id: String, attempts: u32 },

    /// The status request itself failed.
    #[error("Failed to fetch status of task {task_id}: {source}")]
    Source {
        task_id: String,
        #[source]
        source: E,
    },
}

impl<E> PollError<E> {
    /// Id of the task that was being polled.
    pub fn task_id(&self) -> &str {
        match self {
            PollError::Failed { task_id, .. }
            | PollError::Timeout { task_id, .. }
            | PollError::Source { task_id, .. } => task_id,
        }
    }
}
