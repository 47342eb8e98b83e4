//! Retry-with-timeout loop over a task status source.

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::status::TaskStatus;
use crate::PollError;

const DEFAULT_MAX_ATTEMPTS: u32 = 20;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Anything that can report the current status of a task by id.
pub trait TaskSource {
    type Error: std::error::Error + 'static;

    /// Fetch the current status of `task_id`.
    fn task_status(&self, task_id: &str) -> Result<TaskStatus, Self::Error>;
}

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Total number of status requests before giving up.
    pub max_attempts: u32,
    /// Fixed delay between two consecutive requests.
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INTERVAL)
    }
}

/// Poll `task_id` until it completes.
///
/// Returns the status payload of the response that reported completion.
/// A failure state ends polling at once with [`PollError::Failed`]; running
/// out of attempts gives [`PollError::Timeout`]. Errors from the source are
/// not retried.
pub fn wait_for_task<S>(
    source: &S,
    task_id: &str,
    policy: &PollPolicy,
) -> Result<TaskStatus, PollError<S::Error>>
where
    S: TaskSource + ?Sized,
{
    for attempt in 1..=policy.max_attempts {
        let status = source
            .task_status(task_id)
            .map_err(|err| PollError::Source {
                task_id: task_id.to_string(),
                source: err,
            })?;

        if let Some(state) = status.task_state().filter(|state| state.is_terminal()) {
            if state.is_success() {
                debug!("Task {} completed after {} attempt(s)", task_id, attempt);
                return Ok(status);
            }
            warn!(
                "Task {} ended in state {}: {}",
                task_id,
                state.as_ref(),
                status.error_message().unwrap_or("no error reported")
            );
            return Err(PollError::Failed {
                task_id: task_id.to_string(),
                status: Box::new(status),
            });
        }

        info!("Task state: {}, waiting...", status.state_label());

        if attempt < policy.max_attempts {
            thread::sleep(policy.interval);
        }
    }

    Err(PollError::Timeout {
        task_id: task_id.to_string(),
        attempts: policy.max_attempts,
    })
}
