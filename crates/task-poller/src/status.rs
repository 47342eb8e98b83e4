//! Task status payloads as reported by the ML task endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, EnumString};

/// Lifecycle state of a remote task.
///
/// Labels are matched case-insensitively (`"RUNNING"`, `"running"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum TaskState {
    Created,
    Running,
    Completed,
    CompletedWithError,
    Failed,
    Error,
    Cancelled,
}

impl TaskState {
    /// Parse a state label. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        label.trim().parse().ok()
    }

    pub fn is_success(self) -> bool {
        self == TaskState::Completed
    }

    /// States that end the task without a usable result.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            TaskState::Failed
                | TaskState::Error
                | TaskState::Cancelled
                | TaskState::CompletedWithError
        )
    }

    pub fn is_terminal(self) -> bool {
        self.is_success() || self.is_failure()
    }
}

/// One task status response.
///
/// Only the fields the setup flow reads are typed; everything else the
/// cluster sends is kept in `extra` so the payload survives unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskStatus {
    /// Parsed state, `None` when the label is missing or unknown.
    pub fn task_state(&self) -> Option<TaskState> {
        self.state.as_deref().and_then(TaskState::from_label)
    }

    /// Label for log lines.
    pub fn state_label(&self) -> &str {
        self.state.as_deref().unwrap_or("<none>")
    }

    /// Error text reported by the cluster, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.extra.get("error").and_then(Value::as_str)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
