use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;
use super::api::SentimentSummary;

// Task status as reported by the research backend.
// Unrecognized strings are kept verbatim and treated as non-terminal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Running,
    Processing,
    Completed,
    Failed,
    Unknown(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Unknown(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => TaskStatus::Pending,
            "running" => TaskStatus::Running,
            "processing" => TaskStatus::Processing,
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Unknown(raw),
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(raw: &str) -> Self {
        TaskStatus::from(raw.to_string())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// The research job currently tracked by the client
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub location: String,
    pub status: TaskStatus,
    pub submitted_at: DateTime<Utc>,  // local clock, never sent to the server
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub result: Option<TaskResult>,
}

impl Task {
    pub fn new(id: String, location: String, status: TaskStatus, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            location,
            status,
            submitted_at,
            finished_at: None,
            error: None,
            result: None,
        }
    }
}

// Payload carried by a completed task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub report_length: u64,
    pub document_path: Option<String>,
    pub sentiment: Option<SentimentSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_statuses_parse() {
        assert_eq!(TaskStatus::from("pending"), TaskStatus::Pending);
        assert_eq!(TaskStatus::from("running"), TaskStatus::Running);
        assert_eq!(TaskStatus::from("processing"), TaskStatus::Processing);
        assert_eq!(TaskStatus::from("completed"), TaskStatus::Completed);
        assert_eq!(TaskStatus::from("failed"), TaskStatus::Failed);
    }

    #[test]
    fn test_unknown_status_kept_verbatim_and_non_terminal() {
        let status: TaskStatus = serde_json::from_str("\"Queued-For-Review\"").unwrap();
        assert_eq!(status, TaskStatus::Unknown("Queued-For-Review".to_string()));
        assert_eq!(status.as_str(), "Queued-For-Review");
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }

    #[test]
    fn test_status_serializes_as_plain_string() {
        let json = serde_json::to_string(&TaskStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }
}
