use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome recorded for an agent action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Attempted,
    Success,
    Failure,
    Cancelled,
    #[serde(rename = "Success (No Results)")]
    SuccessNoResults,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Attempted => "Attempted",
            ActionStatus::Success => "Success",
            ActionStatus::Failure => "Failure",
            ActionStatus::Cancelled => "Cancelled",
            ActionStatus::SuccessNoResults => "Success (No Results)",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionStatus::Success | ActionStatus::SuccessNoResults)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of `logs.actions`. Entries are never edited once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action_type: String,
    pub target: String,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl ActionLogEntry {
    pub fn new(
        action_type: impl Into<String>,
        target: impl Into<String>,
        status: ActionStatus,
        error_msg: Option<&str>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            action_type: action_type.into(),
            target: target.into(),
            status,
            error_msg: error_msg
                .map(str::trim)
                .filter(|msg| !msg.is_empty())
                .map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_camel_case_with_status_labels() {
        let entry = ActionLogEntry::new("Web Search", "rust", ActionStatus::SuccessNoResults, None);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["actionType"], "Web Search");
        assert_eq!(value["status"], "Success (No Results)");
        assert!(value.get("errorMsg").is_none());
    }

    #[test]
    fn blank_error_messages_are_dropped() {
        let entry = ActionLogEntry::new("Command", "ls", ActionStatus::Success, Some("  \n"));
        assert_eq!(entry.error_msg, None);
    }

    #[test]
    fn reads_entries_written_by_older_versions() {
        let entry: ActionLogEntry = serde_json::from_value(json!({
            "timestamp": "2024-05-01T10:20:30.123Z",
            "actionType": "Command",
            "target": "uptime",
            "status": "Failure",
            "errorMsg": null
        }))
        .unwrap();
        assert_eq!(entry.status, ActionStatus::Failure);
        assert_eq!(entry.error_msg, None);
    }
}
