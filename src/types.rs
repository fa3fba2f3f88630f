use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One reviewable unit produced by the diff partitioner: a single file's
/// hunks plus the set of new-file line numbers its additions introduced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub diff_text: String,
    pub added_lines: HashSet<u32>,
}

/// A single structured review observation about a file and line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub file: String,
    pub line: u32,
    pub severity: Severity,
    pub category: FindingCategory,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Bug,
    Security,
    Performance,
    Style,
    Maintainability,
    #[serde(other)]
    Other,
}

impl FindingCategory {
    pub fn label(&self) -> &'static str {
        match self {
            FindingCategory::Bug => "bug",
            FindingCategory::Security => "security",
            FindingCategory::Performance => "performance",
            FindingCategory::Style => "style",
            FindingCategory::Maintainability => "maintainability",
            FindingCategory::Other => "other",
        }
    }
}

// ----------------------------------------------------------------------------
// Webhook payloads
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub action: String,
    pub repository: Repository,
    pub pull_request: PullRequestRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_serialization() {
        let finding = Finding {
            file: "src/main.rs".to_string(),
            line: 10,
            severity: Severity::High,
            category: FindingCategory::Security,
            message: "SQL built from user input".to_string(),
        };
        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains("\"high\""));
        assert!(json.contains("\"security\""));
        assert!(json.contains("src/main.rs"));
    }

    #[test]
    fn test_category_unknown_maps_to_other() {
        let category: FindingCategory = serde_json::from_str("\"speling\"").unwrap();
        assert_eq!(category, FindingCategory::Other);
    }

    #[test]
    fn test_webhook_payload_deserialization() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{
                "action": "opened",
                "repository": {"full_name": "org/repo"},
                "pull_request": {"number": 7}
            }"#,
        )
        .unwrap();
        assert_eq!(payload.action, "opened");
        assert_eq!(payload.repository.full_name, "org/repo");
        assert_eq!(payload.pull_request.number, 7);
    }
}
