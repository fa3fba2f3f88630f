use crate::types::{Finding, FindingCategory, Severity};
use serde::Deserialize;
use tracing::{debug, warn};

const LOG_SAMPLE_CHARS: usize = 200;

/// Parse free-form model output into findings. Never fails: anything that is
/// not a JSON array of complete finding objects degrades to an empty list,
/// with the offending text sampled into the log.
pub fn parse_findings(raw: &str) -> Vec<Finding> {
    let payload = extract_json_payload(raw);

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                "failed to parse model response as JSON: {} - response was: {}",
                e,
                sample(payload)
            );
            return Vec::new();
        }
    };

    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => {
            warn!("model returned non-array JSON: {}", sample(payload));
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RawFinding>(item) {
            Ok(raw) => Some(raw.into_finding()),
            Err(e) => {
                debug!("dropping malformed finding: {}", e);
                None
            }
        })
        .collect()
}

/// Locate the JSON payload in possibly-fenced model output: the first
/// ```json fence pair wins, then the first generic fence pair, then the raw
/// text as-is. An unterminated fence extends to the end of the text.
pub fn extract_json_payload(raw: &str) -> &str {
    if let Some(start) = raw.find("```json") {
        let rest = &raw[start + "```json".len()..];
        let end = rest.find("```").unwrap_or(rest.len());
        return rest[..end].trim();
    }
    if let Some(start) = raw.find("```") {
        let rest = &raw[start + "```".len()..];
        let end = rest.find("```").unwrap_or(rest.len());
        return rest[..end].trim();
    }
    raw.trim()
}

/// Finding as the model emits it: all five keys required, enum-ish fields
/// still free text.
#[derive(Debug, Deserialize)]
struct RawFinding {
    file: String,
    line: u32,
    severity: String,
    category: String,
    message: String,
}

impl RawFinding {
    fn into_finding(self) -> Finding {
        Finding {
            file: self.file,
            line: self.line,
            severity: parse_severity(&self.severity),
            category: parse_category(&self.category),
            message: self.message,
        }
    }
}

fn parse_severity(s: &str) -> Severity {
    match s.to_lowercase().as_str() {
        "high" => Severity::High,
        "medium" => Severity::Medium,
        "low" => Severity::Low,
        _ => Severity::Medium,
    }
}

fn parse_category(s: &str) -> FindingCategory {
    match s.to_lowercase().as_str() {
        "bug" => FindingCategory::Bug,
        "security" => FindingCategory::Security,
        "performance" => FindingCategory::Performance,
        "style" => FindingCategory::Style,
        "maintainability" => FindingCategory::Maintainability,
        _ => FindingCategory::Other,
    }
}

fn sample(text: &str) -> String {
    text.chars().take(LOG_SAMPLE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_FINDING: &str =
        r#"[{"file":"a","line":1,"severity":"low","category":"style","message":"m"}]"#;

    #[test]
    fn test_extract_json_fence() {
        let raw = format!("prefix ```json {} ``` suffix", ONE_FINDING);
        assert_eq!(extract_json_payload(&raw), ONE_FINDING);
    }

    #[test]
    fn test_extract_generic_fence() {
        let raw = format!("some text\n```\n{}\n```\nmore text", ONE_FINDING);
        assert_eq!(extract_json_payload(&raw), ONE_FINDING);
    }

    #[test]
    fn test_extract_no_fence() {
        assert_eq!(extract_json_payload(ONE_FINDING), ONE_FINDING);
        assert_eq!(extract_json_payload("  [1, 2]  "), "[1, 2]");
    }

    #[test]
    fn test_extract_unterminated_fence() {
        let raw = format!("```json\n{}", ONE_FINDING);
        assert_eq!(extract_json_payload(&raw), ONE_FINDING);
    }

    #[test]
    fn test_parse_findings_through_fence() {
        let raw = format!("prefix ```json {} ``` suffix", ONE_FINDING);
        let findings = parse_findings(&raw);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file, "a");
        assert_eq!(findings[0].line, 1);
        assert_eq!(findings[0].severity, Severity::Low);
        assert_eq!(findings[0].category, FindingCategory::Style);
        assert_eq!(findings[0].message, "m");
    }

    #[test]
    fn test_malformed_items_are_dropped() {
        let raw = r#"[
            {"file":"a.rs","line":3,"severity":"high","category":"bug","message":"overflow"},
            {"file":"b.rs","line":9,"severity":"low","category":"style"}
        ]"#;
        let findings = parse_findings(raw);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file, "a.rs");
    }

    #[test]
    fn test_non_array_json_yields_empty() {
        assert!(parse_findings(r#"{"file":"a"}"#).is_empty());
        assert!(parse_findings("42").is_empty());
    }

    #[test]
    fn test_non_json_yields_empty() {
        assert!(parse_findings("I found no issues, great work!").is_empty());
        assert!(parse_findings("").is_empty());
    }

    #[test]
    fn test_unrecognized_enum_values() {
        let raw = r#"[{"file":"a","line":1,"severity":"critical","category":"typo","message":"m"}]"#;
        let findings = parse_findings(raw);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].category, FindingCategory::Other);
    }

    #[test]
    fn test_order_preserved() {
        let raw = r#"[
            {"file":"z","line":1,"severity":"low","category":"style","message":"first"},
            {"file":"a","line":2,"severity":"high","category":"bug","message":"second"}
        ]"#;
        let findings = parse_findings(raw);
        assert_eq!(findings[0].message, "first");
        assert_eq!(findings[1].message, "second");
    }
}
