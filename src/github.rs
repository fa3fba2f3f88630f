use crate::error::GithubError;
use crate::types::{Finding, Severity};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "pr-review-server";
const FILES_PER_PAGE: usize = 100;

pub struct GithubClient {
    client: Client,
    token: SecretString,
    base_url: String,
}

#[derive(Deserialize)]
struct PrFile {
    filename: String,
    // binary files carry no patch
    patch: Option<String>,
}

#[derive(Deserialize)]
struct PrResponse {
    head: HeadRef,
}

#[derive(Deserialize)]
struct HeadRef {
    sha: String,
}

#[derive(Serialize)]
struct InlineComment<'a> {
    body: String,
    commit_id: &'a str,
    path: &'a str,
    line: u32,
    side: &'static str,
}

#[derive(Serialize)]
struct IssueComment {
    body: String,
}

impl GithubClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: SecretString::from(token.into()),
            base_url: GITHUB_API_BASE.to_string(),
        }
    }

    /// Fetch the PR's changed files and assemble one unified-diff blob from
    /// their patch fragments.
    pub async fn fetch_pr_diff(&self, repo: &str, pr_number: u64) -> Result<String, GithubError> {
        let url = format!(
            "{}/repos/{}/pulls/{}/files",
            self.base_url, repo, pr_number
        );

        let mut files: Vec<PrFile> = Vec::new();
        let mut page = 1u32;
        loop {
            let response = self
                .client
                .get(&url)
                .header("User-Agent", USER_AGENT)
                .bearer_auth(self.token.expose_secret())
                .query(&[
                    ("per_page", FILES_PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(GithubError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            let batch: Vec<PrFile> = response.json().await?;
            let batch_len = batch.len();
            files.extend(batch);
            if batch_len < FILES_PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!("fetched {} changed files for {}#{}", files.len(), repo, pr_number);
        Ok(assemble_unified_diff(&files))
    }

    /// Post one inline comment per high/medium finding plus a summary
    /// comment. Individual comment failures are logged and skipped; the
    /// review itself is already done at this point.
    pub async fn post_review_comments(
        &self,
        repo: &str,
        pr_number: u64,
        findings: &[Finding],
    ) -> Result<(), GithubError> {
        let head_sha = self.fetch_head_sha(repo, pr_number).await?;

        let mut posted = 0;
        let mut failed = 0;
        for finding in findings {
            // low severity stays in the summary only
            if finding.severity == Severity::Low {
                continue;
            }
            match self
                .post_inline_comment(repo, pr_number, &head_sha, finding)
                .await
            {
                Ok(()) => posted += 1,
                Err(e) => {
                    warn!(
                        "could not post inline comment on {} line {}: {}",
                        finding.file, finding.line, e
                    );
                    failed += 1;
                }
            }
        }
        info!("posted {} inline comments, {} failed", posted, failed);

        self.post_summary_comment(repo, pr_number, findings).await
    }

    async fn fetch_head_sha(&self, repo: &str, pr_number: u64) -> Result<String, GithubError> {
        let url = format!("{}/repos/{}/pulls/{}", self.base_url, repo, pr_number);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let pr: PrResponse = response.json().await?;
        Ok(pr.head.sha)
    }

    async fn post_inline_comment(
        &self,
        repo: &str,
        pr_number: u64,
        commit_id: &str,
        finding: &Finding,
    ) -> Result<(), GithubError> {
        let url = format!(
            "{}/repos/{}/pulls/{}/comments",
            self.base_url, repo, pr_number
        );
        let comment = InlineComment {
            body: format_comment(finding),
            commit_id,
            path: &finding.file,
            line: finding.line,
            side: "RIGHT",
        };

        let response = self
            .client
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .bearer_auth(self.token.expose_secret())
            .json(&comment)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn post_summary_comment(
        &self,
        repo: &str,
        pr_number: u64,
        findings: &[Finding],
    ) -> Result<(), GithubError> {
        let url = format!(
            "{}/repos/{}/issues/{}/comments",
            self.base_url, repo, pr_number
        );
        let comment = IssueComment {
            body: format_summary(findings),
        };

        let response = self
            .client
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .bearer_auth(self.token.expose_secret())
            .json(&comment)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Rebuild a single unified-diff blob from per-file patch fragments. GitHub
/// patches omit the file headers, so they are synthesized here.
fn assemble_unified_diff(files: &[PrFile]) -> String {
    let mut parts = Vec::new();
    for file in files {
        if let Some(patch) = &file.patch {
            parts.push(format!("--- a/{}", file.filename));
            parts.push(format!("+++ b/{}", file.filename));
            parts.push(patch.clone());
        }
    }
    parts.join("\n")
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "🔴",
        Severity::Medium => "🟡",
        Severity::Low => "🟢",
    }
}

fn category_icon(category: &str) -> &'static str {
    match category {
        "bug" => "🐛",
        "security" => "🔒",
        "performance" => "⚡",
        "style" => "🎨",
        "maintainability" => "🔧",
        _ => "📌",
    }
}

fn format_comment(finding: &Finding) -> String {
    format!(
        "{} **{}** ({})\n\n{}",
        severity_icon(finding.severity),
        match finding.severity {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        },
        finding.category.label(),
        finding.message
    )
}

fn format_summary(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "## 🤖 AI Code Review\n\n✅ **No issues found!** Looks good to me.".to_string();
    }

    let high = findings
        .iter()
        .filter(|f| f.severity == Severity::High)
        .count();
    let medium = findings
        .iter()
        .filter(|f| f.severity == Severity::Medium)
        .count();
    let low = findings
        .iter()
        .filter(|f| f.severity == Severity::Low)
        .count();

    let mut category_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for finding in findings {
        *category_counts.entry(finding.category.label()).or_insert(0) += 1;
    }

    let category_lines = category_counts
        .iter()
        .map(|(category, count)| {
            format!("| {} {} | {} |", category_icon(category), category, count)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "## 🤖 AI Code Review Summary\n\n\
         | Severity | Count |\n\
         |----------|-------|\n\
         | 🔴 High | {high} |\n\
         | 🟡 Medium | {medium} |\n\
         | 🟢 Low | {low} |\n\n\
         | Category | Count |\n\
         |----------|-------|\n\
         {category_lines}\n\n\
         > Inline comments posted for high and medium severity issues."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FindingCategory;

    fn finding(severity: Severity, category: FindingCategory, message: &str) -> Finding {
        Finding {
            file: "src/app.py".to_string(),
            line: 3,
            severity,
            category,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_assemble_unified_diff_skips_binary_files() {
        let files = vec![
            PrFile {
                filename: "src/app.py".to_string(),
                patch: Some("@@ -1,1 +1,2 @@\n kept\n+added".to_string()),
            },
            PrFile {
                filename: "logo.png".to_string(),
                patch: None,
            },
        ];
        let diff = assemble_unified_diff(&files);
        assert!(diff.starts_with("--- a/src/app.py\n+++ b/src/app.py\n@@"));
        assert!(!diff.contains("logo.png"));
    }

    #[test]
    fn test_assembled_diff_round_trips_through_partitioner() {
        let files = vec![PrFile {
            filename: "src/app.py".to_string(),
            patch: Some("@@ -1,1 +1,2 @@\n kept\n+added".to_string()),
        }];
        let diff = assemble_unified_diff(&files);
        let units = crate::diff::partition(&diff, &[], &[]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].path, "src/app.py");
        assert_eq!(units[0].added_lines, std::collections::HashSet::from([2]));
    }

    #[test]
    fn test_format_comment() {
        let comment = format_comment(&finding(
            Severity::High,
            FindingCategory::Security,
            "SQL injection risk",
        ));
        assert!(comment.contains("🔴"));
        assert!(comment.contains("security"));
        assert!(comment.contains("SQL injection risk"));
    }

    #[test]
    fn test_format_summary_counts() {
        let findings = vec![
            finding(Severity::High, FindingCategory::Bug, "a"),
            finding(Severity::High, FindingCategory::Security, "b"),
            finding(Severity::Low, FindingCategory::Style, "c"),
        ];
        let summary = format_summary(&findings);
        assert!(summary.contains("| 🔴 High | 2 |"));
        assert!(summary.contains("| 🟡 Medium | 0 |"));
        assert!(summary.contains("| 🟢 Low | 1 |"));
        assert!(summary.contains("| 🐛 bug | 1 |"));
        assert!(summary.contains("| 🔒 security | 1 |"));
    }

    #[test]
    fn test_format_summary_empty() {
        let summary = format_summary(&[]);
        assert!(summary.contains("No issues found"));
    }
}
