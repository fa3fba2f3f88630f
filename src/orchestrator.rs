use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ReviewConfig;
use crate::diff;
use crate::llm::ModelClient;
use crate::prompts::render_review_prompt;
use crate::response::parse_findings;
use crate::types::Finding;

/// Drives diff review against a primary provider with a single fallback
/// tier. Every failure mode degrades to fewer findings; nothing here returns
/// an error to the caller.
pub struct ReviewEngine {
    primary: Box<dyn ModelClient>,
    fallback: Box<dyn ModelClient>,
    config: ReviewConfig,
}

impl ReviewEngine {
    pub fn new(
        primary: Box<dyn ModelClient>,
        fallback: Box<dyn ModelClient>,
        config: ReviewConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            config,
        }
    }

    /// Run the full pipeline over a raw unified diff: partition into
    /// per-file units, review each in order, and stamp every finding with
    /// the unit's path. The model's own `file` value is never trusted.
    pub async fn run(&self, raw_diff: &str) -> Vec<Finding> {
        let units = diff::partition(
            raw_diff,
            &self.config.skip_filenames,
            &self.config.skip_extensions,
        );
        if units.is_empty() {
            info!("no reviewable files found in diff");
            return Vec::new();
        }
        info!("found {} files to review", units.len());

        let mut all_findings = Vec::new();
        for unit in &units {
            info!("reviewing {}", unit.path);
            let mut findings = self.review_diff(&unit.diff_text).await;
            for finding in &mut findings {
                if !unit.added_lines.contains(&finding.line) {
                    debug!(
                        "finding for {} targets line {} outside the added lines",
                        unit.path, finding.line
                    );
                }
                finding.file = unit.path.clone();
            }
            all_findings.extend(findings);
        }
        all_findings
    }

    /// Review one file's diff text. Oversized diffs are split into
    /// fixed-size character windows reviewed sequentially, with a pause
    /// between windows for provider rate limits. Windows are not aligned to
    /// hunk boundaries, so the model may lose context at window edges.
    pub async fn review_diff(&self, diff_text: &str) -> Vec<Finding> {
        let char_count = diff_text.chars().count();
        if char_count <= self.config.max_diff_chars {
            return self.review_single(diff_text).await;
        }

        info!("large diff ({} chars), splitting into windows", char_count);
        let windows = split_windows(diff_text, self.config.max_diff_chars);
        let total = windows.len();

        let mut all_findings = Vec::new();
        for (i, window) in windows.into_iter().enumerate() {
            info!("reviewing window {}/{}", i + 1, total);
            all_findings.extend(self.review_single(window).await);
            sleep(Duration::from_millis(self.config.chunk_delay_ms)).await;
        }
        all_findings
    }

    /// Primary/fallback protocol for a single unit. A provider succeeds if
    /// it returns response text; what the validator makes of that text does
    /// not count against the provider.
    async fn review_single(&self, diff_text: &str) -> Vec<Finding> {
        let prompt = render_review_prompt(diff_text);

        match self.primary.generate(&prompt).await {
            Ok(text) => return parse_findings(&text),
            Err(e) => warn!(
                "{} failed, trying {}: {}",
                self.primary.name(),
                self.fallback.name(),
                e
            ),
        }

        sleep(Duration::from_millis(self.config.fallback_delay_ms)).await;

        match self.fallback.generate(&prompt).await {
            Ok(text) => parse_findings(&text),
            Err(e) => {
                warn!(
                    "both providers failed, skipping unit: {} error: {}",
                    self.fallback.name(),
                    e
                );
                Vec::new()
            }
        }
    }
}

/// Cut `text` into contiguous windows of `max_chars` characters (the last
/// may be shorter). Boundaries are char boundaries, so concatenating the
/// windows reproduces the input exactly.
pub fn split_windows(text: &str, max_chars: usize) -> Vec<&str> {
    if max_chars == 0 {
        return vec![text];
    }

    let mut windows = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_chars {
            windows.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        windows.push(&text[start..]);
    }
    windows
}
