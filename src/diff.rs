use crate::types::FileDiff;
use std::collections::HashSet;
use tracing::warn;

/// Split a raw unified diff into per-file review units, dropping files the
/// skip policy excludes. Input that is not recognizable as a unified diff
/// yields an empty list, never an error.
pub fn partition(raw: &str, skip_filenames: &[String], skip_extensions: &[String]) -> Vec<FileDiff> {
    let mut files = Vec::new();
    let mut sections_seen = 0usize;
    let mut current: Option<SectionBuilder> = None;

    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            sections_seen += finish_section(&mut files, current.take(), skip_filenames, skip_extensions);
            let mut section = SectionBuilder::new();
            section.path = path_from_git_header(rest);
            section.push_line(line);
            current = Some(section);
            continue;
        }

        if line.starts_with("--- ") {
            // In header-only diffs (no `diff --git` line) a `--- ` header
            // after a hunk starts the next file section.
            let needs_new = current
                .as_ref()
                .map(|s| s.seen_hunk || s.seen_new_header)
                .unwrap_or(true);
            if needs_new {
                sections_seen +=
                    finish_section(&mut files, current.take(), skip_filenames, skip_extensions);
            }
            let section = current.get_or_insert_with(SectionBuilder::new);
            let path = line[4..].trim();
            if section.path.is_empty() && path != "/dev/null" {
                section.path = strip_side_prefix(path, "a/");
            }
            section.push_line(line);
            continue;
        }

        if line.starts_with("+++ ") {
            if let Some(section) = current.as_mut() {
                let path = line[4..].trim();
                if path != "/dev/null" {
                    section.path = strip_side_prefix(path, "b/");
                }
                section.seen_new_header = true;
                section.push_line(line);
            }
            continue;
        }

        if line.starts_with("@@") {
            if let Some(section) = current.as_mut() {
                section.seen_hunk = true;
                section.new_line = parse_hunk_header(line);
                section.push_line(line);
            }
            continue;
        }

        if let Some(section) = current.as_mut() {
            section.push_line(line);
            if !section.seen_hunk {
                continue;
            }
            if line.starts_with('+') {
                if let Some(n) = section.new_line.as_mut() {
                    section.added_lines.insert(*n);
                    *n += 1;
                }
            } else if line.starts_with(' ') || line.is_empty() {
                if let Some(n) = section.new_line.as_mut() {
                    *n += 1;
                }
            }
            // deletions and "\ No newline" markers do not advance the
            // new-file line counter
        }
    }

    sections_seen += finish_section(&mut files, current.take(), skip_filenames, skip_extensions);

    // skip-policy exclusions are expected and stay silent; only input that
    // parsed as no diff sections at all gets flagged
    if sections_seen == 0 && !raw.trim().is_empty() {
        warn!("no file sections recognized in diff input");
    }

    files
}

struct SectionBuilder {
    path: String,
    lines: Vec<String>,
    added_lines: HashSet<u32>,
    new_line: Option<u32>,
    seen_hunk: bool,
    seen_new_header: bool,
}

impl SectionBuilder {
    fn new() -> Self {
        Self {
            path: String::new(),
            lines: Vec::new(),
            added_lines: HashSet::new(),
            new_line: None,
            seen_hunk: false,
            seen_new_header: false,
        }
    }

    fn push_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

/// Returns 1 when a complete file section (path + hunk) was recognized,
/// whether or not the skip policy let it through.
fn finish_section(
    files: &mut Vec<FileDiff>,
    section: Option<SectionBuilder>,
    skip_filenames: &[String],
    skip_extensions: &[String],
) -> usize {
    let Some(section) = section else {
        return 0;
    };
    if section.path.is_empty() || !section.seen_hunk {
        return 0;
    }
    if should_skip_file(&section.path, skip_filenames, skip_extensions) {
        return 1;
    }
    let mut diff_text = section.lines.join("\n");
    diff_text.push('\n');
    files.push(FileDiff {
        path: section.path,
        diff_text,
        added_lines: section.added_lines,
    });
    1
}

/// Skip auto-generated or binary files. Matching is exact on the final path
/// component for filenames and exact-suffix for extensions.
pub fn should_skip_file(path: &str, skip_filenames: &[String], skip_extensions: &[String]) -> bool {
    let filename = path.rsplit('/').next().unwrap_or(path);

    if skip_filenames.iter().any(|f| f == filename) {
        return true;
    }
    skip_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
}

fn path_from_git_header(rest: &str) -> String {
    let mut parts = rest.split_whitespace();
    let a_path = parts.next().unwrap_or("");
    let b_path = parts.next().unwrap_or(a_path);
    b_path
        .strip_prefix("b/")
        .or_else(|| a_path.strip_prefix("a/"))
        .unwrap_or(b_path)
        .to_string()
}

fn strip_side_prefix(path: &str, prefix: &str) -> String {
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

/// Extract the new-file start line from `@@ -l,s +l,s @@`. Returns None for
/// anything that does not parse; the section then contributes no added lines.
fn parse_hunk_header(line: &str) -> Option<u32> {
    let header = line.trim().strip_prefix("@@")?.trim();
    let header = header.split("@@").next()?.trim();
    let new_part = header.split_whitespace().find(|p| p.starts_with('+'))?;
    let range = new_part.strip_prefix('+')?;
    let start = match range.split_once(',') {
        Some((start, _)) => start,
        None => range,
    };
    start.parse::<u32>().ok()
}
