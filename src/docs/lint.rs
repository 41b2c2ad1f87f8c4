//! Anchor consistency checks for API reference Markdown

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::Result;

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r##"<a href="#([^"]+)">"##).expect("pattern is valid"))
}

fn anchor_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"<h([23]) id="([^"]+)">"#).expect("pattern is valid"))
}

/// What is wrong with an anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "anchor", rename_all = "camelCase")]
pub enum LintIssue {
    /// A link points to an anchor that is not defined
    BrokenLink(String),
    /// An anchor is defined more than once
    DuplicateAnchor(String),
    /// A type section that no link points to
    UnreferencedType(String),
}

/// A single lint problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFinding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// 1-based line of the offending link or anchor
    pub line: usize,
    pub issue: LintIssue,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file.display())?;
        }
        match &self.issue {
            LintIssue::BrokenLink(a) => write!(f, "{}: link to undefined anchor #{}", self.line, a),
            LintIssue::DuplicateAnchor(a) => write!(f, "{}: duplicate anchor {}", self.line, a),
            LintIssue::UnreferencedType(a) => write!(f, "{}: type {} is never referenced", self.line, a),
        }
    }
}

/// Check that every link resolves to exactly one section and that every type
/// section is linked from somewhere
pub fn lint_reference(markdown: &str) -> Vec<LintFinding> {
    // anchor -> (line, heading level)
    let mut anchors: IndexMap<&str, (usize, &str)> = IndexMap::new();
    let mut links: Vec<(usize, &str)> = Vec::new();
    let mut findings = Vec::new();

    for (i, line) in markdown.lines().enumerate() {
        let line_no = i + 1;
        for capture in anchor_pattern().captures_iter(line) {
            let (Some(level), Some(anchor)) = (capture.get(1), capture.get(2)) else {
                continue;
            };
            if anchors.contains_key(anchor.as_str()) {
                findings.push(LintFinding {
                    file: None,
                    line: line_no,
                    issue: LintIssue::DuplicateAnchor(anchor.as_str().to_string()),
                });
            } else {
                anchors.insert(anchor.as_str(), (line_no, level.as_str()));
            }
        }
        for capture in link_pattern().captures_iter(line) {
            if let Some(target) = capture.get(1) {
                links.push((line_no, target.as_str()));
            }
        }
    }

    for (line, target) in &links {
        if !anchors.contains_key(target) {
            findings.push(LintFinding {
                file: None,
                line: *line,
                issue: LintIssue::BrokenLink(target.to_string()),
            });
        }
    }

    // Package headings are roots, only type sections must be referenced
    for (anchor, (line, level)) in &anchors {
        if *level == "3" && !links.iter().any(|(_, target)| target == anchor) {
            findings.push(LintFinding {
                file: None,
                line: *line,
                issue: LintIssue::UnreferencedType(anchor.to_string()),
            });
        }
    }

    findings.sort_by_key(|f| f.line);
    findings
}

/// Lint one Markdown file
pub fn lint_file(path: &Path) -> Result<Vec<LintFinding>> {
    let markdown = std::fs::read_to_string(path)?;
    let mut findings = lint_reference(&markdown);
    for finding in &mut findings {
        finding.file = Some(path.to_path_buf());
    }
    debug!(path = %path.display(), findings = findings.len(), "Linted reference file");
    Ok(findings)
}

/// Lint every file matching a glob pattern, e.g. `docs/api-reference/*.md`
pub fn lint_files(pattern: &str) -> Result<Vec<LintFinding>> {
    let mut findings = Vec::new();
    let mut files = 0usize;
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => {
                files += 1;
                findings.extend(lint_file(&path)?);
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Skipping unreadable path"),
        }
    }
    debug!(pattern, files, findings = findings.len(), "Linted reference files");
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const REFERENCE: &str = r##"<h2 id="core.gardener.cloud/v1beta1">core.gardener.cloud/v1beta1</h2>
<a href="#core.gardener.cloud/v1beta1.Shoot">Shoot</a>
<h3 id="core.gardener.cloud/v1beta1.Shoot">Shoot</h3>
<a href="#core.gardener.cloud/v1beta1.ShootSpec">ShootSpec</a>
<h3 id="core.gardener.cloud/v1beta1.ShootSpec">ShootSpec</h3>
"##;

    #[test]
    fn test_consistent_reference() {
        assert!(lint_reference(REFERENCE).is_empty());
    }

    #[test]
    fn test_broken_duplicate_and_unreferenced() {
        let markdown = format!(
            "{}{}{}{}",
            REFERENCE,
            "<a href=\"#core.gardener.cloud/v1beta1.Worker\">Worker</a>\n",
            "<h3 id=\"core.gardener.cloud/v1beta1.ShootSpec\">ShootSpec</h3>\n",
            "<h3 id=\"core.gardener.cloud/v1beta1.Orphan\">Orphan</h3>\n",
        );
        let findings = lint_reference(&markdown);
        assert_eq!(findings.len(), 3);
        assert_matches!(&findings[0].issue, LintIssue::BrokenLink(a) if a.ends_with("Worker"));
        assert_eq!(findings[0].line, 6);
        assert_matches!(&findings[1].issue, LintIssue::DuplicateAnchor(a) if a.ends_with("ShootSpec"));
        assert_matches!(&findings[2].issue, LintIssue::UnreferencedType(a) if a.ends_with("Orphan"));
    }

    #[test]
    fn test_lint_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("core.md"), REFERENCE).unwrap();
        std::fs::write(dir.path().join("broken.md"), "<a href=\"#missing\">x</a>\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "<a href=\"#ignored\">x</a>\n").unwrap();

        let pattern = format!("{}/*.md", dir.path().display());
        let findings = lint_files(&pattern).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file.as_deref(), Some(dir.path().join("broken.md").as_path()));
        assert!(findings[0].to_string().ends_with("1: link to undefined anchor #missing"));
    }
}
