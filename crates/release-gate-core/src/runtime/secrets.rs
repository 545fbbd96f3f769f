// release-gate-core/src/runtime/secrets.rs
// ============================================================================
// Module: Release Gate Secrets Hygiene
// Description: High-confidence secret scan over the tracked file set.
// Purpose: Fail G0 before credentials can reach a release artifact.
// Dependencies: regex, serde
// ============================================================================

//! ## Overview
//! The scan enumerates tracked files through `git ls-files` and matches only
//! high-confidence patterns: `sk-` style API key assignments and long-form
//! AWS secret values. Unreadable files are skipped; the scan is advisory
//! about *where*, strict about *whether*.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// One compiled high-confidence pattern with its finding kind.
struct SecretPattern {
    /// Compiled matcher.
    regex: Regex,
    /// Stable finding kind label.
    kind: &'static str,
}

/// Returns the compiled high-confidence pattern set.
fn patterns() -> &'static [SecretPattern] {
    static PATTERNS: OnceLock<Vec<SecretPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        #[allow(clippy::unwrap_used, reason = "patterns are compile-time constants")]
        let compiled = vec![
            SecretPattern {
                regex: Regex::new(
                    r#"(?i)\b(openai|anthropic|api|secret|token|key)\b[^\n]{0,40}[:=]\s*['"]?sk-[a-zA-Z0-9]{20,}"#,
                )
                .unwrap(),
                kind: "openai_like_secret",
            },
            SecretPattern {
                regex: Regex::new(r#"(?i)\baws_secret_access_key\b\s*[:=]\s*['"]?[A-Za-z0-9/+=]{30,}"#)
                    .unwrap(),
                kind: "aws_secret_access_key",
            },
        ];
        compiled
    })
}

// ============================================================================
// SECTION: Findings
// ============================================================================

/// One high-confidence secret finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretFinding {
    /// File the match occurred in.
    pub path: String,
    /// Finding kind label.
    pub kind: String,
    /// Truncated matched text.
    pub snippet: String,
}

// ============================================================================
// SECTION: File Enumeration
// ============================================================================

/// Path prefixes excluded from the scan.
const EXCLUDED_PREFIXES: [&str; 3] = ["node_modules/", "logs/", "data/training-data/"];
/// File suffixes excluded from the scan.
const EXCLUDED_SUFFIXES: [&str; 3] = [".png", ".jpg", ".pdf"];

/// Lists tracked files via `git ls-files`, applying the scan exclusions.
fn candidate_files(repo_root: &Path) -> Vec<PathBuf> {
    let Ok(output) = Command::new("git").arg("ls-files").current_dir(repo_root).output() else {
        return Vec::new();
    };
    if !output.status.success() {
        return Vec::new();
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| {
            let rel = line.trim();
            if rel.is_empty() || rel == ".env" {
                return None;
            }
            if EXCLUDED_PREFIXES.iter().any(|prefix| rel.starts_with(prefix)) {
                return None;
            }
            if EXCLUDED_SUFFIXES.iter().any(|suffix| rel.ends_with(suffix)) {
                return None;
            }
            Some(repo_root.join(rel))
        })
        .collect()
}

// ============================================================================
// SECTION: Scan
// ============================================================================

/// Scans the tracked file set for high-confidence secrets.
#[must_use]
pub fn scan_repo(repo_root: &Path) -> Vec<SecretFinding> {
    let mut findings: Vec<SecretFinding> = Vec::new();
    for path in candidate_files(repo_root) {
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        for pattern in patterns() {
            for matched in pattern.regex.find_iter(&text) {
                let snippet: String = matched.as_str().chars().take(120).collect();
                findings.push(SecretFinding {
                    path: path.display().to_string(),
                    kind: pattern.kind.to_string(),
                    snippet,
                });
            }
        }
    }
    findings
}
