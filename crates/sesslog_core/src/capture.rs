//! Failure capture for shell commands.
//!
//! Two pieces: an ephemeral `<root>/captures/` drop area where out-of-band
//! wrappers can leave command output keyed by session id, and a scanner
//! that turns error-looking output into a `[FAILED: ...]` entry.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::config::FailureCaptureConfig;

/// Capture files younger than this are consumed.
const FRESH_WINDOW: Duration = Duration::from_secs(300);

/// Capture files older than this are deleted.
const STALE_AFTER: Duration = Duration::from_secs(600);

/// Substrings that mark command output as a failure.
const ERROR_PATTERNS: &[&str] = &[
    "error:",
    "Error:",
    "ERROR",
    "fatal:",
    "panicked at",
    "command not found",
    "No such file or directory",
    "Permission denied",
    "syntax error",
    "Failed to execute",
    "exit status",
    "Traceback (most recent call last)",
    "Segmentation fault",
    "FAILED",
];

/// One dropped capture record.
#[derive(Debug, Clone, Deserialize)]
pub struct CapturedOutput {
    /// The command whose output was captured.
    #[serde(default)]
    pub bash_command: String,
    /// Working directory of the command.
    #[serde(default)]
    pub cwd: String,
    /// The captured output itself.
    #[serde(default)]
    pub output: String,
}

/// The `<root>/captures/` drop area.
pub struct CaptureArea {
    dir: PathBuf,
}

impl CaptureArea {
    /// Opens the capture area under the given log root.
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join("captures"),
        }
    }

    /// Directory holding capture files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Consumes fresh capture records for a session.
    ///
    /// Files named `{session_id}-*` with an mtime inside the freshness
    /// window are parsed and deleted; unparseable files are deleted too.
    pub fn take_recent(&self, session_id: &str) -> Vec<CapturedOutput> {
        let prefix = format!("{session_id}-");
        let now = SystemTime::now();
        let mut records = Vec::new();

        let Ok(entries) = fs::read_dir(&self.dir) else {
            return records;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with(&prefix) {
                continue;
            }
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|mtime| now.duration_since(mtime).ok());
            if !age.is_some_and(|age| age <= FRESH_WINDOW) {
                continue;
            }

            let path = entry.path();
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        tracing::debug!(path = %path.display(), error = %e, "unparseable capture dropped");
                    }
                },
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "unreadable capture dropped");
                }
            }
            let _ = fs::remove_file(&path);
        }

        records
    }

    /// Deletes capture files past the staleness cutoff, for any session.
    pub fn cleanup(&self) {
        let now = SystemTime::now();
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let stale = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|mtime| now.duration_since(mtime).ok())
                .is_some_and(|age| age > STALE_AFTER);
            if stale {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

/// Returns the first error-looking line of command output, if any.
pub fn detect_failure(output: &str) -> Option<&str> {
    output
        .lines()
        .find(|line| ERROR_PATTERNS.iter().any(|p| line.contains(p)))
        .map(str::trim)
}

/// Builds the multi-line failure entry for a failed command.
///
/// `None` when the output carries no recognizable failure. The entry is a
/// `[FAILED: command]` headline plus up to `max_lines` indented output
/// lines starting at the first error line.
pub fn failure_entry(
    command: &str,
    output: &str,
    config: &FailureCaptureConfig,
    stamp: &str,
) -> Option<String> {
    let first_error = detect_failure(output)?;

    let mut entry = format!("{stamp}[FAILED: {command}]");
    if config.capture_stderr {
        let start = output
            .lines()
            .position(|line| line.trim() == first_error)
            .unwrap_or(0);
        for line in output.lines().skip(start).take(config.max_lines) {
            entry.push_str("\n    ");
            entry.push_str(line);
        }
    }
    Some(entry)
}
