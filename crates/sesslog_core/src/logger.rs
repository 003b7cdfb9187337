//! Event orchestration: one invocation, one event, durable log lines.
//!
//! The write path per event: resolve the effective name, settle the session
//! directory and its files, open the run with a marker if this is the first
//! event of the run, then append the rendered entry. Lifecycle events
//! (SessionStart, Stop) update session state but write no entries.

use crate::capture::{failure_entry, CaptureArea};
use crate::config::Config;
use crate::entry::{format_timestamp, render_entry, ContentExtractor, DefaultExtractor};
use crate::error::Result;
use crate::event::{categorize, ToolCategory, ToolEvent};
use crate::naming::SessionIdentity;
use crate::reconcile::{category_paths, name_from_disk, reconcile_directory};
use crate::resolver::{apply_auto_name, sessions_index_path, NameResolver};
use crate::run::{marker_text, RunTracker};
use crate::state::{FsStateStore, SessionStateBlob};
use crate::{append, reconcile};
use chrono::NaiveDateTime;
use std::path::Path;

/// Session log writer bound to one log root and runtime identity.
pub struct SessionLogger<'a> {
    root: &'a Path,
    config: &'a Config,
    /// Shell kind segment for filenames; injected, never detected.
    shell: &'a str,
    username: &'a str,
    file_prefix: &'a str,
    extractor: &'a dyn ContentExtractor,
}

impl<'a> SessionLogger<'a> {
    /// Creates a logger with the default content extractor.
    pub fn new(
        root: &'a Path,
        config: &'a Config,
        shell: &'a str,
        username: &'a str,
        file_prefix: &'a str,
    ) -> Self {
        Self {
            root,
            config,
            shell,
            username,
            file_prefix,
            extractor: &DefaultExtractor,
        }
    }

    /// Swaps in a different content extractor.
    pub fn with_extractor(mut self, extractor: &'a dyn ContentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Processes one event end to end.
    ///
    /// `tool_output` is the out-of-band command output used for failure
    /// capture, when the caller has it.
    pub fn process(
        &self,
        event: &ToolEvent,
        event_time: NaiveDateTime,
        tool_output: Option<&str>,
    ) -> Result<()> {
        let store = FsStateStore::new(self.root);
        let resolver = NameResolver::new(&store);
        let session_id = event.session_id.as_str();

        if event.is_session_start() {
            // A fresh agent process lifetime opens a new run
            RunTracker::new(&store).reset(session_id);
            apply_auto_name(&store, &resolver, event);
        }

        let resolved = resolver
            .resolve(session_id, &event.transcript_path)
            .or_else(|| name_from_disk(self.root, session_id));

        let (dir, effective_name) =
            reconcile_directory(self.root, session_id, resolved.as_deref(), self.username);

        self.record_state(&store, event, &dir, effective_name.as_deref());
        link_transcript(&dir, &event.transcript_path);

        if !event.is_tool_event() {
            return Ok(());
        }

        let category = categorize(&event.tool_name);
        if !self.config.allows(category) {
            tracing::debug!(
                session_id,
                tool = event.tool_name,
                category = category.as_str(),
                "event filtered out"
            );
            return Ok(());
        }

        let identity = SessionIdentity {
            session_id: session_id.to_string(),
            shell: self.shell.to_string(),
            username: self.username.to_string(),
        };
        let paths = category_paths(&dir, self.file_prefix, &identity, effective_name.as_deref());

        let mut gap_unified = append::needs_time_gap(
            &paths.unified,
            self.config.timestamp_mode,
            event_time,
            append::DEFAULT_GAP_SECS,
        );
        let mut gap_shell = append::needs_time_gap(
            &paths.shell,
            self.config.timestamp_mode,
            event_time,
            append::DEFAULT_GAP_SECS,
        );

        let tracker = RunTracker::new(&store);
        if tracker.is_new_run(session_id) {
            let run = tracker.run_number(session_id, &paths.unified);
            let marker = marker_text(run, event_time, effective_name.as_deref());
            append::atomic_append(&paths.unified, &marker, gap_unified)?;
            append::atomic_append(&paths.shell, &marker, gap_shell)?;
            gap_unified = false;
            gap_shell = false;
            tracker.mark_started(session_id, event_time);
            tracker.store_next_run(session_id, run);
        }

        let entry = render_entry(event, self.config, self.extractor, event_time);
        append::atomic_append(&paths.unified, &entry, gap_unified)?;

        let stamp = format_timestamp(self.config.timestamp_mode, event_time);
        if category == ToolCategory::Bash {
            let command = self.extractor.extract(event);
            if !command.is_empty() {
                append::atomic_append(&paths.shell, &format!("{stamp}{command}"), gap_shell)?;
            }
            self.capture_failures(event, &paths, &stamp, tool_output)?;
        } else if category == ToolCategory::Task {
            let summary = self.extractor.extract(event);
            if !summary.is_empty() {
                append::atomic_append(&paths.tasks, &format!("{stamp}{summary}"), false)?;
            }
        }

        Ok(())
    }

    /// Appends `[FAILED: ...]` entries for error-looking command output.
    fn capture_failures(
        &self,
        event: &ToolEvent,
        paths: &reconcile::CategoryPaths,
        stamp: &str,
        tool_output: Option<&str>,
    ) -> Result<()> {
        if !self.config.failure_capture.enabled {
            return Ok(());
        }

        let command = self.extractor.extract(event);
        let mut failures = Vec::new();

        if let Some(output) = tool_output {
            if let Some(entry) =
                failure_entry(&command, output, &self.config.failure_capture, stamp)
            {
                failures.push(entry);
            }
        }

        let area = CaptureArea::new(self.root);
        for record in area.take_recent(&event.session_id) {
            let captured_command = if record.bash_command.is_empty() {
                command.clone()
            } else {
                record.bash_command
            };
            if let Some(entry) = failure_entry(
                &captured_command,
                &record.output,
                &self.config.failure_capture,
                stamp,
            ) {
                failures.push(entry);
            }
        }
        area.cleanup();

        for failure in failures {
            append::atomic_append(&paths.unified, &failure, false)?;
            append::atomic_append(&paths.shell, &failure, false)?;
        }
        Ok(())
    }

    /// Updates the per-session state blob; never fatal.
    fn record_state(&self, store: &FsStateStore, event: &ToolEvent, dir: &Path, name: Option<&str>) {
        let blob = SessionStateBlob {
            session_id: event.session_id.clone(),
            transcript_path: event.transcript_path.clone(),
            sessions_index_path: sessions_index_path(&event.transcript_path)
                .map(|p| p.to_string_lossy().into_owned()),
            log_dir: Some(dir.to_string_lossy().into_owned()),
            original_cwd: String::new(),
            cwd: event.cwd.clone(),
            current_name: name.map(str::to_string),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(e) = store.write_blob(blob) {
            tracing::warn!(session_id = event.session_id, error = %e, "state blob write failed");
        }
    }
}

/// Links the transcript into the session directory for convenience.
#[cfg(unix)]
fn link_transcript(dir: &Path, transcript_path: &str) {
    if transcript_path.is_empty() || !Path::new(transcript_path).exists() {
        return;
    }
    let link = dir.join("transcript.jsonl");
    if link.exists() {
        return;
    }
    if let Err(e) = std::os::unix::fs::symlink(transcript_path, &link) {
        tracing::debug!(error = %e, "transcript symlink failed");
    }
}

#[cfg(not(unix))]
fn link_transcript(_dir: &Path, _transcript_path: &str) {}
