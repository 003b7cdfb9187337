//! Run boundaries and session markers.
//!
//! A "run" is one agent process lifetime. The first logged event of a run
//! writes a banner marker into the unified and shell logs; the run number
//! comes from a persisted counter, self-healed by counting markers already
//! present in the unified log.

use crate::state::{StateStore, KEY_RUN, KEY_STARTED};
use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;

/// Substring identifying a run marker line.
pub const MARKER_SIGNATURE: &str = "═══ SESSION";

/// Width of the marker rule lines.
const MARKER_WIDTH: usize = 80;

/// Tracks per-session run state through a [`StateStore`].
pub struct RunTracker<'a> {
    store: &'a dyn StateStore,
}

impl<'a> RunTracker<'a> {
    /// Creates a tracker over the given store.
    pub fn new(store: &'a dyn StateStore) -> Self {
        Self { store }
    }

    /// Returns true if no marker has been written for this run yet.
    pub fn is_new_run(&self, session_id: &str) -> bool {
        self.store.read(session_id, KEY_STARTED).is_none()
    }

    /// Records that this run's marker has been written.
    pub fn mark_started(&self, session_id: &str, event_time: NaiveDateTime) {
        let stamp = event_time.format("%Y-%m-%d %H:%M:%S").to_string();
        if let Err(e) = self.store.write(session_id, KEY_STARTED, &stamp) {
            tracing::warn!(session_id, error = %e, "cannot persist started flag");
        }
    }

    /// Clears the started flag so the next event opens a new run.
    pub fn reset(&self, session_id: &str) {
        if let Err(e) = self.store.delete(session_id, KEY_STARTED) {
            tracing::warn!(session_id, error = %e, "cannot clear started flag");
        }
    }

    /// Determines this run's number and persists it.
    ///
    /// The persisted counter wins when valid; otherwise the number is
    /// recovered by counting markers already in the unified log.
    pub fn run_number(&self, session_id: &str, unified_log: &Path) -> u32 {
        if let Some(n) = self
            .store
            .read(session_id, KEY_RUN)
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
        {
            return n;
        }

        let recovered = count_markers(unified_log) + 1;
        if let Err(e) = self
            .store
            .write(session_id, KEY_RUN, &recovered.to_string())
        {
            tracing::warn!(session_id, error = %e, "cannot persist run counter");
        }
        recovered
    }

    /// Advances the persisted counter past the given run.
    pub fn store_next_run(&self, session_id: &str, current: u32) {
        if let Err(e) = self
            .store
            .write(session_id, KEY_RUN, &(current + 1).to_string())
        {
            tracing::warn!(session_id, error = %e, "cannot persist run counter");
        }
    }
}

/// Counts run markers already present in a log file.
pub fn count_markers(path: &Path) -> u32 {
    match fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .filter(|line| line.contains(MARKER_SIGNATURE))
            .count() as u32,
        Err(_) => 0,
    }
}

/// Renders the banner marker for a run.
pub fn marker_text(run: u32, event_time: NaiveDateTime, name: Option<&str>) -> String {
    let rule = "═".repeat(MARKER_WIDTH);
    let stamp = event_time.format("%Y-%m-%d %H:%M:%S");
    let label = name.unwrap_or("(unnamed)");
    format!("{rule}\n{MARKER_SIGNATURE} START  •  {stamp}  •  Run #{run}  •  {label}\n{rule}")
}
