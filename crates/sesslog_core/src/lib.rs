//! Sesslog Core Library
//!
//! Session-scoped, append-only logging for coding-agent runtimes:
//! - One JSON tool-use event in, one durable log line out
//! - Per-session directories and category-tagged log files
//! - Name reconciliation: directories and files follow session renames,
//!   prior naming epochs survive under sequence suffixes
//! - Crash-safe appends with an overflow fallback
//!
//! # Quick Start
//!
//! ```
//! use sesslog_core::{Config, SessionLogger, ToolEvent};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let config = Config::default();
//! let logger = SessionLogger::new(tmp.path(), &config, "bash", "alice", "");
//!
//! let event = ToolEvent::from_json_str(
//!     r#"{"session_id": "abc-123", "tool_name": "Bash",
//!         "tool_input": {"command": "ls -la"}}"#,
//! ).unwrap();
//! logger.process(&event, sesslog_core::event_time_now(), None).unwrap();
//!
//! let unified = tmp.path()
//!     .join("__abc-123_alice")
//!     .join(".sesslog_bash_abc-123_alice.log");
//! assert!(std::fs::read_to_string(unified).unwrap().contains("ls -la"));
//! ```

mod append;
mod capture;
mod config;
mod entry;
mod error;
mod event;
mod logger;
mod naming;
mod reconcile;
mod resolver;
mod run;
mod state;

pub use append::{atomic_append, needs_time_gap, parse_stamp, DEFAULT_GAP_SECS};
pub use capture::{detect_failure, failure_entry, CaptureArea, CapturedOutput};
pub use config::{
    ActionOnlyOverride, Config, FailureCaptureConfig, Overrides, TimestampMode,
};
pub use entry::{
    action_only, format_timestamp, render_entry, ContentExtractor, DefaultExtractor,
};
pub use error::{Result, SesslogError};
pub use event::{categorize, Ack, ToolCategory, ToolEvent};
pub use logger::SessionLogger;
pub use naming::{
    directory_name, file_name, name_from_directory, name_from_file, sanitize_name, slugify,
    LogCategory, SessionIdentity, MAX_NAME_LEN,
};
pub use reconcile::{
    category_paths, name_from_disk, reconcile_directory, safe_rename, CategoryPaths,
};
pub use resolver::{
    apply_auto_name, derive_name_from_cwd, sessions_index_path, NameResolver, NameSource,
};
pub use run::{count_markers, marker_text, RunTracker, MARKER_SIGNATURE};
pub use state::{
    FsStateStore, MemoryStateStore, SessionStateBlob, StateStore, KEY_NAME_CACHE, KEY_RUN,
    KEY_STARTED,
};

/// The current event time, in local wall-clock terms.
///
/// Log timestamps are meant to read like the shell history of the machine
/// they were written on, so local time is deliberate.
pub fn event_time_now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}
