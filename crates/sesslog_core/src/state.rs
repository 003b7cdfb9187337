//! Persisted per-session state.
//!
//! Small flat values (name cache, started flag, run counter) go through the
//! [`StateStore`] key-value abstraction so tests can swap in an in-memory
//! fake. The richer state blob lives next to them as `<session_id>.json`.
//!
//! All reads and writes are best-effort; a missing or unreadable value is
//! simply absent. Cross-process access is guarded by a best-effort advisory
//! lock that never blocks: on contention the writer proceeds unlocked
//! (last writer wins, documented limitation).

use crate::error::{Result, SesslogError};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key for the persisted fallback name cache.
pub const KEY_NAME_CACHE: &str = "name-cache";

/// Key for the started-this-run flag.
pub const KEY_STARTED: &str = "started";

/// Key for the persisted run counter.
pub const KEY_RUN: &str = "run";

/// Key-value store for small per-session state values.
pub trait StateStore {
    /// Reads a value; `None` if absent, empty, or unreadable.
    fn read(&self, session_id: &str, key: &str) -> Option<String>;

    /// Writes a value.
    fn write(&self, session_id: &str, key: &str, value: &str) -> Result<()>;

    /// Deletes a value; absent values are not an error.
    fn delete(&self, session_id: &str, key: &str) -> Result<()>;
}

/// Richer per-session state record, for out-of-band tooling (e.g. rename).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateBlob {
    /// Stable session key.
    pub session_id: String,
    /// Transcript path as last reported by the runtime.
    #[serde(default)]
    pub transcript_path: String,
    /// Path to the external session index, if one was found.
    #[serde(default)]
    pub sessions_index_path: Option<String>,
    /// The session's current log directory.
    #[serde(default)]
    pub log_dir: Option<String>,
    /// Working directory of the first event; set once, never changes.
    #[serde(default)]
    pub original_cwd: String,
    /// Working directory of the latest event.
    #[serde(default)]
    pub cwd: String,
    /// Effective name at the time of the last write.
    #[serde(default)]
    pub current_name: Option<String>,
    /// RFC 3339 UTC timestamp of the last write.
    #[serde(default)]
    pub updated_at: String,
}

/// File-backed state store under `<root>/session-states/`.
///
/// Each value is one flat file named `{session_id}.{key}`; writes go through
/// a temp file and atomic rename.
pub struct FsStateStore {
    dir: PathBuf,
}

impl FsStateStore {
    /// Creates a store rooted under the given log root.
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join("session-states"),
        }
    }

    /// Directory holding the state files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, session_id: &str, key: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.{key}"))
    }

    fn blob_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// Writes a file atomically via temp file + rename.
    fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        // Append rather than replace the extension so distinct keys never
        // share a temp path.
        let mut tmp_os = path.as_os_str().to_os_string();
        tmp_os.push(".tmp");
        let tmp_path = PathBuf::from(tmp_os);
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Tries to take an advisory lock for this session.
    ///
    /// Returns `None` on contention or error; the caller proceeds unlocked.
    fn try_lock(&self, session_id: &str) -> Option<File> {
        fs::create_dir_all(&self.dir).ok()?;
        let path = self.dir.join(format!("{session_id}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .ok()?;

        match file.try_lock_exclusive() {
            Ok(()) => Some(file),
            Err(_) => {
                tracing::debug!(session_id, "state lock contended, proceeding unlocked");
                None
            }
        }
    }

    /// Reads the richer state blob, if present and parseable.
    pub fn read_blob(&self, session_id: &str) -> Option<SessionStateBlob> {
        let content = fs::read_to_string(self.blob_path(session_id)).ok()?;
        match serde_json::from_str(&content) {
            Ok(blob) => Some(blob),
            Err(e) => {
                tracing::debug!(session_id, error = %e, "ignoring unparseable state blob");
                None
            }
        }
    }

    /// Writes the richer state blob atomically.
    ///
    /// `original_cwd` from an existing blob is preserved; it is set on the
    /// first write and never changes afterwards.
    pub fn write_blob(&self, mut blob: SessionStateBlob) -> Result<()> {
        let _lock = self.try_lock(&blob.session_id);

        if let Some(existing) = self.read_blob(&blob.session_id) {
            if !existing.original_cwd.is_empty() {
                blob.original_cwd = existing.original_cwd;
            }
        }
        if blob.original_cwd.is_empty() {
            blob.original_cwd = blob.cwd.clone();
        }

        let content = serde_json::to_string_pretty(&blob)
            .map_err(|e| SesslogError::Serialization(e.to_string()))?;
        self.write_atomic(&self.blob_path(&blob.session_id), &content)
    }
}

impl StateStore for FsStateStore {
    fn read(&self, session_id: &str, key: &str) -> Option<String> {
        let content = fs::read_to_string(self.value_path(session_id, key)).ok()?;
        let trimmed = content.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn write(&self, session_id: &str, key: &str, value: &str) -> Result<()> {
        self.write_atomic(&self.value_path(session_id, key), value)
    }

    fn delete(&self, session_id: &str, key: &str) -> Result<()> {
        match fs::remove_file(self.value_path(session_id, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory state store for tests.
#[derive(Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<(String, String), String>>,
}

impl MemoryStateStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn read(&self, session_id: &str, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()?
            .get(&(session_id.to_string(), key.to_string()))
            .cloned()
    }

    fn write(&self, session_id: &str, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| SesslogError::StateError("memory store poisoned".to_string()))?
            .insert(
                (session_id.to_string(), key.to_string()),
                value.to_string(),
            );
        Ok(())
    }

    fn delete(&self, session_id: &str, key: &str) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| SesslogError::StateError("memory store poisoned".to_string()))?
            .remove(&(session_id.to_string(), key.to_string()));
        Ok(())
    }
}
