use anyhow::{bail, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An isolated log root plus a fake runtime directory holding the
/// transcript and session index, the way the upstream lays them out.
pub struct TestWorkspace {
    root: TempDir,
    runtime: TempDir,
}

impl TestWorkspace {
    /// Creates an empty workspace.
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: TempDir::new().context("Failed to create log root")?,
            runtime: TempDir::new().context("Failed to create runtime dir")?,
        })
    }

    /// The log root events are written under.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Path of the runtime transcript (may not exist yet).
    pub fn transcript(&self) -> PathBuf {
        self.runtime.path().join("transcript.jsonl")
    }

    /// Appends one raw line to the transcript, creating it if needed.
    pub fn append_transcript(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.transcript())
            .context("Failed to open transcript")?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Simulates the runtime renaming the session via a title record.
    pub fn rename_via_transcript(&self, title: &str) -> Result<()> {
        self.append_transcript(&format!(
            r#"{{"type":"custom-title","customTitle":"{title}"}}"#
        ))
    }

    /// Writes a session index entry next to the transcript.
    pub fn write_index(&self, session_id: &str, title: &str) -> Result<()> {
        let index = serde_json::json!({
            "entries": [{"sessionId": session_id, "customTitle": title}]
        });
        fs::write(
            self.runtime.path().join("sessions-index.json"),
            serde_json::to_string_pretty(&index)?,
        )?;
        Ok(())
    }

    /// Finds the single session directory for a session id.
    pub fn session_dir(&self, session_id: &str) -> Result<PathBuf> {
        let marker = format!("__{session_id}_");
        let mut dirs: Vec<PathBuf> = fs::read_dir(self.root())?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter(|e| e.file_name().to_string_lossy().contains(&marker))
            .map(|e| e.path())
            .collect();

        match dirs.len() {
            1 => Ok(dirs.remove(0)),
            0 => bail!("no session directory for {session_id}"),
            n => bail!("{n} session directories for {session_id}, expected one"),
        }
    }

    /// Reads the log file with the given category tag for a session.
    pub fn log_content(&self, session_id: &str, tag: &str) -> Result<String> {
        let path = self.find_log(session_id, tag)?;
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Locates the current log file with the given category tag.
    pub fn find_log(&self, session_id: &str, tag: &str) -> Result<PathBuf> {
        let dir = self.session_dir(session_id)?;
        let prefix = format!(".{tag}_");
        fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".log"))
            })
            .with_context(|| format!("no {tag} log for {session_id} in {}", dir.display()))
    }

    /// Returns true if any log file with the tag exists for the session.
    pub fn log_exists(&self, session_id: &str, tag: &str) -> bool {
        self.find_log(session_id, tag).is_ok()
    }

    /// Deletes the persisted session-state area, simulating state loss.
    pub fn drop_state(&self) -> Result<()> {
        let states = self.root().join("session-states");
        if states.exists() {
            fs::remove_dir_all(&states)?;
        }
        Ok(())
    }

    /// Lists all file names inside the session directory.
    pub fn session_files(&self, session_id: &str) -> Result<Vec<String>> {
        let dir = self.session_dir(session_id)?;
        let mut names: Vec<String> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }
}
