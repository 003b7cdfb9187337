//! Rename a session out-of-band.
//!
//! Writes the new name everywhere the resolver looks: the external session
//! index (backed up first), the transcript (as a `custom-title` record),
//! and the fallback name cache. Directories and files are not touched
//! here; reconciliation picks the rename up on the next hook invocation.

use anyhow::{bail, Context, Result};
use sesslog_core::{
    sessions_index_path, slugify, FsStateStore, StateStore, KEY_NAME_CACHE,
};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Word cap for user-entered names.
const MAX_NAME_WORDS: usize = 10;

/// Renames a session.
pub fn run(root: &Path, session_id: &str, new_name: &str) -> Result<()> {
    let slug = slugify(new_name, MAX_NAME_WORDS);
    if slug.is_empty() {
        bail!("name \"{new_name}\" has no usable characters");
    }

    let store = FsStateStore::new(root);
    let blob = store.read_blob(session_id);

    let transcript_path = blob
        .as_ref()
        .map(|b| b.transcript_path.clone())
        .unwrap_or_default();
    let index_path = blob
        .as_ref()
        .and_then(|b| b.sessions_index_path.clone())
        .or_else(|| {
            sessions_index_path(&transcript_path).map(|p| p.to_string_lossy().into_owned())
        });

    let mut touched = Vec::new();

    if let Some(index_path) = index_path {
        update_index(Path::new(&index_path), session_id, &slug)
            .with_context(|| format!("updating session index {index_path}"))?;
        touched.push("index");
    }

    if !transcript_path.is_empty() && Path::new(&transcript_path).exists() {
        append_title_record(Path::new(&transcript_path), session_id, &slug)
            .with_context(|| format!("updating transcript {transcript_path}"))?;
        touched.push("transcript");
    }

    store
        .write(session_id, KEY_NAME_CACHE, &slug)
        .context("refreshing name cache")?;
    touched.push("cache");

    println!("Renamed session {session_id} to \"{slug}\" ({})", touched.join(", "));
    println!("Log files will follow on the next logged event.");
    Ok(())
}

/// Updates `customTitle` for the session in the index, backing the file up
/// first.
fn update_index(path: &Path, session_id: &str, slug: &str) -> Result<()> {
    let content = fs::read_to_string(path)?;
    let mut index: serde_json::Value = serde_json::from_str(&content)?;

    let backup = path.with_extension(format!(
        "json.{}.bak",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));
    fs::copy(path, &backup)?;

    let entries = index
        .get_mut("entries")
        .and_then(|e| e.as_array_mut())
        .context("index has no entries array")?;

    match entries
        .iter_mut()
        .find(|e| e.get("sessionId").and_then(|v| v.as_str()) == Some(session_id))
    {
        Some(entry) => {
            entry["customTitle"] = serde_json::Value::String(slug.to_string());
        }
        None => entries.push(serde_json::json!({
            "sessionId": session_id,
            "customTitle": slug,
        })),
    }

    fs::write(path, serde_json::to_string_pretty(&index)?)?;
    Ok(())
}

/// Appends a `custom-title` record so transcript-based resolution sees the
/// new name immediately.
fn append_title_record(path: &Path, session_id: &str, slug: &str) -> Result<()> {
    let record = serde_json::json!({
        "type": "custom-title",
        "sessionId": session_id,
        "customTitle": slug,
    });

    let mut file = OpenOptions::new().append(true).open(path)?;
    writeln!(file, "{record}")?;
    Ok(())
}
