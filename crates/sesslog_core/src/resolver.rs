//! Session naming resolution.
//!
//! The authoritative current name for a session comes from an ordered chain
//! of lookup strategies: the transcript (always rescanned so external
//! renames are seen immediately), then the external session index, then the
//! persisted fallback cache. Any found name write-through-refreshes the
//! cache for diagnostics; the cache never gates the authoritative read.

use crate::event::ToolEvent;
use crate::naming::truncate_chars;
use crate::state::{StateStore, KEY_NAME_CACHE};
use serde::Deserialize;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Marker the runtime writes into transcript records when a session is
/// renamed.
const TITLE_RECORD_TYPE: &str = "custom-title";

/// A single name lookup strategy.
pub trait NameSource {
    /// Short capability tag for diagnostics ("transcript", "index", "cache").
    fn capability(&self) -> &'static str;

    /// Looks up the session name, if this source knows one.
    fn lookup(&self, session_id: &str, transcript_path: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct TitleRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "customTitle", default)]
    custom_title: Option<String>,
}

/// Scans the transcript for title records; the last one wins.
pub struct TranscriptSource;

impl NameSource for TranscriptSource {
    fn capability(&self) -> &'static str {
        "transcript"
    }

    fn lookup(&self, _session_id: &str, transcript_path: &str) -> Option<String> {
        if transcript_path.is_empty() {
            return None;
        }

        let file = fs::File::open(transcript_path).ok()?;
        let reader = BufReader::new(file);

        let mut name = None;
        for line in reader.lines() {
            let Ok(line) = line else { break };
            // Cheap filter before parsing; transcripts can be large
            if !line.contains(TITLE_RECORD_TYPE) {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<TitleRecord>(&line) {
                if record.kind == TITLE_RECORD_TYPE {
                    if let Some(title) = record.custom_title.filter(|t| !t.is_empty()) {
                        name = Some(title);
                    }
                }
            }
        }
        name
    }
}

#[derive(Debug, Deserialize)]
struct SessionsIndex {
    #[serde(default)]
    entries: Vec<SessionsIndexEntry>,
}

#[derive(Debug, Deserialize)]
struct SessionsIndexEntry {
    #[serde(rename = "sessionId", default)]
    session_id: String,
    #[serde(rename = "customTitle", default)]
    custom_title: Option<String>,
}

/// Consults `sessions-index.json` next to the transcript.
pub struct IndexSource;

/// Computes the expected index path for a transcript.
pub fn sessions_index_path(transcript_path: &str) -> Option<PathBuf> {
    if transcript_path.is_empty() {
        return None;
    }
    let path = Path::new(transcript_path).parent()?.join("sessions-index.json");
    path.exists().then_some(path)
}

impl NameSource for IndexSource {
    fn capability(&self) -> &'static str {
        "index"
    }

    fn lookup(&self, session_id: &str, transcript_path: &str) -> Option<String> {
        let path = sessions_index_path(transcript_path)?;
        let content = fs::read_to_string(path).ok()?;
        let index: SessionsIndex = serde_json::from_str(&content).ok()?;

        index
            .entries
            .into_iter()
            .find(|entry| entry.session_id == session_id)
            .and_then(|entry| entry.custom_title)
            .filter(|title| !title.is_empty())
    }
}

/// Falls back to the persisted per-session name cache.
pub struct CacheSource<'a> {
    store: &'a dyn StateStore,
}

impl NameSource for CacheSource<'_> {
    fn capability(&self) -> &'static str {
        "cache"
    }

    fn lookup(&self, session_id: &str, _transcript_path: &str) -> Option<String> {
        self.store.read(session_id, KEY_NAME_CACHE)
    }
}

/// Resolves the authoritative current name for a session.
pub struct NameResolver<'a> {
    sources: Vec<Box<dyn NameSource + 'a>>,
    store: &'a dyn StateStore,
}

impl<'a> NameResolver<'a> {
    /// Builds the standard chain: transcript, then index, then cache.
    pub fn new(store: &'a dyn StateStore) -> Self {
        Self {
            sources: vec![
                Box::new(TranscriptSource),
                Box::new(IndexSource),
                Box::new(CacheSource { store }),
            ],
            store,
        }
    }

    /// Returns the current name, or `None` if the session is unnamed.
    pub fn resolve(&self, session_id: &str, transcript_path: &str) -> Option<String> {
        for source in &self.sources {
            if let Some(name) = source.lookup(session_id, transcript_path) {
                tracing::debug!(
                    session_id,
                    source = source.capability(),
                    name,
                    "resolved session name"
                );
                // Refresh the fallback cache; diagnostics only, never gates
                // the authoritative read above.
                if let Err(e) = self.store.write(session_id, KEY_NAME_CACHE, &name) {
                    tracing::debug!(session_id, error = %e, "name cache refresh failed");
                }
                return Some(name);
            }
        }
        None
    }
}

/// Leaf segments too generic to serve as a session name on their own.
const GENERIC_SEGMENTS: &[&str] = &[
    "home",
    "user",
    "users",
    "code",
    "projects",
    "project",
    "work",
    "dev",
    "development",
    "src",
    "source",
    "app",
    "apps",
    "local",
    "current",
    "main",
    "master",
    "opt",
    "var",
    "tmp",
    "temp",
    "desktop",
    "documents",
    "downloads",
    "repos",
    "repository",
    "github",
    "gitlab",
    "bitbucket",
    "workspace",
    "workspaces",
];

/// Separator for path-derived names (distinct from the `__` naming
/// separator so derived names survive filename parsing).
const PATH_NAME_SEPARATOR: &str = "--";

/// How many trailing path segments are considered when deriving a name.
const MAX_PATH_SEGMENTS: usize = 4;

/// Maximum length of a derived name.
const MAX_DERIVED_LEN: usize = 50;

fn sanitize_segment(segment: &str) -> String {
    let lowered = segment.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut prev_dash = false;
    for c in lowered.chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '-'
        };
        if mapped == '-' {
            if !prev_dash {
                out.push('-');
            }
            prev_dash = true;
        } else {
            out.push(mapped);
            prev_dash = false;
        }
    }
    out.trim_matches('-').to_string()
}

/// A single-letter segment is a drive letter, useless as a name on its own.
fn is_drive_like(segment: &str) -> bool {
    segment.len() == 1 && segment.chars().all(|c| c.is_ascii_alphabetic())
}

/// Derives a candidate session name from a working-directory path.
///
/// Prefers the leaf segment when it is distinctive; otherwise walks up to
/// the nearest non-generic ancestor and joins ancestor through leaf.
/// Returns `None` only for empty or unusable paths.
pub fn derive_name_from_cwd(cwd: &str) -> Option<String> {
    if cwd.is_empty() {
        return None;
    }

    let segments: Vec<(String, String)> = cwd
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .map(|raw| raw.trim_end_matches(':'))
        .filter(|raw| !raw.is_empty())
        .map(|raw| (sanitize_segment(raw), raw.to_lowercase()))
        .filter(|(sanitized, _)| !sanitized.is_empty())
        .collect();

    let start = segments.len().saturating_sub(MAX_PATH_SEGMENTS);
    let segments = &segments[start..];
    if segments.is_empty() {
        tracing::debug!(cwd, "no usable path segments");
        return None;
    }

    // Distinctive leaf stands alone
    let (leaf, leaf_raw) = &segments[segments.len() - 1];
    if leaf.len() >= 3 && !GENERIC_SEGMENTS.contains(&leaf_raw.as_str()) && !is_drive_like(leaf) {
        return Some(truncate_chars(leaf, MAX_DERIVED_LEN).to_string());
    }

    // Otherwise join from the nearest non-generic ancestor down
    let mut start_idx = 0;
    for i in (0..segments.len().saturating_sub(1)).rev() {
        let (sanitized, raw) = &segments[i];
        if !GENERIC_SEGMENTS.contains(&raw.as_str()) && !is_drive_like(sanitized) {
            start_idx = i;
            break;
        }
    }

    let joined = segments[start_idx..]
        .iter()
        .map(|(s, _)| s.as_str())
        .collect::<Vec<_>>()
        .join(PATH_NAME_SEPARATOR);

    if joined.is_empty() {
        return None;
    }

    if joined.len() > MAX_DERIVED_LEN {
        let cut = truncate_chars(&joined, MAX_DERIVED_LEN);
        // Truncate at a separator boundary so no segment is half-kept
        let trimmed = cut
            .rfind(PATH_NAME_SEPARATOR)
            .map(|idx| &cut[..idx])
            .unwrap_or(cut);
        return Some(trimmed.to_string());
    }

    Some(joined)
}

/// Auto-names an unnamed session from its working directory on session
/// start.
///
/// The derived name is persisted as a fallback-cache entry only; the
/// transcript is never written. Returns the name if one was applied.
pub fn apply_auto_name(
    store: &dyn StateStore,
    resolver: &NameResolver<'_>,
    event: &ToolEvent,
) -> Option<String> {
    if !event.is_session_start() {
        return None;
    }

    if let Some(existing) = resolver.resolve(&event.session_id, &event.transcript_path) {
        tracing::debug!(
            session_id = event.session_id,
            name = existing,
            "session already named, skipping auto-name"
        );
        return None;
    }

    let name = derive_name_from_cwd(&event.cwd)?;
    match store.write(&event.session_id, KEY_NAME_CACHE, &name) {
        Ok(()) => {
            tracing::debug!(session_id = event.session_id, name, "auto-named session");
            Some(name)
        }
        Err(e) => {
            tracing::debug!(session_id = event.session_id, error = %e, "auto-name cache write failed");
            None
        }
    }
}
