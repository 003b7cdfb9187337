//! Directory and log-file reconciliation.
//!
//! A session's directory and files are renamed in place whenever the
//! effective name changes, so one session never fragments across multiple
//! directories. Files from prior naming epochs are kept under `--NNN`
//! sequence suffixes, never deleted or merged.
//!
//! Every rename here is best-effort: a failure degrades to the existing
//! path with a warning, never to a lost entry.

use crate::naming::{
    self, LogCategory, SessionIdentity, NAME_SEPARATOR, SEQUENCE_SEPARATOR,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Reconciled paths of the three per-session log files.
#[derive(Debug, Clone)]
pub struct CategoryPaths {
    /// The unified session log.
    pub unified: PathBuf,
    /// The raw command history log.
    pub shell: PathBuf,
    /// The task-tool history log.
    pub tasks: PathBuf,
}

impl CategoryPaths {
    /// Path for one category.
    pub fn get(&self, category: LogCategory) -> &Path {
        match category {
            LogCategory::Unified => &self.unified,
            LogCategory::Shell => &self.shell,
            LogCategory::Tasks => &self.tasks,
        }
    }
}

/// Finds the existing directory embedding this session id, if any.
///
/// Directory names are scanned for the `__{session_id}_` marker, which both
/// named and unnamed forms carry. Ties (which would violate the one
/// directory per session invariant) resolve to the lexicographically first.
pub fn find_directory_by_id(root: &Path, session_id: &str) -> Option<PathBuf> {
    let marker = format!("{NAME_SEPARATOR}{session_id}_");
    let mut candidates: Vec<String> = fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.contains(&marker))
        .collect();

    candidates.sort();
    candidates.into_iter().next().map(|name| root.join(name))
}

/// Settles the session directory for the given effective name.
///
/// Returns the directory to use and the name actually in effect on disk,
/// which differs from the requested name only when a rename failed or when
/// no name was requested but the existing directory carries one.
pub fn reconcile_directory(
    root: &Path,
    session_id: &str,
    name: Option<&str>,
    username: &str,
) -> (PathBuf, Option<String>) {
    let sanitized = name.map(naming::sanitize_name);
    let expected = root.join(naming::directory_name(
        sanitized.as_deref(),
        session_id,
        username,
    ));

    if expected.is_dir() {
        return (expected, sanitized);
    }

    if let Some(existing) = find_directory_by_id(root, session_id) {
        let existing_name = existing
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| naming::name_from_directory(n, session_id));

        let Some(new_name) = sanitized else {
            // No name requested; the directory on disk is authoritative.
            return (existing, existing_name);
        };

        return match fs::rename(&existing, &expected) {
            Ok(()) => {
                tracing::debug!(
                    from = %existing.display(),
                    to = %expected.display(),
                    "session directory renamed"
                );
                cascade_rename_files(&expected, existing_name.as_deref(), &new_name, session_id);
                (expected, Some(new_name))
            }
            Err(e) => {
                tracing::warn!(
                    from = %existing.display(),
                    to = %expected.display(),
                    error = %e,
                    "directory rename failed, keeping existing path"
                );
                (existing, existing_name)
            }
        };
    }

    if let Err(e) = fs::create_dir_all(&expected) {
        tracing::warn!(path = %expected.display(), error = %e, "cannot create session directory");
    }
    (expected, sanitized)
}

/// Renames the files inside a freshly renamed session directory so their
/// embedded name matches the directory's.
pub fn cascade_rename_files(
    dir: &Path,
    old_name: Option<&str>,
    new_name: &str,
    session_id: &str,
) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let renamed = match old_name {
            Some(old) => replace_embedded_name(file_name, old, new_name),
            None => insert_name_before_id(file_name, new_name, session_id),
        };

        if let Some(renamed) = renamed {
            safe_rename(&path, &dir.join(renamed));
        }
    }
}

/// Swaps one embedded name for another, preserving any sequence suffix.
fn replace_embedded_name(file_name: &str, old: &str, new: &str) -> Option<String> {
    let current = format!("{NAME_SEPARATOR}{old}{NAME_SEPARATOR}");
    let sequenced = format!("{NAME_SEPARATOR}{old}{SEQUENCE_SEPARATOR}");

    if file_name.contains(&current) {
        Some(file_name.replace(&current, &format!("{NAME_SEPARATOR}{new}{NAME_SEPARATOR}")))
    } else if file_name.contains(&sequenced) {
        Some(file_name.replace(
            &sequenced,
            &format!("{NAME_SEPARATOR}{new}{SEQUENCE_SEPARATOR}"),
        ))
    } else {
        None
    }
}

/// Inserts `__{name}_` before the session-id segment of a previously
/// unnamed filename. Already-named files are left alone.
fn insert_name_before_id(file_name: &str, name: &str, session_id: &str) -> Option<String> {
    if file_name.contains(&format!("{NAME_SEPARATOR}{session_id}")) {
        return None; // already named
    }

    let marker = format!("_{session_id}_");
    let idx = file_name.find(&marker)?;
    Some(format!(
        "{}{NAME_SEPARATOR}{name}{NAME_SEPARATOR}{}",
        &file_name[..idx],
        &file_name[idx + 1..]
    ))
}

/// Renames with src==dst as success and an occupied destination as a skip.
///
/// Returns true only when the destination now holds the source's content.
pub fn safe_rename(src: &Path, dst: &Path) -> bool {
    if src == dst {
        return true;
    }
    if dst.exists() {
        tracing::debug!(
            src = %src.display(),
            dst = %dst.display(),
            "rename skipped, destination exists"
        );
        return false;
    }
    match fs::rename(src, dst) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                src = %src.display(),
                dst = %dst.display(),
                error = %e,
                "rename failed"
            );
            false
        }
    }
}

/// Reconciles one log category inside a settled directory.
///
/// Returns the path future appends for this category should target. With
/// multiple matching files the newest by mtime stays current; older
/// unsequenced files receive fresh strictly-increasing sequence numbers.
pub fn reconcile_category(
    dir: &Path,
    prefix: &str,
    category: LogCategory,
    identity: &SessionIdentity,
    name: Option<&str>,
) -> PathBuf {
    let canonical = dir.join(naming::file_name(prefix, category, identity, name, None));

    let mut matches: Vec<(PathBuf, SystemTime)> = fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| naming::matches_category(n, prefix, category, &identity.session_id))
        })
        .map(|e| {
            let mtime = e
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (e.path(), mtime)
        })
        .collect();

    match matches.len() {
        0 => canonical,
        1 => {
            let (path, _) = matches.remove(0);
            if path == canonical || safe_rename(&path, &canonical) {
                canonical
            } else {
                path
            }
        }
        _ => {
            matches.sort_by_key(|(_, mtime)| *mtime);
            let mut next_seq = matches
                .iter()
                .filter_map(|(p, _)| p.file_name().and_then(|n| n.to_str()))
                .filter_map(naming::sequence_of)
                .max()
                .map_or(0, |max| max + 1);
            let (current, _) = matches.pop().expect("non-empty after len check");

            for (path, _) in &matches {
                let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if naming::has_sequence(file_name) {
                    continue; // already archived under a prior epoch
                }
                let embedded = naming::name_from_file(file_name, &identity.session_id);
                let archive_name = embedded.as_deref().or(name).unwrap_or("session");
                let target = dir.join(naming::file_name(
                    prefix,
                    category,
                    identity,
                    Some(archive_name),
                    Some(next_seq),
                ));
                if safe_rename(path, &target) {
                    next_seq += 1;
                }
            }

            if current == canonical {
                return canonical;
            }
            if canonical.exists() {
                // Canonical slot occupied by a file that is not the newest;
                // archive the newest under a fresh sequence instead.
                let fallback_name = name
                    .map(str::to_string)
                    .or_else(|| {
                        current
                            .file_name()
                            .and_then(|n| n.to_str())
                            .and_then(|n| naming::name_from_file(n, &identity.session_id))
                    })
                    .unwrap_or_else(|| "session".to_string());
                let target = dir.join(naming::file_name(
                    prefix,
                    category,
                    identity,
                    Some(&fallback_name),
                    Some(next_seq),
                ));
                safe_rename(&current, &target);
                return canonical;
            }
            if safe_rename(&current, &canonical) {
                canonical
            } else {
                current
            }
        }
    }
}

/// Reconciles all three categories and returns their append targets.
pub fn category_paths(
    dir: &Path,
    prefix: &str,
    identity: &SessionIdentity,
    name: Option<&str>,
) -> CategoryPaths {
    CategoryPaths {
        unified: reconcile_category(dir, prefix, LogCategory::Unified, identity, name),
        shell: reconcile_category(dir, prefix, LogCategory::Shell, identity, name),
        tasks: reconcile_category(dir, prefix, LogCategory::Tasks, identity, name),
    }
}

/// Recovers a session name from what is on disk, for continuity across
/// cache loss.
pub fn name_from_disk(root: &Path, session_id: &str) -> Option<String> {
    let dir = find_directory_by_id(root, session_id)?;

    if let Some(name) = dir
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| naming::name_from_directory(n, session_id))
    {
        return Some(name);
    }

    // Unnamed directory may still hold named files from before a partial
    // rename.
    fs::read_dir(&dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .find_map(|file_name| naming::name_from_file(&file_name, session_id))
}
