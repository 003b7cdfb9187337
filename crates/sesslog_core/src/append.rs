//! Crash-safe append primitive.
//!
//! Appends go through a fresh temp file in the same directory followed by an
//! atomic rename, so a reader never observes a partially written log. When
//! that fails, the entry is preserved in a numbered non-atomic overflow file
//! rather than silently dropped.

use crate::config::TimestampMode;
use crate::error::{Result, SesslogError};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Default time-gap threshold between entries, in seconds.
pub const DEFAULT_GAP_SECS: i64 = 1800;

/// Overflow files roll over past this size.
const OVERFLOW_SIZE_CEILING: u64 = 1_000_000;

/// Hard cap on the number of overflow files per target.
const OVERFLOW_MAX_FILES: u32 = 100;

/// The two timestamp formats the writer itself produces.
const STAMP_FORMAT_FULL: &str = "%Y-%m-%d %H:%M:%S";
const STAMP_FORMAT_DATE: &str = "%Y-%m-%d";

/// Appends a text block to a file atomically.
///
/// Null bytes are stripped from all content before writing. On failure the
/// entry goes to an overflow file; only when that also fails is the entry
/// lost (and reported as [`SesslogError::EntryLost`]).
pub fn atomic_append(path: &Path, content: &str, add_gap: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = content.replace('\0', "");

    match atomic_append_inner(path, &content, add_gap) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "atomic append failed, writing to overflow"
            );
            write_overflow(path, &content, add_gap)
        }
    }
}

/// The atomic path: copy existing content plus the new entry into a temp
/// file next to the target, fsync, then rename over the target.
fn atomic_append_inner(path: &Path, content: &str, add_gap: bool) -> std::io::Result<()> {
    // Same directory as the target: the rename is only atomic within one
    // filesystem. PID suffix keeps concurrent writers off each other's
    // temp files.
    let mut tmp_os = path.as_os_str().to_os_string();
    tmp_os.push(format!(".{}.tmp", std::process::id()));
    let tmp_path = std::path::PathBuf::from(tmp_os);

    let result = write_and_rename(path, &tmp_path, content, add_gap);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_and_rename(
    path: &Path,
    tmp_path: &Path,
    content: &str,
    add_gap: bool,
) -> std::io::Result<()> {
    {
        let mut file = fs::File::create(tmp_path)?;
        if path.exists() {
            let existing = fs::read_to_string(path)?.replace('\0', "");
            file.write_all(existing.as_bytes())?;
        }
        if add_gap {
            file.write_all(b"\n")?;
        }
        file.write_all(content.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    fs::rename(tmp_path, path)
}

/// Best-effort non-atomic fallback into `{file}.overflow.N`.
fn write_overflow(path: &Path, content: &str, add_gap: bool) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("entries");
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let parent = parent.unwrap_or_else(|| Path::new("."));

    let mut n = 1u32;
    let overflow_path = loop {
        let candidate = parent.join(format!("{file_name}.overflow.{n}"));
        match fs::metadata(&candidate) {
            Err(_) => break candidate,
            Ok(meta) if meta.len() < OVERFLOW_SIZE_CEILING => break candidate,
            Ok(_) => {
                n += 1;
                if n > OVERFLOW_MAX_FILES {
                    tracing::warn!(
                        path = %path.display(),
                        "too many overflow files, entry dropped"
                    );
                    return Err(SesslogError::EntryLost {
                        path: path.to_path_buf(),
                    });
                }
            }
        }
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&overflow_path)?;
    if add_gap {
        file.write_all(b"\n")?;
    }
    file.write_all(content.as_bytes())?;
    file.write_all(b"\n")?;

    tracing::debug!(overflow = %overflow_path.display(), "entry written to overflow");
    Ok(())
}

/// Decides whether a blank-line gap should precede the next entry.
///
/// Parses the trailing `[[...]]` timestamp of the file's last line; a gap is
/// inserted when the elapsed time meets the threshold. Any parse failure
/// means no gap, as does [`TimestampMode::Omit`].
pub fn needs_time_gap(
    path: &Path,
    mode: TimestampMode,
    event_time: NaiveDateTime,
    gap_secs: i64,
) -> bool {
    if mode == TimestampMode::Omit {
        return false;
    }

    let Ok(content) = fs::read_to_string(path) else {
        return false;
    };
    let Some(last_line) = content.lines().last() else {
        return false;
    };
    let Some(stamp) = extract_stamp(last_line) else {
        return false;
    };
    let Some(last_time) = parse_stamp(stamp) else {
        return false;
    };

    (event_time - last_time).num_seconds() >= gap_secs
}

fn extract_stamp(line: &str) -> Option<&str> {
    let start = line.find("[[")? + 2;
    let end = line[start..].find("]]")? + start;
    Some(&line[start..end])
}

/// Parses a timestamp in either of the writer's two supported formats.
pub fn parse_stamp(stamp: &str) -> Option<NaiveDateTime> {
    if let Ok(full) = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT_FULL) {
        return Some(full);
    }
    NaiveDate::parse_from_str(stamp, STAMP_FORMAT_DATE)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
