//! Pure naming functions for session directories and log files.
//!
//! Naming convention:
//!
//! - directory, named:    `{name}__{session_id}_{username}`
//! - directory, unnamed:  `__{session_id}_{username}`
//! - file, unnamed:       `.{prefix}{tag}_{shell}_{session_id}_{username}.log`
//! - file, named:         `.{prefix}{tag}_{shell}__{name}__{session_id}_{username}.log`
//! - file, superseded:    `.{prefix}{tag}_{shell}__{name}--NNN__{session_id}_{username}.log`
//!
//! `--NNN` is a three-digit sequence number marking a prior naming epoch.

/// Separator between the human name and the session id.
pub const NAME_SEPARATOR: &str = "__";

/// Separator before the sequence number of a superseded file.
pub const SEQUENCE_SEPARATOR: &str = "--";

/// Maximum length of a sanitized session name.
pub const MAX_NAME_LEN: usize = 50;

/// Stable identity of a session, used for all naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Stable opaque session key; never changes.
    pub session_id: String,
    /// Shell kind segment embedded in filenames (injected by the caller).
    pub shell: String,
    /// Username disambiguator.
    pub username: String,
}

/// A fixed kind of log file a session maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogCategory {
    /// The unified session log (all entries).
    Unified,
    /// Raw command history.
    Shell,
    /// Task-tool history.
    Tasks,
}

impl LogCategory {
    /// All categories, in write order.
    pub const ALL: [LogCategory; 3] = [Self::Unified, Self::Shell, Self::Tasks];

    /// The filename tag for this category.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Unified => "sesslog",
            Self::Shell => "shell",
            Self::Tasks => "tasks",
        }
    }
}

/// Truncates a string to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Sanitizes a session name for filesystem safety.
///
/// Characters that are unsafe on common filesystems and control characters
/// become `_`; the result is truncated to [`MAX_NAME_LEN`] characters.
pub fn sanitize_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
            {
                '_'
            } else {
                c
            }
        })
        .collect();
    truncate_chars(&safe, MAX_NAME_LEN).to_string()
}

/// Normalizes a user-entered name into a log-friendly label.
///
/// Lowercase, spaces become `_`, path-ish separators become `-`, anything
/// else unsafe is dropped, runs of separators collapse, at most `max_words`
/// underscore-separated words survive.
pub fn slugify(name: &str, max_words: usize) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match c {
            ':' | '/' | '\\' => out.push('-'),
            c if c.is_whitespace() => out.push('_'),
            'a'..='z' | '0'..='9' | '_' | '-' => out.push(c),
            _ => {}
        }
    }

    // Collapse runs of two or more separators into a single underscore
    let mut collapsed = String::with_capacity(out.len());
    let mut chars = out.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' || c == '-' {
            let mut run_len = 1;
            while matches!(chars.peek(), Some('_') | Some('-')) {
                chars.next();
                run_len += 1;
            }
            collapsed.push(if run_len > 1 { '_' } else { c });
        } else {
            collapsed.push(c);
        }
    }
    let trimmed = collapsed.trim_matches(|c| c == '_' || c == '-');

    trimmed
        .split('_')
        .filter(|w| !w.is_empty())
        .take(max_words)
        .collect::<Vec<_>>()
        .join("_")
}

/// Builds the session directory name.
pub fn directory_name(name: Option<&str>, session_id: &str, username: &str) -> String {
    match name {
        Some(name) => format!(
            "{}{NAME_SEPARATOR}{session_id}_{username}",
            sanitize_name(name)
        ),
        None => format!("{NAME_SEPARATOR}{session_id}_{username}"),
    }
}

/// Builds a log filename with an optional name and sequence number.
///
/// A sequence number is only meaningful for named files; it is ignored for
/// unnamed ones.
pub fn file_name(
    prefix: &str,
    category: LogCategory,
    identity: &SessionIdentity,
    name: Option<&str>,
    seq: Option<u32>,
) -> String {
    let tag = category.tag();
    let SessionIdentity {
        session_id,
        shell,
        username,
    } = identity;

    match (name, seq) {
        (Some(name), Some(seq)) => format!(
            ".{prefix}{tag}_{shell}{NAME_SEPARATOR}{name}{SEQUENCE_SEPARATOR}{seq:03}{NAME_SEPARATOR}{session_id}_{username}.log"
        ),
        (Some(name), None) => format!(
            ".{prefix}{tag}_{shell}{NAME_SEPARATOR}{name}{NAME_SEPARATOR}{session_id}_{username}.log"
        ),
        (None, _) => format!(".{prefix}{tag}_{shell}_{session_id}_{username}.log"),
    }
}

/// Returns true if a filename carries a `--NNN__` sequence suffix.
pub fn has_sequence(file_name: &str) -> bool {
    sequence_of(file_name).is_some()
}

/// Extracts the sequence number from a filename, if any.
pub fn sequence_of(file_name: &str) -> Option<u32> {
    let mut search_from = 0;
    while let Some(rel) = file_name[search_from..].find(SEQUENCE_SEPARATOR) {
        let digits_start = search_from + rel + SEQUENCE_SEPARATOR.len();
        let rest = &file_name[digits_start..];
        if rest.len() > 3
            && rest[..3].bytes().all(|b| b.is_ascii_digit())
            && rest[3..].starts_with(NAME_SEPARATOR)
        {
            return rest[..3].parse().ok();
        }
        search_from = digits_start;
    }
    None
}

/// Extracts the session name embedded in a directory name, if any.
pub fn name_from_directory(dir_name: &str, session_id: &str) -> Option<String> {
    if dir_name.starts_with(NAME_SEPARATOR) {
        return None; // unnamed
    }

    let marker = format!("{NAME_SEPARATOR}{session_id}_");
    let idx = dir_name.find(&marker)?;
    let name = &dir_name[..idx];
    (!name.is_empty()).then(|| name.to_string())
}

/// Extracts the session name embedded in a log filename, if any.
///
/// Understands both current (`__{name}__{id}`) and superseded
/// (`__{name}--NNN__{id}`) forms.
pub fn name_from_file(file_name: &str, session_id: &str) -> Option<String> {
    let marker = format!("{NAME_SEPARATOR}{session_id}");
    let idx = file_name.find(&marker)?;
    let head = &file_name[..idx];

    let name_start = head.find(NAME_SEPARATOR)? + NAME_SEPARATOR.len();
    let mut name = &head[name_start..];

    if let Some(pos) = name.rfind(SEQUENCE_SEPARATOR) {
        let suffix = &name[pos + SEQUENCE_SEPARATOR.len()..];
        if suffix.len() == 3 && suffix.bytes().all(|b| b.is_ascii_digit()) {
            name = &name[..pos];
        }
    }

    (!name.is_empty()).then(|| name.to_string())
}

/// Returns true if a filename belongs to this (prefix, category) pair for
/// the given session.
pub fn matches_category(
    file_name: &str,
    prefix: &str,
    category: LogCategory,
    session_id: &str,
) -> bool {
    file_name.starts_with(&format!(".{prefix}{}_", category.tag()))
        && file_name.contains(&format!("{session_id}_"))
        && file_name.ends_with(".log")
}
