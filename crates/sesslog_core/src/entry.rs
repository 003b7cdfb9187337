//! Log entry rendering.
//!
//! One event becomes one line: `{timestamp}{{content }}{["pwd"]}`. The
//! content inside the braces depends on verbosity and per-tool settings;
//! extraction of a human-readable summary from the opaque tool input goes
//! through the [`ContentExtractor`] seam.

use crate::config::{ActionOnlyOverride, Config, TimestampMode};
use crate::event::{categorize, ToolEvent};
use crate::naming::truncate_chars;
use chrono::NaiveDateTime;
use serde_json::Value;

/// Longest description suffix carried into a task summary.
const TASK_DESCRIPTION_MAX: usize = 100;

/// Renders the `[[...]] ` timestamp prefix for an entry.
pub fn format_timestamp(mode: TimestampMode, t: NaiveDateTime) -> String {
    match mode {
        TimestampMode::Omit => String::new(),
        TimestampMode::DateOnly => format!("[[{}]] ", t.format("%Y-%m-%d")),
        TimestampMode::Full => format!("[[{}]] ", t.format("%Y-%m-%d %H:%M:%S")),
    }
}

/// Extracts a one-line summary from a tool invocation.
///
/// Implementations must never fail; an event they cannot summarize renders
/// as an empty string and the entry falls back to the bare tool name.
pub trait ContentExtractor {
    /// Produces the content shown inside the entry braces.
    fn extract(&self, event: &ToolEvent) -> String;
}

/// Extractor covering the upstream runtime's built-in tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExtractor;

impl ContentExtractor for DefaultExtractor {
    fn extract(&self, event: &ToolEvent) -> String {
        let input = &event.tool_input;
        match event.tool_name.as_str() {
            "Bash" => str_field(input, "command"),
            "Read" | "Write" | "Edit" | "MultiEdit" | "NotebookEdit" => {
                quoted_field(input, "file_path")
            }
            "LS" => quoted_field(input, "path"),
            "Glob" | "Grep" => str_field(input, "pattern"),
            "WebFetch" => str_field(input, "url"),
            "WebSearch" => str_field(input, "query"),
            "Task" => str_field(input, "prompt"),
            "TodoWrite" => compact_todos(input),
            "TaskCreate" | "TaskUpdate" | "TaskList" | "TaskGet" => task_content(event),
            _ => first_common_field(input),
        }
    }
}

fn str_field(input: &Value, key: &str) -> String {
    input
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn quoted_field(input: &Value, key: &str) -> String {
    let value = str_field(input, key);
    if value.is_empty() {
        value
    } else {
        format!("\"{value}\"")
    }
}

/// Fallback for tools outside the fixed map: try the common field names in
/// a stable order.
fn first_common_field(input: &Value) -> String {
    for key in ["command", "file_path", "pattern", "url", "query", "prompt", "content"] {
        let value = str_field(input, key);
        if !value.is_empty() {
            return value;
        }
    }
    String::new()
}

/// Renders a todo list as compact one-line JSON.
fn compact_todos(input: &Value) -> String {
    match input.get("todos") {
        Some(todos) => serde_json::to_string(todos).unwrap_or_default(),
        None => String::new(),
    }
}

/// Renders an id-ish JSON value (ids arrive as strings or numbers).
fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Summarizes a task-management invocation.
///
/// The response payload enriches the summary when present: the assigned id
/// on create, the previous status on update.
fn task_content(event: &ToolEvent) -> String {
    let input = &event.tool_input;
    let response = &event.tool_response;
    match event.tool_name.as_str() {
        "TaskCreate" => {
            let assigned_id = response
                .get("task")
                .and_then(|task| task.get("id"))
                .map(id_text)
                .unwrap_or_default();

            let mut out = String::from("CREATE");
            if !assigned_id.is_empty() {
                out.push_str(&format!(" #{assigned_id}"));
            }
            out.push(' ');
            out.push_str(&str_field(input, "subject"));

            let description = str_field(input, "description");
            if !description.is_empty() {
                out.push_str(" | ");
                out.push_str(truncate_chars(&description, TASK_DESCRIPTION_MAX));
            }
            out
        }
        "TaskUpdate" => {
            let id = str_field(input, "taskId");
            let status = str_field(input, "status");
            let previous = response
                .get("statusChange")
                .and_then(|change| change.get("from"))
                .and_then(Value::as_str)
                .unwrap_or_default();

            let mut out = format!("UPDATE {id}");
            if !status.is_empty() {
                if previous.is_empty() {
                    out.push_str(&format!(" -> {status}"));
                } else {
                    out.push_str(&format!(" {previous} -> {status}"));
                }
            }
            out
        }
        "TaskList" => "LIST".to_string(),
        "TaskGet" => format!("GET {}", str_field(input, "taskId")),
        _ => String::new(),
    }
}

/// Returns true if this tool renders as its bare name only.
pub fn action_only(tool_name: &str, config: &Config) -> bool {
    match config
        .action_only_overrides
        .get(tool_name)
        .copied()
        .unwrap_or_default()
    {
        ActionOnlyOverride::On => true,
        ActionOnlyOverride::Off => false,
        ActionOnlyOverride::UseCategory => {
            let category = categorize(tool_name);
            config
                .action_only
                .get(category.as_str())
                .copied()
                .unwrap_or(false)
        }
    }
}

/// Renders the full entry line for an event.
pub fn render_entry(
    event: &ToolEvent,
    config: &Config,
    extractor: &dyn ContentExtractor,
    event_time: NaiveDateTime,
) -> String {
    let stamp = format_timestamp(config.timestamp_mode, event_time);
    let content = render_content(event, config, extractor);
    let pwd = if config.pwd_enabled && !event.cwd.is_empty() {
        format!(" [\"{}\"]", event.cwd)
    } else {
        String::new()
    };

    format!("{stamp}{{{content} }}{pwd}")
}

/// The braces' interior, per verbosity and action-only settings.
fn render_content(event: &ToolEvent, config: &Config, extractor: &dyn ContentExtractor) -> String {
    if action_only(&event.tool_name, config) {
        return event.tool_name.clone();
    }

    let extracted = extractor.extract(event);
    if extracted.is_empty() {
        return event.tool_name.clone();
    }

    match config.verbosity {
        0 | 1 => extracted,
        2 => format!("{}: {extracted}", event.tool_name),
        3 => {
            if event.tool_description.is_empty() {
                format!("{}: {extracted}", event.tool_name)
            } else {
                format!("{}: {extracted}  # {}", event.tool_name, event.tool_description)
            }
        }
        _ => {
            let raw = serde_json::to_string(&event.tool_input).unwrap_or_default();
            format!("{}: {extracted}  <{raw}>", event.tool_name)
        }
    }
}
