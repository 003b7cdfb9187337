//! Tool-use event model and the fixed acknowledgment.
//!
//! One JSON object arrives per invocation on stdin. The schema is owned by
//! the upstream runtime; every field is optional here so a partial payload
//! still yields a usable event.

use crate::error::{Result, SesslogError};
use serde::{Deserialize, Serialize};

/// A single tool-use event as delivered by the upstream runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolEvent {
    /// Kind of event (`PostToolUse`, `PreToolUse`, `SessionStart`, `Stop`, ...).
    #[serde(default = "default_event_kind")]
    pub hook_event_name: String,

    /// Stable opaque session key.
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// Path to the session transcript, if the runtime provides one.
    #[serde(default)]
    pub transcript_path: String,

    /// Working directory at the time of the event.
    #[serde(default)]
    pub cwd: String,

    /// Name of the tool that was invoked.
    #[serde(default)]
    pub tool_name: String,

    /// Opaque tool-input payload.
    #[serde(default)]
    pub tool_input: serde_json::Value,

    /// Free-text description the runtime attached to the invocation.
    #[serde(default)]
    pub tool_description: String,

    /// Opaque tool-response payload (present on post-use events).
    #[serde(default)]
    pub tool_response: serde_json::Value,
}

fn default_event_kind() -> String {
    "PostToolUse".to_string()
}

fn default_session_id() -> String {
    "unknown".to_string()
}

impl ToolEvent {
    /// Parses an event from a raw JSON string.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| SesslogError::MalformedEvent(e.to_string()))
    }

    /// Returns true for events that carry a tool invocation to be logged.
    pub fn is_tool_event(&self) -> bool {
        matches!(
            self.hook_event_name.as_str(),
            "PostToolUse" | "PreToolUse" | "PostToolUseFailure"
        )
    }

    /// Returns true for the session-start lifecycle event.
    pub fn is_session_start(&self) -> bool {
        self.hook_event_name == "SessionStart"
    }
}

/// The minimal acknowledgment emitted on stdout in all cases.
///
/// The upstream treats a non-acknowledging logger as a reason to disrupt the
/// workflow it observes, so this must go out on every path.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Ack {
    #[serde(rename = "continue")]
    proceed: bool,
}

impl Ack {
    /// The standard success acknowledgment.
    pub fn ok() -> Self {
        Self { proceed: true }
    }

    /// Serializes the acknowledgment to a single JSON line.
    pub fn to_json(self) -> String {
        serde_json::to_string(&self).unwrap_or_else(|_| r#"{"continue":true}"#.to_string())
    }
}

/// Fixed category a tool maps to, used for filtering and per-category config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ToolCategory {
    /// Shell command execution.
    Bash,
    /// File writes and edits.
    Io,
    /// Todo-list updates.
    Todo,
    /// Task management tools.
    Task,
    /// Read-only file system queries.
    System,
    /// Sub-agent dispatch.
    Meta,
    /// Web search and fetch.
    Search,
    /// User interaction tools.
    Ui,
    /// Skill invocations.
    Skill,
    /// MCP server tools (`mcp__server__tool`).
    Mcp,
    /// Anything not in the fixed map.
    Other,
}

impl ToolCategory {
    /// Stable lowercase name used in config files and filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Io => "io",
            Self::Todo => "todo",
            Self::Task => "task",
            Self::System => "system",
            Self::Meta => "meta",
            Self::Search => "search",
            Self::Ui => "ui",
            Self::Skill => "skill",
            Self::Mcp => "mcp",
            Self::Other => "other",
        }
    }
}

/// Maps a tool name to its category.
pub fn categorize(tool_name: &str) -> ToolCategory {
    if tool_name.starts_with("mcp__") {
        return ToolCategory::Mcp;
    }

    match tool_name {
        "Bash" => ToolCategory::Bash,
        "LS" | "Glob" | "Grep" | "Read" => ToolCategory::System,
        "Write" | "Edit" | "MultiEdit" | "NotebookEdit" => ToolCategory::Io,
        "TodoWrite" => ToolCategory::Todo,
        "TaskCreate" | "TaskUpdate" | "TaskList" | "TaskGet" => ToolCategory::Task,
        "Task" => ToolCategory::Meta,
        "WebSearch" | "WebFetch" => ToolCategory::Search,
        "AskUserQuestion" => ToolCategory::Ui,
        "Skill" => ToolCategory::Skill,
        _ => {
            tracing::debug!(tool = tool_name, "unknown tool, categorizing as other");
            ToolCategory::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_event() {
        let raw = r#"{
            "hook_event_name": "PostToolUse",
            "session_id": "abc-123",
            "transcript_path": "/tmp/t.jsonl",
            "cwd": "/home/alice/project",
            "tool_name": "Bash",
            "tool_input": {"command": "ls -la"}
        }"#;

        let event = ToolEvent::from_json_str(raw).unwrap();
        assert_eq!(event.session_id, "abc-123");
        assert_eq!(event.tool_name, "Bash");
        assert!(event.is_tool_event());
        assert!(!event.is_session_start());
    }

    #[test]
    fn test_parse_minimal_event_uses_defaults() {
        let event = ToolEvent::from_json_str("{}").unwrap();
        assert_eq!(event.hook_event_name, "PostToolUse");
        assert_eq!(event.session_id, "unknown");
        assert!(event.transcript_path.is_empty());
    }

    #[test]
    fn test_malformed_event_is_an_error() {
        let result = ToolEvent::from_json_str("{not json");
        assert!(matches!(
            result,
            Err(crate::SesslogError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_session_start_is_not_a_tool_event() {
        let event =
            ToolEvent::from_json_str(r#"{"hook_event_name": "SessionStart"}"#).unwrap();
        assert!(event.is_session_start());
        assert!(!event.is_tool_event());
    }

    #[test]
    fn test_ack_shape() {
        assert_eq!(Ack::ok().to_json(), r#"{"continue":true}"#);
    }

    #[test]
    fn test_categorize_known_tools() {
        assert_eq!(categorize("Bash"), ToolCategory::Bash);
        assert_eq!(categorize("Read"), ToolCategory::System);
        assert_eq!(categorize("Edit"), ToolCategory::Io);
        assert_eq!(categorize("TaskUpdate"), ToolCategory::Task);
        assert_eq!(categorize("TodoWrite"), ToolCategory::Todo);
    }

    #[test]
    fn test_categorize_mcp_and_unknown() {
        assert_eq!(categorize("mcp__files__read"), ToolCategory::Mcp);
        assert_eq!(categorize("SomethingNew"), ToolCategory::Other);
    }
}
