//! Logger configuration with layered loading.
//!
//! Precedence, lowest to highest: built-in defaults, global `config.toml`
//! under the log root, per-session `config_<session_id>.toml`, `SESSLOG_*`
//! environment variables, runtime [`Overrides`] from the command line.
//! Table values merge key by key; invalid fields fall back to their defaults
//! individually and never abort the invocation.

use crate::event::ToolCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// How entry timestamps are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampMode {
    /// No timestamp prefix at all (also disables time-gap markers).
    Omit,
    /// Date only, `[[YYYY-MM-DD]]`.
    DateOnly,
    /// Date and time, `[[YYYY-MM-DD HH:MM:SS]]`.
    #[default]
    Full,
}

impl FromStr for TimestampMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "true" | "1" | "yes" => Ok(Self::Full),
            "date" | "date_only" | "date-only" => Ok(Self::DateOnly),
            "none" | "omit" | "false" | "0" | "no" => Ok(Self::Omit),
            other => Err(format!("unknown timestamp mode: {other}")),
        }
    }
}

/// Per-tool override for action-only rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionOnlyOverride {
    /// Always render only the tool name.
    On,
    /// Always render full content.
    Off,
    /// Defer to the tool's category setting.
    #[default]
    UseCategory,
}

/// Failure-capture settings for Bash events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureCaptureConfig {
    /// Master toggle (default: off).
    pub enabled: bool,
    /// Include captured error output under the failure entry.
    pub capture_stderr: bool,
    /// Cap on captured error lines (clamped to 1..=1000).
    pub max_lines: usize,
}

impl Default for FailureCaptureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capture_stderr: true,
            max_lines: 50,
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Verbosity 0-4 (default 2: `tool: content`).
    pub verbosity: u8,

    /// Timestamp rendering mode.
    pub timestamp_mode: TimestampMode,

    /// Append the working directory to each entry.
    pub pwd_enabled: bool,

    /// Category allow-list; empty means log everything.
    pub filter_include: Vec<String>,

    /// Per-category action-only defaults (tool name instead of content).
    pub action_only: BTreeMap<String, bool>,

    /// Per-tool action-only overrides.
    pub action_only_overrides: BTreeMap<String, ActionOnlyOverride>,

    /// Failure-capture settings.
    pub failure_capture: FailureCaptureConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut action_only = BTreeMap::new();
        for category in ["io", "bash", "todo", "task", "system", "meta", "search"] {
            action_only.insert(category.to_string(), category == "todo");
        }

        let mut action_only_overrides = BTreeMap::new();
        action_only_overrides.insert("TodoWrite".to_string(), ActionOnlyOverride::UseCategory);

        Self {
            verbosity: 2,
            timestamp_mode: TimestampMode::Full,
            pwd_enabled: false,
            filter_include: Vec::new(),
            action_only,
            action_only_overrides,
            failure_capture: FailureCaptureConfig::default(),
        }
    }
}

/// Runtime overrides, applied last (highest precedence).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Override verbosity (0-4).
    pub verbosity: Option<u8>,
    /// Override timestamp mode.
    pub timestamp_mode: Option<TimestampMode>,
    /// Override working-directory display.
    pub pwd_enabled: Option<bool>,
    /// Override the category allow-list.
    pub filter_include: Option<Vec<String>>,
}

impl Config {
    /// Loads configuration for a session with full layering applied.
    ///
    /// Never fails: unreadable files and invalid fields degrade to defaults.
    pub fn load(root: &Path, session_id: &str) -> Self {
        let global = load_table(&root.join("config.toml"));
        let session = load_table(&root.join(format!("config_{session_id}.toml")));
        let merged = deep_merge(global, session);

        let mut config = Self::from_table(&merged);
        config.apply_env();
        config.clamp();
        config
    }

    /// Applies runtime overrides on top of the loaded configuration.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(v) = overrides.verbosity {
            self.verbosity = v;
        }
        if let Some(mode) = overrides.timestamp_mode {
            self.timestamp_mode = mode;
        }
        if let Some(pwd) = overrides.pwd_enabled {
            self.pwd_enabled = pwd;
        }
        if let Some(ref filter) = overrides.filter_include {
            self.filter_include = filter.clone();
        }
        self.clamp();
    }

    /// Returns true if the category passes the allow-list filter.
    pub fn allows(&self, category: ToolCategory) -> bool {
        self.filter_include.is_empty()
            || self.filter_include.iter().any(|c| c == category.as_str())
    }

    /// Builds a config from a merged TOML table, field by field.
    ///
    /// Each field that is missing or fails to parse keeps its default.
    fn from_table(table: &toml::value::Table) -> Self {
        let mut config = Self::default();

        if let Some(v) = table.get("verbosity").and_then(toml_as_u8) {
            if v <= 4 {
                config.verbosity = v;
            }
        }

        if let Some(mode) = table
            .get("timestamp_mode")
            .and_then(|v| v.as_str())
            .and_then(|s| TimestampMode::from_str(s).ok())
        {
            config.timestamp_mode = mode;
        }

        if let Some(pwd) = table.get("pwd_enabled").and_then(toml_as_bool) {
            config.pwd_enabled = pwd;
        }

        if let Some(list) = table.get("filter_include").and_then(|v| v.as_array()) {
            config.filter_include = list
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .collect();
        }

        if let Some(categories) = table.get("action_only").and_then(|v| v.as_table()) {
            for (category, value) in categories {
                if let Some(flag) = toml_as_bool(value) {
                    config.action_only.insert(category.clone(), flag);
                }
            }
        }

        if let Some(overrides) = table
            .get("action_only_overrides")
            .and_then(|v| v.as_table())
        {
            for (tool, value) in overrides {
                if let Some(parsed) = value
                    .as_str()
                    .and_then(|s| parse_action_only_override(s))
                {
                    config.action_only_overrides.insert(tool.clone(), parsed);
                }
            }
        }

        if let Some(capture) = table.get("failure_capture").and_then(|v| v.as_table()) {
            if let Some(enabled) = capture.get("enabled").and_then(toml_as_bool) {
                config.failure_capture.enabled = enabled;
            }
            if let Some(stderr) = capture.get("capture_stderr").and_then(toml_as_bool) {
                config.failure_capture.capture_stderr = stderr;
            }
            if let Some(max) = capture.get("max_lines").and_then(|v| v.as_integer()) {
                if max > 0 {
                    config.failure_capture.max_lines = max as usize;
                }
            }
        }

        config
    }

    /// Applies `SESSLOG_*` environment overrides.
    fn apply_env(&mut self) {
        if let Some(v) = env_var("SESSLOG_VERBOSITY").and_then(|s| s.parse::<u8>().ok()) {
            if v <= 4 {
                self.verbosity = v;
            }
        }
        if let Some(mode) =
            env_var("SESSLOG_TIMESTAMPS").and_then(|s| TimestampMode::from_str(&s).ok())
        {
            self.timestamp_mode = mode;
        }
        if let Some(pwd) = env_var("SESSLOG_PWD").map(|s| parse_bool(&s)) {
            self.pwd_enabled = pwd;
        }
        if let Some(filter) = env_var("SESSLOG_FILTER") {
            self.filter_include = filter
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(enabled) = env_var("SESSLOG_FAILURE_ENABLED").map(|s| parse_bool(&s)) {
            self.failure_capture.enabled = enabled;
        }
        if let Some(stderr) = env_var("SESSLOG_FAILURE_STDERR").map(|s| parse_bool(&s)) {
            self.failure_capture.capture_stderr = stderr;
        }
        if let Some(max) =
            env_var("SESSLOG_FAILURE_MAX_LINES").and_then(|s| s.parse::<usize>().ok())
        {
            self.failure_capture.max_lines = max;
        }
    }

    fn clamp(&mut self) {
        self.verbosity = self.verbosity.min(4);
        self.failure_capture.max_lines = self.failure_capture.max_lines.clamp(1, 1000);
    }
}

/// Parses a human-ish boolean ("true", "1", "yes" are true).
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn parse_action_only_override(value: &str) -> Option<ActionOnlyOverride> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Some(ActionOnlyOverride::On),
        "off" | "false" | "0" | "no" => Some(ActionOnlyOverride::Off),
        "use_category" => Some(ActionOnlyOverride::UseCategory),
        _ => None,
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn toml_as_bool(value: &toml::Value) -> Option<bool> {
    match value {
        toml::Value::Boolean(b) => Some(*b),
        toml::Value::String(s) => Some(parse_bool(s)),
        toml::Value::Integer(i) => Some(*i != 0),
        _ => None,
    }
}

fn toml_as_u8(value: &toml::Value) -> Option<u8> {
    value.as_integer().and_then(|i| u8::try_from(i).ok())
}

/// Loads a TOML table from a file, returning an empty table on any failure.
fn load_table(path: &Path) -> toml::value::Table {
    if !path.exists() {
        return toml::value::Table::new();
    }

    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str::<toml::value::Table>(&content) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config");
                toml::value::Table::new()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            toml::value::Table::new()
        }
    }
}

/// Merges `override_table` into `base`, recursing into nested tables.
fn deep_merge(
    mut base: toml::value::Table,
    override_table: toml::value::Table,
) -> toml::value::Table {
    for (key, value) in override_table {
        match (base.remove(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                base.insert(key, toml::Value::Table(deep_merge(existing, incoming)));
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
    base
}
