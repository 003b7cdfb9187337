//! The hook command: one event in on stdin, one acknowledgment out.
//!
//! The upstream runtime treats a silent or failing hook as a reason to
//! interrupt its workflow, so this command acknowledges and exits 0 on
//! every path. Failures are reported on stderr only.

use anyhow::Result;
use sesslog_core::{event_time_now, Ack, Config, Overrides, SessionLogger, ToolEvent};
use std::io::Read;
use std::path::Path;

/// Runs the hook: process stdin, acknowledge unconditionally.
pub fn run(root: &Path, overrides: &Overrides) -> Result<()> {
    if let Err(e) = process(root, overrides) {
        tracing::warn!(error = %e, "event processing failed");
    }
    println!("{}", Ack::ok().to_json());
    Ok(())
}

fn process(root: &Path, overrides: &Overrides) -> anyhow::Result<()> {
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;

    let event = ToolEvent::from_json_str(raw.trim())?;

    let mut config = Config::load(root, &event.session_id);
    config.apply_overrides(overrides);

    let shell = shell_kind();
    let username = username();
    let file_prefix = env_string("SESSLOG_PREFIX").unwrap_or_default();
    let tool_output = env_string("SESSLOG_TOOL_OUTPUT");

    SessionLogger::new(root, &config, &shell, &username, &file_prefix).process(
        &event,
        event_time_now(),
        tool_output.as_deref(),
    )?;
    Ok(())
}

/// Shell kind for filenames: the `$SHELL` leaf, never detected further.
fn shell_kind() -> String {
    env_string("SHELL")
        .and_then(|shell| {
            Path::new(&shell)
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn username() -> String {
    env_string("USER")
        .or_else(|| env_string("USERNAME"))
        .unwrap_or_else(|| "unknown".to_string())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
