use super::workspace::TestWorkspace;
use anyhow::{ensure, Context, Result};
use chrono::{Duration, NaiveDateTime};
use sesslog_core::{directory_name, Config, SessionLogger, ToolEvent};

const SESSION_ID: &str = "abc-123";
const USERNAME: &str = "alice";
const SHELL: &str = "bash";

/// Mutable world a scenario's steps execute against.
pub struct World {
    pub ws: TestWorkspace,
    pub config: Config,
    pub session_id: String,
    pub clock: NaiveDateTime,
}

impl World {
    fn new() -> Result<Self> {
        Ok(Self {
            ws: TestWorkspace::new()?,
            config: Config::default(),
            session_id: SESSION_ID.to_string(),
            clock: NaiveDateTime::parse_from_str("2026-01-01 09:00:00", "%Y-%m-%d %H:%M:%S")
                .expect("valid seed time"),
        })
    }

    /// Feeds one event through the logger at the current clock.
    pub fn process(&self, event: &ToolEvent, tool_output: Option<&str>) -> Result<()> {
        SessionLogger::new(self.ws.root(), &self.config, SHELL, USERNAME, "")
            .process(event, self.clock, tool_output)?;
        Ok(())
    }

    /// Builds an event bound to this world's session and transcript.
    pub fn event(&self, kind: &str, tool: &str, input: serde_json::Value) -> Result<ToolEvent> {
        let payload = serde_json::json!({
            "hook_event_name": kind,
            "session_id": self.session_id,
            "transcript_path": self.ws.transcript().to_string_lossy(),
            "cwd": "/home/alice/project",
            "tool_name": tool,
            "tool_input": input,
        });
        Ok(ToolEvent::from_json_str(&payload.to_string())?)
    }
}

type Step = Box<dyn FnOnce(&mut World) -> Result<()>>;

/// Fluent builder for end-to-end logging scenarios.
///
/// Steps run in order against one isolated world; the first failing step
/// or assertion fails the scenario with its name attached.
pub struct Scenario {
    name: String,
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
        }
    }

    fn step(mut self, step: impl FnOnce(&mut World) -> Result<()> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Adjusts the configuration before later steps.
    pub fn configure(self, adjust: impl FnOnce(&mut Config) + 'static) -> Self {
        self.step(move |world| {
            adjust(&mut world.config);
            Ok(())
        })
    }

    /// The agent runs a shell command.
    pub fn agent_runs(self, command: &str) -> Self {
        let command = command.to_string();
        self.step(move |world| {
            let event = world.event(
                "PostToolUse",
                "Bash",
                serde_json::json!({"command": command}),
            )?;
            world.process(&event, None)
        })
    }

    /// The agent runs a shell command whose output looks like a failure.
    pub fn agent_runs_failing(self, command: &str, output: &str) -> Self {
        let command = command.to_string();
        let output = output.to_string();
        self.step(move |world| {
            let event = world.event(
                "PostToolUse",
                "Bash",
                serde_json::json!({"command": command}),
            )?;
            world.process(&event, Some(&output))
        })
    }

    /// The agent uses an arbitrary tool.
    pub fn agent_uses(self, tool: &str, input: serde_json::Value) -> Self {
        let tool = tool.to_string();
        self.step(move |world| {
            let event = world.event("PostToolUse", &tool, input)?;
            world.process(&event, None)
        })
    }

    /// A new agent process lifetime begins.
    pub fn session_starts(self, cwd: &str) -> Self {
        let cwd = cwd.to_string();
        self.step(move |world| {
            let payload = serde_json::json!({
                "hook_event_name": "SessionStart",
                "session_id": world.session_id,
                "transcript_path": world.ws.transcript().to_string_lossy(),
                "cwd": cwd,
            });
            let event = ToolEvent::from_json_str(&payload.to_string())?;
            world.process(&event, None)
        })
    }

    /// Wall-clock time passes.
    pub fn clock_advances(self, secs: i64) -> Self {
        self.step(move |world| {
            world.clock += Duration::seconds(secs);
            Ok(())
        })
    }

    /// The runtime renames the session through its transcript.
    pub fn runtime_renames(self, title: &str) -> Self {
        let title = title.to_string();
        self.step(move |world| world.ws.rename_via_transcript(&title))
    }

    /// The external session index names the session.
    pub fn index_names(self, title: &str) -> Self {
        let title = title.to_string();
        self.step(move |world| {
            let session_id = world.session_id.clone();
            world.ws.write_index(&session_id, &title)
        })
    }

    /// The persisted state area disappears (crash, cleanup, new machine).
    pub fn state_lost(self) -> Self {
        self.step(|world| world.ws.drop_state())
    }

    /// Escape hatch for one-off steps and assertions.
    pub fn then(self, f: impl FnOnce(&mut World) -> Result<()> + 'static) -> Self {
        self.step(f)
    }

    pub fn assert_dir_named(self, name: Option<&str>) -> Self {
        let name = name.map(str::to_string);
        self.step(move |world| {
            let expected = world
                .ws
                .root()
                .join(directory_name(name.as_deref(), &world.session_id, USERNAME));
            ensure!(
                expected.is_dir(),
                "expected session directory {} to exist",
                expected.display()
            );
            // And it must be the only one for this session
            world.ws.session_dir(&world.session_id)?;
            Ok(())
        })
    }

    pub fn assert_log_contains(self, tag: &str, needle: &str) -> Self {
        let (tag, needle) = (tag.to_string(), needle.to_string());
        self.step(move |world| {
            let content = world.ws.log_content(&world.session_id, &tag)?;
            ensure!(
                content.contains(&needle),
                "{tag} log does not contain {needle:?}:\n{content}"
            );
            Ok(())
        })
    }

    pub fn assert_log_count(self, tag: &str, needle: &str, expected: usize) -> Self {
        let (tag, needle) = (tag.to_string(), needle.to_string());
        self.step(move |world| {
            let content = world.ws.log_content(&world.session_id, &tag)?;
            let actual = content.matches(&needle).count();
            ensure!(
                actual == expected,
                "{tag} log has {actual} occurrences of {needle:?}, expected {expected}:\n{content}"
            );
            Ok(())
        })
    }

    pub fn assert_no_log(self, tag: &str) -> Self {
        let tag = tag.to_string();
        self.step(move |world| {
            ensure!(
                !world.ws.log_exists(&world.session_id, &tag),
                "{tag} log exists but should not"
            );
            Ok(())
        })
    }

    /// Runs all steps, attaching the scenario name to any failure.
    pub fn run(self) -> Result<()> {
        let mut world = World::new()?;
        for step in self.steps {
            step(&mut world).with_context(|| format!("scenario {:?}", self.name))?;
        }
        Ok(())
    }
}
