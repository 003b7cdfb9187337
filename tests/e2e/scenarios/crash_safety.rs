use crate::harness::Scenario;
use anyhow::ensure;
use std::fs;

#[test]
fn test_append_failure_lands_in_overflow() {
    Scenario::new("append_failure_overflow")
        // A directory squatting on the unified log path makes every atomic
        // append to it fail
        .then(|world| {
            let dir = world.ws.root().join("__abc-123_alice");
            fs::create_dir_all(dir.join(".sesslog_bash_abc-123_alice.log"))?;
            Ok(())
        })
        .agent_runs("echo hello")
        .then(|world| {
            let dir = world.ws.root().join("__abc-123_alice");
            let overflow =
                fs::read_to_string(dir.join(".sesslog_bash_abc-123_alice.log.overflow.1"))?;
            ensure!(
                overflow.contains("{Bash: echo hello }"),
                "entry missing from overflow:\n{overflow}"
            );
            // The squatting directory was never clobbered
            ensure!(dir.join(".sesslog_bash_abc-123_alice.log").is_dir());
            // The shell log was unaffected and took the entry normally
            let shell = world.ws.log_content(&world.session_id, "shell")?;
            ensure!(shell.contains("echo hello"));
            Ok(())
        })
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_no_temp_files_left_behind() {
    Scenario::new("no_temp_files")
        .agent_runs("one")
        .agent_runs("two")
        .agent_uses(
            "TaskCreate",
            serde_json::json!({"subject": "tidy up"}),
        )
        .then(|world| {
            let files = world.ws.session_files(&world.session_id)?;
            ensure!(
                files.iter().all(|f| !f.ends_with(".tmp")),
                "leftover temp files: {files:?}"
            );
            Ok(())
        })
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_existing_content_survives_every_append() {
    Scenario::new("content_survives_appends")
        .agent_runs("first")
        .agent_runs("second")
        .agent_runs("third")
        .assert_log_count("sesslog", "{Bash: first }", 1)
        .assert_log_count("sesslog", "{Bash: second }", 1)
        .assert_log_count("sesslog", "{Bash: third }", 1)
        .assert_log_count("sesslog", "Run #", 1)
        .run()
        .expect("scenario should pass");
}
