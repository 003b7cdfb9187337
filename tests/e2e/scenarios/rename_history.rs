use crate::harness::Scenario;
use anyhow::ensure;

#[test]
fn test_unnamed_session_uses_bare_layout() {
    Scenario::new("unnamed_layout")
        .agent_runs("ls -la")
        .assert_dir_named(None)
        .assert_log_contains("sesslog", "{Bash: ls -la }")
        .assert_log_contains("shell", "ls -la")
        .then(|world| {
            let files = world.ws.session_files(&world.session_id)?;
            ensure!(
                files.contains(&".sesslog_bash_abc-123_alice.log".to_string()),
                "unexpected layout: {files:?}"
            );
            Ok(())
        })
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_rename_preserves_history() {
    Scenario::new("rename_preserves_history")
        .agent_runs("cargo build")
        .runtime_renames("fix-auth")
        .agent_runs("cargo test")
        .assert_dir_named(Some("fix-auth"))
        .assert_log_count("sesslog", "{Bash: cargo build }", 1)
        .assert_log_count("sesslog", "{Bash: cargo test }", 1)
        .then(|world| {
            let files = world.ws.session_files(&world.session_id)?;
            ensure!(
                files.contains(&".sesslog_bash__fix-auth__abc-123_alice.log".to_string()),
                "unified log not renamed: {files:?}"
            );
            ensure!(
                files.contains(&".shell_bash__fix-auth__abc-123_alice.log".to_string()),
                "shell log not renamed: {files:?}"
            );
            Ok(())
        })
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_second_rename_cascades_again() {
    Scenario::new("second_rename")
        .agent_runs("one")
        .runtime_renames("fix-auth")
        .agent_runs("two")
        .runtime_renames("fix-tests")
        .agent_runs("three")
        .assert_dir_named(Some("fix-tests"))
        .assert_log_count("sesslog", "{Bash: one }", 1)
        .assert_log_count("sesslog", "{Bash: two }", 1)
        .assert_log_count("sesslog", "{Bash: three }", 1)
        .then(|world| {
            let files = world.ws.session_files(&world.session_id)?;
            ensure!(
                files.contains(&".sesslog_bash__fix-tests__abc-123_alice.log".to_string()),
                "unified log not renamed twice: {files:?}"
            );
            Ok(())
        })
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_index_rename_applies_when_transcript_silent() {
    Scenario::new("index_rename")
        .agent_runs("one")
        .index_names("from-index")
        .agent_runs("two")
        .assert_dir_named(Some("from-index"))
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_transcript_beats_index() {
    Scenario::new("transcript_beats_index")
        .index_names("from-index")
        .runtime_renames("from-transcript")
        .agent_runs("one")
        .assert_dir_named(Some("from-transcript"))
        .run()
        .expect("scenario should pass");
}
