use crate::harness::Scenario;

#[test]
fn test_allow_list_excludes_other_categories() {
    Scenario::new("allow_list")
        .configure(|config| config.filter_include = vec!["bash".to_string()])
        .agent_uses("Read", serde_json::json!({"file_path": "/tmp/a.rs"}))
        // The filtered event left session state but wrote no log files
        .assert_dir_named(None)
        .assert_no_log("sesslog")
        .agent_runs("ls")
        .assert_log_contains("sesslog", "{Bash: ls }")
        .assert_log_count("sesslog", "Read", 0)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_todo_logs_action_only_by_default() {
    Scenario::new("todo_action_only")
        .agent_uses(
            "TodoWrite",
            serde_json::json!({"todos": [{"content": "write docs", "status": "pending"}]}),
        )
        .assert_log_contains("sesslog", "{TodoWrite }")
        .assert_log_count("sesslog", "write docs", 0)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_task_events_build_task_history() {
    Scenario::new("task_history")
        .agent_uses("TaskCreate", serde_json::json!({"subject": "fix login"}))
        .agent_uses(
            "TaskUpdate",
            serde_json::json!({"taskId": "1", "status": "done"}),
        )
        .assert_log_contains("tasks", "CREATE fix login")
        .assert_log_contains("tasks", "UPDATE 1 -> done")
        .assert_log_count("shell", "CREATE", 0)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_failure_capture_writes_failed_entries() {
    Scenario::new("failure_capture")
        .configure(|config| config.failure_capture.enabled = true)
        .agent_runs_failing("cargo test", "running 3 tests\nerror: assertion failed\n")
        .assert_log_contains("sesslog", "[FAILED: cargo test]")
        .assert_log_contains("sesslog", "    error: assertion failed")
        .assert_log_contains("shell", "[FAILED: cargo test]")
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_pwd_suffix_when_enabled() {
    Scenario::new("pwd_suffix")
        .configure(|config| config.pwd_enabled = true)
        .agent_runs("ls")
        .assert_log_contains("sesslog", "{Bash: ls } [\"/home/alice/project\"]")
        .run()
        .expect("scenario should pass");
}
