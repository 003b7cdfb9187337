use crate::harness::Scenario;

#[test]
fn test_single_marker_per_run() {
    Scenario::new("single_marker_per_run")
        .agent_runs("one")
        .agent_runs("two")
        .agent_runs("three")
        .assert_log_count("sesslog", "Run #", 1)
        .assert_log_count("shell", "Run #", 1)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_restart_opens_next_run_and_auto_names() {
    Scenario::new("restart_next_run")
        .agent_runs("one")
        .session_starts("/home/alice/widget")
        .agent_runs("two")
        // The restart both bumped the run number and auto-named the
        // previously unnamed session from its working directory
        .assert_dir_named(Some("widget"))
        .assert_log_count("sesslog", "Run #1", 1)
        .assert_log_count("sesslog", "Run #2", 1)
        .assert_log_contains("sesslog", "widget")
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_run_number_recovers_after_state_loss() {
    Scenario::new("run_number_recovery")
        .agent_runs("one")
        .state_lost()
        .agent_runs("two")
        .assert_log_count("sesslog", "Run #1", 1)
        .assert_log_count("sesslog", "Run #2", 1)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_tasks_log_carries_no_markers() {
    Scenario::new("tasks_without_markers")
        .agent_uses("TaskCreate", serde_json::json!({"subject": "fix login"}))
        .assert_log_contains("tasks", "CREATE fix login")
        .assert_log_count("tasks", "Run #", 0)
        .assert_log_count("sesslog", "Run #", 1)
        .run()
        .expect("scenario should pass");
}
