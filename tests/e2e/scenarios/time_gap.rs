use crate::harness::Scenario;
use anyhow::ensure;

fn blank_line_count(content: &str) -> usize {
    content.matches("\n\n").count()
}

#[test]
fn test_gap_after_long_pause() {
    Scenario::new("gap_after_long_pause")
        .agent_runs("one")
        .clock_advances(3600)
        .agent_runs("two")
        .then(|world| {
            let unified = world.ws.log_content(&world.session_id, "sesslog")?;
            ensure!(
                blank_line_count(&unified) == 1,
                "expected exactly one gap:\n{unified}"
            );
            Ok(())
        })
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_no_gap_after_short_pause() {
    Scenario::new("no_gap_after_short_pause")
        .agent_runs("one")
        .clock_advances(60)
        .agent_runs("two")
        .then(|world| {
            let unified = world.ws.log_content(&world.session_id, "sesslog")?;
            ensure!(
                blank_line_count(&unified) == 0,
                "unexpected gap:\n{unified}"
            );
            Ok(())
        })
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_no_gap_without_timestamps() {
    Scenario::new("no_gap_without_timestamps")
        .configure(|config| config.timestamp_mode = sesslog_core::TimestampMode::Omit)
        .agent_runs("one")
        .clock_advances(7200)
        .agent_runs("two")
        .then(|world| {
            let unified = world.ws.log_content(&world.session_id, "sesslog")?;
            ensure!(!unified.contains("[["), "unexpected timestamps:\n{unified}");
            ensure!(
                blank_line_count(&unified) == 0,
                "unexpected gap:\n{unified}"
            );
            Ok(())
        })
        .run()
        .expect("scenario should pass");
}
