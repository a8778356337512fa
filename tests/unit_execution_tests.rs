mod common;

use row_runner::core::execution::{ReportedStep, parse_step_line, row_env_key};

#[test]
fn test_parse_step_line_reads_json_payload() {
    let line = r#"##step {"action": "Open page", "expected": "Shown", "actual": "Shown", "status": "PASS", "step": 2}"#;
    let step = parse_step_line(line).unwrap();
    assert_eq!(
        step,
        ReportedStep {
            action: "Open page".into(),
            expected: "Shown".into(),
            actual: "Shown".into(),
            status: Some("PASS".into()),
            step: Some(2),
            evidence: None,
        }
    );
}

#[test]
fn test_parse_step_line_tolerates_indent_and_optional_fields() {
    let step = parse_step_line(r#"   ##step {"action": "a", "expected": "b"}"#).unwrap();
    assert_eq!(step.actual, "");
    assert_eq!(step.status, None);
}

#[test]
fn test_parse_step_line_ignores_other_output() {
    assert_eq!(parse_step_line("running 3 tests"), None);
    assert_eq!(parse_step_line("##stepper {}"), None);
    assert_eq!(parse_step_line("##step {not json"), None);
    assert_eq!(parse_step_line(r#"##step {"action": "missing expected"}"#), None);
}

#[test]
fn test_row_env_key() {
    assert_eq!(row_env_key("UserName"), "ROW_USERNAME");
    assert_eq!(row_env_key(" User Name "), "ROW_USER_NAME");
    assert_eq!(row_env_key("e-mail.address"), "ROW_E_MAIL_ADDRESS");
}

#[cfg(unix)]
mod runner_tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use row_runner::core::config::{SuiteCase, SuiteConfig};
    use row_runner::core::data::TabularDataSource;
    use row_runner::core::execution::CaseRunner;
    use row_runner::core::models::{CaseResult, FailureReason};
    use row_runner::reporting::summary::RunMetadata;
    use row_runner::{Status, StepTracker, build_summary};
    use tempfile::{TempDir, tempdir};

    use super::common::sample_workbook;

    fn step_line(action: &str, expected: &str, status: &str) -> String {
        format!(
            r#"echo '##step {{"action": "{action}", "expected": "{expected}", "actual": "{expected}", "status": "{status}"}}'"#
        )
    }

    fn write_script(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), format!("#!/bin/sh\n{body}\n")).unwrap();
    }

    fn runner(dir: &TempDir) -> CaseRunner {
        let data: Arc<dyn TabularDataSource> = Arc::new(sample_workbook());
        CaseRunner::new(
            Arc::new(StepTracker::default()),
            data,
            Arc::new(SuiteConfig::default()),
            dir.path().to_path_buf(),
        )
    }

    fn case(name: &str, script: &str, expected_steps: u32) -> SuiteCase {
        SuiteCase {
            name: name.into(),
            application: "WebApp".into(),
            sheet: "Login".into(),
            command: Some(format!("sh {script}")),
            expected_steps,
            retries: Some(0),
            ..SuiteCase::default()
        }
    }

    #[tokio::test]
    async fn test_passing_case_records_steps_and_completes() {
        let dir = tempdir().unwrap();
        write_script(
            dir.path(),
            "pass.sh",
            &[step_line("Open", "Shown", "PASS"), step_line("Login", "Welcome", "PASS")].join("\n"),
        );
        let runner = runner(&dir);

        let result = runner.run_case(case("Login_01", "pass.sh", 2)).await;
        assert!(matches!(result, CaseResult::Passed { attempts: 1, .. }));

        let execution = runner.tracker().get("Login_01").unwrap();
        assert!(execution.is_complete());
        assert_eq!(execution.status, Status::Pass);
        assert_eq!(execution.steps.len(), 2);
        assert_eq!(runner.tracker().modules().get("Login").unwrap().passed, 1);
    }

    #[tokio::test]
    async fn test_row_values_are_exported_to_the_command() {
        let dir = tempdir().unwrap();
        write_script(
            dir.path(),
            "env.sh",
            r###"if [ "$ROW_USERNAME" = "bob" ] && [ "$ROW_RUNNER_ROW" = "3" ]; then S=PASS; else S=FAIL; fi
echo "##step {\"action\": \"Check row\", \"expected\": \"bob\", \"actual\": \"$ROW_USERNAME\", \"status\": \"$S\"}""###,
        );
        let runner = runner(&dir);

        let result = runner.run_case(case("Login_02", "env.sh", 1)).await;
        assert!(matches!(result, CaseResult::Passed { .. }), "{result:?}");
        let execution = runner.tracker().get("Login_02").unwrap();
        assert_eq!(execution.steps[0].actual, "bob");
    }

    #[tokio::test]
    async fn test_failing_step_fails_the_case_without_retry() {
        let dir = tempdir().unwrap();
        write_script(
            dir.path(),
            "fail.sh",
            &[
                "echo run >> attempts.log".to_string(),
                step_line("Open", "Shown", "PASS"),
                step_line("Login", "Welcome", "FAIL"),
                step_line("Logout", "Bye", "PASS"),
            ]
            .join("\n"),
        );
        let runner = runner(&dir);
        let mut case = case("Login_01", "fail.sh", 3);
        case.retries = Some(2);

        let result = runner.run_case(case).await;
        assert!(matches!(
            result,
            CaseResult::Failed { reason: FailureReason::StepFailed, .. }
        ));
        let execution = runner.tracker().get("Login_01").unwrap();
        assert_eq!(execution.status, Status::Fail);
        assert_eq!(execution.steps.len(), 3);
        assert_eq!(fs::read_to_string(dir.path().join("attempts.log")).unwrap().lines().count(), 1);
        assert_eq!(runner.tracker().modules().get("Login").unwrap().failed, 1);
    }

    #[tokio::test]
    async fn test_command_failure_is_retried() {
        let dir = tempdir().unwrap();
        write_script(dir.path(), "broken.sh", "echo run >> attempts.log\nexit 3");
        let runner = runner(&dir);
        let mut case = case("Cart_01", "broken.sh", 0);
        case.sheet = "Cart".into();
        case.retries = Some(1);

        let result = runner.run_case(case).await;
        assert!(matches!(
            result,
            CaseResult::Failed { reason: FailureReason::CommandFailed, .. }
        ));
        assert_eq!(fs::read_to_string(dir.path().join("attempts.log")).unwrap().lines().count(), 2);

        let execution = runner.tracker().get("Cart_01").unwrap();
        assert_eq!(execution.status, Status::Fail);
        assert_eq!(execution.module, "Cart");
    }

    #[tokio::test]
    async fn test_case_passes_on_retry() {
        let dir = tempdir().unwrap();
        write_script(
            dir.path(),
            "flaky.sh",
            &format!("if [ ! -f marker ]; then touch marker; exit 1; fi\n{}", step_line("Open", "Shown", "PASS")),
        );
        let runner = runner(&dir);
        let mut case = case("Login_01", "flaky.sh", 1);
        case.retries = Some(1);

        let result = runner.run_case(case).await;
        assert!(matches!(result, CaseResult::Passed { attempts: 2, .. }), "{result:?}");
        assert_eq!(runner.tracker().get("Login_01").unwrap().status, Status::Pass);
    }

    #[tokio::test]
    async fn test_nonzero_exit_after_passing_steps_adds_failing_step() {
        let dir = tempdir().unwrap();
        write_script(
            dir.path(),
            "crash.sh",
            &format!("{}\nexit 2", step_line("Open", "Shown", "PASS")),
        );
        let runner = runner(&dir);

        let result = runner.run_case(case("Login_01", "crash.sh", 3)).await;
        assert!(result.is_failure());

        let execution = runner.tracker().get("Login_01").unwrap();
        assert!(execution.is_complete());
        assert_eq!(execution.status, Status::Fail);
        let last = execution.steps.last().unwrap();
        assert_eq!(last.action, "Test command");
        assert_eq!(last.status, Status::Fail);
    }

    #[tokio::test]
    async fn test_missing_row_fails_without_running() {
        let dir = tempdir().unwrap();
        write_script(dir.path(), "never.sh", "echo run >> attempts.log");
        let runner = runner(&dir);

        let result = runner.run_case(case("Login_77", "never.sh", 0)).await;
        assert!(matches!(
            result,
            CaseResult::Failed { reason: FailureReason::MissingDataRow, .. }
        ));
        assert!(!dir.path().join("attempts.log").exists());

        let execution = runner.tracker().get("Login_77").unwrap();
        assert_eq!(execution.status, Status::Fail);
        assert!(execution.description.contains("Login_77"));
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let dir = tempdir().unwrap();
        write_script(dir.path(), "slow.sh", "echo run >> attempts.log\nsleep 10");
        let runner = runner(&dir);
        let mut case = case("Login_02", "slow.sh", 0);
        case.timeout_secs = Some(1);
        case.retries = Some(2);

        let result = runner.run_case(case).await;
        assert!(result.is_timeout());
        assert_eq!(fs::read_to_string(dir.path().join("attempts.log")).unwrap().lines().count(), 1);
        assert_eq!(runner.tracker().get("Login_02").unwrap().status, Status::Fail);
    }

    #[tokio::test]
    async fn test_non_utf8_output_does_not_hide_later_steps() {
        let dir = tempdir().unwrap();
        write_script(
            dir.path(),
            "bytes.sh",
            &format!(
                "printf '\\377\\376\\n' >&2\nsleep 0.2\n{}",
                step_line("Login", "Welcome", "FAIL")
            ),
        );
        let runner = runner(&dir);

        let result = runner.run_case(case("Login_01", "bytes.sh", 1)).await;
        assert!(
            matches!(result, CaseResult::Failed { reason: FailureReason::StepFailed, .. }),
            "{result:?}"
        );
        let execution = runner.tracker().get("Login_01").unwrap();
        assert_eq!(execution.steps.len(), 1);
        assert_eq!(execution.status, Status::Fail);
        if let CaseResult::Failed { output, .. } = result {
            assert!(output.contains('\u{FFFD}'));
        }
    }

    #[tokio::test]
    async fn test_exit_after_completed_steps_keeps_reported_outcome() {
        let dir = tempdir().unwrap();
        write_script(
            dir.path(),
            "late_exit.sh",
            &format!("{}\nexit 2", step_line("Open", "Shown", "PASS")),
        );
        let runner = runner(&dir);

        let result = runner.run_case(case("Login_02", "late_exit.sh", 1)).await;
        assert!(matches!(result, CaseResult::Passed { attempts: 1, .. }), "{result:?}");

        let execution = runner.tracker().get("Login_02").unwrap();
        assert_eq!(execution.status, Status::Pass);
        assert_eq!(execution.steps.len(), 1);

        let summary = build_summary(
            &runner.tracker().executions(),
            &runner.tracker().modules().snapshot(),
            RunMetadata::default(),
        );
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.passed, 1);
    }

    #[tokio::test]
    async fn test_largest_retry_count_is_accepted() {
        let dir = tempdir().unwrap();
        write_script(
            dir.path(),
            "flaky.sh",
            &format!("if [ ! -f marker ]; then touch marker; exit 1; fi\n{}", step_line("Open", "Shown", "PASS")),
        );
        let runner = runner(&dir);
        let mut case = case("Login_01", "flaky.sh", 1);
        case.retries = Some(u8::MAX);

        let result = runner.run_case(case).await;
        assert!(matches!(result, CaseResult::Passed { attempts: 2, .. }), "{result:?}");
    }
}
