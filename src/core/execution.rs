//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! This module runs one suite case end to end: it opens the case's execution
//! scope (binding the data row), runs the test command with timeout and
//! retries, feeds the step lines the command prints into the step tracker,
//! and settles the case's test execution when the command is done.
//!
//! A test command reports a step by printing one line:
//!
//! ```text
//! ##step {"action": "Open login page", "expected": "Page shown", "actual": "Page shown", "status": "PASS"}
//! ```
//!
//! 此模块端到端地运行一个套件用例：打开用例的执行作用域（绑定数据行），
//! 在超时和重试控制下运行测试命令，将命令打印的步骤行送入步骤跟踪器，
//! 并在命令结束后结算该用例的测试执行。

use colored::*;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::core::config::{SuiteCase, SuiteConfig};
use crate::core::context::{ExecutionContext, ExecutionScope};
use crate::core::data::TabularDataSource;
use crate::core::models::{CaseResult, FailureReason, Status, StepRecord, module_name_for};
use crate::core::tracker::StepTracker;
use crate::infra::{command, t};

/// Prefix of a step line in a test command's output.
pub const STEP_PREFIX: &str = "##step ";

/// A step as printed by a test command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportedStep {
    pub action: String,
    pub expected: String,
    #[serde(default)]
    pub actual: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub step: Option<u32>,
    #[serde(default)]
    pub evidence: Option<String>,
}

/// Parses a `##step {json}` line. Other lines yield `None`; malformed step
/// lines are logged and yield `None` as well.
pub fn parse_step_line(line: &str) -> Option<ReportedStep> {
    let payload = line.trim_start().strip_prefix(STEP_PREFIX)?;
    match serde_json::from_str::<ReportedStep>(payload) {
        Ok(step) => Some(step),
        Err(e) => {
            warn!(line, "malformed step line: {e}");
            None
        }
    }
}

/// Environment variable name under which a data-row cell is exported.
///
/// `User Name` becomes `ROW_USER_NAME`.
pub fn row_env_key(header: &str) -> String {
    let key: String = header
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("ROW_{key}")
}

enum Attempt {
    Exited { success: bool, code: String, output: String },
    TimedOut { timeout: Duration },
    SpawnFailed(String),
}

/// Runs suite cases against a shared tracker and data source.
pub struct CaseRunner {
    tracker: Arc<StepTracker>,
    data: Arc<dyn TabularDataSource>,
    suite: Arc<SuiteConfig>,
    project_root: PathBuf,
}

impl CaseRunner {
    pub fn new(
        tracker: Arc<StepTracker>,
        data: Arc<dyn TabularDataSource>,
        suite: Arc<SuiteConfig>,
        project_root: PathBuf,
    ) -> Self {
        Self {
            tracker,
            data,
            suite,
            project_root,
        }
    }

    pub fn tracker(&self) -> &Arc<StepTracker> {
        &self.tracker
    }

    /// The main entry point for running a single case.
    ///
    /// A case whose method has no data row fails without running. Failed
    /// attempts are retried up to the case's retry count unless the attempt
    /// timed out, recorded a failing step, or already completed its
    /// execution; later attempts feed the same test execution, so steps seen
    /// before are suppressed as duplicates. Once the execution has completed
    /// as PASS, a failing command no longer changes the verdict.
    pub async fn run_case(&self, case: SuiteCase) -> CaseResult {
        let start = Instant::now();
        let module = module_name_for(&case.name);
        let browser = self.suite.browser_for(&case).to_string();
        let ctx = ExecutionContext::new(&case.application, &case.sheet, &case.name, &browser);

        let scope = match ExecutionScope::begin(ctx, Arc::clone(&self.data)) {
            Ok(scope) => scope,
            Err(e) => {
                println!("{}", t!("run.row_not_found", name = &case.name, sheet = &case.sheet).red());
                let message = e.to_string();
                self.tracker
                    .add_test_execution(&module, &case.scenario, &case.name, &message, Status::Fail);
                return CaseResult::Failed {
                    name: case.name,
                    output: message,
                    reason: FailureReason::MissingDataRow,
                    duration: start.elapsed(),
                };
            }
        };

        let Some(command_line) = self.suite.command_for(&case) else {
            let message = format!("no command configured for case '{}'", case.name);
            self.tracker
                .add_test_execution(&module, &case.scenario, &case.name, &message, Status::Fail);
            return CaseResult::Failed {
                name: case.name,
                output: message,
                reason: FailureReason::Spawn,
                duration: start.elapsed(),
            };
        };

        println!("{}", t!("run.running_test", name = &case.name).blue());

        let retries = self.suite.retries_for(&case);
        let max_attempts = u32::from(retries) + 1;
        let mut attempt_no = 1u32;
        let attempt = loop {
            let attempt = self.run_attempt(&scope, &case, &command_line).await;
            let retryable = match &attempt {
                Attempt::Exited { success, .. } => !success,
                Attempt::SpawnFailed(_) => true,
                Attempt::TimedOut { .. } => false,
            };
            let settled = self
                .tracker
                .get(&case.name)
                .is_some_and(|e| e.status == Status::Fail || e.is_complete());

            if !retryable || settled || attempt_no >= max_attempts {
                break attempt;
            }
            println!(
                "{}",
                t!("run.test_retrying", name = &case.name, attempt = attempt_no, retries = retries)
                    .yellow()
            );
            attempt_no += 1;
        };
        scope.end();

        self.settle(case, module, attempt, attempt_no, start.elapsed())
    }

    async fn run_attempt(&self, scope: &ExecutionScope, case: &SuiteCase, command_line: &str) -> Attempt {
        let (mut cmd, expanded) = match command::build_command(command_line, &self.project_root) {
            Ok(built) => built,
            Err(e) => return Attempt::SpawnFailed(format!("{e:#}")),
        };
        for (header, value) in scope.row_record() {
            cmd.env(row_env_key(&header), value);
        }
        cmd.env("ROW_RUNNER_METHOD", scope.method())
            .env("ROW_RUNNER_SHEET", scope.sheet())
            .env("ROW_RUNNER_ROW", scope.row().unwrap_or_default().to_string())
            .env("ROW_RUNNER_BROWSER", scope.browser())
            .env("ROW_RUNNER_APPLICATION", scope.application());
        debug!(case = %case.name, command = %expanded, "spawning test command");

        let run = command::spawn_and_capture(cmd, |line| {
            let Some(reported) = parse_step_line(line) else {
                return;
            };
            let outcome = self.tracker.record_step(self.step_record(case, reported), scope.evidence());
            debug!(case = %case.name, ?outcome, "step recorded");
        });

        let (status, output) = match case.timeout_secs.map(Duration::from_secs) {
            Some(timeout) => match tokio::time::timeout(timeout, run).await {
                Ok(finished) => finished,
                Err(_) => {
                    println!(
                        "{}",
                        t!("run.test_timeout", name = &case.name, timeout = timeout.as_secs()).red()
                    );
                    return Attempt::TimedOut { timeout };
                }
            },
            None => run.await,
        };

        let output = format!("{} {expanded}\n{output}", t!("run.command_prefix"));
        match status {
            Ok(status) => Attempt::Exited {
                success: status.success(),
                code: status.to_string(),
                output,
            },
            Err(e) => Attempt::SpawnFailed(format!("{e}\n{output}")),
        }
    }

    fn step_record(&self, case: &SuiteCase, reported: ReportedStep) -> StepRecord {
        let status = match reported.status.as_deref().map(str::parse::<Status>) {
            None => Status::Pass,
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                warn!(case = %case.name, "{e}; recording the step as FAIL");
                Status::Fail
            }
        };
        let mut record = StepRecord::new(&case.name, reported.action, reported.expected)
            .scenario(&case.scenario)
            .description(&case.description)
            .actual(reported.actual)
            .status(status)
            .expected_total(case.expected_steps);
        if let Some(step) = reported.step {
            record = record.step(step);
        }
        if let Some(evidence) = reported.evidence {
            record = record.evidence(evidence);
        }
        record
    }

    /// Closes the case's test execution and turns the last attempt into a result.
    fn settle(
        &self,
        case: SuiteCase,
        module: String,
        attempt: Attempt,
        attempts: u32,
        duration: Duration,
    ) -> CaseResult {
        let (mut failure, output) = match attempt {
            Attempt::Exited { success: true, output, .. } => (None, output),
            Attempt::Exited { code, output, .. } => {
                (Some((FailureReason::CommandFailed, code)), output)
            }
            Attempt::TimedOut { timeout } => {
                let message = t!("run.test_timeout_message", timeout = timeout.as_secs()).to_string();
                (Some((FailureReason::Timeout, message.clone())), message)
            }
            Attempt::SpawnFailed(message) => (Some((FailureReason::Spawn, message.clone())), message),
        };

        // Only steps the test itself reported count toward StepFailed.
        let execution = self.tracker.get(&case.name);
        let step_failed = execution.as_ref().is_some_and(|e| e.first_failure().is_some());

        // A completed PASS is already committed to the module stats and
        // stays the verdict; later trouble with the command is only logged.
        if execution.as_ref().is_some_and(|e| e.is_complete() && e.status == Status::Pass) {
            if let Some((reason, actual)) = failure.take() {
                warn!(case = %case.name, ?reason, %actual, "command failed after its execution completed as PASS");
            }
        }

        match execution {
            None => {
                let (status, description) = match &failure {
                    Some((_, actual)) => (Status::Fail, actual.clone()),
                    None => (Status::Pass, case.description.clone()),
                };
                self.tracker
                    .add_test_execution(&module, &case.scenario, &case.name, &description, status);
            }
            Some(execution) => {
                if let Some((_, actual)) = &failure {
                    if execution.status != Status::Fail && !execution.is_complete() {
                        let record = StepRecord::new(&case.name, "Test command", "exit status 0")
                            .actual(actual)
                            .status(Status::Fail);
                        self.tracker.record_step(record, None);
                    }
                }
                self.tracker.finalize(&case.name);
            }
        }

        let reason = match failure {
            Some((FailureReason::Timeout, _)) => Some(FailureReason::Timeout),
            Some((FailureReason::Spawn, _)) => Some(FailureReason::Spawn),
            _ if step_failed => Some(FailureReason::StepFailed),
            Some((reason, _)) => Some(reason),
            None => None,
        };

        let secs = duration.as_secs_f64().to_string();
        match reason {
            None => {
                if attempts > 1 {
                    println!(
                        "{}",
                        t!("run.test_passed_on_retry", name = &case.name, retries = attempts - 1).green()
                    );
                } else {
                    println!("{}", t!("run.test_passed", name = &case.name, duration = &secs).green());
                }
                CaseResult::Passed {
                    name: case.name,
                    duration,
                    attempts,
                }
            }
            Some(reason) => {
                if attempts > 1 {
                    println!(
                        "{}",
                        t!("run.test_failed_after_retries", name = &case.name, retries = attempts - 1).red()
                    );
                } else {
                    println!("{}", t!("run.test_failed", name = &case.name, duration = &secs).red());
                }
                CaseResult::Failed {
                    name: case.name,
                    output,
                    reason,
                    duration,
                }
            }
        }
    }
}
