//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the row runner.
//! It includes the step and test-execution records kept by the tracker, the
//! per-module counters, and the final per-case results produced by the runner.
//!
//! 此模块定义了整个运行器中使用的核心数据结构。
//! 它包括跟踪器保存的步骤和测试执行记录、按模块的计数器，
//! 以及运行器产生的每个用例的最终结果。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::core::error::RunnerError;
use crate::infra::t;

/// Module name used when a test name carries no `_`-separated prefix.
pub const FALLBACK_MODULE: &str = "Other";

/// Outcome of a step, and rollup outcome of a test execution.
/// 步骤的结果，以及测试执行的汇总结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Skipped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Skipped => "SKIPPED",
        }
    }

    /// Gets the appropriate CSS class for the status.
    pub fn css_class(&self) -> &'static str {
        match self {
            Status::Pass => "status-Passed",
            Status::Fail => "status-Failed",
            Status::Skipped => "status-Skipped",
        }
    }

    /// Gets the localized label of the status for display.
    /// 获取状态的本地化标签以供显示。
    pub fn label(&self, locale: &str) -> String {
        match self {
            Status::Pass => t!("report.status_passed", locale = locale).to_string(),
            Status::Fail => t!("report.status_failed", locale = locale).to_string(),
            Status::Skipped => t!("report.status_skipped", locale = locale).to_string(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PASS" | "PASSED" => Ok(Status::Pass),
            "FAIL" | "FAILED" => Ok(Status::Fail),
            "SKIP" | "SKIPPED" => Ok(Status::Skipped),
            other => Err(RunnerError::InvalidConfig(format!("unknown status '{other}'"))),
        }
    }
}

/// Lifecycle of a test execution. There is no transition out of `Complete`.
/// 测试执行的生命周期。`Complete` 状态不可再转换。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionState {
    /// Steps are still arriving. / 步骤仍在到达。
    Open,
    /// End time set and module stats committed. / 已设置结束时间并提交模块统计。
    Complete,
}

/// One recorded action/expectation/outcome unit within a test execution.
/// 测试执行中记录的一个"操作/预期/结果"单元。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based step number, stable within its execution.
    pub number: u32,
    pub action: String,
    pub expected: String,
    pub actual: String,
    pub status: Status,
    /// Screenshot identifier or path; `None` when capture failed or was not requested.
    pub evidence: Option<String>,
}

impl Step {
    /// Two steps are duplicates when they share the (action, expected) pair.
    pub fn is_duplicate_of(&self, action: &str, expected: &str) -> bool {
        self.action == action && self.expected == expected
    }
}

/// One run of one test case, as observed by the step tracker.
/// 步骤跟踪器观察到的单个测试用例的一次运行。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecution {
    pub module: String,
    pub scenario_id: String,
    /// Unique key of the execution within a run.
    pub test_case_id: String,
    pub description: String,
    pub started_at: DateTime<Local>,
    pub ended_at: Option<DateTime<Local>>,
    /// Rollup status: PASS unless any step failed. Sticky toward FAIL.
    pub status: Status,
    pub steps: Vec<Step>,
    /// Number of distinct steps that became known so far.
    pub expected_steps: u32,
    /// Largest step total announced by a step record (0 when never announced).
    pub declared_steps: u32,
    pub state: ExecutionState,
}

impl TestExecution {
    pub fn new(
        module: impl Into<String>,
        scenario_id: impl Into<String>,
        test_case_id: impl Into<String>,
        description: impl Into<String>,
        status: Status,
    ) -> Self {
        Self {
            module: module.into(),
            scenario_id: scenario_id.into(),
            test_case_id: test_case_id.into(),
            description: description.into(),
            started_at: Local::now(),
            ended_at: None,
            status,
            steps: Vec::new(),
            expected_steps: 0,
            declared_steps: 0,
            state: ExecutionState::Open,
        }
    }

    pub fn observed_steps(&self) -> u32 {
        self.steps.len() as u32
    }

    /// The step count at which this execution counts as complete.
    pub fn completion_threshold(&self) -> u32 {
        self.expected_steps.max(self.declared_steps)
    }

    pub fn is_complete(&self) -> bool {
        self.state == ExecutionState::Complete
    }

    /// Wall-clock duration, available once the execution has an end time.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }

    /// The first step recorded as FAIL, if any.
    pub fn first_failure(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == Status::Fail)
    }

    pub fn find_duplicate(&self, action: &str, expected: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.is_duplicate_of(action, expected))
    }
}

/// A step as reported by a running test, before the tracker numbers it.
///
/// Build one with [`StepRecord::new`] and the chained setters; the module is
/// derived from the test case id unless set explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub test_case_id: String,
    pub module: String,
    pub scenario_id: String,
    pub description: String,
    /// Explicit step number; the tracker never assigns less than `observed + 1`.
    pub step_hint: Option<u32>,
    pub action: String,
    pub expected: String,
    pub actual: String,
    pub status: Status,
    /// Evidence already captured by the caller.
    pub evidence: Option<String>,
    /// Total steps this test case is expected to record (0 = unknown).
    pub expected_total: u32,
}

impl StepRecord {
    pub fn new(
        test_case_id: impl Into<String>,
        action: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        let test_case_id = test_case_id.into();
        Self {
            module: module_name_for(&test_case_id),
            scenario_id: String::new(),
            description: String::new(),
            test_case_id,
            step_hint: None,
            action: action.into(),
            expected: expected.into(),
            actual: String::new(),
            status: Status::Pass,
            evidence: None,
            expected_total: 0,
        }
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn scenario(mut self, scenario_id: impl Into<String>) -> Self {
        self.scenario_id = scenario_id.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn step(mut self, number: u32) -> Self {
        self.step_hint = Some(number);
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = actual.into();
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn expected_total(mut self, total: u32) -> Self {
        self.expected_total = total;
        self
    }
}

/// Running pass/fail/skip counters of one module. `total` is always derived.
/// 单个模块的通过/失败/跳过计数。`total` 始终由计算得出。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStats {
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl ModuleStats {
    pub fn total(&self) -> u64 {
        self.passed + self.failed + self.skipped
    }
}

impl std::ops::Add for ModuleStats {
    type Output = ModuleStats;

    fn add(self, rhs: Self) -> Self::Output {
        ModuleStats {
            passed: self.passed + rhs.passed,
            failed: self.failed + rhs.failed,
            skipped: self.skipped + rhs.skipped,
        }
    }
}

/// Derives the module grouping key from a test name: the text before the
/// first `_`, or [`FALLBACK_MODULE`] when there is none (or it leads the name).
///
/// 从测试名称派生模块分组键：第一个 `_` 之前的文本；
/// 如果没有 `_`（或 `_` 位于开头），则为 [`FALLBACK_MODULE`]。
pub fn module_name_for(test_name: &str) -> String {
    match test_name.find('_') {
        Some(index) if index > 0 => test_name[..index].to_string(),
        _ => FALLBACK_MODULE.to_string(),
    }
}

/// Enumerates the possible reasons for a test case failure.
/// 枚举测试用例失败的可能原因。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum FailureReason {
    /// No data row matched the test method; the test never started.
    /// 没有与测试方法匹配的数据行；测试从未开始。
    MissingDataRow,
    /// At least one step was recorded as FAIL.
    /// 至少有一个步骤被记录为 FAIL。
    StepFailed,
    /// The test command exited unsuccessfully without a failing step.
    /// 测试命令以非成功状态退出，且没有失败的步骤。
    CommandFailed,
    /// The test exceeded its configured timeout.
    /// 测试超出了其配置的超时时间。
    Timeout,
    /// The test command could not be started.
    /// 无法启动测试命令。
    Spawn,
}

/// Represents the final result of a single suite case, as seen by the runner.
/// 表示运行器看到的单个套件用例的最终结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CaseResult {
    Passed {
        name: String,
        duration: Duration,
        /// Number of attempts it took to pass (1 means first try).
        attempts: u32,
    },
    Failed {
        name: String,
        output: String,
        reason: FailureReason,
        duration: Duration,
    },
    Skipped {
        name: String,
        reason: String,
    },
}

impl CaseResult {
    pub fn case_name(&self) -> &str {
        match self {
            CaseResult::Passed { name, .. }
            | CaseResult::Failed { name, .. }
            | CaseResult::Skipped { name, .. } => name,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CaseResult::Failed { .. })
    }

    pub fn status(&self) -> Status {
        match self {
            CaseResult::Passed { .. } => Status::Pass,
            CaseResult::Failed { .. } => Status::Fail,
            CaseResult::Skipped { .. } => Status::Skipped,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CaseResult::Failed { reason: FailureReason::Timeout, .. })
    }
}

impl fmt::Display for CaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.case_name(), self.status())
    }
}
