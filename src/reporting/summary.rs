//! # Summary Assembly Module / 摘要组装模块
//!
//! Turns tracked test executions and committed module statistics into the
//! structured [`Summary`] every renderer works from. Assembly is pure: the
//! same inputs always produce the same summary.
//!
//! 将跟踪的测试执行和已提交的模块统计转换为所有渲染器使用的结构化 [`Summary`]。
//! 组装是纯函数：相同的输入总是产生相同的摘要。

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::core::models::{ModuleStats, Status, Step, TestExecution};

/// Execution-time thresholds of the performance buckets, in milliseconds.
pub const FAST_THRESHOLD_MS: i64 = 100;
pub const SLOW_THRESHOLD_MS: i64 = 500;

/// Describes the run a summary belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub project: String,
    pub environment: String,
    pub release_version: String,
    pub browser: String,
    pub started_at: DateTime<Local>,
    pub duration: Duration,
}

impl Default for RunMetadata {
    fn default() -> Self {
        Self {
            project: String::new(),
            environment: String::new(),
            release_version: String::new(),
            browser: String::new(),
            started_at: Local::now(),
            duration: Duration::ZERO,
        }
    }
}

/// One module row of the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSummary {
    pub module: String,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Passed share of the module's total, as `"%.2f"`.
    pub success_rate: String,
}

/// One test row of the summary.
#[derive(Debug, Clone, Serialize)]
pub struct TestSummary {
    pub module: String,
    pub scenario_id: String,
    pub test_case_id: String,
    pub description: String,
    pub status: Status,
    pub started_at: DateTime<Local>,
    pub duration_ms: Option<i64>,
    pub steps: Vec<Step>,
    /// The execution never completed; its status is the last-known rollup.
    pub incomplete: bool,
}

impl TestSummary {
    pub fn first_failure(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == Status::Fail)
    }
}

/// Execution-time statistics over the executions that have an end time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub timed_executions: usize,
    pub average_ms: f64,
    pub min_ms: i64,
    pub max_ms: i64,
    /// Executions faster than [`FAST_THRESHOLD_MS`].
    pub fast: usize,
    /// Executions between [`FAST_THRESHOLD_MS`] and [`SLOW_THRESHOLD_MS`], inclusive.
    pub medium: usize,
    /// Executions slower than [`SLOW_THRESHOLD_MS`].
    pub slow: usize,
    pub pass_rate: String,
}

/// The assembled summary of a run.
/// 一次运行的组装摘要。
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub meta: RunMetadata,
    pub total_tests: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub pass_percentage: String,
    pub fail_percentage: String,
    pub skip_percentage: String,
    pub per_module: Vec<ModuleSummary>,
    pub per_test: Vec<TestSummary>,
    pub metrics: PerformanceMetrics,
}

impl Summary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// `count / total * 100` with two decimals; `"0.00"` when `total` is zero.
pub fn percent(count: u64, total: u64) -> String {
    if total == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", count as f64 / total as f64 * 100.0)
}

/// Assembles the summary of a run.
///
/// Totals count the executions by rollup status. The module table comes from
/// the committed module statistics, ordered by module name.
pub fn build_summary(
    executions: &[TestExecution],
    module_stats: &BTreeMap<String, ModuleStats>,
    meta: RunMetadata,
) -> Summary {
    let count = |status: Status| executions.iter().filter(|e| e.status == status).count() as u64;
    let passed = count(Status::Pass);
    let failed = count(Status::Fail);
    let skipped = count(Status::Skipped);
    let total_tests = executions.len() as u64;

    let per_module = module_stats
        .iter()
        .map(|(module, stats)| ModuleSummary {
            module: module.clone(),
            total: stats.total(),
            passed: stats.passed,
            failed: stats.failed,
            skipped: stats.skipped,
            success_rate: percent(stats.passed, stats.total()),
        })
        .collect();

    let per_test = executions
        .iter()
        .map(|e| TestSummary {
            module: e.module.clone(),
            scenario_id: e.scenario_id.clone(),
            test_case_id: e.test_case_id.clone(),
            description: e.description.clone(),
            status: e.status,
            started_at: e.started_at,
            duration_ms: e.duration().map(|d| d.num_milliseconds()),
            steps: e.steps.clone(),
            incomplete: !e.is_complete(),
        })
        .collect();

    Summary {
        meta,
        total_tests,
        passed,
        failed,
        skipped,
        pass_percentage: percent(passed, total_tests),
        fail_percentage: percent(failed, total_tests),
        skip_percentage: percent(skipped, total_tests),
        per_module,
        per_test,
        metrics: performance_metrics(executions),
    }
}

/// Timing statistics of the executions that have an end time.
pub fn performance_metrics(executions: &[TestExecution]) -> PerformanceMetrics {
    let durations: Vec<i64> = executions
        .iter()
        .filter_map(|e| e.duration())
        .map(|d| d.num_milliseconds())
        .collect();
    let passed = executions.iter().filter(|e| e.status == Status::Pass).count() as u64;
    let pass_rate = percent(passed, executions.len() as u64);

    if durations.is_empty() {
        return PerformanceMetrics {
            pass_rate,
            ..PerformanceMetrics::default()
        };
    }

    let sum: i64 = durations.iter().sum();
    PerformanceMetrics {
        timed_executions: durations.len(),
        average_ms: sum as f64 / durations.len() as f64,
        min_ms: durations.iter().copied().min().unwrap_or_default(),
        max_ms: durations.iter().copied().max().unwrap_or_default(),
        fast: durations.iter().filter(|&&d| d < FAST_THRESHOLD_MS).count(),
        medium: durations
            .iter()
            .filter(|&&d| (FAST_THRESHOLD_MS..=SLOW_THRESHOLD_MS).contains(&d))
            .count(),
        slow: durations.iter().filter(|&&d| d > SLOW_THRESHOLD_MS).count(),
        pass_rate,
    }
}
