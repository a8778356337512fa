//! # Summary Unit Tests / 摘要单元测试
//!
//! Tests for summary assembly: totals, percentages, the module table and the
//! performance buckets.
//!
//! 摘要组装的测试：总数、百分比、模块表和性能分组。

use chrono::{Duration, Local};
use std::collections::BTreeMap;

use row_runner::core::models::{ExecutionState, ModuleStats, Status, TestExecution};
use row_runner::reporting::summary::{RunMetadata, build_summary, percent, performance_metrics};

fn execution(id: &str, status: Status, millis: Option<i64>) -> TestExecution {
    let mut execution = TestExecution::new("Login", "S1", id, "", status);
    if let Some(ms) = millis {
        execution.ended_at = Some(execution.started_at + Duration::milliseconds(ms));
        execution.state = ExecutionState::Complete;
    }
    execution
}

#[test]
fn test_percent_formats_two_decimals() {
    assert_eq!(percent(0, 0), "0.00");
    assert_eq!(percent(1, 3), "33.33");
    assert_eq!(percent(2, 3), "66.67");
    assert_eq!(percent(4, 4), "100.00");
}

#[test]
fn test_empty_run_has_zero_percentages() {
    let summary = build_summary(&[], &BTreeMap::new(), RunMetadata::default());
    assert_eq!(summary.total_tests, 0);
    assert_eq!(summary.pass_percentage, "0.00");
    assert_eq!(summary.fail_percentage, "0.00");
    assert_eq!(summary.skip_percentage, "0.00");
    assert!(summary.per_module.is_empty());
    assert_eq!(summary.metrics.timed_executions, 0);
    assert!(!summary.has_failures());
}

#[test]
fn test_totals_and_module_table() {
    let executions = vec![
        execution("Login_01", Status::Pass, Some(10)),
        execution("Login_02", Status::Fail, Some(10)),
        execution("Login_03", Status::Pass, Some(10)),
        execution("Login_04", Status::Skipped, Some(0)),
    ];
    let mut modules = BTreeMap::new();
    modules.insert("Login".to_string(), ModuleStats { passed: 2, failed: 1, skipped: 1 });
    modules.insert("Cart".to_string(), ModuleStats::default());

    let summary = build_summary(&executions, &modules, RunMetadata::default());
    assert_eq!(summary.total_tests, 4);
    assert_eq!((summary.passed, summary.failed, summary.skipped), (2, 1, 1));
    assert_eq!(summary.pass_percentage, "50.00");
    assert_eq!(summary.fail_percentage, "25.00");
    assert_eq!(summary.skip_percentage, "25.00");
    assert!(summary.has_failures());

    let modules: Vec<_> = summary.per_module.iter().map(|m| m.module.as_str()).collect();
    assert_eq!(modules, vec!["Cart", "Login"]);
    assert_eq!(summary.per_module[0].success_rate, "0.00");
    assert_eq!(summary.per_module[1].total, 4);
    assert_eq!(summary.per_module[1].success_rate, "50.00");
}

#[test]
fn test_open_executions_are_marked_incomplete() {
    let executions = vec![execution("Login_01", Status::Pass, None)];
    let summary = build_summary(&executions, &BTreeMap::new(), RunMetadata::default());
    assert!(summary.per_test[0].incomplete);
    assert_eq!(summary.per_test[0].duration_ms, None);
    assert_eq!(summary.metrics.timed_executions, 0);
    assert_eq!(summary.metrics.pass_rate, "100.00");
}

#[test]
fn test_performance_buckets() {
    let executions = vec![
        execution("A_1", Status::Pass, Some(50)),
        execution("A_2", Status::Pass, Some(100)),
        execution("A_3", Status::Fail, Some(500)),
        execution("A_4", Status::Pass, Some(900)),
        execution("A_5", Status::Pass, None),
    ];
    let metrics = performance_metrics(&executions);
    assert_eq!(metrics.timed_executions, 4);
    assert_eq!((metrics.fast, metrics.medium, metrics.slow), (1, 2, 1));
    assert_eq!(metrics.min_ms, 50);
    assert_eq!(metrics.max_ms, 900);
    assert!((metrics.average_ms - 387.5).abs() < f64::EPSILON);
    assert_eq!(metrics.pass_rate, "80.00");
}

#[test]
fn test_summary_is_deterministic() {
    let started = Local::now();
    let meta = RunMetadata { started_at: started, ..RunMetadata::default() };
    let executions = vec![execution("Login_01", Status::Fail, Some(20))];
    let a = serde_json::to_string(&build_summary(&executions, &BTreeMap::new(), meta.clone())).unwrap();
    let b = serde_json::to_string(&build_summary(&executions, &BTreeMap::new(), meta)).unwrap();
    assert_eq!(a, b);
}
