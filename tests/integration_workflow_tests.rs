//! # Workflow Integration Tests / 工作流集成测试
//!
//! Drives the library the way a test framework would: every worker opens an
//! execution scope for its method, records steps against the shared tracker,
//! and the run ends with an assembled summary.
//!
//! 以测试框架的方式驱动库：每个工作线程为其方法打开执行作用域，
//! 向共享跟踪器记录步骤，运行结束时组装摘要。

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use row_runner::core::context::{ExecutionContext, ExecutionScope};
use row_runner::core::data::TabularDataSource;
use row_runner::reporting::summary::RunMetadata;
use row_runner::{ModuleAggregator, ModuleStats, Status, StepRecord, StepTracker, build_summary};

use common::{FakeDriver, sample_workbook};

/// One worker: bind the row, record `statuses` as steps, release the scope.
fn run_test(
    tracker: &StepTracker,
    data: Arc<dyn TabularDataSource>,
    sheet: &str,
    method: &str,
    statuses: &[Status],
    driver: &FakeDriver,
) {
    let ctx = ExecutionContext::new("WebApp", sheet, method, "chrome").with_driver(Box::new(driver.clone()));
    let Ok(scope) = ExecutionScope::begin(ctx, data) else {
        tracker.add_test_execution(
            &row_runner::core::models::module_name_for(method),
            "",
            method,
            "data row not found",
            Status::Fail,
        );
        return;
    };

    let total = statuses.len() as u32;
    for (i, status) in statuses.iter().enumerate() {
        let expected = scope.cell("UserName").or_else(|| scope.cell("Item")).unwrap_or_default();
        let record = StepRecord::new(method, format!("step {}", i + 1), format!("{expected} #{i}"))
            .actual(format!("{expected} #{i}"))
            .status(*status)
            .expected_total(total);
        tracker.record_step(record, scope.evidence());
    }
}

#[test]
fn test_parallel_workers_roll_up_into_one_summary() {
    let data: Arc<dyn TabularDataSource> = Arc::new(sample_workbook());
    let modules = Arc::new(ModuleAggregator::new());
    let tracker = Arc::new(StepTracker::new(Arc::clone(&modules)));
    let driver = FakeDriver::default();

    let plan: Vec<(&str, &str, Vec<Status>)> = vec![
        ("Login", "Login_01", vec![Status::Pass, Status::Fail, Status::Pass]),
        ("Login", "Login_02", vec![Status::Pass, Status::Pass]),
        ("Cart", "Cart_01", vec![Status::Pass]),
        ("Cart", "Cart_02", vec![Status::Pass, Status::Pass, Status::Pass, Status::Pass]),
        ("Cart", "Cart_09", vec![Status::Pass]),
    ];

    thread::scope(|s| {
        for (sheet, method, statuses) in &plan {
            let tracker = Arc::clone(&tracker);
            let data = Arc::clone(&data);
            let driver = driver.clone();
            s.spawn(move || run_test(&tracker, data, sheet, method, statuses, &driver));
        }
    });

    // Every scope was released, including the one whose row was missing.
    assert_eq!(driver.quit_count(), plan.len());

    let login_01 = tracker.get("Login_01").unwrap();
    assert_eq!(login_01.status, Status::Fail);
    assert_eq!(login_01.steps.len(), 3);
    assert!(login_01.is_complete());
    assert!(login_01.steps.iter().all(|s| s.evidence.is_some()));

    assert_eq!(
        modules.snapshot(),
        BTreeMap::from([
            ("Cart".to_string(), ModuleStats { passed: 2, failed: 1, skipped: 0 }),
            ("Login".to_string(), ModuleStats { passed: 1, failed: 1, skipped: 0 }),
        ])
    );

    assert_eq!(modules.totals(), ModuleStats { passed: 3, failed: 2, skipped: 0 });

    let summary = build_summary(&tracker.executions(), &modules.snapshot(), RunMetadata::default());
    assert_eq!(summary.total_tests, 5);
    assert_eq!(summary.passed, 3);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.pass_percentage, "60.00");
    assert!(summary.per_test.iter().all(|t| !t.incomplete));
    assert_eq!(summary.per_module[0].module, "Cart");
    assert_eq!(summary.per_module[0].success_rate, "66.67");
}

#[test]
fn test_interrupted_test_is_reported_incomplete() {
    let data: Arc<dyn TabularDataSource> = Arc::new(sample_workbook());
    let tracker = StepTracker::default();
    let driver = FakeDriver::default();

    {
        let scope = ExecutionScope::begin(
            ExecutionContext::new("WebApp", "Login", "Login_02", "chrome").with_driver(Box::new(driver.clone())),
            data,
        )
        .unwrap();
        tracker.record_step(
            StepRecord::new("Login_02", "Open", "Shown").actual("Shown").expected_total(4),
            scope.evidence(),
        );
        // The worker stops here; the scope is dropped without further steps.
    }

    assert_eq!(driver.quit_count(), 1);
    assert!(tracker.modules().is_empty());
    let summary = build_summary(&tracker.executions(), &tracker.modules().snapshot(), RunMetadata::default());
    assert_eq!(summary.total_tests, 1);
    assert_eq!(summary.passed, 1);
    assert!(summary.per_test[0].incomplete);
    // Nothing was committed, so the module table stays empty.
    assert!(summary.per_module.is_empty());
}
