//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints the assembled summary to the console, with colored
//! statuses and internationalization support.
//!
//! 此模块将组装好的摘要打印到控制台，支持彩色状态和国际化。

use colored::*;

use crate::core::models::{CaseResult, FailureReason, Status};
use crate::infra::t;
use crate::reporting::summary::Summary;

fn colored_status(status: Status, locale: &str) -> ColoredString {
    let label = status.label(locale);
    match status {
        Status::Pass => label.green(),
        Status::Fail => label.red(),
        Status::Skipped => label.dimmed(),
    }
}

/// Prints a formatted summary of a run to the console.
///
/// 在控制台打印格式化的运行摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Test Summary ---
///   - Status     | Test Case                         | Duration | Steps
///   - Passed     | Login_01                          |    412ms |     3
///   - Failed     | Cart_02                           |    108ms |     2
///
/// --- Modules ---
///   - Module               |  Total | Passed | Failed | Skipped | Success
///   - Login                |      1 |      1 |      0 |       0 |  100.00%
/// ```
pub fn print_summary(summary: &Summary, locale: &str) {
    println!("\n{}", t!("report.summary_banner", locale = locale).bold());

    for test in &summary.per_test {
        let duration = test
            .duration_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "N/A".to_string());
        let marker = if test.incomplete {
            format!(" ({})", t!("report.incomplete", locale = locale))
        } else {
            String::new()
        };
        println!(
            "  - {:<10} | {:<40} | {:>9} | {:>5}{}",
            colored_status(test.status, locale),
            test.test_case_id,
            duration,
            test.steps.len(),
            marker.yellow()
        );
    }

    if !summary.per_module.is_empty() {
        println!("\n{}", t!("report.modules_banner", locale = locale).bold());
        for module in &summary.per_module {
            println!(
                "  - {:<20} | {:>6} | {:>6} | {:>6} | {:>7} | {:>7}%",
                module.module.cyan(),
                module.total,
                module.passed.to_string().green(),
                module.failed.to_string().red(),
                module.skipped,
                module.success_rate
            );
        }
    }

    println!(
        "\n{}",
        t!(
            "report.totals",
            locale = locale,
            total = summary.total_tests,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            rate = &summary.pass_percentage
        )
        .bold()
    );
    let metrics = &summary.metrics;
    if metrics.timed_executions > 0 {
        let avg = format!("{:.0}", metrics.average_ms);
        println!(
            "{}",
            t!(
                "report.metrics",
                locale = locale,
                avg = avg,
                min = metrics.min_ms,
                max = metrics.max_ms,
                fast = metrics.fast,
                medium = metrics.medium,
                slow = metrics.slow
            )
            .dimmed()
        );
    }
}

/// Prints the output of each failed case and the first failing step of each
/// failed test execution.
///
/// 打印每个失败用例的输出，以及每个失败测试执行的第一个失败步骤。
pub fn print_failure_details(failures: &[&CaseResult], summary: &Summary, locale: &str) {
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, result) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            t!("report.failure_header", locale = locale).red(),
            result.case_name().cyan()
        );

        let first_failure = summary
            .per_test
            .iter()
            .find(|test| test.test_case_id == result.case_name())
            .and_then(|test| test.first_failure());
        if let Some(step) = first_failure {
            println!(
                "  {}",
                t!(
                    "report.first_failing_step",
                    locale = locale,
                    step = step.number,
                    action = &step.action,
                    expected = &step.expected,
                    actual = &step.actual
                )
                .yellow()
            );
        }

        if let CaseResult::Failed { output, reason, .. } = result {
            let log_header = match reason {
                FailureReason::MissingDataRow => t!("report.config_log", locale = locale),
                _ => t!("report.test_log", locale = locale),
            };
            println!("\n--- {} ---\n", log_header.yellow());
            println!("{}", output.trim_end());
            println!("\n{}", "-".repeat(80));
        }
    }
}
