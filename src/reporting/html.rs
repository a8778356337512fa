//! # HTML Reporting Module / HTML 报告模块
//!
//! This module renders the assembled summary as a self-contained HTML
//! report: run metadata, overall counts, the module table, timing metrics,
//! and one collapsible section per test execution listing its steps.
//!
//! 此模块将组装好的摘要渲染为独立的 HTML 报告：运行元数据、总体计数、
//! 模块表格、耗时指标，以及每个测试执行的可折叠步骤列表。

use anyhow::Result;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::path::Path;

use crate::core::models::Step;
use crate::infra::{fs, t};
use crate::reporting::summary::{Summary, TestSummary};

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = include_str!("assets/report.css");

const INLINE_IMAGE_PREFIX: &str = "data:image/";

/// Renders the summary as an HTML document.
///
/// 将摘要渲染为 HTML 文档。
pub fn render_html_report(summary: &Summary, locale: &str) -> String {
    let meta = &summary.meta;
    let avg = format!("{:.0}", summary.metrics.average_ms);
    let markup = html! {
        (DOCTYPE)
        html lang=(locale) {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) }
                dl class="meta" {
                    dt { (t!("html_report.meta.project", locale = locale)) } dd { (meta.project) }
                    dt { (t!("html_report.meta.environment", locale = locale)) } dd { (meta.environment) }
                    dt { (t!("html_report.meta.release", locale = locale)) } dd { (meta.release_version) }
                    dt { (t!("html_report.meta.browser", locale = locale)) } dd { (meta.browser) }
                    dt { (t!("html_report.meta.started", locale = locale)) }
                    dd { (meta.started_at.format("%Y-%m-%d %H:%M:%S").to_string()) }
                    dt { (t!("html_report.meta.duration", locale = locale)) }
                    dd { (format!("{:.2}s", meta.duration.as_secs_f64())) }
                }

                div class="summary-container" {
                    (summary_item(summary.total_tests, "", &t!("html_report.summary.total", locale = locale), None))
                    (summary_item(summary.passed, "passed-text", &t!("html_report.summary.passed", locale = locale), Some(&summary.pass_percentage)))
                    (summary_item(summary.failed, "failed-text", &t!("html_report.summary.failed", locale = locale), Some(&summary.fail_percentage)))
                    (summary_item(summary.skipped, "skipped-text", &t!("html_report.summary.skipped", locale = locale), Some(&summary.skip_percentage)))
                }

                h2 { (t!("html_report.modules.header", locale = locale)) }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.modules.module", locale = locale)) }
                            th { (t!("html_report.summary.total", locale = locale)) }
                            th { (t!("html_report.summary.passed", locale = locale)) }
                            th { (t!("html_report.summary.failed", locale = locale)) }
                            th { (t!("html_report.summary.skipped", locale = locale)) }
                            th { (t!("html_report.modules.success_rate", locale = locale)) }
                        }
                    }
                    tbody {
                        @for module in &summary.per_module {
                            tr {
                                td { (module.module) }
                                td { (module.total) }
                                td class="passed-text" { (module.passed) }
                                td class="failed-text" { (module.failed) }
                                td class="skipped-text" { (module.skipped) }
                                td { (module.success_rate) "%" }
                            }
                        }
                    }
                }

                h2 { (t!("html_report.metrics.header", locale = locale)) }
                p class="metrics" {
                    (t!(
                        "html_report.metrics.line",
                        locale = locale,
                        avg = avg,
                        min = summary.metrics.min_ms,
                        max = summary.metrics.max_ms,
                        fast = summary.metrics.fast,
                        medium = summary.metrics.medium,
                        slow = summary.metrics.slow,
                        rate = &summary.metrics.pass_rate
                    ))
                }

                h2 { (t!("html_report.tests.header", locale = locale)) }
                @for test in &summary.per_test {
                    (test_section(test, locale))
                }
            }
        }
    };
    markup.into_string()
}

/// Renders the summary and writes it to `output_path`.
pub fn write_html_report(summary: &Summary, output_path: &Path, locale: &str) -> Result<()> {
    fs::write_report(output_path, &render_html_report(summary, locale))
}

fn summary_item(count: u64, class: &str, label: &str, percentage: Option<&str>) -> Markup {
    html! {
        div class="summary-item" {
            span class={ "count " (class) } { (count) }
            span class="label" { (label) }
            @if let Some(percentage) = percentage {
                span class="percentage" { (percentage) "%" }
            }
        }
    }
}

fn test_section(test: &TestSummary, locale: &str) -> Markup {
    let duration = test
        .duration_ms
        .map(|ms| format!("{ms}ms"))
        .unwrap_or_else(|| "N/A".to_string());
    html! {
        details class="test" open[test.first_failure().is_some()] {
            summary {
                span class={ "status-cell " (test.status.css_class()) } { (test.status.label(locale)) }
                " "
                strong { (test.test_case_id) }
                @if !test.scenario_id.is_empty() {
                    " · " (test.scenario_id)
                }
                @if !test.description.is_empty() {
                    " · " (test.description)
                }
                span class="duration-cell" { (duration) }
                @if test.incomplete {
                    span class="incomplete" { (t!("report.incomplete", locale = locale)) }
                }
            }
            @if test.steps.is_empty() {
                p class="no-steps" { (t!("html_report.tests.no_steps", locale = locale)) }
            } @else {
                table class="steps" {
                    thead {
                        tr {
                            th { "#" }
                            th { (t!("html_report.steps.action", locale = locale)) }
                            th { (t!("html_report.steps.expected", locale = locale)) }
                            th { (t!("html_report.steps.actual", locale = locale)) }
                            th class="status-col" { (t!("html_report.steps.status", locale = locale)) }
                            th { (t!("html_report.steps.evidence", locale = locale)) }
                        }
                    }
                    tbody {
                        @for step in &test.steps {
                            (step_row(step, locale))
                        }
                    }
                }
            }
        }
    }
}

fn step_row(step: &Step, locale: &str) -> Markup {
    html! {
        tr {
            td { (step.number) }
            td { (step.action) }
            td { (step.expected) }
            td { (step.actual) }
            td class="status-col" {
                div class={ "status-cell " (step.status.css_class()) } { (step.status.label(locale)) }
            }
            td class="evidence" {
                @match &step.evidence {
                    Some(evidence) if evidence.starts_with(INLINE_IMAGE_PREFIX) => {
                        img src=(evidence) alt={ "step " (step.number) };
                    }
                    Some(evidence) => { a href=(evidence) { (evidence) } }
                    None => {}
                }
            }
        }
    }
}
