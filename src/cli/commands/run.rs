//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command of the Row Runner CLI, which
//! executes the suite's cases in parallel against the data workbook and
//! reports the tracked outcomes.
//!
//! 此模块实现了 Row Runner CLI 的 `run` 命令，
//! 针对数据工作簿并行执行套件用例并报告跟踪的结果。

use anyhow::{Context, Result};
use colored::*;
use futures::{StreamExt, stream};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    core::{
        config::{SuiteCase, SuiteConfig},
        data::{TabularDataSource, Workbook},
        execution::CaseRunner,
        models::{CaseResult, Status, module_name_for},
        planner,
        tracker::StepTracker,
    },
    infra::{fs::resolve_in, t},
    reporting::{
        build_summary, print_failure_details, print_summary,
        summary::RunMetadata,
        write_html_report, write_json_report,
    },
};

/// Options of the `run` command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub jobs: Option<usize>,
    pub config: PathBuf,
    pub project_dir: PathBuf,
    /// Overrides the suite's `data_file`.
    pub data: Option<PathBuf>,
    pub total_runners: Option<usize>,
    pub runner_index: Option<usize>,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    /// Language chosen on the command line; wins over the suite's `language`.
    pub language: Option<String>,
}

/// Executes the run command with the provided options.
///
/// # Returns
/// `Ok(())` when every executed case passed; an error when any case failed
/// or the run could not be set up.
pub async fn execute(options: RunOptions) -> Result<()> {
    let (suite, config_path) = setup_and_parse_config(&options.config)?;
    let locale = options
        .language
        .clone()
        .unwrap_or_else(|| crate::resolve_locale(&suite.language).to_string());
    rust_i18n::set_locale(&locale);

    let project_root = std::fs::canonicalize(&options.project_dir).with_context(|| {
        t!("run.project_dir_not_found", locale = &locale, path = options.project_dir.display())
    })?;
    println!(
        "{}",
        t!("run.loading_suite", locale = &locale, path = config_path.display())
    );

    let data_path = resolve_in(
        &project_root,
        options.data.as_deref().unwrap_or(Path::new(&suite.data_file)),
    );
    let workbook = Workbook::load(&data_path)
        .with_context(|| t!("run.data_load_failed", locale = &locale, path = data_path.display()))?;
    println!(
        "{}",
        t!("run.loading_data", locale = &locale, path = data_path.display())
    );
    let data: Arc<dyn TabularDataSource> = Arc::new(workbook);

    let cases = collect_cases(&suite, data.as_ref())?;
    let plan = planner::plan_execution(
        cases,
        &suite.environment,
        options.total_runners,
        options.runner_index,
    )?;

    if let (Some(total), Some(index)) = (options.total_runners, options.runner_index) {
        println!(
            "{}",
            t!(
                "run.running_as_split_runner",
                locale = &locale,
                index = index + 1,
                total = total,
                count = plan.cases_to_run.len()
            )
            .bold()
        );
    } else {
        println!("{}", t!("run.running_as_single_runner", locale = &locale).bold());
    }

    let started_at = chrono::Local::now();
    let run_start = Instant::now();
    let tracker = Arc::new(StepTracker::default());

    for (case, reason) in &plan.skipped {
        println!(
            "{}",
            t!("run.case_skipped", locale = &locale, name = &case.name, reason = reason).dimmed()
        );
        tracker.mark_skipped(&module_name_for(&case.name), &case.name, reason);
    }

    let mut results = Vec::new();
    if plan.cases_to_run.is_empty() {
        println!("{}", t!("run.no_cases_to_run", locale = &locale).green());
    } else {
        let stop_token = setup_signal_handler(&locale);
        let runner = Arc::new(CaseRunner::new(
            Arc::clone(&tracker),
            data,
            Arc::new(suite.clone()),
            project_root,
        ));
        let jobs = options.jobs.unwrap_or(num_cpus::get() / 2 + 1).max(1);
        results = run_cases(plan.cases_to_run, jobs, runner, stop_token).await;
    }

    let meta = RunMetadata {
        project: suite.project.clone(),
        environment: suite.environment.name.clone(),
        release_version: suite.environment.release_version.clone(),
        browser: suite.environment.browser.clone(),
        started_at,
        duration: run_start.elapsed(),
    };
    let summary = build_summary(&tracker.executions(), &tracker.modules().snapshot(), meta);
    print_summary(&summary, &locale);

    if let Some(report_path) = &options.html {
        println!("\n{}", t!("run.html_report", locale = &locale, path = report_path.display()));
        if let Err(e) = write_html_report(&summary, report_path, &locale) {
            eprintln!("{} {e:#}", t!("run.report_failed", locale = &locale).red());
        }
    }
    if let Some(report_path) = &options.json {
        println!("{}", t!("run.json_report", locale = &locale, path = report_path.display()));
        if let Err(e) = write_json_report(&summary, report_path) {
            eprintln!("{} {e:#}", t!("run.report_failed", locale = &locale).red());
        }
    }

    let failures: Vec<&CaseResult> = results.iter().filter(|r| r.is_failure()).collect();
    if failures.is_empty() && !summary.has_failures() {
        println!("\n{}", t!("run.all_tests_passed", locale = &locale).green().bold());
        Ok(())
    } else {
        print_failure_details(&failures, &summary, &locale);
        let count = summary.failed.max(failures.len() as u64);
        anyhow::bail!(t!("run.tests_failed", locale = &locale, count = count).to_string());
    }
}

/// Sets up and parses the suite configuration file.
fn setup_and_parse_config(config_path_arg: &Path) -> Result<(SuiteConfig, PathBuf)> {
    let config_path = std::fs::canonicalize(config_path_arg)
        .with_context(|| t!("run.config_read_failed", path = config_path_arg.display()))?;
    let suite = SuiteConfig::load(&config_path)
        .with_context(|| t!("run.config_parse_failed", path = config_path.display()))?;
    Ok((suite, config_path))
}

/// The suite's declared cases plus, for dynamic suites, the generated ones.
/// A generated case never replaces a declared case of the same name.
fn collect_cases(suite: &SuiteConfig, data: &dyn TabularDataSource) -> Result<Vec<SuiteCase>> {
    let mut cases = suite.cases.clone();
    let Some(dynamic) = &suite.dynamic else {
        return Ok(cases);
    };

    let generated = planner::cases_from_sheet(data, dynamic)?;
    let mut names: HashSet<String> = cases.iter().map(|c| c.name.clone()).collect();
    for case in generated {
        if names.insert(case.name.clone()) {
            cases.push(case);
        } else {
            warn!(case = %case.name, "generated case shadowed by a declared case");
        }
    }
    info!(count = cases.len(), "suite cases collected");
    Ok(cases)
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", t!("run.shutdown_signal", locale = &locale).yellow());
                token_clone.cancel();
            }
            Err(e) => warn!("failed to listen for Ctrl-C: {e}"),
        }
    });

    token
}

/// Reports a cancelled case as skipped. A case that already recorded steps
/// keeps its execution and its last-known rollup.
fn cancelled(runner: &CaseRunner, name: String) -> CaseResult {
    let reason = t!("run.cancelled").to_string();
    runner.tracker().mark_skipped(&module_name_for(&name), &name, &reason);
    CaseResult::Skipped { name, reason }
}

/// Runs the cases in parallel, at most `jobs` at a time.
///
/// A cancelled case is aborted; dropping its task releases its execution
/// context.
async fn run_cases(
    cases: Vec<SuiteCase>,
    jobs: usize,
    runner: Arc<CaseRunner>,
    stop_token: CancellationToken,
) -> Vec<CaseResult> {
    stream::iter(cases.into_iter().map(|case| {
        let runner = Arc::clone(&runner);
        let stop_token = stop_token.clone();
        let name = case.name.clone();

        async move {
            if stop_token.is_cancelled() {
                return cancelled(&runner, name);
            }
            let task_runner = Arc::clone(&runner);
            let mut handle = tokio::spawn(async move { task_runner.run_case(case).await });

            tokio::select! {
                biased;
                _ = stop_token.cancelled() => {
                    handle.abort();
                    cancelled(&runner, name)
                }
                joined = &mut handle => match joined {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(case = %name, "test task failed: {e}");
                        let output = format!("Critical error during test execution: {e}");
                        runner.tracker().add_test_execution(
                            &module_name_for(&name),
                            "",
                            &name,
                            &output,
                            Status::Fail,
                        );
                        CaseResult::Failed {
                            name,
                            output,
                            reason: crate::core::models::FailureReason::Spawn,
                            duration: std::time::Duration::default(),
                        }
                    }
                },
            }
        }
    }))
    .buffer_unordered(jobs)
    .collect()
    .await
}
