//! # Test Execution Planner Module / 测试执行计划模块
//!
//! This module decides which suite cases run on this runner: it orders the
//! cases, applies the no-prod skip rule, and handles distributed execution.
//! It can also generate cases from a script-details sheet.
//!
//! 此模块决定哪些套件用例在此运行器上运行：对用例排序、应用非生产跳过规则，
//! 并处理分布式执行。它也可以从脚本明细表生成用例。

use anyhow::{Context, Result, bail};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::core::config::{DynamicSuite, Environment, SuiteCase};
use crate::core::data::TabularDataSource;
use crate::core::resolver::FIRST_DATA_ROW;

const PACKAGE_COLUMN: &str = "package name";
const CLASS_COLUMN: &str = "class name";
const METHOD_COLUMN: &str = "method name";
const RUN_COLUMN: &str = "run";
const TYPE_COLUMN: &str = "type";
const SHEET_COLUMN: &str = "sheet name";
const APPLICATION_COLUMN: &str = "application name";
const DEFAULT_RUN_TYPE: &str = "default";

/// Represents a complete execution plan for a suite.
/// 表示套件的完整执行计划。
#[derive(Debug)]
pub struct ExecutionPlan {
    /// Cases to execute on this runner, sorted by name.
    /// 要在此运行器上执行的用例，按名称排序。
    pub cases_to_run: Vec<SuiteCase>,
    /// Cases blocked by the no-prod rule, with the reason.
    /// 被非生产规则阻止的用例及原因。
    pub skipped: Vec<(SuiteCase, String)>,
    /// Whether the cases are distributed across multiple runners (CI environment).
    /// 用例是否分布在多个运行器上（CI 环境）。
    pub is_distributed: bool,
}

/// Why a `no_prod` case may not run in `env`, or `None` when it may.
pub fn no_prod_skip_reason(env: &Environment) -> Option<&'static str> {
    let restrict_run = env.restrict_run.to_lowercase();
    let tag = env.tag().to_lowercase();

    if env.name.eq_ignore_ascii_case("run") || tag.contains("liv.") || tag.contains("run.") {
        return Some("execution is restricted in a live environment");
    }
    if tag.contains("run19") && restrict_run != "no" {
        return Some("execution in run19 is restricted unless restrict_run = \"no\"");
    }
    if restrict_run == "yes" {
        return Some("execution restricted by restrict_run = \"yes\"");
    }
    None
}

/// Creates an execution plan for the given cases.
///
/// Cases are sorted by name for a deterministic order; `no_prod` cases that
/// the environment blocks are set aside; the remainder is optionally split
/// across runners by `index % total_runners == runner_index`.
///
/// 为给定的用例创建执行计划。
pub fn plan_execution(
    mut cases: Vec<SuiteCase>,
    env: &Environment,
    total_runners: Option<usize>,
    runner_index: Option<usize>,
) -> Result<ExecutionPlan> {
    cases.sort_by(|a, b| a.name.cmp(&b.name));

    let mut runnable = Vec::with_capacity(cases.len());
    let mut skipped = Vec::new();
    let skip_reason = no_prod_skip_reason(env);
    for case in cases {
        match skip_reason {
            Some(reason) if case.no_prod => {
                debug!(case = %case.name, reason, "no-prod case skipped");
                skipped.push((case, reason.to_string()));
            }
            _ => runnable.push(case),
        }
    }

    let (cases_to_run, is_distributed) =
        if let (Some(total), Some(index)) = (total_runners, runner_index) {
            if total == 0 {
                bail!("Total runners must be at least 1.");
            }
            if index >= total {
                bail!("Runner index must be less than total runners.");
            }
            let distributed_cases: Vec<_> = runnable
                .into_iter()
                .enumerate()
                .filter(|(i, _)| i % total == index)
                .map(|(_, case)| case)
                .collect();
            (distributed_cases, true)
        } else {
            if total_runners.is_some() || runner_index.is_some() {
                bail!("Both --total-runners and --runner-index must be provided.");
            }
            (runnable, false)
        };

    Ok(ExecutionPlan {
        cases_to_run,
        skipped,
        is_distributed,
    })
}

/// Generates suite cases from a script-details sheet.
///
/// Columns are matched case-insensitively against the header row; `package
/// name`, `class name`, `method name` and `run` are required. Rows are
/// grouped by `package.class` in sorted order, and a row becomes a case when
/// `run` is `yes` and its `type` is empty or equals the configured run type.
/// Every case of a class takes the `sheet name` and `application name` of the
/// first row of that class.
pub fn cases_from_sheet(
    source: &dyn TabularDataSource,
    dynamic: &DynamicSuite,
) -> Result<Vec<SuiteCase>> {
    let sheet = dynamic.sheet.as_str();
    let headers = source
        .headers(sheet)
        .with_context(|| format!("script details sheet '{sheet}' not found"))?;
    let columns: HashMap<String, String> = headers
        .iter()
        .map(|h| (h.trim().to_lowercase(), h.clone()))
        .collect();

    for required in [PACKAGE_COLUMN, CLASS_COLUMN, METHOD_COLUMN, RUN_COLUMN] {
        if !columns.contains_key(required) {
            bail!("required column '{required}' not found in sheet '{sheet}'");
        }
    }

    let cell = |column: &str, row: usize| -> String {
        columns
            .get(column)
            .and_then(|header| source.lookup(sheet, header, row))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };
    let run_type = dynamic.run_type.as_deref().unwrap_or(DEFAULT_RUN_TYPE);

    // package.class -> (sheet, application of its first row, included rows)
    let mut classes: BTreeMap<String, (String, String, Vec<usize>)> = BTreeMap::new();
    for row in FIRST_DATA_ROW..=source.row_count(sheet) {
        let package = cell(PACKAGE_COLUMN, row);
        let class = cell(CLASS_COLUMN, row);
        if package.is_empty() || class.is_empty() {
            continue;
        }
        let entry = classes
            .entry(format!("{package}.{class}"))
            .or_insert_with(|| (cell(SHEET_COLUMN, row), cell(APPLICATION_COLUMN, row), Vec::new()));

        let row_type = cell(TYPE_COLUMN, row);
        if cell(RUN_COLUMN, row).eq_ignore_ascii_case("yes")
            && (row_type.is_empty() || row_type.eq_ignore_ascii_case(run_type))
        {
            entry.2.push(row);
        }
    }

    let mut cases = Vec::new();
    for (full_name, (data_sheet, application, rows)) in classes {
        let class = full_name.rsplit('.').next().unwrap_or(&full_name).to_string();
        for row in rows {
            let method = cell(METHOD_COLUMN, row);
            if method.is_empty() {
                warn!(class = %full_name, row, "row without a method name skipped");
                continue;
            }
            cases.push(SuiteCase {
                name: method,
                application: application.clone(),
                sheet: data_sheet.clone(),
                scenario: class.clone(),
                run_type: Some(run_type.to_string()),
                ..SuiteCase::default()
            });
        }
    }
    debug!(sheet, count = cases.len(), "generated cases from script details");
    Ok(cases)
}
