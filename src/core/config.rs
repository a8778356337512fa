//! # Suite Configuration Module / 套件配置模块
//!
//! The suite file (`RowRunner.toml`) names the data workbook, describes the
//! environment the run targets, and lists the cases: each case is a test
//! method bound to a data sheet, executed by a shell command.
//!
//! 套件文件（`RowRunner.toml`）指定数据工作簿，描述运行的目标环境，
//! 并列出用例：每个用例是绑定到数据表的测试方法，由 shell 命令执行。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::core::error::{Result, RunnerError};

/// Environment the suite runs against; drives the no-prod skip rule.
/// 套件运行的目标环境；决定非生产跳过规则。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Environment {
    /// Environment name, e.g. `qa`, `uat` or `run` (live).
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub release_version: String,
    /// `yes` (default) skips every `no_prod` case; `no` lifts the `run19` restriction.
    #[serde(default = "default_restrict_run")]
    pub restrict_run: String,
    #[serde(default = "default_browser")]
    pub browser: String,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            name: String::new(),
            release_version: String::new(),
            restrict_run: default_restrict_run(),
            browser: default_browser(),
        }
    }
}

impl Environment {
    /// `NAME_RELEASE` with the name upper-cased, e.g. `QA_run19.2`.
    pub fn tag(&self) -> String {
        format!("{}_{}", self.name.to_uppercase(), self.release_version)
    }
}

/// Settings for generating cases from a script-details sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DynamicSuite {
    pub sheet: String,
    /// Only rows whose `type` is empty or equal to this (case-insensitive) are used.
    #[serde(default)]
    pub run_type: Option<String>,
}

/// A single case of the suite.
/// 套件中的单个用例。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SuiteCase {
    /// Test method name; also the test case id and the `TestMethodName` to resolve.
    pub name: String,
    #[serde(default)]
    pub application: String,
    pub sheet: String,
    /// Overrides the environment's browser.
    #[serde(default)]
    pub browser: Option<String>,
    /// Overrides the suite's `default_command`.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Overrides the suite's `retries`.
    #[serde(default)]
    pub retries: Option<u8>,
    /// Cases that must never run against production.
    #[serde(default)]
    pub no_prod: bool,
    /// Number of steps the case is expected to record (0 = unknown).
    #[serde(default)]
    pub expected_steps: u32,
    #[serde(default)]
    pub scenario: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub run_type: Option<String>,
}

/// The whole suite file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuiteConfig {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub project: String,
    /// Workbook path, relative to the project directory.
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_retries")]
    pub retries: u8,
    /// Command template with `{method}`, `{sheet}`, `{application}` and `{browser}` placeholders.
    #[serde(default)]
    pub default_command: Option<String>,
    #[serde(default)]
    pub dynamic: Option<DynamicSuite>,
    #[serde(default)]
    pub cases: Vec<SuiteCase>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            project: String::new(),
            data_file: default_data_file(),
            environment: Environment::default(),
            retries: default_retries(),
            default_command: None,
            dynamic: None,
            cases: Vec::new(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_data_file() -> String {
    "data.toml".to_string()
}

fn default_restrict_run() -> String {
    "yes".to_string()
}

fn default_browser() -> String {
    "chrome".to_string()
}

fn default_retries() -> u8 {
    1
}

impl SuiteConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SuiteConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for case in &self.cases {
            if case.name.trim().is_empty() {
                return Err(RunnerError::InvalidConfig("case with an empty name".into()));
            }
            if !seen.insert(case.name.as_str()) {
                return Err(RunnerError::InvalidConfig(format!(
                    "duplicate case name '{}'",
                    case.name
                )));
            }
            if case.command.is_none() && self.default_command.is_none() {
                return Err(RunnerError::InvalidConfig(format!(
                    "case '{}' has no command and the suite has no default_command",
                    case.name
                )));
            }
        }
        if self.dynamic.is_some() && self.default_command.is_none() {
            return Err(RunnerError::InvalidConfig(
                "dynamic suites require a default_command".into(),
            ));
        }
        Ok(())
    }

    /// The command line of `case`, with template placeholders filled in.
    pub fn command_for(&self, case: &SuiteCase) -> Option<String> {
        let template = case.command.as_ref().or(self.default_command.as_ref())?;
        Some(
            template
                .replace("{method}", &case.name)
                .replace("{sheet}", &case.sheet)
                .replace("{application}", &case.application)
                .replace("{browser}", self.browser_for(case)),
        )
    }

    pub fn browser_for<'a>(&'a self, case: &'a SuiteCase) -> &'a str {
        case.browser.as_deref().unwrap_or(&self.environment.browser)
    }

    pub fn retries_for(&self, case: &SuiteCase) -> u8 {
        case.retries.unwrap_or(self.retries)
    }
}
