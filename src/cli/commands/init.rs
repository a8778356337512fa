//! # Suite Initialization Module / 套件初始化模块
//!
//! This module provides the `init` command: an interactive command-line
//! wizard that creates a starter `RowRunner.toml` suite file and a matching
//! `data.toml` workbook in the current directory.
//!
//! 此模块提供 `init` 命令：一个交互式命令行向导，
//! 在当前目录中创建初始的 `RowRunner.toml` 套件文件和匹配的 `data.toml` 工作簿。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use std::fs;
use std::path::Path;

use crate::core::config::{Environment, SuiteCase, SuiteConfig};
use crate::core::data::{TabularDataSource, Workbook};
use crate::core::resolver::METHOD_COLUMN;
use crate::infra::t;

pub const CONFIG_FILE: &str = "RowRunner.toml";
pub const DATA_FILE: &str = "data.toml";

const BROWSERS: [&str; 3] = ["chrome", "firefox", "edge"];

/// A command that reports one passing step, usable until real test commands exist.
const STARTER_COMMAND: &str = r#"echo '##step {"action": "Run {method}", "expected": "Completed", "actual": "Completed", "status": "PASS"}'"#;

/// Runs the interactive wizard to generate `RowRunner.toml` and `data.toml`.
///
/// 运行交互式向导以生成 `RowRunner.toml` 和 `data.toml`。
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let config_path = Path::new(CONFIG_FILE);
    let data_path = Path::new(DATA_FILE);
    let theme = ColorfulTheme::default();

    if non_interactive {
        if config_path.exists() {
            println!(
                "{}",
                t!("init.file_exists", locale = language, path = config_path.display()).yellow()
            );
            return Ok(());
        }
        return write_files(config_path, data_path, &default_suite(language), language);
    }

    println!("\n{}", t!("init.wizard_welcome", locale = language).cyan().bold());
    println!("{}", t!("init.wizard_description", locale = language));

    if config_path.exists() {
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", locale = language, path = config_path.display()))
            .default(false)
            .interact()
            .context(t!("init.user_confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init.aborted", locale = language));
            return Ok(());
        }
    }

    let mut suite = default_suite(language);
    suite.project = Input::with_theme(&theme)
        .with_prompt(t!("init.project_prompt", locale = language))
        .default(suite.project)
        .interact_text()?;
    suite.environment.name = Input::with_theme(&theme)
        .with_prompt(t!("init.environment_prompt", locale = language))
        .default(suite.environment.name)
        .interact_text()?;
    suite.environment.release_version = Input::with_theme(&theme)
        .with_prompt(t!("init.release_prompt", locale = language))
        .default(suite.environment.release_version)
        .interact_text()?;
    let browser = Select::with_theme(&theme)
        .with_prompt(t!("init.browser_prompt", locale = language))
        .items(&BROWSERS)
        .default(0)
        .interact()?;
    suite.environment.browser = BROWSERS[browser].to_string();
    suite.default_command = Some(
        Input::with_theme(&theme)
            .with_prompt(t!("init.command_prompt", locale = language))
            .default(STARTER_COMMAND.to_string())
            .interact_text()?,
    );

    write_files(config_path, data_path, &suite, language)
}

/// The starter suite: two login cases reading the `Login` sheet.
pub fn default_suite(language: &str) -> SuiteConfig {
    let case = |name: &str, description: &str| SuiteCase {
        name: name.to_string(),
        application: "WebApp".to_string(),
        sheet: "Login".to_string(),
        scenario: "Login".to_string(),
        description: description.to_string(),
        timeout_secs: Some(60),
        ..SuiteCase::default()
    };
    SuiteConfig {
        language: language.to_string(),
        project: "My Project".to_string(),
        data_file: DATA_FILE.to_string(),
        environment: Environment {
            name: "qa".to_string(),
            release_version: "1.0".to_string(),
            restrict_run: "yes".to_string(),
            browser: BROWSERS[0].to_string(),
        },
        default_command: Some(STARTER_COMMAND.to_string()),
        cases: vec![
            case("Login_01", "Valid credentials"),
            case("Login_02", "Invalid password"),
        ],
        ..SuiteConfig::default()
    }
}

/// The starter workbook with one data row per starter case.
pub fn default_workbook() -> Result<Workbook> {
    let workbook = Workbook::new();
    workbook.create_sheet("Login", &[METHOD_COLUMN, "UserName", "Password"])?;
    workbook.push_row("Login", &["Login_01", "alice", "secret"])?;
    workbook.push_row("Login", &["Login_02", "bob", "wrong"])?;
    Ok(workbook)
}

fn write_files(config_path: &Path, data_path: &Path, suite: &SuiteConfig, language: &str) -> Result<()> {
    let toml_string = suite
        .to_toml_string()
        .context(t!("init.serialize_failed", locale = language).to_string())?;
    fs::write(config_path, toml_string)
        .with_context(|| t!("init.write_failed", locale = language, path = config_path.display()))?;

    if data_path.exists() {
        println!(
            "{}",
            t!("init.data_kept", locale = language, path = data_path.display()).yellow()
        );
    } else {
        default_workbook()?
            .save(data_path)
            .with_context(|| t!("init.write_failed", locale = language, path = data_path.display()))?;
    }

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success_created", locale = language, path = config_path.display()).bold()
    );
    println!("{}", t!("init.usage_hint", locale = language));
    Ok(())
}
