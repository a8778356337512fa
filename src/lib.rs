//! # Row Runner Library / Row Runner 库
//!
//! This library provides the core functionality for the Row Runner tool,
//! a data-driven test orchestrator: each test method is bound to a row of a
//! data sheet, its steps are tracked while it runs on a parallel worker, and
//! the outcomes are rolled up per module into a summary report.
//!
//! 此库为 Row Runner 工具提供核心功能，
//! 这是一个数据驱动的测试编排器：每个测试方法绑定到数据表中的一行，
//! 在并行工作线程上运行时跟踪其步骤，并按模块汇总结果生成摘要报告。
//!
//! ## Modules / 模块
//!
//! - `core` - Data model, row resolution, execution context, step tracking and aggregation
//! - `infra` - Infrastructure services like command execution and file system operations
//! - `reporting` - Summary assembly and console/HTML/JSON rendering
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 数据模型、行解析、执行上下文、步骤跟踪与汇总
//! - `infra` - 基础设施服务，如命令执行和文件系统操作
//! - `reporting` - 摘要组装以及控制台/HTML/JSON 渲染
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::aggregator::ModuleAggregator;
pub use crate::core::error::{Result, RunnerError};
pub use crate::core::models::{ModuleStats, Status, Step, StepRecord, TestExecution};
pub use crate::core::tracker::StepTracker;
pub use crate::reporting::summary::{Summary, build_summary};

/// Maps a requested locale onto one of the bundled translations.
/// 将请求的语言环境映射到内置翻译之一。
pub fn resolve_locale(requested: &str) -> &'static str {
    let available_locales = rust_i18n::available_locales!();

    // Try the full locale first (e.g., "zh-CN"), then the language part only
    // (e.g., "en" from "en-US"), and finally fall back to "en".
    if let Some(found) = available_locales.iter().find(|l| **l == requested) {
        return *found;
    }
    requested
        .split('-')
        .next()
        .and_then(|lang_code| available_locales.iter().find(|l| **l == lang_code))
        .copied()
        .unwrap_or("en")
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
