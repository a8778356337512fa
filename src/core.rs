//! # Core Module / 核心模块
//!
//! This module contains the core functionality of Row Runner: the data model,
//! tabular data access, row resolution, per-worker execution contexts, the
//! shared step tracker and module aggregator, suite configuration, planning
//! and case execution.
//!
//! 此模块包含 Row Runner 的核心功能：数据模型、表格数据访问、行解析、
//! 每个工作线程的执行上下文、共享的步骤跟踪器和模块汇总器、套件配置、
//! 执行计划以及用例执行。

pub mod aggregator;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod execution;
pub mod models;
pub mod planner;
pub mod resolver;
pub mod tracker;

// Re-exports
pub use aggregator::ModuleAggregator;
pub use config::SuiteConfig;
pub use context::{ExecutionContext, ExecutionScope};
pub use execution::CaseRunner;
pub use tracker::StepTracker;
