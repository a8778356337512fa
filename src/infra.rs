//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Row Runner,
//! including child-process execution, report file output, and i18n support.
//!
//! 此模块为 Row Runner 提供基础设施服务，
//! 包括子进程执行、报告文件输出和国际化支持。

pub mod command;
pub mod fs;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
