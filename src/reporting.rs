//! # Reporting Module / 报告模块
//!
//! This module assembles the run summary and renders it in multiple formats:
//! colorful console output with internationalization support, a styled HTML
//! report, and a JSON document.
//!
//! 此模块组装运行摘要并以多种格式渲染：支持国际化的彩色控制台输出、
//! 样式化的 HTML 报告以及 JSON 文档。

pub mod console;
pub mod html;
pub mod json;
pub mod summary;

// Re-export common reporting functions
pub use console::{print_failure_details, print_summary};
pub use html::write_html_report;
pub use json::write_json_report;
pub use summary::build_summary;
