//! # JSON Reporting Module / JSON 报告模块
//!
//! Writes the assembled summary as pretty-printed JSON for other tools.
//!
//! 将组装好的摘要写为格式化的 JSON，供其他工具使用。

use anyhow::{Context, Result};
use std::path::Path;

use crate::infra::fs;
use crate::reporting::summary::Summary;

pub fn render_json_report(summary: &Summary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("Failed to serialize summary")
}

pub fn write_json_report(summary: &Summary, output_path: &Path) -> Result<()> {
    fs::write_report(output_path, &render_json_report(summary)?)
}
