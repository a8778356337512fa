//! # File System Operations Module / 文件系统操作模块
//!
//! Small helpers for locating project files and writing report files.
//!
//! 用于定位项目文件和写入报告文件的小工具。

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Creates the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Writes a report file, creating parent directories as needed.
///
/// # Arguments
/// * `path` - Destination of the report
/// * `content` - Rendered report content
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    ensure_parent_dir(path)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))
}

/// Resolves `path` against `base` unless it is already absolute.
pub fn resolve_in(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
