//! # Row Resolver Module / 行解析模块
//!
//! Binds a test method to its data row: the first row whose `TestMethodName`
//! column equals the method name exactly.
//!
//! 将测试方法绑定到其数据行：`TestMethodName` 列与方法名完全相等的第一行。

use tracing::{debug, error};

use crate::core::data::{HEADER_ROW, TabularDataSource};
use crate::core::error::{Result, RunnerError};

/// Column that carries the test method name in every data sheet.
pub const METHOD_COLUMN: &str = "TestMethodName";

/// First row that can hold test data (row 1 is the header row).
pub const FIRST_DATA_ROW: usize = HEADER_ROW + 1;

/// Finds the data row of `method` in `sheet`.
///
/// Rows are scanned from [`FIRST_DATA_ROW`] through `row_count(sheet)`; the
/// match is case-sensitive and the first one wins. An empty or missing sheet
/// yields `None` without scanning.
pub fn find_row(source: &dyn TabularDataSource, sheet: &str, method: &str) -> Option<usize> {
    let last_row = source.row_count(sheet);
    (FIRST_DATA_ROW..=last_row).find(|&row| {
        source
            .lookup(sheet, METHOD_COLUMN, row)
            .is_some_and(|value| value == method)
    })
}

/// Like [`find_row`], but a missing row is the fatal configuration error
/// [`RunnerError::RowNotFound`].
pub fn require_row(source: &dyn TabularDataSource, sheet: &str, method: &str) -> Result<usize> {
    match find_row(source, sheet, method) {
        Some(row) => {
            debug!(method, sheet, row, "data row match found");
            Ok(row)
        }
        None => {
            error!(method, sheet, "data row not found");
            Err(RunnerError::RowNotFound {
                sheet: sheet.to_string(),
                method: method.to_string(),
            })
        }
    }
}
