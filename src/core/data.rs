//! # Tabular Data Module / 表格数据模块
//!
//! The data-driven core reads its test data through [`TabularDataSource`], a
//! sheet/column/row addressable view of a workbook. Rows use spreadsheet
//! numbering: row 1 holds the headers and data starts at row 2.
//!
//! [`Workbook`] is the bundled implementation. It keeps every sheet in memory
//! and loads from (and saves back to) a TOML workbook file:
//!
//! 数据驱动核心通过 [`TabularDataSource`] 读取测试数据，它是一个可按
//! 工作表/列/行寻址的工作簿视图。行号采用电子表格编号：第 1 行是表头，
//! 数据从第 2 行开始。
//!
//! ```toml
//! [[sheets]]
//! name = "Login"
//! headers = ["TestMethodName", "UserName"]
//! rows = [["Login_01", "alice"]]
//! ```

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::error::{Result, RunnerError};

/// Row number of the header row.
pub const HEADER_ROW: usize = 1;

/// A rectangular sheet store addressable by (sheet, column header, row).
///
/// Implementations must be shareable between workers; writes go through
/// `&self` and are serialized internally.
pub trait TabularDataSource: Send + Sync {
    /// Reads one cell. `None` when the sheet, column or row does not exist;
    /// an existing row that is shorter than the header row yields `Some("")`.
    fn lookup(&self, sheet: &str, column: &str, row: usize) -> Option<String>;

    /// Number of the last populated row, counting the header row.
    /// Zero for a missing or completely empty sheet.
    fn row_count(&self, sheet: &str) -> usize;

    /// The header row of a sheet.
    fn headers(&self, sheet: &str) -> Option<Vec<String>>;

    fn create_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()>;

    /// Writes one cell, growing the sheet with empty rows when needed.
    fn write_cell(&self, sheet: &str, column: &str, row: usize, value: &str) -> Result<()>;

    /// Every (header, value) pair of one data row.
    fn row_record(&self, sheet: &str, row: usize) -> Vec<(String, String)> {
        let Some(headers) = self.headers(sheet) else {
            return Vec::new();
        };
        headers
            .into_iter()
            .filter_map(|header| {
                let value = self.lookup(sheet, &header, row)?;
                Some((header, value))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Sheet {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    fn column_index(&self, column: &str) -> Option<usize> {
        let column = column.trim();
        self.headers.iter().position(|h| h.trim() == column)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SheetFile {
    name: String,
    #[serde(default)]
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkbookFile {
    #[serde(default)]
    sheets: Vec<SheetFile>,
}

/// An in-memory workbook guarded by a read/write lock.
/// 由读写锁保护的内存工作簿。
#[derive(Debug, Default)]
pub struct Workbook {
    sheets: RwLock<BTreeMap<String, Sheet>>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a workbook from its TOML representation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: WorkbookFile = toml::from_str(content)?;
        let mut sheets = BTreeMap::new();
        for SheetFile { name, headers, rows } in file.sheets {
            if sheets.insert(name.clone(), Sheet { headers, rows }).is_some() {
                return Err(RunnerError::SheetExists(name));
            }
        }
        Ok(Self {
            sheets: RwLock::new(sheets),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let file = WorkbookFile {
            sheets: self
                .sheets
                .read()
                .iter()
                .map(|(name, sheet)| SheetFile {
                    name: name.clone(),
                    headers: sheet.headers.clone(),
                    rows: sheet.rows.clone(),
                })
                .collect(),
        };
        Ok(toml::to_string(&file)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Appends a data row to an existing sheet and returns its row number.
    pub fn push_row<S: AsRef<str>>(&self, sheet: &str, values: &[S]) -> Result<usize> {
        let mut sheets = self.sheets.write();
        let target = sheets
            .get_mut(sheet)
            .ok_or_else(|| RunnerError::SheetNotFound(sheet.to_string()))?;
        target
            .rows
            .push(values.iter().map(|v| v.as_ref().to_string()).collect());
        Ok(target.rows.len() + HEADER_ROW)
    }
}

impl TabularDataSource for Workbook {
    fn lookup(&self, sheet: &str, column: &str, row: usize) -> Option<String> {
        let sheets = self.sheets.read();
        let sheet = sheets.get(sheet)?;
        let col = sheet.column_index(column)?;
        if row == HEADER_ROW {
            return sheet.headers.get(col).cloned();
        }
        let values = sheet.rows.get(row.checked_sub(HEADER_ROW + 1)?)?;
        Some(values.get(col).cloned().unwrap_or_default())
    }

    fn row_count(&self, sheet: &str) -> usize {
        match self.sheets.read().get(sheet) {
            Some(sheet) if sheet.headers.is_empty() && sheet.rows.is_empty() => 0,
            Some(sheet) => sheet.rows.len() + HEADER_ROW,
            None => 0,
        }
    }

    fn headers(&self, sheet: &str) -> Option<Vec<String>> {
        self.sheets.read().get(sheet).map(|s| s.headers.clone())
    }

    fn create_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()> {
        let mut sheets = self.sheets.write();
        if sheets.contains_key(sheet) {
            return Err(RunnerError::SheetExists(sheet.to_string()));
        }
        sheets.insert(
            sheet.to_string(),
            Sheet {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn write_cell(&self, sheet: &str, column: &str, row: usize, value: &str) -> Result<()> {
        let mut sheets = self.sheets.write();
        let target = sheets
            .get_mut(sheet)
            .ok_or_else(|| RunnerError::SheetNotFound(sheet.to_string()))?;
        let col = target
            .column_index(column)
            .ok_or_else(|| RunnerError::ColumnNotFound {
                sheet: sheet.to_string(),
                column: column.to_string(),
            })?;
        if row <= HEADER_ROW {
            return Err(RunnerError::InvalidConfig(format!(
                "row {row} is not a data row of sheet '{sheet}'"
            )));
        }

        let index = row - HEADER_ROW - 1;
        if target.rows.len() <= index {
            target.rows.resize(index + 1, Vec::new());
        }
        let cells = &mut target.rows[index];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.to_string();
        Ok(())
    }
}
