// Shared test helpers for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use row_runner::core::context::{BrowserDriver, EvidenceSource};
use row_runner::core::data::Workbook;
use row_runner::{RunnerError, Status, StepRecord};
use tempfile::{TempDir, tempdir};

pub const SAMPLE_DATA: &str = r#"
[[sheets]]
name = "Login"
headers = ["TestMethodName", "UserName", "Password"]
rows = [
    ["Login_01", "alice", "secret"],
    ["Login_02", "bob", "wrong"],
    ["Login_01", "shadowed", "never-used"],
]

[[sheets]]
name = "Cart"
headers = ["TestMethodName", "Item"]
rows = [
    ["Cart_01", "book"],
    ["Cart_02", "pen"],
]

[[sheets]]
name = "Empty"
"#;

pub fn sample_workbook() -> Workbook {
    Workbook::from_toml_str(SAMPLE_DATA).expect("sample workbook should parse")
}

/// Builds a step record with an explicit status.
pub fn step(test_case_id: &str, action: &str, expected: &str, status: Status) -> StepRecord {
    StepRecord::new(test_case_id, action, expected)
        .actual(expected)
        .status(status)
}

/// Creates a project directory holding `RowRunner.toml` and `data.toml`.
pub fn setup_project(suite_toml: &str, data_toml: &str) -> TempDir {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    fs::write(temp_dir.path().join("RowRunner.toml"), suite_toml).expect("Failed to write RowRunner.toml");
    fs::write(temp_dir.path().join("data.toml"), data_toml).expect("Failed to write data.toml");
    temp_dir
}

/// Helper function to create an invalid TOML configuration
pub fn create_invalid_toml(temp_dir: &TempDir) -> PathBuf {
    let suite_path = temp_dir.path().join("invalid.toml");
    let content = r#"
language = "en"
# Invalid TOML - missing closing bracket
[[cases]
name = "Login_01"
"#;
    fs::write(&suite_path, content).unwrap();
    suite_path
}

/// A browser driver double that counts quits and captures numbered evidence.
#[derive(Debug, Clone, Default)]
pub struct FakeDriver {
    pub quits: Arc<AtomicUsize>,
    pub captures: Arc<AtomicUsize>,
    pub fail_capture: bool,
    pub fail_quit: bool,
}

impl FakeDriver {
    pub fn quit_count(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }
}

impl EvidenceSource for FakeDriver {
    fn capture_evidence(&self) -> row_runner::Result<String> {
        if self.fail_capture {
            return Err(RunnerError::Evidence("browser window is gone".into()));
        }
        let n = self.captures.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("screenshots/{n}.png"))
    }
}

impl BrowserDriver for FakeDriver {
    fn name(&self) -> &str {
        "fake"
    }

    fn quit(&mut self) -> row_runner::Result<()> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        if self.fail_quit {
            return Err(RunnerError::Evidence("quit failed".into()));
        }
        Ok(())
    }
}
