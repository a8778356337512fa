mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

use common::{SAMPLE_DATA, create_invalid_toml, setup_project};

fn row_runner() -> Command {
    let mut cmd = Command::cargo_bin("row-runner").unwrap();
    cmd.args(["--lang", "en"]);
    cmd
}

/// `init --non-interactive` writes both starter files, and the starter
/// project runs green out of the box.
///
/// `init --non-interactive` 写入两个初始文件，且初始项目可直接运行通过。
#[cfg(unix)]
#[test]
fn test_init_then_run_starter_project() {
    let dir = tempdir().unwrap();

    row_runner()
        .current_dir(dir.path())
        .args(["init", "--non-interactive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created RowRunner.toml"));
    assert!(dir.path().join("RowRunner.toml").exists());
    assert!(dir.path().join("data.toml").exists());

    row_runner()
        .current_dir(dir.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("All tests passed!"))
        .stdout(predicate::str::contains("Login_02"));
}

#[test]
fn test_init_does_not_overwrite_existing_suite() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("RowRunner.toml"), "# mine").unwrap();

    row_runner()
        .current_dir(dir.path())
        .args(["init", "--non-interactive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(dir.path().join("RowRunner.toml")).unwrap(), "# mine");
}

/// A passing suite writes both reports and skips its no-prod case.
#[cfg(unix)]
#[test]
fn test_successful_run_with_reports() {
    let project = setup_project(
        r#"
project = "Shop"
default_command = "sh pass.sh"

[environment]
name = "qa"
release_version = "1.0"

[[cases]]
name = "Login_01"
sheet = "Login"
expected_steps = 1

[[cases]]
name = "Login_02"
sheet = "Login"
no_prod = true
"#,
        SAMPLE_DATA,
    );
    fs::write(
        project.path().join("pass.sh"),
        r#"echo '##step {"action": "Open", "expected": "Shown", "actual": "Shown", "status": "PASS"}'"#,
    )
    .unwrap();

    row_runner()
        .current_dir(project.path())
        .args(["run", "--html", "out/report.html", "--json", "out/summary.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped Login_02"))
        .stdout(predicate::str::contains("--- Test Summary ---"))
        .stdout(predicate::str::contains("All tests passed!"));

    let html = fs::read_to_string(project.path().join("out/report.html")).unwrap();
    assert!(html.contains("Login_01"));
    assert!(html.contains("Shop"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(project.path().join("out/summary.json")).unwrap()).unwrap();
    assert_eq!(json["total_tests"], 2);
    assert_eq!(json["passed"], 1);
    assert_eq!(json["skipped"], 1);
}

/// A failing step fails the run and shows the failure details.
#[cfg(unix)]
#[test]
fn test_failing_step_fails_the_run() {
    let project = setup_project(
        r#"
default_command = "sh check.sh"
retries = 0

[[cases]]
name = "Cart_01"
sheet = "Cart"
expected_steps = 2
"#,
        SAMPLE_DATA,
    );
    fs::write(
        project.path().join("check.sh"),
        [
            r#"echo '##step {"action": "Add item", "expected": "In cart", "actual": "In cart", "status": "PASS"}'"#,
            r#"echo '##step {"action": "Checkout", "expected": "Paid", "actual": "Declined", "status": "FAIL"}'"#,
        ]
        .join("\n"),
    )
    .unwrap();

    row_runner()
        .current_dir(project.path())
        .arg("run")
        .assert()
        .failure()
        .stdout(predicate::str::contains("--- Failure Details ---"))
        .stdout(predicate::str::contains("Checkout"))
        .stderr(predicate::str::contains("1 test(s) failed."));
}

#[cfg(unix)]
#[test]
fn test_missing_data_row_fails_the_run() {
    let project = setup_project(
        r#"
default_command = "true"

[[cases]]
name = "Login_42"
sheet = "Login"
"#,
        SAMPLE_DATA,
    );

    row_runner()
        .current_dir(project.path())
        .arg("run")
        .assert()
        .failure()
        .stdout(predicate::str::contains("No data row for Login_42"));
}

#[cfg(unix)]
#[test]
fn test_split_runner_announces_its_share() {
    let project = setup_project(
        r#"
default_command = "true"

[[cases]]
name = "Cart_01"
sheet = "Cart"

[[cases]]
name = "Cart_02"
sheet = "Cart"
"#,
        SAMPLE_DATA,
    );

    row_runner()
        .current_dir(project.path())
        .args(["run", "--total-runners", "2", "--runner-index", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running as runner 2/2 with 1 case(s)"));
}

#[test]
fn test_invalid_suite_file_is_reported() {
    let project = setup_project("", SAMPLE_DATA);
    let invalid = create_invalid_toml(&project);

    row_runner()
        .current_dir(project.path())
        .arg("run")
        .arg("--config")
        .arg(&invalid)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse suite file"));
}

#[test]
fn test_missing_suite_file_is_reported() {
    let dir = tempdir().unwrap();

    row_runner()
        .current_dir(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read suite file"));
}
