use assert_cmd::Command;
use predicates::str::contains as str_contains;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn run_cli(data_dir: &Path, script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.env("STUDY_HUB_DATA_DIR", data_dir)
        .env_remove("STUDY_HUB_SQLITE")
        .env_remove("GEMINI_API_KEY")
        .env("RUST_LOG", "off")
        .write_stdin(script.to_string())
        .assert()
}

#[test]
fn cli_status_shows_baseline_gpa() {
    let dir = tempdir().unwrap();
    run_cli(dir.path(), "status\nquit\n")
        .success()
        .stdout(str_contains("GPA      : 3.750"));
}

#[test]
fn cli_grades_update_gpa() {
    let dir = tempdir().unwrap();
    run_cli(
        dir.path(),
        "grade add MAT 1110 continuous 25\ngrade add MAT1110 mid-term 22\ngrade add mat 1110 final 35 Final exam\ngpa\nquit\n",
    )
    .success()
    .stdout(str_contains("Cumulative GPA: 3.781"))
    .stdout(str_contains("MAT 1110"));
}

#[test]
fn cli_rejects_score_above_weight() {
    let dir = tempdir().unwrap();
    run_cli(dir.path(), "grade add BIS 2122 continuous 31\nquit\n")
        .success()
        .stdout(str_contains("exceeds the Continuous maximum"));
}

#[test]
fn cli_attendance_toggle_and_summary() {
    let dir = tempdir().unwrap();
    run_cli(
        dir.path(),
        "attend MAT 1110 present 2025-01-06\nattend MAT 1110 present 2025-01-06\nattend MAT 1110 absent 2025-01-08\nattendance\nquit\n",
    )
    .success()
    .stdout(str_contains("Marked MAT 1110-2025-01-06 present."))
    .stdout(str_contains("Cleared MAT 1110-2025-01-06."))
    .stdout(str_contains("Marked MAT 1110-2025-01-08 absent."));
}

#[test]
fn cli_unknown_course_is_reported() {
    let dir = tempdir().unwrap();
    run_cli(dir.path(), "attend ACC 1010 present\nquit\n")
        .success()
        .stdout(str_contains("Unknown course"));
}

#[test]
fn cli_state_persists_between_runs() {
    let dir = tempdir().unwrap();
    run_cli(dir.path(), "note Keep going\ndark on\nquit\n")
        .success()
        .stdout(str_contains("Note saved."));
    assert!(dir.path().join("personalNote.json").exists());

    run_cli(dir.path(), "note\ndark\nquit\n")
        .success()
        .stdout(str_contains("Keep going"))
        .stdout(str_contains("Dark mode off."));
}

#[test]
fn cli_ask_without_key_prints_fallback() {
    let dir = tempdir().unwrap();
    run_cli(dir.path(), "ask What is marketing mix?\nchat\nquit\n")
        .success()
        .stdout(str_contains("I hit a glitch. Try again!"))
        .stdout(str_contains("you: What is marketing mix?"));
}

#[test]
fn cli_grades_csv_export_and_import() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("grades.csv");
    let csv = csv_path.to_string_lossy().to_string();
    let script = format!(
        "grade add GED 1117 final 30\nexport grades {csv}\ngrade add GED 1117 continuous 20\nimport grades {csv}\ngrades\nquit\n"
    );
    let assert = run_cli(dir.path(), &script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("Imported 1 grades"), "import not reported:\n{output}");
    let after_import = output.split("Imported 1 grades").last().unwrap_or_default();
    assert!(
        !after_import.contains("Continuous"),
        "grade added after export should be replaced:\n{after_import}"
    );
}
