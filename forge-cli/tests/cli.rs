//! End-to-end tests for the `forge` binary

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn script(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, source).unwrap();
    path
}

fn forge(args: &[&str], cwd: &Path, stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_forge"))
        .args(args)
        .current_dir(cwd)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("FORGE_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_run_answers_prompts_from_stdin() {
    let dir = TempDir::new().unwrap();
    script(&dir, "hello.fg", "let name = input(\"Name? \");\nprint(\"Hello,\", name);\n");

    let output = forge(&["run", "hello.fg"], dir.path(), "Ada\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Name? \n› Ada\nHello, Ada\n");
}

#[test]
fn test_run_failure_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    script(&dir, "bad.fg", "print(\"start\");\nprint(nope);\n");

    let output = forge(&["run", "bad.fg"], dir.path(), "");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout(&output), "start\nNameError: name 'nope' is not defined\n");
}

#[test]
fn test_run_stops_when_stdin_closes() {
    let dir = TempDir::new().unwrap();
    script(&dir, "ask.fg", "input(\"?\");\n");

    let output = forge(&["run", "ask.fg"], dir.path(), "");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("stdin closed"));
}

#[test]
fn test_run_writes_transcript_and_banner() {
    let dir = TempDir::new().unwrap();
    script(&dir, "t.fg", "print(input(\"P\"));\n");

    let output = forge(&["run", "t.fg", "--banner", "--transcript", "out.json"], dir.path(), "X\n");
    assert!(output.status.success());

    let transcript = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
    assert!(transcript.contains("\"state\": \"finished\""));
    assert!(transcript.contains("\"$ forge run t.fg\""));
    assert!(transcript.contains("\"› X\""));
}

#[test]
fn test_run_reads_config_next_to_script() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("forge.toml"), "[terminal]\necho_prefix = \">>\"\n").unwrap();
    script(&dir, "echo.fg", "print(input());\n");

    let output = forge(&["run", "echo.fg"], dir.path(), "hi\n");
    assert_eq!(stdout(&output), ">> hi\nhi\n");
}

#[test]
fn test_rewrite_prints_unit() {
    let dir = TempDir::new().unwrap();
    script(&dir, "r.fg", "let a = input(\"a\");\n");

    let output = forge(&["rewrite", "r.fg"], dir.path(), "");
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "async fn __forge_main__() {\n    let a = await input(\"a\");\n}\n\nawait __forge_main__();\n"
    );
}

#[test]
fn test_check_reports_every_error() {
    let dir = TempDir::new().unwrap();
    script(&dir, "c.fg", "let = 1;\nprint(2);\nlet y 3;\n");

    let output = forge(&["check", "c.fg"], dir.path(), "");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Parse error at 1:5"));
    assert!(stderr.contains("Parse error at 3:7"));
    assert!(stderr.contains("Found 2 error(s)"));
}

#[test]
fn test_fmt_check() {
    let dir = TempDir::new().unwrap();
    script(&dir, "messy.fg", "let x=1+2;");
    script(&dir, "tidy.fg", "let x = 1 + 2;\n");

    assert_eq!(forge(&["fmt", "--check", "messy.fg"], dir.path(), "").status.code(), Some(1));
    assert!(forge(&["fmt", "--check", "tidy.fg"], dir.path(), "").status.success());
    assert_eq!(stdout(&forge(&["fmt", "messy.fg"], dir.path(), "")), "let x = 1 + 2;\n");
}
