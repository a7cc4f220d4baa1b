// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Integration tests for running the `prefix` executable against script
//! fixtures and checking stdout/exit code.

use std::path::{Path, PathBuf};
use std::process::Command;

fn prefix_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("prefix");
    path
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn run_script(fixture_name: &str) -> (String, String, i32) {
    let out = Command::new(prefix_binary())
        .arg(fixture(fixture_name))
        .output()
        .expect("failed to run prefix binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    let code = out.status.code().unwrap_or(-1);
    (stdout, stderr, code)
}

#[test]
fn runs_script_and_exits_zero_on_success() {
    let (stdout, stderr, code) = run_script("hello.pre");
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert_eq!(stdout.trim(), "11");
}

#[test]
fn division_by_zero_exits_with_runtime_category() {
    let (_stdout, stderr, code) = run_script("exit_div_zero.pre");
    assert_eq!(code, 4, "expected the runtime exit category, stderr: {}", stderr);
    assert!(stderr.contains("division by zero"));
}

#[test]
fn missing_script_file_exits_with_io_category() {
    let out = Command::new(prefix_binary())
        .arg("/nonexistent/path/does-not-exist.pre")
        .output()
        .expect("failed to run prefix binary");
    assert_eq!(out.status.code(), Some(1));
}
