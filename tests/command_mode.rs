//! Integration tests for the command line front end

use std::path::PathBuf;
use std::process::Command;

fn run_command(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_decel"))
        // Tests must be deterministic and not depend on a user's config.toml or DECEL_SCRIPT_DIR.
        .arg("--no-scripts")
        .args(args)
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

struct Cleanup(PathBuf);

impl Drop for Cleanup {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "decel_cli_{}_{}_{}",
        tag,
        std::process::id(),
        nanos
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_basic_arithmetic() {
    let (stdout, _, code) = run_command(&["-c", "5 + 3"]);
    assert_eq!(stdout.trim(), "8");
    assert_eq!(code, 0);
}

#[test]
fn test_pow_function() {
    let (stdout, _, code) = run_command(&["-c", "POW(2, 10)"]);
    assert_eq!(stdout.trim(), "1024");
    assert_eq!(code, 0);
}

#[test]
fn test_comparison_is_numeric() {
    let (stdout, _, code) = run_command(&["-c", "2 > 1"]);
    assert_eq!(stdout.trim(), "1");
    assert_eq!(code, 0);
}

#[test]
fn test_auto_strip_equals() {
    let (stdout1, _, _) = run_command(&["-c", "10 + 5"]);
    let (stdout2, _, _) = run_command(&["-c", "=10 + 5"]);
    assert_eq!(stdout1, stdout2);
}

#[test]
fn test_error_exit_code() {
    let (stdout, _, code) = run_command(&["-c", "undefined_function()"]);
    assert!(stdout.starts_with("#ERR"));
    assert_eq!(code, 1);
}

#[test]
fn test_division_by_zero() {
    let (stdout, _, code) = run_command(&["-c", "1/0"]);
    assert!(stdout.starts_with("#ERR"));
    assert_eq!(code, 1);
}

#[test]
fn test_empty_result() {
    let (stdout, _, code) = run_command(&["-c", "\"\""]);
    assert_eq!(stdout.trim(), "");
    assert_eq!(code, 0);
}

#[test]
fn test_command_reads_cells() {
    let (stdout, _, code) = run_command(&[
        "-s", "A1=1", "-s", "A2=2", "-s", "A3=3", "-c", "SUM(A1:A3)",
    ]);
    assert_eq!(stdout.trim(), "6");
    assert_eq!(code, 0);
}

#[test]
fn test_fill_and_print() {
    let (stdout, _, code) = run_command(&[
        "-s", "A1=1", "-s", "A2=2", "-s", "A3=3", "-s", "B1=A1 * 10", "--fill", "B1:B2:B3", "-p",
    ]);
    assert_eq!(stdout, "1,10\n2,20\n3,30\n");
    assert_eq!(code, 0);
}

#[test]
fn test_circular_reference() {
    let (stdout, stderr, code) = run_command(&["-s", "A1=B1", "-s", "B1=A1", "-c", "A1"]);
    assert!(stdout.starts_with("#ERR"));
    assert!(stderr.contains("circular reference"));
    assert_eq!(code, 1);
}

#[test]
fn test_write_and_reopen() {
    let dir = temp_dir("reopen");
    let _cleanup = Cleanup(dir.clone());
    let file = dir.join("book.json");
    let file = file.to_str().unwrap();

    let (_, stderr, code) = run_command(&[
        file, "-s", "A1=2", "-s", "B1=A1 ** 3", "-s", "A2=5", "--fill", "B1:B2:B2", "-w",
    ]);
    assert_eq!(code, 0, "{}", stderr);
    assert!(stderr.contains("Saved to"));

    let content = std::fs::read_to_string(file).unwrap();
    assert!(content.contains("\"formulae\""));
    assert!(content.contains("\"children\": \"B2\""));

    let (stdout, _, code) = run_command(&[file, "-c", "B2"]);
    assert_eq!(stdout.trim(), "125");
    assert_eq!(code, 0);
}

#[test]
fn test_write_without_file_fails() {
    let (_, stderr, code) = run_command(&["-s", "A1=1", "-w"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("--write"));
}

#[test]
fn test_custom_functions() {
    let dir = temp_dir("scripts");
    let _cleanup = Cleanup(dir.clone());
    std::fs::write(dir.join("double.rhai"), "fn double(x) { x * 2 }\n").unwrap();

    let (stdout, _, code) = run_command(&["--scripts", dir.to_str().unwrap(), "-c", "double(21)"]);
    assert_eq!(stdout.trim(), "42");
    assert_eq!(code, 0);
}

#[test]
fn test_unknown_option() {
    let (_, stderr, code) = run_command(&["--frobnicate"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unknown option"));
}

#[test]
fn test_function_listing() {
    let dir = temp_dir("listing");
    let _cleanup = Cleanup(dir.clone());
    std::fs::write(dir.join("double.rhai"), "fn double(x) { x * 2 }\n").unwrap();

    let (stdout, _, code) = run_command(&["--scripts", dir.to_str().unwrap(), "--functions"]);
    assert_eq!(code, 0);
    assert!(stdout.lines().any(|l| l.starts_with("SUM") && l.contains("Sum of numeric values")));
    assert!(stdout.lines().any(|l| l.starts_with("double") && l.contains("(script)")));
}
