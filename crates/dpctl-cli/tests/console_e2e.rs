use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn dpctl_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dpctl"))
}

fn dpctl(args: &[&str]) -> Output {
    Command::new(dpctl_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .expect("run dpctl")
}

fn dpctl_stdin(args: &[&str], input: &str) -> Output {
    let mut child = Command::new(dpctl_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn dpctl");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait dpctl")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn inline_commands_run_in_order() {
    let out = dpctl(&["add", "worker", "0", "1", "--", "show", "worker"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("Worker ID"));
    assert!(text.contains("RUNNING"));
}

#[test]
fn script_stops_at_first_failing_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("setup.dpctl");
    fs::write(&script, "add worker 0 1\nbogus\nshow worker\n").expect("script");

    let out = dpctl(&["--script", script.to_str().expect("utf8 path")]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("*** Error: Unknown command \"bogus\"."));
    assert!(!stdout(&out).contains("Worker ID"));
}

#[test]
fn script_from_stdin() {
    let out = dpctl_stdin(&["--script", "-"], "help\n");
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("show tc worker WORKER_ID..."));
    assert!(stdout(&out).contains("Show the list of traffic classes"));
}

#[test]
fn batch_echo_prints_prompt_and_command() {
    let out = dpctl_stdin(&["--batch", "--echo"], "show driver\n");
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("localhost:10514 $ show driver\n"));
    assert!(text.contains("PMDPort"));
}

#[test]
fn bind_and_grammar_errors_are_reported() {
    let out = dpctl(&["add", "worker", "x", "1"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("*** Error: int: Expected an integer\n"));

    let out = dpctl(&["daemon", "connect", "localhost", "http"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("*** Error: TCP port: Expected an integer\n"));

    let out = dpctl(&["add"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("*** Error: Incomplete command \"add\". Candidates:"));
    assert!(err.contains("add worker WORKER_ID CORE"));
}

#[test]
fn generated_port_name_is_announced() {
    let out = dpctl(&["add", "port", "PMDPort", "--", "show", "port"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("The new port \"pmdport0\" has been created"));
    assert!(text.contains("pmdport0     Driver PMDPort"));
}

#[test]
fn commands_fail_after_disconnect() {
    let out = dpctl(&["daemon", "disconnect", "--", "show", "worker"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("*** Error: Not connected to the daemon"));
}

#[test]
fn missing_script_is_fatal() {
    let out = dpctl(&["--script", "/definitely/not/here.dpctl"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("cannot open script"));
}
