use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};

fn stk() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stk"))
}

fn write_source(dir: &Path, name: &str, source: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, source).unwrap();
    path
}

// --- compile ---

#[test]
fn compile_and_run_prints_dumps() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "prog.stk", "1 2 +\n.\n\n1 2.0 + .\n");
    let out_file = dir.path().join("prog.out");
    let out = stk()
        .args(["compile", src.to_str().unwrap(), "-o", out_file.to_str().unwrap(), "-r"])
        .output()
        .expect("failed to run stk");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "3\n3.0\n");
    assert!(out_file.exists());
}

#[test]
fn compile_without_run_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "prog.stk", "7 .");
    let out_file = dir.path().join("prog.out");
    let out = stk()
        .args(["c", src.to_str().unwrap(), "--output", out_file.to_str().unwrap()])
        .output()
        .expect("failed to run stk");
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    assert!(out_file.exists());
}

#[test]
fn compile_default_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "prog.stk", "7 .");
    let out = stk()
        .current_dir(dir.path())
        .args(["compile", src.to_str().unwrap()])
        .output()
        .expect("failed to run stk");
    assert!(out.status.success());
    assert!(dir.path().join("output.out").exists());
}

#[test]
fn compile_unknown_token_fails() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "bad.stk", "1 dup +");
    let out = stk()
        .current_dir(dir.path())
        .args(["compile", src.to_str().unwrap()])
        .output()
        .expect("failed to run stk");
    assert!(!out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stderr).trim(),
        "error: unknown token 'dup' at position 2"
    );
}

// --- execute ---

#[test]
fn execute_compiled_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "prog.stk", "0 if 2 . else 3 . end");
    let out_file = dir.path().join("prog.out");
    let status = stk()
        .args(["compile", src.to_str().unwrap(), "-o", out_file.to_str().unwrap()])
        .status()
        .expect("failed to run stk");
    assert!(status.success());

    let out = stk()
        .args(["e", out_file.to_str().unwrap()])
        .output()
        .expect("failed to run stk");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "3\n");
}

#[test]
fn execute_runtime_error_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "prog.stk", "1 . +");
    let out_file = dir.path().join("prog.out");
    let out = stk()
        .args(["compile", src.to_str().unwrap(), "-o", out_file.to_str().unwrap(), "--run"])
        .output()
        .expect("failed to run stk");
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "1\n");
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("error: stack underflow"));
}

#[test]
fn execute_rejects_foreign_file() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = write_source(dir.path(), "bogus.out", "definitely not a program");
    let out = stk()
        .args(["execute", bogus.to_str().unwrap()])
        .output()
        .expect("failed to run stk");
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert_eq!(String::from_utf8_lossy(&out.stderr).trim(), "error: invalid file format");
}

#[test]
fn execute_missing_file_fails() {
    let out = stk()
        .args(["execute", "/definitely/not/here.out"])
        .output()
        .expect("failed to run stk");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).starts_with("error: "));
}

#[test]
fn while_latches_condition_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "loop.stk", "1 while\n  1 .\nend\n");
    let out_file = dir.path().join("loop.out");
    let out = stk()
        .args([
            "compile", src.to_str().unwrap(), "-o", out_file.to_str().unwrap(), "-r",
            "--max-steps", "20",
        ])
        .output()
        .expect("failed to run stk");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("1\n1\n"));
    assert_eq!(
        String::from_utf8_lossy(&out.stderr).trim(),
        "error: step limit of 20 exceeded"
    );
}

#[test]
fn refresh_while_pops_condition_left_by_body() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "loop.stk", "1 2 0 0 1 while\n  3 .\n  =\nend\n");
    let out_file = dir.path().join("loop.out");
    let out = stk()
        .args([
            "compile", src.to_str().unwrap(), "-o", out_file.to_str().unwrap(), "-r",
            "--refresh-while",
        ])
        .output()
        .expect("failed to run stk");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8_lossy(&out.stdout), "3\n3\n");
}

// --- inspect ---

#[test]
fn inspect_prints_json_program() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "prog.stk", "1 2.5 + .");
    let out_file = dir.path().join("prog.out");
    let status = stk()
        .args(["compile", src.to_str().unwrap(), "-o", out_file.to_str().unwrap()])
        .status()
        .expect("failed to run stk");
    assert!(status.success());

    let out = stk()
        .args(["inspect", out_file.to_str().unwrap()])
        .output()
        .expect("failed to run stk");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("\"Int\": 1"), "got: {}", stdout);
    assert!(stdout.contains("\"Float\": 2.5"), "got: {}", stdout);
    assert!(stdout.contains("\"Dump\""), "got: {}", stdout);
}

// --- repl ---

#[test]
fn repl_carries_stack_and_survives_errors() {
    let mut child = stk()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run stk");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"1 2\nbogus\n+ .\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "> [1, 2]\n> > 3\n[]\n> \n");
    assert_eq!(
        String::from_utf8_lossy(&out.stderr).trim(),
        "error: unknown token 'bogus' at position 0"
    );
}

#[cfg(unix)]
#[test]
fn repl_interrupt_exits_cleanly() {
    let mut child = stk()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run stk");

    // The handler is installed before the first prompt is written
    let mut prompt = [0u8; 2];
    child.stdout.as_mut().unwrap().read_exact(&mut prompt).unwrap();
    assert_eq!(&prompt, b"> ");

    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(rc, 0);

    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(0));
}
