//! End-to-end tests for the `ctxweave` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const CONFIG: &str = r#"template = 'defer trace.Start({{.Ctx}}, "{{.FuncName}}").End()'
imports = ["example.com/trace"]
"#;

const SOURCE: &str = r#"package svc

import "context"

func Get(ctx context.Context) error {
	return load(ctx)
}
"#;

/// A module with one eligible function and a config at its root.
fn setup_module() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ctxweave.toml"), CONFIG).unwrap();
    fs::create_dir(dir.path().join("svc")).unwrap();
    fs::write(dir.path().join("svc/get.go"), SOURCE).unwrap();
    dir
}

fn ctxweave(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ctxweave"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("CTXWEAVE_LOG")
        .output()
        .expect("failed to run ctxweave")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_apply_help() {
    let dir = TempDir::new().unwrap();
    let output = ctxweave(dir.path(), &["apply", "--help"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("Remove matching statements"));
    assert!(stdout.contains("--dry-run"));
}

#[test]
fn test_apply_writes_and_check_passes() {
    let dir = setup_module();
    let file = dir.path().join("svc/get.go");

    let output = ctxweave(dir.path(), &["check"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("need weaving"));

    let output = ctxweave(dir.path(), &["apply"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Summary:"));
    let woven = fs::read_to_string(&file).unwrap();
    assert!(woven.contains("\tdefer trace.Start(ctx, \"svc.Get\").End()\n\n\treturn load(ctx)\n"));
    assert!(woven.contains("import \"example.com/trace\""));

    let output = ctxweave(dir.path(), &["check"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("All files up to date"));

    let output = ctxweave(dir.path(), &["apply", "--remove"]);
    assert!(output.status.success());
    let restored = fs::read_to_string(&file).unwrap();
    assert!(!restored.contains("trace.Start"));
    assert!(restored.contains("error {\n\treturn load(ctx)\n}"));
}

#[test]
fn test_dry_run_json_report() {
    let dir = setup_module();
    let config = dir.path().join("ctxweave.toml");
    let output = ctxweave(
        dir.path(),
        &["apply", "--dry-run", "--json", "--config", config.to_str().unwrap()],
    );
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["inserted"], 1);
    assert_eq!(report["summary"]["changed"], 1);
    assert_eq!(report["files"][0]["status"], "changed");
    assert_eq!(report["files"][0]["functions"][0]["function"], "svc.Get");
    assert_eq!(report["files"][0]["functions"][0]["action"], "insert");

    assert_eq!(
        fs::read_to_string(dir.path().join("svc/get.go")).unwrap(),
        SOURCE
    );
}

#[test]
fn test_render_method_name() {
    let dir = setup_module();
    let output = ctxweave(
        dir.path(),
        &[
            "render",
            "--func",
            "Get",
            "--receiver",
            "Server",
            "--pointer",
            "--package",
            "svc",
        ],
    );
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "defer trace.Start(ctx, \"svc.(*Server).Get\").End()\n"
    );
}

#[test]
fn test_invalid_config_reports_suggestion() {
    let dir = setup_module();
    fs::write(
        dir.path().join("ctxweave.toml"),
        "template = 'defer trace.Start({{.Ctx}}, \"{{.FuncNme}}\").End()'\n",
    )
    .unwrap();

    let output = ctxweave(dir.path(), &["apply"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("FuncNme"));
    assert!(stderr.contains("FuncName"));
    assert_eq!(
        fs::read_to_string(dir.path().join("svc/get.go")).unwrap(),
        SOURCE
    );
}

#[test]
fn test_failing_pre_hook_aborts() {
    let dir = setup_module();
    fs::write(
        dir.path().join("ctxweave.toml"),
        format!("{CONFIG}\n[hooks]\npre = [\"exit 4\"]\n"),
    )
    .unwrap();

    let output = ctxweave(dir.path(), &["apply"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("pre hook failed"));
    assert_eq!(
        fs::read_to_string(dir.path().join("svc/get.go")).unwrap(),
        SOURCE
    );
}
