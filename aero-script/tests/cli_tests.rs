//! Run the `aero-script` binary against init scripts and `--eval` chunks and
//! check what it prints.
//!
//! `XDG_CONFIG_HOME` points at a scratch directory so a real
//! `~/.config/aerospace/init.lua` never leaks into a run.

use std::path::Path;
use std::process::{Command, Output};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn binary() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_aero-script"))
}

fn run(config_home: &Path, args: &[&str]) -> Output {
    Command::new(binary())
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to spawn aero-script: {e}"))
}

fn stdout_lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stdout).lines().map(str::to_owned).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn defaults_without_init_script() {
    let home = tempfile::tempdir().unwrap();
    let out = run(home.path(), &[]);
    assert!(out.status.success());
    let lines = stdout_lines(&out);
    assert!(lines.contains(&"accordion_padding = 30".to_owned()), "{lines:?}");
    assert!(lines.contains(&"mode main (active): 0 bindings".to_owned()), "{lines:?}");
}

#[test]
fn default_init_location_is_used() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("aerospace");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("init.lua"), "aero.config.accordion_padding(11)").unwrap();

    let out = run(home.path(), &[]);
    assert!(out.status.success());
    assert!(stdout_lines(&out).contains(&"accordion_padding = 11".to_owned()));
}

#[test]
fn explicit_init_and_eval() {
    let home = tempfile::tempdir().unwrap();
    let init = home.path().join("custom.lua");
    std::fs::write(&init, "aero.keymap.set('main', 'cmd-shift-k', 'focus up')").unwrap();

    let init = init.to_string_lossy().into_owned();
    let out = run(home.path(), &["--init", &init, "--eval", "return 1 + 1, 'ok'"]);
    assert!(out.status.success());
    let lines = stdout_lines(&out);
    assert_eq!(lines[0], "2\tok");
    assert!(lines.contains(&"mode main (active): 1 bindings".to_owned()), "{lines:?}");
    assert!(lines.contains(&"  cmd-shift-k -> focus up".to_owned()), "{lines:?}");
}

#[test]
fn script_error_exits_with_status_one() {
    let home = tempfile::tempdir().unwrap();
    let out = run(home.path(), &["--eval", "aero.api.gap_set(99, 1)"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Invalid gap position value"), "{stderr}");
    assert!(out.stdout.is_empty());
}
