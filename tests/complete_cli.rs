//! Integration tests for the `tabkit` CLI.
//!
//! External probing is exercised against stub executables written into temp
//! directories, so no tool on the host system is ever probed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn tabkit() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tabkit"));
    // Pin the config lookup away from the host user's real config.
    cmd.env("XDG_CONFIG_HOME", env!("CARGO_TARGET_TMPDIR"));
    cmd
}

fn stdout_lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("apple"), b"").unwrap();
    fs::create_dir(dir.path().join("Banana")).unwrap();
    fs::write(dir.path().join(".hidden"), b"").unwrap();
    dir
}

// ── Path completion ─────────────────────────────────────────

#[test]
fn path_lists_directories_first_then_files() {
    let dir = fixture_dir();
    let out = tabkit()
        .args(["path", "", "--cwd", dir.path().to_str().unwrap()])
        .output()
        .expect("run tabkit path");

    assert!(out.status.success());
    assert_eq!(stdout_lines(&out), ["Banana/", "apple"]);
}

#[test]
fn path_dot_fragment_shows_hidden_entries() {
    let dir = fixture_dir();
    let out = tabkit()
        .args(["path", ".", "--cwd", dir.path().to_str().unwrap()])
        .output()
        .expect("run tabkit path");

    assert!(out.status.success());
    assert_eq!(stdout_lines(&out), [".hidden"]);
}

#[test]
fn path_missing_directory_prints_nothing() {
    let dir = fixture_dir();
    let out = tabkit()
        .args(["path", "nosuch/", "--cwd", dir.path().to_str().unwrap()])
        .output()
        .expect("run tabkit path");

    assert!(out.status.success());
    assert!(stdout_lines(&out).is_empty());
}

// ── First-token and built-in completion ─────────────────────

#[test]
fn complete_first_token_offers_builtins() {
    let dir = fixture_dir();
    let out = tabkit()
        .args(["complete", "cl", "--cwd", dir.path().to_str().unwrap()])
        .output()
        .expect("run tabkit complete");

    assert!(out.status.success());
    let lines = stdout_lines(&out);
    assert!(lines.contains(&"clear".to_string()));
    assert_eq!(lines.iter().filter(|l| *l == "clear").count(), 1);
}

#[test]
fn complete_builtin_flags_skip_used_ones() {
    let dir = fixture_dir();
    let out = tabkit()
        .args(["complete", "ls -a -", "--cwd", dir.path().to_str().unwrap()])
        .output()
        .expect("run tabkit complete");

    assert!(out.status.success());
    let lines = stdout_lines(&out);
    assert!(lines.contains(&"-A".to_string()));
    assert!(!lines.contains(&"-a".to_string()));
}

#[test]
fn complete_json_output_is_an_array() {
    let dir = fixture_dir();
    let out = tabkit()
        .args([
            "complete",
            "--format",
            "json",
            "--cwd",
            dir.path().to_str().unwrap(),
            "cl",
        ])
        .output()
        .expect("run tabkit complete");

    assert!(out.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("valid json output");
    let values = parsed.as_array().expect("array");
    assert!(values.iter().any(|v| v == "clear"));
}

#[test]
fn complete_survives_unterminated_quote() {
    let dir = fixture_dir();
    let out = tabkit()
        .args([
            "complete",
            "ls \"unterm",
            "--cwd",
            dir.path().to_str().unwrap(),
        ])
        .output()
        .expect("run tabkit complete");

    assert!(out.status.success());
    assert!(stdout_lines(&out).is_empty());
}

// ── External probing against stub executables ───────────────

#[cfg(unix)]
mod external {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, Instant};

    const STUB_HELP: &str = r#"cat <<'EOF'
Usage: toolx [options] <FILE>
Commands:
  fetch    Download data
  push     Upload data
Options:
  -v, --verbose   Verbose output
  -x              Extra checks
EOF"#;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn external_flags_are_probed_from_help_output() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "toolx", STUB_HELP);

        let out = tabkit()
            .args([
                "complete",
                "./toolx -",
                "--cwd",
                dir.path().to_str().unwrap(),
            ])
            .output()
            .expect("run tabkit complete");

        assert!(out.status.success());
        assert_eq!(stdout_lines(&out), ["--verbose", "-v", "-x"]);
    }

    #[test]
    fn external_subcommands_are_probed_from_help_output() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "toolx", STUB_HELP);

        let out = tabkit()
            .args([
                "complete",
                "./toolx ",
                "--cwd",
                dir.path().to_str().unwrap(),
            ])
            .output()
            .expect("run tabkit complete");

        assert!(out.status.success());
        assert_eq!(stdout_lines(&out), ["fetch", "push"]);
    }

    #[test]
    fn probe_reports_flags_and_positionals() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "toolx", STUB_HELP);

        let out = tabkit()
            .args([
                "probe",
                "--format",
                "json",
                "--cwd",
                dir.path().to_str().unwrap(),
                "./toolx",
            ])
            .output()
            .expect("run tabkit probe");

        assert!(out.status.success());
        let parsed: serde_json::Value =
            serde_json::from_slice(&out.stdout).expect("valid json output");
        let flags = parsed["flags"].as_array().unwrap();
        assert!(flags.iter().any(|v| v == "--verbose"));
        assert!(flags.iter().any(|v| v == "-x"));
        let positionals = parsed["positionals"].as_array().unwrap();
        assert!(positionals.iter().any(|v| v == "fetch"));
    }

    #[test]
    fn hanging_probe_is_bounded_and_falls_back_to_paths() {
        let config_home = tempfile::tempdir().unwrap();
        let tabkit_dir = config_home.path().join("tabkit");
        fs::create_dir_all(&tabkit_dir).unwrap();
        fs::write(
            tabkit_dir.join("config.toml"),
            "[probe]\ntimeout_ms = 200\n",
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "sleepy", "sleep 30");

        let start = Instant::now();
        let out = tabkit()
            .env("XDG_CONFIG_HOME", config_home.path())
            .args([
                "complete",
                "./sleepy ",
                "--cwd",
                dir.path().to_str().unwrap(),
            ])
            .output()
            .expect("run tabkit complete");

        assert!(out.status.success());
        assert!(start.elapsed() < Duration::from_secs(15), "probing is bounded");
        // Nothing scraped, so the fragment degrades to path completion.
        assert_eq!(stdout_lines(&out), ["sleepy"]);
    }
}
