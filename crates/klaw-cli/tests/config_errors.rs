use std::process::Command;

use tempfile::TempDir;

use klaw_core::config::{write_config, KlawConfig};

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_klaw"));
    cmd.env_remove("KLAW_TOKEN").env_remove("KLAW_LOG");
    cmd
}

fn go_config() -> KlawConfig {
    KlawConfig {
        extensions: vec![".go".to_string()],
        ..KlawConfig::default()
    }
}

#[test]
fn config_command_redacts_token() {
    let repo = TempDir::new().expect("repo");
    write_config(repo.path(), &go_config()).expect("config");

    let output = bin()
        .env("KLAW_TOKEN", "ghp_supersecret")
        .arg("--root")
        .arg(repo.path())
        .arg("config")
        .output()
        .expect("config");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(!stdout.contains("ghp_supersecret"));
    assert!(stdout.contains("set (KLAW_TOKEN)"));
    assert!(stdout.contains(".go"));
}

#[test]
fn missing_extensions_exit_with_config_code() {
    let repo = TempDir::new().expect("repo");
    write_config(repo.path(), &KlawConfig::default()).expect("config");

    let output = bin()
        .arg("--root")
        .arg(repo.path())
        .args(["list", "--offline"])
        .output()
        .expect("list");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("[error]"));
    assert!(stderr.contains("extensions"));
}

#[test]
fn missing_config_file_exits_with_config_code() {
    let repo = TempDir::new().expect("repo");
    let output = bin()
        .arg("--root")
        .arg(repo.path())
        .arg("--config")
        .arg(repo.path().join("absent.yml"))
        .args(["list", "--offline"])
        .output()
        .expect("list");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("absent.yml"));
}

#[test]
fn create_refuses_offline_mode() {
    let repo = TempDir::new().expect("repo");
    write_config(repo.path(), &go_config()).expect("config");
    std::fs::write(repo.path().join("a.go"), "// TODO: needs an issue\n").expect("write");

    let output = bin()
        .arg("--root")
        .arg(repo.path())
        .args(["create", "--offline", "--yes"])
        .output()
        .expect("create");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(
        std::fs::read_to_string(repo.path().join("a.go")).expect("read"),
        "// TODO: needs an issue\n"
    );
}

#[test]
fn online_list_without_token_fails_before_scanning() {
    let repo = TempDir::new().expect("repo");
    write_config(repo.path(), &go_config()).expect("config");

    let output = bin()
        .arg("--root")
        .arg(repo.path())
        .output()
        .expect("default command");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("KLAW_TOKEN"));
    assert!(output.stdout.is_empty());
}

#[test]
fn token_without_github_remote_is_a_config_error() {
    let repo = TempDir::new().expect("repo");
    write_config(repo.path(), &go_config()).expect("config");
    std::fs::create_dir_all(repo.path().join(".git")).expect("git dir");
    std::fs::write(
        repo.path().join(".git/config"),
        "[remote \"origin\"]\n\turl = https://gitlab.com/a/b.git\n",
    )
    .expect("git config");

    let output = bin()
        .env("KLAW_TOKEN", "t")
        .arg("--root")
        .arg(repo.path())
        .arg("list")
        .output()
        .expect("list");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn version_needs_no_config() {
    let repo = TempDir::new().expect("repo");
    let output = bin()
        .current_dir(repo.path())
        .arg("version")
        .output()
        .expect("version");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.starts_with("klaw "));
}
