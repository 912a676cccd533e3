//! Integration tests for devorch.

mod orchestrator;
mod process;

use std::process::Command;

#[test]
fn test_dev_command_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_devorch"))
        .args(["dev", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("--services"), "Help should mention --services");
    assert!(stdout.contains("--no-generate"), "Help should mention --no-generate");
}

#[test]
fn test_config_command_applies_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_devorch"))
        .current_dir(dir.path())
        .args([
            "config",
            "--services",
            "gateway,worker",
            "--status-addr",
            "127.0.0.1:9999",
            "--no-generate",
        ])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let config: devorch::config::DevConfig = toml::from_str(&stdout).unwrap();
    let names: Vec<&str> = config.services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["gateway", "worker"]);
    assert_eq!(config.status.addr, "127.0.0.1:9999");
    assert!(!config.regenerate.enabled);
}

#[test]
fn test_missing_config_file_is_fatal() {
    let output = Command::new(env!("CARGO_BIN_EXE_devorch"))
        .args(["config", "--config", "/nonexistent/devorch.toml"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("devorch.toml"));
}

#[test]
fn test_duplicate_services_are_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_devorch"))
        .args(["config", "--services", "api,api"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("configured twice"));
}
