//! The full run loop driven through a scripted console.

use std::time::Duration;

use devorch::config::{DevConfig, ServiceEntry};
use devorch::orchestrator::{Orchestrator, ShutdownReason};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::time::timeout;

fn config(root: &std::path::Path) -> DevConfig {
    let mut config = DevConfig::default();
    config.command_template = "sleep 60 # {name}".to_string();
    config.services = vec![ServiceEntry::named("http-api"), ServiceEntry::named("json-rpc")];
    config.status.addr = "127.0.0.1:0".to_string();
    config.watch.roots = vec![root.to_path_buf()];
    config.watch.debounce_ms = 100;
    config.regenerate.command = "true".to_string();
    config
}

/// Send `status` until the output contains `needle`.
async fn status_until(input: &mut DuplexStream, output: &mut DuplexStream, needle: &str) -> String {
    let mut seen = String::new();
    let mut buf = [0u8; 4096];
    for _ in 0..50 {
        input.write_all(b"status\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        while let Ok(Ok(n)) = timeout(Duration::from_millis(20), output.read(&mut buf)).await {
            if n == 0 {
                break;
            }
            seen.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
        if seen.contains(needle) {
            return seen;
        }
    }
    panic!("never saw {needle:?} in console output:\n{seen}");
}

#[tokio::test]
async fn test_run_restarts_on_change_and_quits() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("internal");
    std::fs::create_dir(&root).unwrap();

    let (console_in, mut input) = tokio::io::duplex(4096);
    let (mut output, console_out) = tokio::io::duplex(64 * 1024);

    let orchestrator = Orchestrator::new(config(&root)).unwrap();
    let run = tokio::spawn(orchestrator.run_with_console(BufReader::new(console_in), console_out));

    let text = status_until(&mut input, &mut output, "cycles: 1").await;
    assert!(text.contains("running"));
    assert!(text.contains("regenerations: 1 (0 failed)"));

    std::fs::write(root.join("main.go"), "package main\n").unwrap();
    let text = status_until(&mut input, &mut output, "cycles: 2").await;
    assert!(text.contains("main.go"));

    input.write_all(b"quit\n").await.unwrap();
    let reason = timeout(Duration::from_secs(10), run)
        .await
        .expect("run did not finish")
        .unwrap()
        .unwrap();
    assert_eq!(reason, ShutdownReason::Quit);
}

#[tokio::test]
async fn test_artifacts_written_during_regeneration_do_not_retrigger() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("internal");
    let generated_dir = root.join("interfaces/http");
    let endpoint_dir = root.join("user/interfaces/endpoint");
    std::fs::create_dir_all(&generated_dir).unwrap();
    std::fs::create_dir_all(&endpoint_dir).unwrap();

    let mut config = config(&root);
    // The artifact lands well before the step finishes.
    config.regenerate.command = format!(
        "echo package http > '{}'; sleep 0.5",
        generated_dir.join("zz_user.go").display()
    );
    config.watch.suppression_ms = 200;

    let (console_in, mut input) = tokio::io::duplex(4096);
    let (mut output, console_out) = tokio::io::duplex(64 * 1024);

    let orchestrator = Orchestrator::new(config).unwrap();
    let run = tokio::spawn(orchestrator.run_with_console(BufReader::new(console_in), console_out));

    status_until(&mut input, &mut output, "cycles: 1").await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    std::fs::write(endpoint_dir.join("user_endpoint.go"), "package endpoint\n").unwrap();
    status_until(&mut input, &mut output, "regenerations: 2").await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let text = status_until(&mut input, &mut output, "SERVICE").await;
    let latest = text.rsplit("SERVICE").next().unwrap();
    assert!(latest.contains("cycles: 2"), "unexpected status:\n{latest}");
    assert!(latest.contains("user_endpoint.go"), "unexpected status:\n{latest}");

    input.write_all(b"quit\n").await.unwrap();
    let reason = timeout(Duration::from_secs(10), run)
        .await
        .expect("run did not finish")
        .unwrap()
        .unwrap();
    assert_eq!(reason, ShutdownReason::Quit);
}

#[tokio::test]
async fn test_run_stops_when_input_closes() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("pkg");
    std::fs::create_dir(&root).unwrap();
    let mut config = config(&root);
    config.regenerate.enabled = false;

    let orchestrator = Orchestrator::new(config).unwrap();
    let reason = timeout(
        Duration::from_secs(10),
        orchestrator.run_with_console(&b""[..], tokio::io::sink()),
    )
    .await
    .expect("run did not finish")
    .unwrap();
    assert_eq!(reason, ShutdownReason::InputClosed);
}
