//! Process tree teardown.

use std::path::Path;
use std::time::Duration;

use devorch::config::ServiceSpec;
use devorch::process::{platform_control, ProcessSupervisor, ServiceState};
use devorch::state::SharedState;

fn supervisor(name: &str, command: String) -> ProcessSupervisor {
    let state = SharedState::from_specs(&[ServiceSpec {
        name: name.to_string(),
        command,
    }]);
    ProcessSupervisor::new(state, platform_control())
}

async fn read_pid(path: &Path) -> i32 {
    for _ in 0..100 {
        if let Ok(text) = std::fs::read_to_string(path) {
            if let Ok(pid) = text.trim().parse() {
                return pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("pid file {} never written", path.display());
}

/// Alive and not a zombie.
fn is_running(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            .is_some_and(|state| state != 'Z' && state != 'X'),
        Err(_) => false,
    }
}

async fn wait_gone(pid: i32) -> bool {
    for _ in 0..100 {
        if !is_running(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_stop_kills_grandchild() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("grandchild.pid");
    let sup = supervisor(
        "tree",
        format!("sleep 300 & echo $! > '{}'; wait", pid_file.display()),
    );

    sup.start("tree").unwrap();
    let grandchild = read_pid(&pid_file).await;
    assert!(is_running(grandchild));

    assert!(sup.stop_tree("tree").await.unwrap());
    assert!(wait_gone(grandchild).await, "grandchild {grandchild} survived stop");

    let state = sup.state().lock();
    let svc = state.service("tree").unwrap();
    assert_eq!(svc.state, ServiceState::Stopped);
    assert!(svc.pid.is_none());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_stop_kills_background_sibling() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("orphan.pid");
    // The shell backgrounds one sleep, then execs into another. Both share
    // the process group.
    let sup = supervisor(
        "orphaning",
        format!("sleep 300 & echo $! > '{}'; exec sleep 300", pid_file.display()),
    );

    let leader = sup.start("orphaning").unwrap();
    let background = read_pid(&pid_file).await;
    assert_ne!(i64::from(background), i64::from(leader));

    assert!(sup.stop_tree("orphaning").await.unwrap());
    assert!(wait_gone(background).await, "background {background} survived stop");
}

#[tokio::test]
async fn test_stop_waits_for_exit_record() {
    let sup = supervisor("sleeper", "sleep 30".to_string());
    let pid = sup.start("sleeper").unwrap();
    assert!(pid > 0);
    assert_eq!(
        sup.state().lock().service("sleeper").unwrap().state,
        ServiceState::Running
    );

    assert!(sup.stop_tree("sleeper").await.unwrap());
    assert!(!sup.stop_tree("sleeper").await.unwrap());

    let state = sup.state().lock();
    let svc = state.service("sleeper").unwrap();
    assert_eq!(svc.state, ServiceState::Stopped);
    assert!(svc.handle.is_none());
    assert_eq!(svc.starts, 1);
}

#[tokio::test]
async fn test_restart_starts_fresh_process() {
    let sup = supervisor("sleeper", "sleep 30".to_string());
    let first = sup.start("sleeper").unwrap();
    sup.stop_tree("sleeper").await.unwrap();
    let second = sup.start("sleeper").unwrap();

    assert_ne!(first, second);
    assert_eq!(sup.state().lock().service("sleeper").unwrap().starts, 2);
    sup.stop_all().await;
}
