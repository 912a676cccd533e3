//! Restart cycles against real services.

use std::sync::Arc;
use std::time::Duration;

use devorch::config::ServiceSpec;
use devorch::orchestrator::{
    CommandRegenerator, CycleTrigger, Debouncer, RegenerateOutcome, Regenerator,
    RestartCoordinator, ShutdownController,
};
use devorch::process::{platform_control, ProcessSupervisor, ServiceState};
use devorch::state::SharedState;
use devorch::watcher::{ChangeClassifier, ChangeEvent, ChangeKind};

fn specs() -> Vec<ServiceSpec> {
    ["http-api", "json-rpc"]
        .into_iter()
        .map(|name| ServiceSpec {
            name: name.to_string(),
            command: "sleep 60".to_string(),
        })
        .collect()
}

fn coordinator(regenerate: Option<&str>) -> Arc<RestartCoordinator> {
    let supervisor = ProcessSupervisor::new(SharedState::from_specs(&specs()), platform_control());
    let regenerator =
        regenerate.map(|cmd| Arc::new(CommandRegenerator::new(cmd)) as Arc<dyn Regenerator>);
    Arc::new(RestartCoordinator::new(supervisor, regenerator))
}

fn starts(coord: &RestartCoordinator) -> Vec<u64> {
    coord.state().lock().services().map(|s| s.starts).collect()
}

fn all_running(coord: &RestartCoordinator) -> bool {
    coord
        .state()
        .lock()
        .services()
        .all(|s| s.state == ServiceState::Running && s.pid.is_some())
}

#[tokio::test]
async fn test_failing_regeneration_still_starts_services() {
    let coord = coordinator(Some("exit 1"));

    let report = coord.restart_all(CycleTrigger::Startup, true).await.unwrap();
    assert!(matches!(report.regenerate, RegenerateOutcome::Failed(_)));
    assert!(report.start.all_started());
    assert!(all_running(&coord));

    {
        let state = coord.state().lock();
        assert!(state.last_regenerate.is_none());
        assert!(state.last_restart.is_some());
        assert!(state.pending_regenerate);
    }

    coord.stop_for_shutdown().await;
}

#[tokio::test]
async fn test_restart_replaces_every_process() {
    let coord = coordinator(None);
    coord.restart_all(CycleTrigger::Startup, false).await;
    let before: Vec<Option<u32>> = coord.state().lock().services().map(|s| s.pid).collect();

    let report = coord.restart_all(CycleTrigger::Manual, false).await.unwrap();
    assert_eq!(report.stopped, 2);

    let after: Vec<Option<u32>> = coord.state().lock().services().map(|s| s.pid).collect();
    for (old, new) in before.iter().zip(&after) {
        assert!(new.is_some());
        assert_ne!(old, new);
    }
    assert_eq!(starts(&coord), [2, 2]);

    coord.stop_for_shutdown().await;
}

#[tokio::test]
async fn test_burst_of_changes_restarts_once() {
    let coord = coordinator(Some("true"));
    coord.restart_all(CycleTrigger::Startup, false).await;
    assert_eq!(starts(&coord), [1, 1]);

    let classifier = ChangeClassifier::from_config(&Default::default()).unwrap();
    let debouncer = Arc::new(Debouncer::new(Duration::from_millis(100), coord.state().clone()));
    let shutdown = ShutdownController::new();
    let timer = {
        let debouncer = debouncer.clone();
        let coord = coord.clone();
        let token = shutdown.token();
        tokio::spawn(async move { debouncer.run(&coord, token).await })
    };

    for path in [
        "internal/server/handler.go",
        "internal/store/db.go",
        "pkg/util/strings.go",
    ] {
        let event = ChangeEvent::new(path, ChangeKind::Modified);
        let classification = classifier.classify(&event, None);
        assert!(classification.relevant);
        assert!(!classification.needs_regenerate);
        debouncer.record(&event, classification);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(coord.state().lock().cycles, 2);
    assert_eq!(coord.state().lock().regenerations, 0);
    assert_eq!(starts(&coord), [2, 2]);

    shutdown.request(devorch::orchestrator::ShutdownReason::Quit);
    timer.await.unwrap();
    shutdown.execute(&coord).await;
}

#[tokio::test]
async fn test_interface_change_regenerates_before_restart() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("regenerated");
    let command = format!("touch '{}'", marker.display());
    let coord = coordinator(Some(&command));
    coord.restart_all(CycleTrigger::Startup, false).await;
    assert!(!marker.exists());

    let classifier = ChangeClassifier::from_config(&Default::default()).unwrap();
    let event = ChangeEvent::new("internal/interfaces/endpoint/user_endpoint.go", ChangeKind::Modified);
    let classification = classifier.classify(&event, None);
    assert!(classification.needs_regenerate);

    let debouncer = Debouncer::new(Duration::from_millis(50), coord.state().clone());
    debouncer.record(&event, classification);

    let report = coord.restart_all(CycleTrigger::FileChange, false).await.unwrap();
    assert_eq!(report.regenerate, RegenerateOutcome::Succeeded);
    assert!(marker.exists());
    assert!(!coord.state().lock().pending_regenerate);

    // Generated output written right after regeneration is suppressed.
    let marks = coord.state().lock().regenerate_marks();
    assert!(!marks.in_progress);
    let generated = ChangeEvent::new("internal/interfaces/http/zz_user.go", ChangeKind::Created);
    assert!(!classifier.classify_with(&generated, marks).relevant);

    coord.stop_for_shutdown().await;
}

#[tokio::test]
async fn test_manual_restart_waits_for_running_cycle() {
    let coord = coordinator(Some("sleep 0.3"));
    coord.restart_all(CycleTrigger::Startup, false).await;

    let automatic = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.restart_all(CycleTrigger::FileChange, true).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let manual = coord.restart_all(CycleTrigger::Manual, true).await.unwrap();
    let automatic = automatic.await.unwrap().unwrap();

    assert!(manual.began >= automatic.finished, "cycles overlapped");
    assert_eq!(automatic.id + 1, manual.id);
    assert_eq!(starts(&coord), [3, 3]);
    assert!(all_running(&coord));

    coord.stop_for_shutdown().await;
}

#[tokio::test]
async fn test_shutdown_during_cycle_lets_it_finish() {
    let coord = coordinator(Some("sleep 0.3"));
    coord.restart_all(CycleTrigger::Startup, false).await;

    let cycle = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.restart_all(CycleTrigger::Manual, true).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let shutdown = ShutdownController::new();
    assert!(shutdown.execute(&coord).await);

    let report = cycle.await.unwrap().expect("in-flight cycle completes");
    assert!(report.start.all_started());
    assert!(coord.restart_all(CycleTrigger::Manual, false).await.is_none());

    let state = coord.state().lock();
    assert!(state.shutting_down);
    assert!(state
        .services()
        .all(|s| s.state == ServiceState::Stopped && s.pid.is_none()));
}
