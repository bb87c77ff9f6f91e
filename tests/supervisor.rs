#![cfg(unix)]

mod common;
use crate::common::builders::WatcherConfigBuilder;
use crate::common::init_tracing;
use crate::common::with_timeout;

use std::io;
use std::process::Command;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::sleep;
use observer::engine::fatal_channel;
use observer::errors::ObserverError;
use observer::exec::{BuildOutcome, ExitOutcome, ProcessSupervisor, RunOutcome};

fn pid_alive(pid: u32) -> bool {
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn started_pid(run: &RunOutcome) -> u32 {
    match run {
        RunOutcome::Started { pid: Some(pid) } => *pid,
        other => panic!("expected a started run process, got {other:?}"),
    }
}

#[tokio::test]
async fn rebuild_replaces_previous_run_process() {
    init_tracing();
    let (fatal_tx, mut fatal_rx) = fatal_channel();
    let spec = WatcherConfigBuilder::new("true")
        .label("svc")
        .run_command("sleep 5")
        .spec();
    let mut supervisor = ProcessSupervisor::new(&spec, fatal_tx);

    let first = supervisor.rebuild().await;
    assert_eq!(first.build, BuildOutcome::Succeeded);
    let first_pid = started_pid(&first.run);
    assert!(supervisor.is_running());

    let second = supervisor.rebuild().await;
    let second_pid = started_pid(&second.run);
    assert_ne!(first_pid, second_pid);

    // The predecessor was reaped before the replacement started.
    assert!(!pid_alive(first_pid));
    assert!(pid_alive(second_pid));
    assert!(supervisor.is_running());

    sleep(Duration::from_millis(200)).await;
    assert!(fatal_rx.try_recv().is_err(), "supervisor kill was reported as fatal");

    assert_eq!(supervisor.shutdown().await, Some(ExitOutcome::SupervisorKilled));
    assert!(!supervisor.is_running());
    assert!(!pid_alive(second_pid));
    sleep(Duration::from_millis(100)).await;
    assert!(fatal_rx.try_recv().is_err(), "shutdown was reported as fatal");
}

#[tokio::test]
async fn failed_build_still_starts_run_command() {
    let (fatal_tx, _fatal_rx) = fatal_channel();
    let spec = WatcherConfigBuilder::new("exit 3")
        .run_command("sleep 5")
        .spec();
    let mut supervisor = ProcessSupervisor::new(&spec, fatal_tx);

    let report = supervisor.rebuild().await;
    assert_eq!(report.build, BuildOutcome::Failed("exit status 3".to_string()));
    started_pid(&report.run);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn build_only_watcher_has_nothing_to_run() {
    let (fatal_tx, _fatal_rx) = fatal_channel();
    let spec = WatcherConfigBuilder::new("true").spec();
    let mut supervisor = ProcessSupervisor::new(&spec, fatal_tx);

    let report = supervisor.rebuild().await;
    assert_eq!(report.build, BuildOutcome::Succeeded);
    assert_eq!(report.run, RunOutcome::NotConfigured);
    assert!(supervisor.current().is_none());
}

#[tokio::test]
async fn unexpected_non_zero_exit_is_fatal() {
    init_tracing();
    let (fatal_tx, mut fatal_rx) = fatal_channel();
    let spec = WatcherConfigBuilder::new("true")
        .label("svc")
        .run_command("exit 1")
        .spec();
    let mut supervisor = ProcessSupervisor::new(&spec, fatal_tx);

    supervisor.rebuild().await;

    let err = with_timeout(fatal_rx.recv()).await.expect("fatal channel closed");
    assert!(err.is_fatal());
    match err {
        ObserverError::UnexpectedExit {
            watcher,
            command,
            status,
        } => {
            assert_eq!(watcher, "svc");
            assert_eq!(command, "exit 1");
            assert_eq!(status, "exit status 1");
        }
        other => panic!("expected UnexpectedExit, got {other:?}"),
    }
}

#[tokio::test]
async fn external_kill_is_fatal() {
    let (fatal_tx, mut fatal_rx) = fatal_channel();
    let spec = WatcherConfigBuilder::new("true")
        .run_command("sleep 5")
        .spec();
    let mut supervisor = ProcessSupervisor::new(&spec, fatal_tx);

    let pid = started_pid(&supervisor.rebuild().await.run);
    let killed = Command::new("kill").arg("-9").arg(pid.to_string()).status().unwrap();
    assert!(killed.success());

    let err = with_timeout(fatal_rx.recv()).await.expect("fatal channel closed");
    match err {
        ObserverError::UnexpectedExit { status, .. } => assert_eq!(status, "signal 9"),
        other => panic!("expected UnexpectedExit, got {other:?}"),
    }
}

#[tokio::test]
async fn clean_exit_is_not_fatal() {
    let (fatal_tx, mut fatal_rx) = fatal_channel();
    let spec = WatcherConfigBuilder::new("true").run_command("true").spec();
    let mut supervisor = ProcessSupervisor::new(&spec, fatal_tx);

    supervisor.rebuild().await;
    sleep(Duration::from_millis(300)).await;

    assert!(fatal_rx.try_recv().is_err());
    let process = supervisor.current().expect("run process handle");
    assert!(process.has_exited());
    assert!(!process.kill_requested());

    let process = supervisor.take_current().expect("run process handle");
    assert_eq!(process.wait_exit().await, ExitOutcome::ExitedCleanly);

    // A rebuild after a clean exit starts a fresh process without a kill.
    let report = supervisor.rebuild().await;
    started_pid(&report.run);
    sleep(Duration::from_millis(300)).await;
    assert_eq!(supervisor.shutdown().await, Some(ExitOutcome::ExitedCleanly));
}

#[tokio::test]
async fn wait_exit_reports_unexpected_exit() {
    let (fatal_tx, mut fatal_rx) = fatal_channel();
    let spec = WatcherConfigBuilder::new("true").run_command("exit 4").spec();
    let mut supervisor = ProcessSupervisor::new(&spec, fatal_tx);

    supervisor.rebuild().await;
    let process = supervisor.take_current().expect("run process handle");
    assert_eq!(
        with_timeout(process.wait_exit()).await,
        ExitOutcome::ExitedWithError("exit status 4".to_string())
    );
    assert!(matches!(
        fatal_rx.try_recv(),
        Ok(ObserverError::UnexpectedExit { .. })
    ));
}

#[tokio::test]
async fn exit_racing_a_kill_stays_fatal() {
    init_tracing();
    let (fatal_tx, mut fatal_rx) = fatal_channel();
    let spec = WatcherConfigBuilder::new("true")
        .label("svc")
        .run_command("exit 1")
        .spec();
    let mut supervisor = ProcessSupervisor::new(&spec, fatal_tx);

    supervisor.rebuild().await;

    // Block the runtime thread so the process exits before its exit-watch
    // task is ever polled. The kill request then reaches a process that is
    // already gone.
    std::thread::sleep(Duration::from_millis(300));

    assert_eq!(
        supervisor.shutdown().await,
        Some(ExitOutcome::ExitedWithError("exit status 1".to_string()))
    );
    match fatal_rx.try_recv() {
        Ok(ObserverError::UnexpectedExit { watcher, status, .. }) => {
            assert_eq!(watcher, "svc");
            assert_eq!(status, "exit status 1");
        }
        other => panic!("expected UnexpectedExit, got {other:?}"),
    }
}

fn refuse_kill(_: &mut Child) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::PermissionDenied,
        "operation not permitted",
    ))
}

#[tokio::test]
async fn kill_failure_is_fatal_and_skips_replacement() {
    init_tracing();
    let (fatal_tx, mut fatal_rx) = fatal_channel();
    let spec = WatcherConfigBuilder::new("true")
        .label("svc")
        .run_command("sleep 5")
        .spec();
    let mut supervisor = ProcessSupervisor::new(&spec, fatal_tx).with_kill_fn(refuse_kill);

    started_pid(&supervisor.rebuild().await.run);

    let report = supervisor.rebuild().await;
    assert_eq!(report.build, BuildOutcome::Succeeded);
    assert_eq!(report.run, RunOutcome::KillFailed);
    assert!(supervisor.current().is_none());
    assert!(!supervisor.is_running());

    match with_timeout(fatal_rx.recv()).await {
        Some(ObserverError::KillFailed { watcher, source }) => {
            assert_eq!(watcher, "svc");
            assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
        }
        other => panic!("expected KillFailed, got {other:?}"),
    }

    sleep(Duration::from_millis(200)).await;
    assert!(fatal_rx.try_recv().is_err(), "more than one fatal error");
}

/// A zombie or vanished `/proc` entry both count as dead.
#[cfg(target_os = "linux")]
fn proc_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .and_then(|rest| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z"),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn shutdown_kills_shell_grandchildren() {
    let out = tempfile::tempdir().unwrap();
    let pid_file = out.path().join("child.pid");
    let (fatal_tx, _fatal_rx) = fatal_channel();
    let spec = WatcherConfigBuilder::new("true")
        .run_command(&format!("sleep 30 & echo $! > {}; wait", pid_file.display()))
        .spec();
    let mut supervisor = ProcessSupervisor::new(&spec, fatal_tx);

    supervisor.rebuild().await;

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    let grandchild: u32 = loop {
        if let Some(pid) = std::fs::read_to_string(&pid_file)
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            break pid;
        }
        assert!(std::time::Instant::now() < deadline, "pid file never written");
        sleep(Duration::from_millis(20)).await;
    };
    assert!(proc_alive(grandchild));

    assert_eq!(supervisor.shutdown().await, Some(ExitOutcome::SupervisorKilled));

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while proc_alive(grandchild) {
        assert!(std::time::Instant::now() < deadline, "grandchild {grandchild} survived shutdown");
        sleep(Duration::from_millis(20)).await;
    }
}
