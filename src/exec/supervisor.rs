// src/exec/supervisor.rs

//! Build-then-run process supervision.
//!
//! A rebuild runs the build command to completion, then (when a run command
//! is configured) replaces the single supervised run process:
//!
//! ```text
//! Idle -> Building -> {BuildFailed, BuildSucceeded} -> RunStarting -> Running
//!      -> {SelfKilled, ExitedCleanly, ExitedWithError}
//! ```
//!
//! A failed build does not stop the run step. Replacing a live process asks
//! its exit-watch task to kill it and waits until it has been reaped before
//! the replacement starts. The exit-watch task sets the kill marker itself,
//! right before killing, so a process that already exited on its own is
//! still reported as an unexpected exit.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::process::Child;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::FatalSender;
use crate::errors::ObserverError;
use crate::exec::shell;
use crate::watch::debounce::RebuildTarget;
use crate::watch::spec::WatchSpec;

/// Lifecycle lines are promoted to `info` for watchers with `debug = true`.
macro_rules! lifecycle {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+)
        } else {
            debug!($($arg)+)
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded,
    /// Non-zero exit or failure to launch the shell.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The watcher has no run command.
    NotConfigured,
    Started { pid: Option<u32> },
    /// The run command could not be launched; no process is supervised.
    StartFailed(String),
    /// The previous instance could not be killed; a fatal error was raised
    /// and no replacement was started.
    KillFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    pub build: BuildOutcome,
    pub run: RunOutcome,
}

/// How a supervised run process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    SupervisorKilled,
    ExitedCleanly,
    ExitedWithError(String),
}

/// How a live run process is signalled when it has to be replaced.
///
/// Defaults to [`shell::kill_tree`].
pub type KillFn = fn(&mut Child) -> io::Result<()>;

struct KillRequest {
    ack: oneshot::Sender<io::Result<()>>,
}

/// One live instance of the run command.
///
/// The child itself is owned by the exit-watch task; this handle keeps the
/// kill marker and the channel used to ask that task for a kill.
pub struct SupervisedProcess {
    command: String,
    pid: Option<u32>,
    kill_requested: Arc<AtomicBool>,
    kill_tx: Option<oneshot::Sender<KillRequest>>,
    exit_watch: JoinHandle<ExitOutcome>,
}

impl std::fmt::Debug for SupervisedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisedProcess")
            .field("command", &self.command)
            .field("pid", &self.pid)
            .field("kill_requested", &self.kill_requested())
            .finish_non_exhaustive()
    }
}

impl SupervisedProcess {
    fn watch(child: Child, command: String, ctx: ExitContext) -> Self {
        let pid = child.id();
        let kill_requested = Arc::new(AtomicBool::new(false));
        let (kill_tx, kill_rx) = oneshot::channel();

        let exit_watch = tokio::spawn(watch_exit(
            child,
            kill_rx,
            Arc::clone(&kill_requested),
            ctx,
        ));

        Self {
            command,
            pid,
            kill_requested,
            kill_tx: Some(kill_tx),
            exit_watch,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn kill_requested(&self) -> bool {
        self.kill_requested.load(Ordering::SeqCst)
    }

    pub fn has_exited(&self) -> bool {
        self.exit_watch.is_finished()
    }

    /// Wait until the process has exited and been classified.
    pub async fn wait_exit(mut self) -> ExitOutcome {
        match (&mut self.exit_watch).await {
            Ok(outcome) => outcome,
            Err(err) => ExitOutcome::ExitedWithError(format!("exit watch failed: {err}")),
        }
    }

    /// Kill the process and wait until it has been reaped.
    ///
    /// A process that exits on its own before the kill request is handled
    /// keeps its own outcome.
    async fn terminate(mut self) -> io::Result<ExitOutcome> {
        if let Some(kill_tx) = self.kill_tx.take() {
            let (ack_tx, ack_rx) = oneshot::channel();
            // A closed channel means the exit-watch task already finished.
            if kill_tx.send(KillRequest { ack: ack_tx }).is_ok() {
                ack_rx.await.unwrap_or(Ok(()))?;
            }
        }
        Ok(self.wait_exit().await)
    }
}

impl Drop for SupervisedProcess {
    fn drop(&mut self) {
        if self.exit_watch.is_finished() {
            return;
        }
        self.kill_requested.store(true, Ordering::SeqCst);
        // The child is dropped with the exit-watch task and `kill_on_drop`
        // takes the shell down; the rest of its group needs its own signal.
        #[cfg(unix)]
        {
            if let Some(pid) = self.pid {
                let _ = shell::kill_group(pid);
            }
        }
        self.exit_watch.abort();
    }
}

struct ExitContext {
    label: String,
    command: String,
    verbose: bool,
    fatal: FatalSender,
    kill: KillFn,
}

async fn watch_exit(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<KillRequest>,
    kill_requested: Arc<AtomicBool>,
    ctx: ExitContext,
) -> ExitOutcome {
    let status = tokio::select! {
        // An exit that is already observable wins over a pending kill request.
        biased;
        status = child.wait() => status,
        Ok(request) = &mut kill_rx => match child.try_wait() {
            // Exited on its own before the request was handled.
            Ok(Some(status)) => {
                let _ = request.ack.send(Ok(()));
                Ok(status)
            }
            _ => {
                kill_requested.store(true, Ordering::SeqCst);
                match (ctx.kill)(&mut child) {
                    Ok(()) => {
                        let status = child.wait().await;
                        let _ = request.ack.send(Ok(()));
                        status
                    }
                    Err(err) => {
                        kill_requested.store(false, Ordering::SeqCst);
                        let _ = request.ack.send(Err(err));
                        child.wait().await
                    }
                }
            }
        },
    };

    if kill_requested.load(Ordering::SeqCst) {
        lifecycle!(ctx.verbose, watcher = %ctx.label, command = %ctx.command, "KILLED");
        return ExitOutcome::SupervisorKilled;
    }

    let description = match status {
        Ok(status) if status.success() => {
            info!(watcher = %ctx.label, command = %ctx.command, "run command exited");
            return ExitOutcome::ExitedCleanly;
        }
        Ok(status) => shell::describe_status(&status),
        Err(err) => format!("wait failed: {err}"),
    };

    error!(
        watcher = %ctx.label,
        command = %ctx.command,
        status = %description,
        "run command failed"
    );
    let _ = ctx.fatal.send(ObserverError::UnexpectedExit {
        watcher: ctx.label,
        command: ctx.command,
        status: description.clone(),
    });
    ExitOutcome::ExitedWithError(description)
}

/// Owns the build/run commands of one watcher and its supervised process.
pub struct ProcessSupervisor {
    label: String,
    build_command: String,
    run_command: Option<String>,
    verbose: bool,
    current: Option<SupervisedProcess>,
    fatal: FatalSender,
    kill: KillFn,
}

impl ProcessSupervisor {
    pub fn new(spec: &WatchSpec, fatal: FatalSender) -> Self {
        Self {
            label: spec.label.clone(),
            build_command: spec.build_command.clone(),
            run_command: spec.run_command.clone(),
            verbose: spec.debug,
            current: None,
            fatal,
            kill: shell::kill_tree,
        }
    }

    /// Replace how a live run process is killed before its replacement
    /// starts.
    pub fn with_kill_fn(mut self, kill: KillFn) -> Self {
        self.kill = kill;
        self
    }

    /// Build, then restart the run command if there is one.
    pub async fn rebuild(&mut self) -> RebuildReport {
        let build = self.build().await;
        let run = match self.run_command.clone() {
            Some(command) => self.restart(&command).await,
            None => RunOutcome::NotConfigured,
        };
        RebuildReport { build, run }
    }

    /// The supervised run process, if one was started and not replaced.
    pub fn current(&self) -> Option<&SupervisedProcess> {
        self.current.as_ref()
    }

    /// Detach the current run process from the supervisor.
    ///
    /// The next rebuild starts without a kill. Dropping the returned handle
    /// kills the process.
    pub fn take_current(&mut self) -> Option<SupervisedProcess> {
        self.current.take()
    }

    /// True while a supervised run process is alive.
    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(|p| !p.has_exited())
    }

    /// Kill the supervised process, if any, and return how it ended.
    ///
    /// A process that already exited on its own keeps that outcome; an
    /// unexpected exit has been reported on the fatal channel by then.
    pub async fn shutdown(&mut self) -> Option<ExitOutcome> {
        let process = self.current.take()?;
        let pid = process.pid();
        match process.terminate().await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                warn!(watcher = %self.label, ?pid, error = %err, "failed to stop run command");
                None
            }
        }
    }

    async fn build(&self) -> BuildOutcome {
        lifecycle!(self.verbose, watcher = %self.label, command = %self.build_command, "BUILD");

        let reason = match shell::run_to_completion(&self.build_command).await {
            Ok(status) if status.success() => return BuildOutcome::Succeeded,
            Ok(status) => shell::describe_status(&status),
            Err(err) => err.to_string(),
        };

        error!(
            watcher = %self.label,
            command = %self.build_command,
            reason = %reason,
            "build command failed"
        );
        BuildOutcome::Failed(reason)
    }

    async fn restart(&mut self, command: &str) -> RunOutcome {
        if let Some(previous) = self.current.take() {
            if !previous.has_exited() {
                let pid = previous.pid();
                lifecycle!(self.verbose, watcher = %self.label, ?pid, "killing previous run command");
                if let Err(source) = previous.terminate().await {
                    error!(
                        watcher = %self.label,
                        ?pid,
                        error = %source,
                        "error killing previous run command"
                    );
                    let _ = self.fatal.send(ObserverError::KillFailed {
                        watcher: self.label.clone(),
                        source,
                    });
                    return RunOutcome::KillFailed;
                }
            }
        }

        lifecycle!(self.verbose, watcher = %self.label, command = %command, "RUN");

        match shell::spawn(command) {
            Ok(child) => {
                let process = SupervisedProcess::watch(
                    child,
                    command.to_string(),
                    ExitContext {
                        label: self.label.clone(),
                        command: command.to_string(),
                        verbose: self.verbose,
                        fatal: self.fatal.clone(),
                        kill: self.kill,
                    },
                );
                let pid = process.pid();
                self.current = Some(process);
                RunOutcome::Started { pid }
            }
            Err(err) => {
                error!(
                    watcher = %self.label,
                    command = %command,
                    error = %err,
                    "run command failed to start"
                );
                RunOutcome::StartFailed(err.to_string())
            }
        }
    }
}

impl RebuildTarget for Mutex<ProcessSupervisor> {
    fn rebuild(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let mut supervisor = self.lock().await;
            let report = supervisor.rebuild().await;
            debug!(watcher = %supervisor.label, ?report, "rebuild finished");
        })
    }
}
