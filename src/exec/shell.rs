// src/exec/shell.rs

//! Running shell lines with the host's standard streams.

use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tracing::{error, info};

use crate::errors::{ObserverError, Result};

/// Build a shell command appropriate for the platform.
///
/// Output is inherited so build and run output shows up directly in the
/// terminal running observer.
pub fn shell_command(line: &str) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    };

    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd
}

/// Run `line` to completion and return its exit status.
pub async fn run_to_completion(line: &str) -> io::Result<ExitStatus> {
    shell_command(line).status().await
}

/// Start `line` without waiting for it.
///
/// On Unix the shell leads a new process group so that [`kill_tree`] also
/// reaches whatever it started (`cd app && ./server`, pipelines, background
/// jobs). Being outside the terminal's foreground group, such commands do not
/// receive the terminal's Ctrl-C and cannot read from it.
///
/// The shell itself is killed if its handle is dropped. On other platforms
/// only the shell is killed and commands it started may keep running.
pub fn spawn(line: &str) -> io::Result<Child> {
    let mut cmd = shell_command(line);
    cmd.kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    cmd.spawn()
}

/// Send SIGKILL to `child` and, on Unix, to every process in its group.
///
/// The child still has to be waited on afterwards.
pub fn kill_tree(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            return kill_group(pid);
        }
    }
    child.start_kill()
}

/// SIGKILL every process in group `pgid`. A group that is already gone is
/// not an error.
#[cfg(unix)]
pub fn kill_group(pgid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// Human-readable exit status, e.g. `exit status 1` or `signal 9`.
pub fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit status {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {signal}");
        }
    }
    status.to_string()
}

/// Run `commands` one after another, stopping at the first failure.
pub async fn run_init_commands(commands: &[String]) -> Result<()> {
    for command in commands {
        info!(command = %command, "INIT");

        let reason = match run_to_completion(command).await {
            Ok(status) if status.success() => continue,
            Ok(status) => describe_status(&status),
            Err(err) => err.to_string(),
        };

        error!(command = %command, reason = %reason, "init command failed");
        return Err(ObserverError::InitCommandFailed {
            command: command.clone(),
            reason,
        });
    }
    Ok(())
}
