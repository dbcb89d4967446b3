//! Worker subprocess spawning.
//!
//! Workers are the same binary re-invoked with the hidden `worker`
//! subcommand, via `std::process::Command` rather than a bare `fork()`.
//! The channel pair exists before the process split (the child's piped
//! stdin/stdout), and `Command` prunes end ownership on both sides: the
//! supervisor keeps the inbound write end and outbound read end, the worker
//! inherits only the opposite ends.

use std::os::unix::io::OwnedFd;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use nix::unistd::Pid;
use tracing::debug;

use super::channel::{ChannelFd, FrameReceiver, FrameSender};
use super::notify;
use super::protocol::OperationTag;
use crate::error::{Result, SigcalcError};

/// A freshly spawned worker: its PID plus the supervisor-owned channel ends.
pub struct SpawnedWorker {
    pub pid: Pid,
    /// Write end of the worker's inbound channel.
    pub inbound: FrameSender,
    /// Read end of the worker's outbound channel.
    pub outbound: FrameReceiver,
}

/// Spawn one worker bound to `operation`.
///
/// The notification set is blocked in the child before `exec`, and the mask
/// survives `exec`, so a wake delivered in the window before the worker
/// installs its handlers stays pending instead of killing the child via the
/// signal's default disposition.
pub fn spawn_worker(program: &Path, operation: OperationTag) -> Result<SpawnedWorker> {
    let mut cmd = Command::new(program);
    cmd.arg("worker");
    cmd.arg("--operation");
    cmd.arg(operation.name());

    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::inherit()); // Worker logs go to the supervisor's stderr

    // Safety: the closure runs post-fork in a single-threaded child and only
    // calls the async-signal-safe sigprocmask.
    unsafe {
        cmd.pre_exec(|| {
            notify::notification_mask()
                .thread_block()
                .map_err(|e| std::io::Error::from_raw_os_error(e as i32))
        });
    }

    let mut child = cmd.spawn().map_err(|e| {
        SigcalcError::Setup(format!("failed to spawn '{}' worker: {}", operation, e))
    })?;
    let pid = Pid::from_raw(child.id() as i32);

    let stdin = child.stdin.take().ok_or_else(|| {
        SigcalcError::Setup(format!("worker '{}' stdin not captured", operation))
    })?;
    let stdout = child.stdout.take().ok_or_else(|| {
        SigcalcError::Setup(format!("worker '{}' stdout not captured", operation))
    })?;

    debug!(operation = %operation, pid = pid.as_raw(), "spawned worker");

    // The supervisor reaps via waitpid, so drop the Child handle and keep
    // only the pipe ends.
    Ok(SpawnedWorker {
        pid,
        inbound: FrameSender::new(ChannelFd::new(OwnedFd::from(stdin))),
        outbound: FrameReceiver::new(ChannelFd::new(OwnedFd::from(stdout))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failure_is_setup_error() {
        let err = spawn_worker(Path::new("/nonexistent/sigcalc"), OperationTag::Add)
            .err()
            .expect("spawn of a nonexistent program must fail");
        assert!(err.to_string().contains("Setup failed"));
    }
}
