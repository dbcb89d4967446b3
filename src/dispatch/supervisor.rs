//! Dispatch supervisor: owns every channel end on the coordinator side and
//! drives the send → notify → receive cycle.
//!
//! The supervisor is single-threaded and `dispatch` takes `&mut self`, so
//! each request is fully processed before the next one starts. Combined with
//! the 1:1 operation-to-worker binding this makes the single-flight
//! invariant hold by construction: a worker is never woken again before its
//! previous response has been consumed.

use std::path::Path;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use super::channel::{ChannelError, FrameReceiver, FrameSender};
use super::notify::{self, Notification};
use super::protocol::{
    decode_result, encode_operands, OperationTag, Request, RESULT_FRAME_LEN,
};
use super::spawn::{spawn_worker, SpawnedWorker};
use crate::error::{DispatchError, Result};

/// One worker's registry entry: its binding, process handle, and the
/// supervisor-owned channel ends. Immutable after spawn except liveness.
struct WorkerDescriptor {
    operation: OperationTag,
    pid: Pid,
    inbound: FrameSender,
    outbound: FrameReceiver,
    /// Set once the process has been waited on (or found dead).
    reaped: bool,
}

impl WorkerDescriptor {
    /// Blocking wait for this worker's exit, at most once.
    fn reap(&mut self) {
        if self.reaped {
            return;
        }
        match waitpid(self.pid, None) {
            Ok(WaitStatus::Exited(_, 0)) => {
                debug!(operation = %self.operation, pid = self.pid.as_raw(), "worker exited cleanly");
            }
            Ok(status) => {
                warn!(
                    operation = %self.operation,
                    pid = self.pid.as_raw(),
                    ?status,
                    "worker exited abnormally"
                );
            }
            Err(e) => {
                warn!(operation = %self.operation, pid = self.pid.as_raw(), error = %e, "waitpid failed");
            }
        }
        self.reaped = true;
    }
}

/// Coordinator-side dispatch logic over the fixed worker registry.
pub struct Supervisor {
    /// Indexed by [`OperationTag::index`]; exactly one entry per operation.
    workers: Vec<WorkerDescriptor>,
    shut_down: bool,
}

impl Supervisor {
    /// Create all channel pairs and spawn one worker per operation.
    ///
    /// `program` is the binary to re-invoke in worker mode (normally
    /// `std::env::current_exe()`). Fails with a setup error before any
    /// request is accepted if a single spawn fails; already-spawned workers
    /// are terminated and reaped before the error is returned, since they
    /// sit suspended at their wait point and would never observe a plain
    /// channel closure.
    pub fn spawn(program: &Path) -> Result<Self> {
        let mut workers = Vec::with_capacity(OperationTag::ALL.len());
        for operation in OperationTag::ALL {
            let SpawnedWorker {
                pid,
                inbound,
                outbound,
            } = match spawn_worker(program, operation) {
                Ok(spawned) => spawned,
                Err(e) => {
                    terminate_pool(&mut workers);
                    return Err(e);
                }
            };
            workers.push(WorkerDescriptor {
                operation,
                pid,
                inbound,
                outbound,
                reaped: false,
            });
        }
        info!(count = workers.len(), "worker pool ready");
        Ok(Self {
            workers,
            shut_down: false,
        })
    }

    /// PID of the worker bound to `operation`.
    pub fn worker_pid(&self, operation: OperationTag) -> Pid {
        self.workers[operation.index()].pid
    }

    /// Run one full dispatch cycle for `request`.
    ///
    /// Sends the operand frame, wakes the worker, and blocks until the
    /// result frame arrives. A dead worker surfaces as
    /// [`DispatchError::WorkerUnavailable`] (notification undeliverable) or
    /// [`DispatchError::WorkerCrashed`] (channel closed mid-cycle) — the
    /// supervisor itself never crashes on either.
    pub fn dispatch(&mut self, request: &Request) -> std::result::Result<i32, DispatchError> {
        let operation = request.operation;
        let worker = &mut self.workers[operation.index()];
        if self.shut_down || worker.reaped {
            return Err(DispatchError::WorkerUnavailable(operation));
        }

        let frame = encode_operands(request.lhs, request.rhs);
        if worker.inbound.send(&frame).is_err() {
            // Write end still open on our side, so a failure means the
            // worker's read end is gone.
            worker.reap();
            return Err(DispatchError::WorkerCrashed(operation));
        }

        if let Err(e) = notify::deliver(worker.pid, Notification::Wake(operation)) {
            debug!(operation = %operation, error = %e, "wake delivery failed");
            if e == Errno::ESRCH {
                worker.reaped = true;
            }
            return Err(DispatchError::WorkerUnavailable(operation));
        }

        match worker.outbound.receive::<RESULT_FRAME_LEN>() {
            Ok(result) => Ok(decode_result(&result)),
            Err(ChannelError::Closed) | Err(ChannelError::ShortFrame { .. }) => {
                worker.reap();
                Err(DispatchError::WorkerCrashed(operation))
            }
            Err(ChannelError::Io(e)) => {
                warn!(operation = %operation, error = %e, "result receive failed");
                worker.reap();
                Err(DispatchError::WorkerCrashed(operation))
            }
        }
    }

    /// Deliver the termination notification to every live worker and wait
    /// for each to exit. Idempotent: runs the teardown exactly once no
    /// matter how many requests were processed or whether Drop also fires.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        terminate_pool(&mut self.workers);
        info!("all workers terminated");
    }
}

/// Deliver the termination notification to every live worker in `workers`,
/// then reap each one. Shared by `shutdown` and the partial-spawn error path.
fn terminate_pool(workers: &mut [WorkerDescriptor]) {
    for worker in workers.iter_mut() {
        if worker.reaped {
            continue;
        }
        // ESRCH here just means the worker already died; reap below.
        if let Err(e) = notify::deliver(worker.pid, Notification::Terminate) {
            debug!(operation = %worker.operation, error = %e, "terminate delivery failed");
        }
    }
    for worker in workers.iter_mut() {
        worker.reap();
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `/bin/true` ignores the worker arguments and exits immediately. The
    // guards under test fire before any channel I/O, so a real worker
    // process is not required.
    const STUB_WORKER: &str = "/bin/true";

    #[test]
    fn test_dispatch_after_shutdown_is_unavailable() {
        let mut supervisor = Supervisor::spawn(Path::new(STUB_WORKER)).unwrap();
        supervisor.shutdown();

        let request = Request::new(1, 2, OperationTag::Add);
        assert_eq!(
            supervisor.dispatch(&request),
            Err(DispatchError::WorkerUnavailable(OperationTag::Add))
        );
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut supervisor = Supervisor::spawn(Path::new(STUB_WORKER)).unwrap();
        supervisor.shutdown();
        // A second call (and the Drop fallback after it) must not wait on
        // already-reaped PIDs.
        supervisor.shutdown();
    }

    #[test]
    fn test_terminate_pool_reaps_partial_pool() {
        let spawned = spawn_worker(Path::new(STUB_WORKER), OperationTag::Add).unwrap();
        let pid = spawned.pid;
        let mut workers = vec![WorkerDescriptor {
            operation: OperationTag::Add,
            pid,
            inbound: spawned.inbound,
            outbound: spawned.outbound,
            reaped: false,
        }];

        terminate_pool(&mut workers);

        assert!(workers.iter().all(|w| w.reaped));
        // Fully reaped: a second wait on the PID finds no child.
        assert!(waitpid(pid, None).is_err());
    }
}
