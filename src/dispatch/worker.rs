//! Worker loop: one process, permanently bound to one operation.
//!
//! A worker blocks until notified, consumes exactly one operand frame from
//! its inbound channel, computes, writes the result frame to its outbound
//! channel, and returns to waiting.
//!
//! # Notification handling
//!
//! The signal handler does nothing but record the delivery in process-wide
//! atomics — no I/O, no allocation, no exit. All real work happens in the
//! ordinary sequential flow of [`Worker::run`], which observes the flag
//! inside a `sigsuspend`-based wait. The notification set stays blocked at
//! all times except inside `sigsuspend`, so a signal delivered while the
//! worker is mid-computation (or before it first reaches the wait point)
//! stays pending and wakes the next suspend. This closes the lost-wakeup
//! race without performing anything async-signal-unsafe in the handler.

use std::process;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use nix::libc::c_int;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::{debug, error, info};

use super::channel::{ChannelError, ChannelFd, FrameReceiver, FrameSender};
use super::notify::{self, Notification};
use super::protocol::{
    decode_operands, encode_result, OperationTag, OPERAND_FRAME_LEN,
};

/// Exit status for a clean termination (terminate notification, or inbound
/// channel closed by a departing supervisor).
pub const EXIT_CLEAN: i32 = 0;

/// Exit status for a protocol violation: short frame, or a channel failure
/// mid-cycle. There is no resynchronization, so the process must die.
pub const EXIT_PROTOCOL_VIOLATION: i32 = 2;

/// Exit status for a notification kind this worker is not bound to.
pub const EXIT_UNKNOWN_NOTIFICATION: i32 = 3;

/// Set by the handler when any notification has been delivered.
static NOTIFIED: AtomicBool = AtomicBool::new(false);

/// Raw signal number of the most recent notification.
static LAST_SIGNAL: AtomicI32 = AtomicI32::new(0);

/// Notification handler. Async-signal-safe: two atomic stores, nothing else.
extern "C" fn on_notification(signum: c_int) {
    LAST_SIGNAL.store(signum, Ordering::SeqCst);
    NOTIFIED.store(true, Ordering::SeqCst);
}

/// How a worker's main loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Explicit termination notification or supervisor departure.
    Clean,
    /// Short frame or channel failure mid-cycle.
    ProtocolViolation,
    /// A notification kind this worker is not bound to.
    UnknownNotification,
}

impl WorkerExit {
    /// Process exit status for this outcome.
    pub fn code(self) -> i32 {
        match self {
            WorkerExit::Clean => EXIT_CLEAN,
            WorkerExit::ProtocolViolation => EXIT_PROTOCOL_VIOLATION,
            WorkerExit::UnknownNotification => EXIT_UNKNOWN_NOTIFICATION,
        }
    }
}

/// Per-process worker state, constructed once at spawn and carried through
/// the loop. Each worker process has exactly one instance for its lifetime.
pub struct Worker {
    operation: OperationTag,
    inbound: FrameReceiver,
    outbound: FrameSender,
}

impl Worker {
    /// Build a worker over the stdin/stdout pipes wired up by the spawning
    /// supervisor.
    fn from_stdio(operation: OperationTag) -> Self {
        // Safety: file descriptors 0 and 1 are always valid for stdin/stdout,
        // and in worker mode nothing else in the process uses them
        let inbound = FrameReceiver::new(unsafe { ChannelFd::from_raw(0) });
        let outbound = FrameSender::new(unsafe { ChannelFd::from_raw(1) });
        Self {
            operation,
            inbound,
            outbound,
        }
    }

    /// Run the worker loop to completion.
    pub fn run(mut self) -> WorkerExit {
        info!(operation = %self.operation, pid = process::id(), "worker ready");

        loop {
            match wait_for_notification() {
                Some(Notification::Terminate) => {
                    debug!(operation = %self.operation, "terminate notification received");
                    return WorkerExit::Clean;
                }
                Some(Notification::Wake(op)) if op == self.operation => {}
                Some(Notification::Wake(op)) => {
                    error!(
                        bound = %self.operation,
                        received = %op,
                        "wake notification for a different operation"
                    );
                    return WorkerExit::UnknownNotification;
                }
                None => {
                    error!(operation = %self.operation, "unknown notification kind");
                    return WorkerExit::UnknownNotification;
                }
            }

            let frame = match self.inbound.receive::<OPERAND_FRAME_LEN>() {
                Ok(frame) => frame,
                Err(ChannelError::Closed) => {
                    // Supervisor departed without a terminate notification
                    debug!(operation = %self.operation, "inbound channel closed");
                    return WorkerExit::Clean;
                }
                Err(e) => {
                    error!(operation = %self.operation, error = %e, "failed reading operands");
                    return WorkerExit::ProtocolViolation;
                }
            };

            let (lhs, rhs) = decode_operands(&frame);
            let result = self.operation.apply(lhs, rhs);
            debug!(operation = %self.operation, lhs, rhs, result, "computed");

            if let Err(e) = self.outbound.send(&encode_result(result)) {
                error!(operation = %self.operation, error = %e, "failed writing result");
                return WorkerExit::ProtocolViolation;
            }
        }
    }
}

/// Block until a notification is observed and classify it.
///
/// Checks the pending flag *before* suspending: a notification that
/// arrived while the set was blocked (e.g. before the loop was entered)
/// is consumed here without ever sleeping.
///
/// [`LAST_SIGNAL`] holds only the most recent delivery, so notifications
/// that pile up across one suspend coalesce into the latest one. The
/// supervisor never has more than one outstanding notification per worker,
/// so this is only observable under out-of-protocol signaling.
fn wait_for_notification() -> Option<Notification> {
    loop {
        if NOTIFIED.swap(false, Ordering::SeqCst) {
            let raw = LAST_SIGNAL.load(Ordering::SeqCst);
            return Signal::try_from(raw).ok().and_then(Notification::from_signal);
        }
        // Atomically unblock the notification set and sleep; returns
        // (with EINTR) once a handler has run.
        let _ = SigSet::empty().suspend();
    }
}

/// Install the worker's signal state: block the notification set, then
/// register the deferred-flag handler for every signal in it.
///
/// Blocking is idempotent with the mask inherited from the supervisor's
/// pre-exec setup, and makes a directly-invoked worker behave identically.
fn install_notification_handlers() -> nix::Result<()> {
    notify::notification_mask().thread_block()?;

    let action = SigAction::new(
        SigHandler::Handler(on_notification),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for op in OperationTag::ALL {
        unsafe { sigaction(Notification::Wake(op).signal(), &action)? };
    }
    unsafe { sigaction(Notification::Terminate.signal(), &action)? };

    // Pipe errors must surface as io::Error, not kill the process
    unsafe { sigaction(Signal::SIGPIPE, &SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty()))? };

    Ok(())
}

/// Worker subprocess entry point for `sigcalc worker --operation <op>`.
pub fn run_worker(operation: OperationTag) -> ! {
    if let Err(e) = install_notification_handlers() {
        error!(error = %e, "failed to install notification handlers");
        process::exit(1);
    }

    let exit = Worker::from_stdio(operation).run();
    process::exit(exit.code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_eq!(WorkerExit::Clean.code(), 0);
        assert_ne!(WorkerExit::ProtocolViolation.code(), 0);
        assert_ne!(WorkerExit::UnknownNotification.code(), 0);
        assert_ne!(
            WorkerExit::ProtocolViolation.code(),
            WorkerExit::UnknownNotification.code()
        );
    }

    #[test]
    fn test_handler_records_delivery() {
        // Call the handler directly; it must be observable from normal flow.
        on_notification(Signal::SIGUSR1 as c_int);
        assert!(NOTIFIED.swap(false, Ordering::SeqCst));
        assert_eq!(LAST_SIGNAL.load(Ordering::SeqCst), Signal::SIGUSR1 as i32);
    }
}
