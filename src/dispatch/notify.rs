//! Out-of-band wake notifications between supervisor and workers.
//!
//! A notification is a payload-less POSIX signal: it only says "data is
//! ready on your inbound channel" (or "terminate now"). The payload itself
//! always travels over the pipe, never in the signal.
//!
//! The signal-number namespace is deliberately decoupled from the operation
//! set: [`WAKE_SIGNALS`] is the single table binding each operation's worker
//! to the signal it listens for, so the design generalizes past three
//! operations without leaking signal numbers into the protocol types.

use crate::dispatch::protocol::OperationTag;
use nix::sys::signal::{self, SigSet, Signal};
use nix::unistd::Pid;

/// Wake signal per operation, indexed by [`OperationTag::index`].
const WAKE_SIGNALS: [Signal; 3] = [Signal::SIGUSR1, Signal::SIGUSR2, Signal::SIGALRM];

/// Signal delivered to every worker on supervisor shutdown.
const TERMINATE_SIGNAL: Signal = Signal::SIGTERM;

/// A notification kind deliverable to a worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Wake the worker bound to this operation: one operand frame is ready
    /// on its inbound channel.
    Wake(OperationTag),
    /// Terminate now. Delivered to all workers uniformly.
    Terminate,
}

impl Notification {
    /// The OS signal carrying this notification.
    pub fn signal(self) -> Signal {
        match self {
            Notification::Wake(op) => WAKE_SIGNALS[op.index()],
            Notification::Terminate => TERMINATE_SIGNAL,
        }
    }

    /// Classify a received signal. Returns `None` for signals outside the
    /// notification set.
    pub fn from_signal(signal: Signal) -> Option<Self> {
        if signal == TERMINATE_SIGNAL {
            return Some(Notification::Terminate);
        }
        OperationTag::ALL
            .into_iter()
            .find(|op| WAKE_SIGNALS[op.index()] == signal)
            .map(Notification::Wake)
    }
}

/// The full set of signals a worker treats as notifications.
///
/// Workers block this set except while suspended at their wait point, and
/// the supervisor blocks it in the child between fork and exec, so a
/// notification delivered before the worker reaches its wait point stays
/// pending instead of being lost (or killing the child via the default
/// disposition).
pub fn notification_mask() -> SigSet {
    let mut mask = SigSet::empty();
    for signal in WAKE_SIGNALS {
        mask.add(signal);
    }
    mask.add(TERMINATE_SIGNAL);
    mask
}

/// Deliver a notification to a worker process.
pub fn deliver(pid: Pid, notification: Notification) -> nix::Result<()> {
    signal::kill(pid, notification.signal())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_signals_are_distinct() {
        for a in OperationTag::ALL {
            for b in OperationTag::ALL {
                if a != b {
                    assert_ne!(
                        Notification::Wake(a).signal(),
                        Notification::Wake(b).signal()
                    );
                }
            }
        }
    }

    #[test]
    fn test_terminate_signal_not_a_wake_signal() {
        for op in OperationTag::ALL {
            assert_ne!(
                Notification::Terminate.signal(),
                Notification::Wake(op).signal()
            );
        }
    }

    #[test]
    fn test_classify_roundtrip() {
        for op in OperationTag::ALL {
            let n = Notification::Wake(op);
            assert_eq!(Notification::from_signal(n.signal()), Some(n));
        }
        assert_eq!(
            Notification::from_signal(Signal::SIGTERM),
            Some(Notification::Terminate)
        );
        assert_eq!(Notification::from_signal(Signal::SIGHUP), None);
    }

    #[test]
    fn test_notification_mask_covers_the_set() {
        let mask = notification_mask();
        for op in OperationTag::ALL {
            assert!(mask.contains(Notification::Wake(op).signal()));
        }
        assert!(mask.contains(Signal::SIGTERM));
        assert!(!mask.contains(Signal::SIGINT));
    }
}
