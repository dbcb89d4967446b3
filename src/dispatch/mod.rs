//! Multi-process dispatch core.
//!
//! One supervisor process coordinates a fixed pool of three worker
//! processes, each permanently bound to one arithmetic operation. Operands
//! and results flow over per-worker pipe pairs; computation is triggered by
//! an out-of-band signal notification.
//!
//! ```text
//!                   ┌──────────────────┐
//!                   │    Supervisor    │
//!                   │  (request loop)  │
//!                   └────────┬─────────┘
//!                            │ operands ↓ · wake signal ↓ · result ↑
//!          ┌─────────────────┼─────────────────┐
//!    ┌─────▼─────┐     ┌─────▼─────┐     ┌─────▼─────┐
//!    │  Worker   │     │  Worker   │     │  Worker   │
//!    │    add    │     │ subtract  │     │ multiply  │
//!    └───────────┘     └───────────┘     └───────────┘
//! ```
//!
//! The protocol is strictly one request in flight per worker: the
//! supervisor writes one 8-byte operand frame, delivers the worker's wake
//! signal, and blocks reading the 4-byte result before accepting the next
//! request. Workers use a deferred-flag wait (the handler sets an atomic,
//! the loop suspends on the signal mask), so a notification that arrives
//! before the wait point is never lost and no I/O ever happens inside a
//! handler.

mod channel;
mod notify;
mod protocol;
mod spawn;
mod supervisor;
mod worker;

pub use protocol::{OperationTag, Request};
pub use supervisor::Supervisor;
pub use worker::run_worker;
