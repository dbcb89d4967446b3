//! Wire protocol for operand and result frames.
//!
//! Frames are fixed-width native-endian integers with no length prefix or
//! other framing metadata: exactly 8 bytes for an operand pair on a worker's
//! inbound channel, exactly 4 bytes for a result on its outbound channel.
//! Framing is implicit from the fixed size — there is no resynchronization
//! mechanism, so a short frame is always a protocol violation.

#![allow(dead_code)] // Some helpers are exercised only by the unit tests

use std::fmt;

/// Size of an operand-pair frame (two `i32`s).
pub const OPERAND_FRAME_LEN: usize = 8;

/// Size of a result frame (one `i32`).
pub const RESULT_FRAME_LEN: usize = 4;

/// The closed set of operations. Each variant maps 1:1 to one long-lived
/// worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationTag {
    Add,
    Subtract,
    Multiply,
}

impl OperationTag {
    /// All operations, in worker-index order.
    pub const ALL: [OperationTag; 3] = [
        OperationTag::Add,
        OperationTag::Subtract,
        OperationTag::Multiply,
    ];

    /// Worker index for this operation, in `[0, 3)`.
    pub fn index(self) -> usize {
        match self {
            OperationTag::Add => 0,
            OperationTag::Subtract => 1,
            OperationTag::Multiply => 2,
        }
    }

    /// The operator symbol accepted by the request source.
    pub fn symbol(self) -> char {
        match self {
            OperationTag::Add => '+',
            OperationTag::Subtract => '-',
            OperationTag::Multiply => '*',
        }
    }

    /// Parse an operator symbol. Returns `None` for anything outside the
    /// closed set.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(OperationTag::Add),
            '-' => Some(OperationTag::Subtract),
            '*' => Some(OperationTag::Multiply),
            _ => None,
        }
    }

    /// Stable lowercase name, used for CLI arguments and log fields.
    pub fn name(self) -> &'static str {
        match self {
            OperationTag::Add => "add",
            OperationTag::Subtract => "subtract",
            OperationTag::Multiply => "multiply",
        }
    }

    /// Apply the operation. Overflow wraps per fixed-width semantics.
    pub fn apply(self, lhs: i32, rhs: i32) -> i32 {
        match self {
            OperationTag::Add => lhs.wrapping_add(rhs),
            OperationTag::Subtract => lhs.wrapping_sub(rhs),
            OperationTag::Multiply => lhs.wrapping_mul(rhs),
        }
    }
}

impl fmt::Display for OperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One operation request, constructed by the request source and consumed by
/// exactly one dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub lhs: i32,
    pub rhs: i32,
    pub operation: OperationTag,
}

impl Request {
    pub fn new(lhs: i32, rhs: i32, operation: OperationTag) -> Self {
        Self {
            lhs,
            rhs,
            operation,
        }
    }
}

/// Encode an operand pair for a worker's inbound channel.
pub fn encode_operands(lhs: i32, rhs: i32) -> [u8; OPERAND_FRAME_LEN] {
    let mut frame = [0u8; OPERAND_FRAME_LEN];
    frame[..4].copy_from_slice(&lhs.to_ne_bytes());
    frame[4..].copy_from_slice(&rhs.to_ne_bytes());
    frame
}

/// Decode an operand pair received on a worker's inbound channel.
pub fn decode_operands(frame: &[u8; OPERAND_FRAME_LEN]) -> (i32, i32) {
    let lhs = i32::from_ne_bytes(frame[..4].try_into().expect("4-byte slice"));
    let rhs = i32::from_ne_bytes(frame[4..].try_into().expect("4-byte slice"));
    (lhs, rhs)
}

/// Encode a result for a worker's outbound channel.
pub fn encode_result(value: i32) -> [u8; RESULT_FRAME_LEN] {
    value.to_ne_bytes()
}

/// Decode a result frame received from a worker.
pub fn decode_result(frame: &[u8; RESULT_FRAME_LEN]) -> i32 {
    i32::from_ne_bytes(*frame)
}
