//! Error taxonomy shared by adapters, the sync engine and the supervisor.

use crate::model::{Board, Family, Value};

/// A failed register access reported by a board driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BusError(pub String);

impl BusError {
    /// Create a bus error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A command or value that is not legal for the addressed signal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The family has no writable signal by that name
    #[error("{family} has no writable signal '{signal}'")]
    UnknownSignal {
        /// Board family
        family: Family,
        /// Requested signal name
        signal: String,
    },
    /// Channel outside `1..=arity`
    #[error("channel {channel} out of range for {signal} (1-{arity})")]
    ChannelOutOfRange {
        /// Signal name
        signal: &'static str,
        /// Requested channel
        channel: u8,
        /// Channel count of the signal
        arity: u8,
    },
    /// Value outside the signal's domain
    #[error("value {value} out of range for {signal}")]
    OutOfDomain {
        /// Signal name
        signal: &'static str,
        /// Rejected value
        value: Value,
    },
    /// Signal is read only
    #[error("{signal} is read only")]
    NotWritable {
        /// Signal name
        signal: &'static str,
    },
}

/// Failure of one adapter operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    /// Register access failed on the bus
    #[error("bus access on {board} failed: {source}")]
    Bus {
        /// Board being accessed
        board: Board,
        /// Driver error
        source: BusError,
    },
    /// The family does not implement the operation
    #[error("{family} boards do not support {operation}")]
    Unsupported {
        /// Board family
        family: Family,
        /// Operation name
        operation: &'static str,
    },
    /// The request was rejected before touching the bus
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl DeviceError {
    /// Wrap a driver error with the board it occurred on.
    #[must_use]
    pub fn bus(board: Board, source: BusError) -> Self {
        Self::Bus { board, source }
    }
}

/// A rejected or failed inbound command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// No board is configured at the stack address
    #[error("no board configured at stack {0}")]
    UnknownBoard(u8),
    /// The command failed validation; the device was not touched
    #[error("rejected command for {board}: {source}")]
    Invalid {
        /// Addressed board
        board: Board,
        /// Validation failure
        source: ValidationError,
    },
    /// Write or read-back failed; the cache was left unchanged
    #[error("can't set {board} {signal}/{channel} to {value}: {source}")]
    Device {
        /// Addressed board
        board: Board,
        /// Signal name
        signal: String,
        /// Channel
        channel: u8,
        /// Requested value
        value: Value,
        /// Underlying device failure
        source: DeviceError,
    },
}

/// Heartbeat timed out; all outputs were forced to their safe state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing heartbeat for {silent_secs}s, all board outputs reset")]
pub struct LivenessExpired {
    /// Seconds since the last challenge
    pub silent_secs: u64,
}
