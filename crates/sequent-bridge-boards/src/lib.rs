//! # Sequent Bridge Boards
//!
//! Device adapters for the supported Sequent Microsystems cards.
//!
//! Each family adapter translates catalog signals into calls on a family
//! driver trait, the boundary to register-level bus access. [`SimBus`]
//! implements every driver in memory.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod megabas;
pub mod megaind;
pub mod sim;
pub mod simple;
mod supervisor;

pub use driver::{
    BasInput, BusResult, IndInput, IndOutput, InputsDriver, MegaBasDriver, MegaIndDriver,
    RelayDriver, RtdDriver, SupervisorDriver,
};
pub use megabas::MegaBas;
pub use megaind::MegaInd;
pub use sim::SimBus;
pub use simple::{Inputs8, Relay8, Rtd};

use sequent_bridge_core::{
    Board, BusError, DeviceAdapter, DeviceError, Family, SignalSpec, ValidationError, Value,
};

/// Build the adapter for `board` on a driver that speaks every family.
pub fn open<D>(board: Board, driver: D) -> Box<dyn DeviceAdapter>
where
    D: MegaIndDriver + MegaBasDriver + RelayDriver + InputsDriver + RtdDriver + 'static,
{
    let stack = board.stack;
    match board.family {
        Family::MegaInd => Box::new(MegaInd::new(stack, driver)),
        Family::MegaBas => Box::new(MegaBas::new(stack, driver)),
        Family::Relay8 => Box::new(Relay8::new(stack, driver)),
        Family::Inputs8 => Box::new(Inputs8::new(stack, driver)),
        Family::Rtd => Box::new(Rtd::new(stack, driver)),
    }
}

/// Attach the board to a driver error.
pub(crate) trait OnBoard<T> {
    fn on(self, board: Board) -> Result<T, DeviceError>;
}

impl<T> OnBoard<T> for Result<T, BusError> {
    fn on(self, board: Board) -> Result<T, DeviceError> {
        self.map_err(|source| DeviceError::bus(board, source))
    }
}

pub(crate) fn flag(on: bool) -> Value {
    Value::Int(i64::from(on))
}

/// Validate a write before it reaches the bus.
pub(crate) fn checked_write(
    signal: &SignalSpec,
    channel: u8,
    value: Value,
) -> Result<Value, DeviceError> {
    signal.check_channel(channel)?;
    Ok(signal.validate(value)?)
}

pub(crate) fn unknown_signal(board: Board, signal: &SignalSpec) -> DeviceError {
    ValidationError::UnknownSignal {
        family: board.family,
        signal: format!("{}/{}", signal.direction, signal.name),
    }
    .into()
}
