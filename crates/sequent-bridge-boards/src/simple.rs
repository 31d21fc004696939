//! Single-signal cards: relays, digital inputs and RTD inputs.
//!
//! None of them carry supervisor registers, so power and watchdog operations
//! fall back to the trait's unsupported defaults.

use crate::driver::{InputsDriver, RelayDriver, RtdDriver};
use crate::{checked_write, flag, unknown_signal, OnBoard};
use sequent_bridge_core::{Board, DeviceAdapter, DeviceError, Family, SignalSpec, Value};

/// `8relind` board.
#[derive(Debug)]
pub struct Relay8<D> {
    board: Board,
    driver: D,
}

impl<D: RelayDriver> Relay8<D> {
    /// Adapter for the card at `stack`.
    pub fn new(stack: u8, driver: D) -> Self {
        Self {
            board: Board::new(Family::Relay8, stack),
            driver,
        }
    }
}

impl<D: RelayDriver> DeviceAdapter for Relay8<D> {
    fn board(&self) -> Board {
        self.board
    }

    fn read_signal(&mut self, signal: &SignalSpec, channel: u8) -> Result<Value, DeviceError> {
        signal.check_channel(channel)?;
        if signal.name != "relay" {
            return Err(unknown_signal(self.board, signal));
        }
        let on = self.driver.relay(self.board.stack, channel).on(self.board)?;
        Ok(flag(on))
    }

    fn write_signal(
        &mut self,
        signal: &SignalSpec,
        channel: u8,
        value: Value,
    ) -> Result<(), DeviceError> {
        let value = checked_write(signal, channel, value)?;
        if signal.name != "relay" {
            return Err(unknown_signal(self.board, signal));
        }
        self.driver
            .set_relay(self.board.stack, channel, value.as_integer() == Some(1))
            .on(self.board)
    }
}

/// `8inputs` board.
#[derive(Debug)]
pub struct Inputs8<D> {
    board: Board,
    driver: D,
}

impl<D: InputsDriver> Inputs8<D> {
    /// Adapter for the card at `stack`.
    pub fn new(stack: u8, driver: D) -> Self {
        Self {
            board: Board::new(Family::Inputs8, stack),
            driver,
        }
    }
}

impl<D: InputsDriver> DeviceAdapter for Inputs8<D> {
    fn board(&self) -> Board {
        self.board
    }

    fn read_signal(&mut self, signal: &SignalSpec, channel: u8) -> Result<Value, DeviceError> {
        signal.check_channel(channel)?;
        if signal.name != "opto" {
            return Err(unknown_signal(self.board, signal));
        }
        let on = self.driver.input(self.board.stack, channel).on(self.board)?;
        Ok(flag(on))
    }

    fn write_signal(&mut self, _: &SignalSpec, _: u8, _: Value) -> Result<(), DeviceError> {
        Err(self.unsupported("output write"))
    }
}

/// `rtd` board.
#[derive(Debug)]
pub struct Rtd<D> {
    board: Board,
    driver: D,
}

impl<D: RtdDriver> Rtd<D> {
    /// Adapter for the card at `stack`.
    pub fn new(stack: u8, driver: D) -> Self {
        Self {
            board: Board::new(Family::Rtd, stack),
            driver,
        }
    }
}

impl<D: RtdDriver> DeviceAdapter for Rtd<D> {
    fn board(&self) -> Board {
        self.board
    }

    fn read_signal(&mut self, signal: &SignalSpec, channel: u8) -> Result<Value, DeviceError> {
        signal.check_channel(channel)?;
        if signal.name != "rtd" {
            return Err(unknown_signal(self.board, signal));
        }
        let celsius = self
            .driver
            .temperature(self.board.stack, channel)
            .on(self.board)?;
        Ok(Value::Float(celsius))
    }

    fn write_signal(&mut self, _: &SignalSpec, _: u8, _: Value) -> Result<(), DeviceError> {
        Err(self.unsupported("output write"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimBus;
    use sequent_bridge_core::{catalog, Direction};

    #[test]
    fn relay_write_and_read_back() {
        let mut card = Relay8::new(2, SimBus::new());
        let relay = catalog::find(Family::Relay8, Direction::Response, "relay").unwrap();

        card.write_signal(relay, 8, Value::Int(1)).unwrap();
        assert_eq!(card.read_signal(relay, 8).unwrap(), Value::Int(1));
        assert_eq!(card.read_signal(relay, 7).unwrap(), Value::Int(0));
        assert!(matches!(
            card.write_signal(relay, 1, Value::Int(2)),
            Err(DeviceError::Validation(_))
        ));
    }

    #[test]
    fn read_only_cards_reject_writes_and_supervision() {
        let bus = SimBus::new();
        bus.set_temperature(5, 3, 21.456);
        let mut rtd = Rtd::new(5, bus.clone());
        let spec = catalog::find(Family::Rtd, Direction::Input, "rtd").unwrap();

        assert_eq!(rtd.read_signal(spec, 3).unwrap(), Value::Float(21.456));
        assert!(matches!(
            rtd.write_signal(spec, 3, Value::Float(1.0)),
            Err(DeviceError::Unsupported { .. })
        ));
        assert!(matches!(
            rtd.read_power_state(),
            Err(DeviceError::Unsupported { .. })
        ));

        let mut inputs = Inputs8::new(6, bus.clone());
        bus.set_digital_input(6, 4, true);
        let opto = catalog::find(Family::Inputs8, Direction::Input, "opto").unwrap();
        assert_eq!(inputs.read_signal(opto, 4).unwrap(), Value::Int(1));
        assert!(matches!(
            inputs.reload_watchdog(),
            Err(DeviceError::Unsupported { .. })
        ));
    }
}
