//! Building automation card adapter.

use crate::driver::{BasInput, MegaBasDriver};
use crate::{checked_write, flag, supervisor, unknown_signal, OnBoard};
use sequent_bridge_core::{
    Board, DeviceAdapter, DeviceError, Direction, Domain, Family, PowerState, SignalSpec,
    ValidationError, Value, WatchdogSettings,
};

/// `megabas` board: 0-10 V outputs, triacs, universal inputs and dry
/// contacts with edge counters.
///
/// The rising and falling count enables of a contact share one packed
/// register, exposed through the edge mode operations.
#[derive(Debug)]
pub struct MegaBas<D> {
    board: Board,
    driver: D,
}

impl<D: MegaBasDriver> MegaBas<D> {
    /// Adapter for the card at `stack`.
    pub fn new(stack: u8, driver: D) -> Self {
        Self {
            board: Board::new(Family::MegaBas, stack),
            driver,
        }
    }
}

impl<D: MegaBasDriver> DeviceAdapter for MegaBas<D> {
    fn board(&self) -> Board {
        self.board
    }

    fn read_signal(&mut self, signal: &SignalSpec, channel: u8) -> Result<Value, DeviceError> {
        signal.check_channel(channel)?;
        let (board, stack) = (self.board, self.board.stack);

        if let Domain::EdgeEnable { edge, .. } = signal.domain {
            let mode = self.driver.contact_edge(stack, channel).on(board)?;
            return Ok(flag(edge.enabled_in(i64::from(mode))));
        }

        let driver = &mut self.driver;
        let value = match (signal.direction, signal.name) {
            (Direction::Response, "0_10") => {
                Value::Float(driver.analog_output(stack, channel).on(board)?)
            }
            (Direction::Response, "triac") => {
                let triacs = driver.triacs(stack).on(board)?;
                flag((triacs >> (channel - 1)) & 1 == 1)
            }
            (Direction::Input, "0_10") => {
                Value::Float(driver.analog_input(stack, BasInput::ZeroTen, channel).on(board)?)
            }
            (Direction::Input, "1k") => {
                Value::Float(driver.analog_input(stack, BasInput::Res1k, channel).on(board)?)
            }
            (Direction::Input, "10k") => {
                Value::Float(driver.analog_input(stack, BasInput::Res10k, channel).on(board)?)
            }
            (Direction::Input, "cont") => flag(driver.contact(stack, channel).on(board)?),
            (Direction::Input, "cont_count") => {
                Value::Int(i64::from(driver.contact_count(stack, channel).on(board)?))
            }
            _ => return Err(unknown_signal(board, signal)),
        };
        Ok(value)
    }

    fn write_signal(
        &mut self,
        signal: &SignalSpec,
        channel: u8,
        value: Value,
    ) -> Result<(), DeviceError> {
        let value = checked_write(signal, channel, value)?;
        let (board, stack) = (self.board, self.board.stack);

        match (signal.direction, signal.name, signal.domain) {
            (_, _, Domain::EdgeEnable { .. }) => Err(self.unsupported("single edge bit write")),
            (Direction::Response, "0_10", _) => self
                .driver
                .set_analog_output(stack, channel, value.as_f64())
                .on(board),
            (Direction::Response, "triac", _) => self
                .driver
                .set_triac(stack, channel, value.as_integer() == Some(1))
                .on(board),
            (Direction::Output, "cont_rst", _) => {
                self.driver.reset_contact_count(stack, channel).on(board)
            }
            _ => Err(unknown_signal(board, signal)),
        }
    }

    fn read_edge_mode(&mut self, signal: &SignalSpec, channel: u8) -> Result<i64, DeviceError> {
        signal.check_channel(channel)?;
        let mode = self
            .driver
            .contact_edge(self.board.stack, channel)
            .on(self.board)?;
        Ok(i64::from(mode))
    }

    fn write_edge_mode(
        &mut self,
        signal: &SignalSpec,
        channel: u8,
        mode: i64,
    ) -> Result<(), DeviceError> {
        signal.check_channel(channel)?;
        let mode = u8::try_from(mode)
            .ok()
            .filter(|mode| *mode <= 3)
            .ok_or(ValidationError::OutOfDomain {
                signal: signal.name,
                value: Value::Int(mode),
            })?;
        self.driver
            .set_contact_edge(self.board.stack, channel, mode)
            .on(self.board)
    }

    fn read_power_state(&mut self) -> Result<PowerState, DeviceError> {
        supervisor::read_power_state(&mut self.driver, self.board)
    }

    fn configure_watchdog(&mut self, settings: &WatchdogSettings) -> Result<usize, DeviceError> {
        supervisor::configure_watchdog(&mut self.driver, self.board, settings)
    }

    fn reload_watchdog(&mut self) -> Result<(), DeviceError> {
        self.driver.watchdog_reload(self.board.stack).on(self.board)
    }
}
