//! Industrial automation card adapter.

use crate::driver::{IndInput, IndOutput, MegaIndDriver};
use crate::{checked_write, flag, supervisor, unknown_signal, OnBoard};
use sequent_bridge_core::{
    Board, DeviceAdapter, DeviceError, Direction, Family, PowerState, SignalSpec, Value,
    WatchdogSettings,
};

/// `megaind` board: four channels of every analog range, LEDs and
/// optocoupled inputs with edge counters.
#[derive(Debug)]
pub struct MegaInd<D> {
    board: Board,
    driver: D,
}

impl<D: MegaIndDriver> MegaInd<D> {
    /// Adapter for the card at `stack`.
    pub fn new(stack: u8, driver: D) -> Self {
        Self {
            board: Board::new(Family::MegaInd, stack),
            driver,
        }
    }
}

impl<D: MegaIndDriver> DeviceAdapter for MegaInd<D> {
    fn board(&self) -> Board {
        self.board
    }

    fn read_signal(&mut self, signal: &SignalSpec, channel: u8) -> Result<Value, DeviceError> {
        signal.check_channel(channel)?;
        let (board, stack) = (self.board, self.board.stack);
        let driver = &mut self.driver;

        let value = match (signal.direction, signal.name) {
            (Direction::Response, "0_10") => {
                Value::Float(driver.analog_output(stack, IndOutput::ZeroTen, channel).on(board)?)
            }
            (Direction::Response, "4_20") => Value::Float(
                driver
                    .analog_output(stack, IndOutput::FourTwenty, channel)
                    .on(board)?,
            ),
            (Direction::Response, "pwm") => {
                Value::Float(driver.analog_output(stack, IndOutput::Pwm, channel).on(board)?)
            }
            (Direction::Response, "led") => flag(driver.led(stack, channel).on(board)?),
            (Direction::Response, "opto_rce") => {
                flag(driver.opto_rising_count(stack, channel).on(board)?)
            }
            (Direction::Response, "opto_fce") => {
                flag(driver.opto_falling_count(stack, channel).on(board)?)
            }
            (Direction::Input, "0_10") => {
                Value::Float(driver.analog_input(stack, IndInput::ZeroTen, channel).on(board)?)
            }
            (Direction::Input, "pm0_10") => Value::Float(
                driver
                    .analog_input(stack, IndInput::PlusMinusTen, channel)
                    .on(board)?,
            ),
            (Direction::Input, "4_20") => Value::Float(
                driver
                    .analog_input(stack, IndInput::FourTwenty, channel)
                    .on(board)?,
            ),
            (Direction::Input, "opto") => flag(driver.opto(stack, channel).on(board)?),
            (Direction::Input, "opto_count") => {
                Value::Int(i64::from(driver.opto_count(stack, channel).on(board)?))
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
        let driver = &mut self.driver;
        let on = value.as_integer() == Some(1);

        match (signal.direction, signal.name) {
            (Direction::Response, "0_10") => {
                driver.set_analog_output(stack, IndOutput::ZeroTen, channel, value.as_f64())
            }
            (Direction::Response, "4_20") => {
                driver.set_analog_output(stack, IndOutput::FourTwenty, channel, value.as_f64())
            }
            (Direction::Response, "pwm") => {
                driver.set_analog_output(stack, IndOutput::Pwm, channel, value.as_f64())
            }
            (Direction::Response, "led") => driver.set_led(stack, channel, on),
            (Direction::Response, "opto_rce") => driver.set_opto_rising_count(stack, channel, on),
            (Direction::Response, "opto_fce") => driver.set_opto_falling_count(stack, channel, on),
            (Direction::Output, "opto_rst") => driver.reset_opto_count(stack, channel),
            _ => return Err(unknown_signal(board, signal)),
        }
        .on(board)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimBus;
    use sequent_bridge_core::catalog;
    use sequent_bridge_core::ValidationError;

    fn spec(direction: Direction, name: &str) -> &'static SignalSpec {
        catalog::find(Family::MegaInd, direction, name).unwrap()
    }

    #[test]
    fn response_and_input_share_names() {
        let bus = SimBus::new();
        bus.set_ind_input(1, IndInput::ZeroTen, 2, 7.5);
        let mut card = MegaInd::new(1, bus);

        card.write_signal(spec(Direction::Response, "0_10"), 2, Value::Float(3.0))
            .unwrap();

        assert_eq!(
            card.read_signal(spec(Direction::Response, "0_10"), 2).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            card.read_signal(spec(Direction::Input, "0_10"), 2).unwrap(),
            Value::Float(7.5)
        );
    }

    #[test]
    fn current_loop_rejects_below_four_milliamps() {
        let bus = SimBus::new();
        let mut card = MegaInd::new(0, bus.clone());

        let err = card
            .write_signal(spec(Direction::Response, "4_20"), 1, Value::Int(0))
            .unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Validation(ValidationError::OutOfDomain { .. })
        ));
        assert_eq!(bus.writes(0), 0);
    }

    #[test]
    fn counter_reset_clears_count() {
        let bus = SimBus::new();
        let mut card = MegaInd::new(0, bus.clone());
        card.write_signal(spec(Direction::Response, "opto_rce"), 3, Value::Int(1))
            .unwrap();

        bus.set_digital_input(0, 3, true);
        bus.set_digital_input(0, 3, false);
        bus.set_digital_input(0, 3, true);
        let count = spec(Direction::Input, "opto_count");
        assert_eq!(card.read_signal(count, 3).unwrap(), Value::Int(2));

        card.write_signal(spec(Direction::Output, "opto_rst"), 3, Value::Int(1))
            .unwrap();
        assert_eq!(card.read_signal(count, 3).unwrap(), Value::Int(0));
    }

    #[test]
    fn watchdog_configuration_is_idempotent() {
        let bus = SimBus::new();
        let mut card = MegaInd::new(2, bus.clone());
        let settings = WatchdogSettings {
            period: 90,
            boot_period: 180,
            reset_interval: 10,
        };

        assert_eq!(card.configure_watchdog(&settings).unwrap(), 2);
        let writes = bus.writes(2);
        assert_eq!(card.configure_watchdog(&settings).unwrap(), 0);
        assert_eq!(bus.writes(2), writes);
    }

    #[test]
    fn bus_fault_carries_board() {
        let bus = SimBus::new();
        bus.set_fault(4, true);
        let mut card = MegaInd::new(4, bus);

        let err = card.read_power_state().unwrap_err();
        assert!(matches!(err, DeviceError::Bus { board, .. } if board == Board::new(Family::MegaInd, 4)));
    }
}
