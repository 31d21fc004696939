//! Register-level driver interfaces, one per board family.
//!
//! Every call addresses the board by stack, mirroring the vendor libraries.
//! Channels are 1-indexed.

use sequent_bridge_core::BusError;

/// Result of a single register access.
pub type BusResult<T> = Result<T, BusError>;

/// Analog outputs of the industrial card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndOutput {
    /// 0-10 V output
    ZeroTen,
    /// 4-20 mA current loop output
    FourTwenty,
    /// Open-drain PWM output, percent
    Pwm,
}

/// Analog inputs of the industrial card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndInput {
    /// 0-10 V input
    ZeroTen,
    /// ±10 V input
    PlusMinusTen,
    /// 4-20 mA input
    FourTwenty,
}

/// Analog inputs of the building automation card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasInput {
    /// 0-10 V input
    ZeroTen,
    /// 1 kΩ thermistor input, kΩ
    Res1k,
    /// 10 kΩ thermistor input, kΩ
    Res10k,
}

/// Power and watchdog registers shared by the industrial and building cards.
pub trait SupervisorDriver: Send {
    /// Main supply voltage.
    fn supply_voltage(&mut self, stack: u8) -> BusResult<f64>;
    /// Voltage delivered to the host computer.
    fn host_voltage(&mut self, stack: u8) -> BusResult<f64>;
    /// Firmware version as `major.minor`.
    fn firmware_version(&mut self, stack: u8) -> BusResult<String>;
    /// On-board CPU temperature, °C.
    fn cpu_temp(&mut self, stack: u8) -> BusResult<f64>;

    /// Number of resets the watchdog performed.
    fn watchdog_reset_count(&mut self, stack: u8) -> BusResult<u32>;
    /// Watchdog period, seconds.
    fn watchdog_period(&mut self, stack: u8) -> BusResult<u32>;
    /// Set the watchdog period.
    fn set_watchdog_period(&mut self, stack: u8, secs: u32) -> BusResult<()>;
    /// Watchdog period applied after power-on.
    fn watchdog_boot_period(&mut self, stack: u8) -> BusResult<u32>;
    /// Set the power-on watchdog period.
    fn set_watchdog_boot_period(&mut self, stack: u8, secs: u32) -> BusResult<()>;
    /// How long host power stays off when the watchdog fires.
    fn watchdog_off_interval(&mut self, stack: u8) -> BusResult<u32>;
    /// Set the power-off interval.
    fn set_watchdog_off_interval(&mut self, stack: u8, secs: u32) -> BusResult<()>;
    /// Reload the watchdog.
    fn watchdog_reload(&mut self, stack: u8) -> BusResult<()>;
}

/// Industrial automation card (`megaind`).
pub trait MegaIndDriver: SupervisorDriver {
    /// Read back an analog output.
    fn analog_output(&mut self, stack: u8, kind: IndOutput, channel: u8) -> BusResult<f64>;
    /// Set an analog output.
    fn set_analog_output(
        &mut self,
        stack: u8,
        kind: IndOutput,
        channel: u8,
        value: f64,
    ) -> BusResult<()>;
    /// Read an analog input.
    fn analog_input(&mut self, stack: u8, kind: IndInput, channel: u8) -> BusResult<f64>;
    /// Front-panel LED state.
    fn led(&mut self, stack: u8, channel: u8) -> BusResult<bool>;
    /// Switch a front-panel LED.
    fn set_led(&mut self, stack: u8, channel: u8, on: bool) -> BusResult<()>;
    /// Optocoupled input state.
    fn opto(&mut self, stack: u8, channel: u8) -> BusResult<bool>;
    /// Pulses counted on an optocoupled input.
    fn opto_count(&mut self, stack: u8, channel: u8) -> BusResult<u32>;
    /// Clear an optocoupled input counter.
    fn reset_opto_count(&mut self, stack: u8, channel: u8) -> BusResult<()>;
    /// Whether rising edges are counted.
    fn opto_rising_count(&mut self, stack: u8, channel: u8) -> BusResult<bool>;
    /// Enable or disable rising-edge counting.
    fn set_opto_rising_count(&mut self, stack: u8, channel: u8, on: bool) -> BusResult<()>;
    /// Whether falling edges are counted.
    fn opto_falling_count(&mut self, stack: u8, channel: u8) -> BusResult<bool>;
    /// Enable or disable falling-edge counting.
    fn set_opto_falling_count(&mut self, stack: u8, channel: u8, on: bool) -> BusResult<()>;
}

/// Building automation card (`megabas`).
pub trait MegaBasDriver: SupervisorDriver {
    /// Read back a 0-10 V output.
    fn analog_output(&mut self, stack: u8, channel: u8) -> BusResult<f64>;
    /// Set a 0-10 V output.
    fn set_analog_output(&mut self, stack: u8, channel: u8, value: f64) -> BusResult<()>;
    /// Triac states, bit `n-1` for triac `n`.
    fn triacs(&mut self, stack: u8) -> BusResult<u8>;
    /// Switch one triac.
    fn set_triac(&mut self, stack: u8, channel: u8, on: bool) -> BusResult<()>;
    /// Read an analog input.
    fn analog_input(&mut self, stack: u8, kind: BasInput, channel: u8) -> BusResult<f64>;
    /// Dry contact state.
    fn contact(&mut self, stack: u8, channel: u8) -> BusResult<bool>;
    /// Pulses counted on a dry contact.
    fn contact_count(&mut self, stack: u8, channel: u8) -> BusResult<u32>;
    /// Clear a dry contact counter.
    fn reset_contact_count(&mut self, stack: u8, channel: u8) -> BusResult<()>;
    /// Edge counting mode of a contact: `0=none, 1=rising, 2=falling, 3=both`.
    fn contact_edge(&mut self, stack: u8, channel: u8) -> BusResult<u8>;
    /// Set the edge counting mode of a contact.
    fn set_contact_edge(&mut self, stack: u8, channel: u8, mode: u8) -> BusResult<()>;
}

/// Eight relay card (`8relind`).
pub trait RelayDriver: Send {
    /// Relay state.
    fn relay(&mut self, stack: u8, channel: u8) -> BusResult<bool>;
    /// Switch a relay.
    fn set_relay(&mut self, stack: u8, channel: u8, on: bool) -> BusResult<()>;
}

/// Eight digital input card (`8inputs`).
pub trait InputsDriver: Send {
    /// Optocoupled input state.
    fn input(&mut self, stack: u8, channel: u8) -> BusResult<bool>;
}

/// Eight RTD card (`rtd`).
pub trait RtdDriver: Send {
    /// Temperature, °C.
    fn temperature(&mut self, stack: u8, channel: u8) -> BusResult<f64>;
}
