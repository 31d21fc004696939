//! Uniform access to one board's channels.

use crate::catalog::SignalSpec;
use crate::error::DeviceError;
use crate::model::{Board, Value};

/// Supply voltage below which a board is treated as absent.
pub const MIN_SUPPLY_VOLTAGE: f64 = 5.0;

/// Power and supervisor registers of a board.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerState {
    /// Main supply voltage
    pub supply_voltage: f64,
    /// Voltage delivered to the host computer
    pub backup_voltage: f64,
    /// Firmware version, `major.minor`
    pub firmware_version: String,
    /// On-board CPU temperature in °C
    pub cpu_temp: f64,
    /// Number of resets triggered by the hardware watchdog
    pub watchdog_resets: u32,
}

impl PowerState {
    /// Whether the board is powered and may act as telemetry source.
    #[must_use]
    pub fn is_powered(&self) -> bool {
        self.supply_voltage >= MIN_SUPPLY_VOLTAGE
    }
}

/// Hardware watchdog configuration, all values in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogSettings {
    /// Reload period before the watchdog fires
    pub period: u32,
    /// Period applied right after power-on
    pub boot_period: u32,
    /// How long the host power stays off when the watchdog fires
    pub reset_interval: u32,
}

/// Capability set every board family adapter implements.
///
/// Signals are addressed through their catalog entry; the same name may
/// appear under two directions (`response/0_10` and `input/0_10`), so
/// adapters dispatch on direction and name together. Operations a family has
/// no registers for return [`DeviceError::Unsupported`].
pub trait DeviceAdapter: Send {
    /// The board this adapter drives.
    fn board(&self) -> Board;

    /// Read one channel of a signal.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Bus`] if the register access fails.
    fn read_signal(&mut self, signal: &SignalSpec, channel: u8) -> Result<Value, DeviceError>;

    /// Write one channel of a signal after validating the value.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Validation`] without touching the bus when the
    /// value is illegal, [`DeviceError::Unsupported`] for read-only signals,
    /// and [`DeviceError::Bus`] when the write fails.
    fn write_signal(
        &mut self,
        signal: &SignalSpec,
        channel: u8,
        value: Value,
    ) -> Result<(), DeviceError>;

    /// Read the packed edge mode (`0=none, 1=rising, 2=falling, 3=both`) behind
    /// an edge-enable signal.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unsupported`] for families without a packed register.
    fn read_edge_mode(&mut self, signal: &SignalSpec, channel: u8) -> Result<i64, DeviceError> {
        let _ = (signal, channel);
        Err(self.unsupported("edge mode register"))
    }

    /// Write the packed edge mode behind an edge-enable signal.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unsupported`] for families without a packed register.
    fn write_edge_mode(
        &mut self,
        signal: &SignalSpec,
        channel: u8,
        mode: i64,
    ) -> Result<(), DeviceError> {
        let _ = (signal, channel, mode);
        Err(self.unsupported("edge mode register"))
    }

    /// Read power and supervisor registers.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unsupported`] for families without supervisor registers.
    fn read_power_state(&mut self) -> Result<PowerState, DeviceError> {
        Err(self.unsupported("power state"))
    }

    /// Bring the hardware watchdog to `settings`, writing only registers that differ.
    ///
    /// Returns the number of registers written.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unsupported`] for families without a watchdog.
    fn configure_watchdog(&mut self, settings: &WatchdogSettings) -> Result<usize, DeviceError> {
        let _ = settings;
        Err(self.unsupported("watchdog configuration"))
    }

    /// Reload the hardware watchdog.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unsupported`] for families without a watchdog.
    fn reload_watchdog(&mut self) -> Result<(), DeviceError> {
        Err(self.unsupported("watchdog reload"))
    }

    /// Error for an operation this family does not implement.
    fn unsupported(&self, operation: &'static str) -> DeviceError {
        DeviceError::Unsupported {
            family: self.board().family,
            operation,
        }
    }
}
