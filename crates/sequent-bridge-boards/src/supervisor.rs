//! Power and watchdog handling shared by the industrial and building cards.

use crate::driver::{BusResult, SupervisorDriver};
use crate::OnBoard;
use sequent_bridge_core::{Board, DeviceError, PowerState, WatchdogSettings};

type Getter<D> = fn(&mut D, u8) -> BusResult<u32>;
type Setter<D> = fn(&mut D, u8, u32) -> BusResult<()>;

pub(crate) fn read_power_state<D: SupervisorDriver>(
    driver: &mut D,
    board: Board,
) -> Result<PowerState, DeviceError> {
    let stack = board.stack;
    Ok(PowerState {
        supply_voltage: driver.supply_voltage(stack).on(board)?,
        backup_voltage: driver.host_voltage(stack).on(board)?,
        firmware_version: driver.firmware_version(stack).on(board)?,
        cpu_temp: driver.cpu_temp(stack).on(board)?,
        watchdog_resets: driver.watchdog_reset_count(stack).on(board)?,
    })
}

/// Write only the watchdog registers that differ from `settings`.
pub(crate) fn configure_watchdog<D: SupervisorDriver>(
    driver: &mut D,
    board: Board,
    settings: &WatchdogSettings,
) -> Result<usize, DeviceError> {
    let registers: [(&str, Getter<D>, Setter<D>, u32); 3] = [
        ("period", D::watchdog_period, D::set_watchdog_period, settings.period),
        (
            "boot_period",
            D::watchdog_boot_period,
            D::set_watchdog_boot_period,
            settings.boot_period,
        ),
        (
            "off_interval",
            D::watchdog_off_interval,
            D::set_watchdog_off_interval,
            settings.reset_interval,
        ),
    ];

    let mut written = 0;
    for (register, get, set, wanted) in registers {
        let current = get(driver, board.stack).on(board)?;
        if current != wanted {
            set(driver, board.stack, wanted).on(board)?;
            tracing::debug!(%board, register, current, wanted, "Watchdog register updated");
            written += 1;
        }
    }
    Ok(written)
}
