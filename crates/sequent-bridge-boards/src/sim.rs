//! In-memory bus that behaves like a stack of Sequent cards.
//!
//! [`SimBus`] implements every family driver so the whole bridge runs without
//! hardware. Clones share the same register file, which lets tests and the
//! agent poke inputs and inject faults while adapters hold their own handle.
//!
//! Registers are created lazily per stack with a powered card's defaults:
//! 24 V supply, 4 mA on current loop outputs, all other outputs off.

use crate::driver::{
    BasInput, BusResult, IndInput, IndOutput, InputsDriver, MegaBasDriver, MegaIndDriver,
    RelayDriver, RtdDriver, SupervisorDriver,
};
use sequent_bridge_core::BusError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const CHANNELS: usize = 8;

/// Shared simulated register file for cards at stacks 0-7.
#[derive(Debug, Clone, Default)]
pub struct SimBus {
    state: Arc<Mutex<SimState>>,
}

#[derive(Debug, Default)]
struct SimState {
    cards: BTreeMap<u8, SimCard>,
    faulty: BTreeSet<u8>,
}

#[derive(Debug, Clone)]
struct SimCard {
    supply_voltage: f64,
    host_voltage: f64,
    firmware: String,
    cpu_temp: f64,
    watchdog_period: u32,
    watchdog_boot_period: u32,
    watchdog_off_interval: u32,
    watchdog_resets: u32,
    reloads: u32,
    writes: u32,
    outputs: [[f64; CHANNELS]; 3],
    inputs: [[f64; CHANNELS]; 3],
    temperatures: [f64; CHANNELS],
    // LEDs, triacs or relays depending on the card
    switches: u8,
    digital: u8,
    counts: [u32; CHANNELS],
    edges: u16,
}

impl Default for SimCard {
    fn default() -> Self {
        let mut outputs = [[0.0; CHANNELS]; 3];
        outputs[out_slot(IndOutput::FourTwenty)] = [4.0; CHANNELS];
        Self {
            supply_voltage: 24.0,
            host_voltage: 5.1,
            firmware: "1.0".to_string(),
            cpu_temp: 35.0,
            watchdog_period: 120,
            watchdog_boot_period: 120,
            watchdog_off_interval: 10,
            watchdog_resets: 0,
            reloads: 0,
            writes: 0,
            outputs,
            inputs: [[0.0; CHANNELS]; 3],
            temperatures: [0.0; CHANNELS],
            switches: 0,
            digital: 0,
            counts: [0; CHANNELS],
            edges: 0,
        }
    }
}

impl SimCard {
    #[allow(clippy::cast_possible_truncation)]
    fn edge(&self, index: usize) -> u8 {
        // Two bits per channel
        ((self.edges >> (2 * index)) & 0b11) as u8
    }

    fn set_edge(&mut self, index: usize, mode: u8) {
        let shift = 2 * index;
        self.edges = (self.edges & !(0b11 << shift)) | (u16::from(mode & 0b11) << shift);
    }

    fn set_edge_bit(&mut self, index: usize, bit: u8, on: bool) {
        let mode = self.edge(index);
        self.set_edge(index, if on { mode | bit } else { mode & !bit });
    }
}

fn out_slot(kind: IndOutput) -> usize {
    match kind {
        IndOutput::ZeroTen => 0,
        IndOutput::FourTwenty => 1,
        IndOutput::Pwm => 2,
    }
}

fn out_range(kind: IndOutput) -> (f64, f64) {
    match kind {
        IndOutput::ZeroTen => (0.0, 10.0),
        IndOutput::FourTwenty => (4.0, 20.0),
        IndOutput::Pwm => (0.0, 100.0),
    }
}

fn ind_slot(kind: IndInput) -> usize {
    match kind {
        IndInput::ZeroTen => 0,
        IndInput::PlusMinusTen => 1,
        IndInput::FourTwenty => 2,
    }
}

fn bas_slot(kind: BasInput) -> usize {
    match kind {
        BasInput::ZeroTen => 0,
        BasInput::Res1k => 1,
        BasInput::Res10k => 2,
    }
}

fn index(channel: u8) -> BusResult<usize> {
    let index = usize::from(channel)
        .checked_sub(1)
        .filter(|index| *index < CHANNELS)
        .ok_or_else(|| BusError::new(format!("channel {channel} does not exist")))?;
    Ok(index)
}

fn bit(mask: u8, index: usize) -> bool {
    (mask >> index) & 1 == 1
}

fn with_bit(mask: u8, index: usize, on: bool) -> u8 {
    if on {
        mask | (1 << index)
    } else {
        mask & !(1 << index)
    }
}

impl SimBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register access as seen by a driver; fails on faulty stacks.
    fn access<T>(&self, stack: u8, f: impl FnOnce(&mut SimCard) -> BusResult<T>) -> BusResult<T> {
        let mut state = self.lock();
        if state.faulty.contains(&stack) {
            return Err(BusError::new(format!("no acknowledge from card at stack {stack}")));
        }
        f(state.cards.entry(stack).or_default())
    }

    /// Register write as seen by a driver; counted in [`SimBus::writes`].
    fn write(&self, stack: u8, f: impl FnOnce(&mut SimCard) -> BusResult<()>) -> BusResult<()> {
        self.access(stack, |card| {
            f(card)?;
            card.writes += 1;
            Ok(())
        })
    }

    /// Out-of-band access for test benches, ignoring injected faults.
    fn poke<T>(&self, stack: u8, f: impl FnOnce(&mut SimCard) -> T) -> T {
        f(self.lock().cards.entry(stack).or_default())
    }

    /// Make every access to `stack` fail, or heal it again.
    pub fn set_fault(&self, stack: u8, failing: bool) {
        let mut state = self.lock();
        if failing {
            state.faulty.insert(stack);
        } else {
            state.faulty.remove(&stack);
        }
    }

    /// Set the supply voltage a card reports; below 5 V it counts as unpowered.
    pub fn set_supply_voltage(&self, stack: u8, volts: f64) {
        self.poke(stack, |card| card.supply_voltage = volts);
    }

    /// Drive an analog input of an industrial card.
    pub fn set_ind_input(&self, stack: u8, kind: IndInput, channel: u8, value: f64) {
        let Ok(i) = index(channel) else { return };
        self.poke(stack, |card| card.inputs[ind_slot(kind)][i] = value);
    }

    /// Drive an analog input of a building card.
    pub fn set_bas_input(&self, stack: u8, kind: BasInput, channel: u8, value: f64) {
        let Ok(i) = index(channel) else { return };
        self.poke(stack, |card| card.inputs[bas_slot(kind)][i] = value);
    }

    /// Set an RTD temperature.
    pub fn set_temperature(&self, stack: u8, channel: u8, celsius: f64) {
        let Ok(i) = index(channel) else { return };
        self.poke(stack, |card| card.temperatures[i] = celsius);
    }

    /// Open or close a digital input, counting the edge if enabled.
    pub fn set_digital_input(&self, stack: u8, channel: u8, closed: bool) {
        let Ok(i) = index(channel) else { return };
        self.poke(stack, |card| {
            if bit(card.digital, i) == closed {
                return;
            }
            card.digital = with_bit(card.digital, i, closed);
            let edge = if closed { 0b01 } else { 0b10 };
            if card.edge(i) & edge != 0 {
                card.counts[i] += 1;
            }
        });
    }

    /// Number of register writes a card received.
    #[must_use]
    pub fn writes(&self, stack: u8) -> u32 {
        self.poke(stack, |card| card.writes)
    }

    /// Number of watchdog reloads a card received.
    #[must_use]
    pub fn watchdog_reloads(&self, stack: u8) -> u32 {
        self.poke(stack, |card| card.reloads)
    }
}

impl SupervisorDriver for SimBus {
    fn supply_voltage(&mut self, stack: u8) -> BusResult<f64> {
        self.access(stack, |card| Ok(card.supply_voltage))
    }

    fn host_voltage(&mut self, stack: u8) -> BusResult<f64> {
        self.access(stack, |card| Ok(card.host_voltage))
    }

    fn firmware_version(&mut self, stack: u8) -> BusResult<String> {
        self.access(stack, |card| Ok(card.firmware.clone()))
    }

    fn cpu_temp(&mut self, stack: u8) -> BusResult<f64> {
        self.access(stack, |card| Ok(card.cpu_temp))
    }

    fn watchdog_reset_count(&mut self, stack: u8) -> BusResult<u32> {
        self.access(stack, |card| Ok(card.watchdog_resets))
    }

    fn watchdog_period(&mut self, stack: u8) -> BusResult<u32> {
        self.access(stack, |card| Ok(card.watchdog_period))
    }

    fn set_watchdog_period(&mut self, stack: u8, secs: u32) -> BusResult<()> {
        self.write(stack, |card| {
            card.watchdog_period = secs;
            Ok(())
        })
    }

    fn watchdog_boot_period(&mut self, stack: u8) -> BusResult<u32> {
        self.access(stack, |card| Ok(card.watchdog_boot_period))
    }

    fn set_watchdog_boot_period(&mut self, stack: u8, secs: u32) -> BusResult<()> {
        self.write(stack, |card| {
            card.watchdog_boot_period = secs;
            Ok(())
        })
    }

    fn watchdog_off_interval(&mut self, stack: u8) -> BusResult<u32> {
        self.access(stack, |card| Ok(card.watchdog_off_interval))
    }

    fn set_watchdog_off_interval(&mut self, stack: u8, secs: u32) -> BusResult<()> {
        self.write(stack, |card| {
            card.watchdog_off_interval = secs;
            Ok(())
        })
    }

    fn watchdog_reload(&mut self, stack: u8) -> BusResult<()> {
        self.access(stack, |card| {
            card.reloads += 1;
            Ok(())
        })
    }
}

impl MegaIndDriver for SimBus {
    fn analog_output(&mut self, stack: u8, kind: IndOutput, channel: u8) -> BusResult<f64> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(card.outputs[out_slot(kind)][i]))
    }

    fn set_analog_output(
        &mut self,
        stack: u8,
        kind: IndOutput,
        channel: u8,
        value: f64,
    ) -> BusResult<()> {
        let i = index(channel)?;
        let (min, max) = out_range(kind);
        self.write(stack, |card| {
            card.outputs[out_slot(kind)][i] = value.clamp(min, max);
            Ok(())
        })
    }

    fn analog_input(&mut self, stack: u8, kind: IndInput, channel: u8) -> BusResult<f64> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(card.inputs[ind_slot(kind)][i]))
    }

    fn led(&mut self, stack: u8, channel: u8) -> BusResult<bool> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(bit(card.switches, i)))
    }

    fn set_led(&mut self, stack: u8, channel: u8, on: bool) -> BusResult<()> {
        let i = index(channel)?;
        self.write(stack, |card| {
            card.switches = with_bit(card.switches, i, on);
            Ok(())
        })
    }

    fn opto(&mut self, stack: u8, channel: u8) -> BusResult<bool> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(bit(card.digital, i)))
    }

    fn opto_count(&mut self, stack: u8, channel: u8) -> BusResult<u32> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(card.counts[i]))
    }

    fn reset_opto_count(&mut self, stack: u8, channel: u8) -> BusResult<()> {
        let i = index(channel)?;
        self.write(stack, |card| {
            card.counts[i] = 0;
            Ok(())
        })
    }

    fn opto_rising_count(&mut self, stack: u8, channel: u8) -> BusResult<bool> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(card.edge(i) & 0b01 != 0))
    }

    fn set_opto_rising_count(&mut self, stack: u8, channel: u8, on: bool) -> BusResult<()> {
        let i = index(channel)?;
        self.write(stack, |card| {
            card.set_edge_bit(i, 0b01, on);
            Ok(())
        })
    }

    fn opto_falling_count(&mut self, stack: u8, channel: u8) -> BusResult<bool> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(card.edge(i) & 0b10 != 0))
    }

    fn set_opto_falling_count(&mut self, stack: u8, channel: u8, on: bool) -> BusResult<()> {
        let i = index(channel)?;
        self.write(stack, |card| {
            card.set_edge_bit(i, 0b10, on);
            Ok(())
        })
    }
}

impl MegaBasDriver for SimBus {
    fn analog_output(&mut self, stack: u8, channel: u8) -> BusResult<f64> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(card.outputs[0][i]))
    }

    fn set_analog_output(&mut self, stack: u8, channel: u8, value: f64) -> BusResult<()> {
        let i = index(channel)?;
        self.write(stack, |card| {
            card.outputs[0][i] = value.clamp(0.0, 10.0);
            Ok(())
        })
    }

    fn triacs(&mut self, stack: u8) -> BusResult<u8> {
        self.access(stack, |card| Ok(card.switches))
    }

    fn set_triac(&mut self, stack: u8, channel: u8, on: bool) -> BusResult<()> {
        let i = index(channel)?;
        self.write(stack, |card| {
            card.switches = with_bit(card.switches, i, on);
            Ok(())
        })
    }

    fn analog_input(&mut self, stack: u8, kind: BasInput, channel: u8) -> BusResult<f64> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(card.inputs[bas_slot(kind)][i]))
    }

    fn contact(&mut self, stack: u8, channel: u8) -> BusResult<bool> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(bit(card.digital, i)))
    }

    fn contact_count(&mut self, stack: u8, channel: u8) -> BusResult<u32> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(card.counts[i]))
    }

    fn reset_contact_count(&mut self, stack: u8, channel: u8) -> BusResult<()> {
        let i = index(channel)?;
        self.write(stack, |card| {
            card.counts[i] = 0;
            Ok(())
        })
    }

    fn contact_edge(&mut self, stack: u8, channel: u8) -> BusResult<u8> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(card.edge(i)))
    }

    fn set_contact_edge(&mut self, stack: u8, channel: u8, mode: u8) -> BusResult<()> {
        let i = index(channel)?;
        if mode > 3 {
            return Err(BusError::new(format!("invalid edge mode {mode}")));
        }
        self.write(stack, |card| {
            card.set_edge(i, mode);
            Ok(())
        })
    }
}

impl RelayDriver for SimBus {
    fn relay(&mut self, stack: u8, channel: u8) -> BusResult<bool> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(bit(card.switches, i)))
    }

    fn set_relay(&mut self, stack: u8, channel: u8, on: bool) -> BusResult<()> {
        let i = index(channel)?;
        self.write(stack, |card| {
            card.switches = with_bit(card.switches, i, on);
            Ok(())
        })
    }
}

impl InputsDriver for SimBus {
    fn input(&mut self, stack: u8, channel: u8) -> BusResult<bool> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(bit(card.digital, i)))
    }
}

impl RtdDriver for SimBus {
    fn temperature(&mut self, stack: u8, channel: u8) -> BusResult<f64> {
        let i = index(channel)?;
        self.access(stack, |card| Ok(card.temperatures[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_registers() {
        let bus = SimBus::new();
        let mut driver = bus.clone();

        RelayDriver::set_relay(&mut driver, 1, 3, true).unwrap();
        assert!(RelayDriver::relay(&mut bus.clone(), 1, 3).unwrap());
        assert_eq!(bus.writes(1), 1);
    }

    #[test]
    fn analog_outputs_clamp_to_range() {
        let mut bus = SimBus::new();

        MegaIndDriver::set_analog_output(&mut bus, 0, IndOutput::FourTwenty, 1, 25.0).unwrap();
        assert_eq!(
            MegaIndDriver::analog_output(&mut bus, 0, IndOutput::FourTwenty, 1).unwrap(),
            20.0
        );
        assert_eq!(
            MegaIndDriver::analog_output(&mut bus, 0, IndOutput::FourTwenty, 2).unwrap(),
            4.0
        );
    }

    #[test]
    fn contacts_count_enabled_edges() {
        let mut bus = SimBus::new();
        bus.set_contact_edge(0, 2, 0b10).unwrap();

        for closed in [true, false, true, false] {
            bus.set_digital_input(0, 2, closed);
        }
        assert_eq!(bus.contact_count(0, 2).unwrap(), 2);
        assert_eq!(bus.contact_count(0, 1).unwrap(), 0);
    }

    #[test]
    fn faults_fail_every_access_until_healed() {
        let mut bus = SimBus::new();
        bus.set_fault(3, true);

        assert!(bus.supply_voltage(3).is_err());
        assert!(RelayDriver::set_relay(&mut bus, 3, 1, true).is_err());
        assert!(bus.supply_voltage(2).is_ok());

        bus.set_fault(3, false);
        assert_eq!(bus.supply_voltage(3).unwrap(), 24.0);
    }

    #[test]
    fn channels_outside_the_card_fail() {
        let mut bus = SimBus::new();
        assert!(RtdDriver::temperature(&mut bus, 0, 0).is_err());
        assert!(RtdDriver::temperature(&mut bus, 0, 9).is_err());
    }
}
