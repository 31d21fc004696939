//! Poll/diff/publish and command application over all configured boards.
//!
//! Every board sits behind its own mutex together with its cache, so a
//! write, its read-back and the cache update form one step that a concurrent
//! poll of the same board can never observe half done.

use crate::adapter::{DeviceAdapter, PowerState, WatchdogSettings};
use crate::cache::ChannelCache;
use crate::catalog::{self, Domain, SignalSpec};
use crate::error::{CommandError, DeviceError, ValidationError};
use crate::model::{Board, Direction, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A value that must be published to the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishEvent {
    /// Source board
    pub board: Board,
    /// Topic direction
    pub direction: Direction,
    /// Signal name
    pub signal: &'static str,
    /// Channel, 1-indexed
    pub channel: u8,
    /// Value to publish
    pub value: Value,
}

/// Outcome of a successfully applied command.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmed {
    /// Value read back from the device after the write
    pub value: Value,
    /// Events to publish, in order
    pub events: Vec<PublishEvent>,
}

/// Outcome of forcing a board's outputs to their safe state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResetReport {
    /// Confirmed safe values to publish
    pub events: Vec<PublishEvent>,
    /// Channels attempted
    pub attempted: usize,
    /// Channels whose write or read-back failed
    pub failed: usize,
}

/// The board reporting telemetry for the fleet.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySource {
    /// Board the readings come from
    pub board: Board,
    /// Power and supervisor readings
    pub power: PowerState,
}

/// Two adapters were registered for the same stack address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stack {0} configured twice")]
pub struct DuplicateStack(pub u8);

struct BoardSlot {
    adapter: Box<dyn DeviceAdapter>,
    cache: ChannelCache,
}

struct BoardEntry {
    board: Board,
    slot: Mutex<BoardSlot>,
}

/// Cache-diff engine over a fixed set of boards.
pub struct SyncEngine {
    boards: BTreeMap<u8, BoardEntry>,
}

impl SyncEngine {
    /// Build an engine with a zeroed cache per adapter.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateStack`] if two adapters drive the same stack address.
    pub fn new(adapters: Vec<Box<dyn DeviceAdapter>>) -> Result<Self, DuplicateStack> {
        let mut boards = BTreeMap::new();
        for adapter in adapters {
            let board = adapter.board();
            let entry = BoardEntry {
                board,
                slot: Mutex::new(BoardSlot {
                    cache: ChannelCache::new(board.family),
                    adapter,
                }),
            };
            if boards.insert(board.stack, entry).is_some() {
                return Err(DuplicateStack(board.stack));
            }
        }
        Ok(Self { boards })
    }

    /// Configured boards in stack order.
    pub fn boards(&self) -> impl Iterator<Item = Board> + '_ {
        self.boards.values().map(|entry| entry.board)
    }

    /// Board configured at `stack`.
    #[must_use]
    pub fn board(&self, stack: u8) -> Option<Board> {
        self.boards.get(&stack).map(|entry| entry.board)
    }

    fn lock(&self, stack: u8) -> Result<(Board, MutexGuard<'_, BoardSlot>), CommandError> {
        let entry = self
            .boards
            .get(&stack)
            .ok_or(CommandError::UnknownBoard(stack))?;
        let slot = entry.slot.lock().unwrap_or_else(PoisonError::into_inner);
        Ok((entry.board, slot))
    }

    /// Read every polled channel of a board and return the values that must be
    /// published: those differing from the cache, or all of them with `force_all`.
    ///
    /// A channel whose read fails is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownBoard`] if no board sits at `stack`.
    pub fn poll_and_publish(
        &self,
        stack: u8,
        force_all: bool,
    ) -> Result<Vec<PublishEvent>, CommandError> {
        let (board, mut slot) = self.lock(stack)?;
        let BoardSlot { adapter, cache } = &mut *slot;
        let mut events = Vec::new();

        for spec in catalog::signals(board.family)
            .iter()
            .filter(|spec| spec.is_polled())
        {
            for channel in 1..=spec.arity {
                match adapter.read_signal(spec, channel) {
                    Ok(value) => {
                        let value = value.rounded();
                        if cache.update(spec.direction, spec.name, channel, value, force_all) {
                            events.push(event(board, spec.direction, spec.name, channel, value));
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            %board,
                            direction = %spec.direction,
                            signal = spec.name,
                            channel,
                            error = %err,
                            "Failed to read channel"
                        );
                    }
                }
            }
        }

        tracing::trace!(%board, changed = events.len(), force_all, "Polled board");
        Ok(events)
    }

    /// Poll every board in stack order.
    #[must_use]
    pub fn poll_all(&self, force_all: bool) -> Vec<PublishEvent> {
        let mut events = Vec::new();
        for stack in self.boards.keys() {
            match self.poll_and_publish(*stack, force_all) {
                Ok(changed) => events.extend(changed),
                Err(err) => tracing::warn!(stack, error = %err, "Poll failed"),
            }
        }
        events
    }

    /// Validate a command, write it, read the channel back and cache the
    /// confirmed value.
    ///
    /// Validation happens before any device access. The published value is
    /// the read-back, not the requested value.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownBoard`], [`CommandError::Invalid`] when
    /// the command is rejected without touching the device, or
    /// [`CommandError::Device`] when the write or read-back fails, in which
    /// case the cache is left unchanged.
    pub fn apply_command(
        &self,
        stack: u8,
        signal: &str,
        channel: u8,
        raw: Value,
    ) -> Result<Confirmed, CommandError> {
        let (board, mut slot) = self.lock(stack)?;
        let invalid = |source| CommandError::Invalid { board, source };

        let spec = catalog::command_target(board.family, signal).map_err(invalid)?;
        spec.check_channel(channel).map_err(invalid)?;
        let value = spec.validate(raw).map_err(invalid)?;

        let confirmed = slot
            .apply(board, spec, channel, value)
            .map_err(|source| CommandError::Device {
                board,
                signal: spec.name.to_string(),
                channel,
                value: raw,
                source,
            })?;

        tracing::info!(
            %board,
            signal = spec.name,
            channel,
            requested = %raw,
            confirmed = %confirmed.value,
            "Applied command"
        );
        Ok(confirmed)
    }

    /// Force every output channel of a board to its safe value.
    ///
    /// Best effort: a failing channel is logged and the remaining channels
    /// are still attempted.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownBoard`] if no board sits at `stack`.
    pub fn reset_board_outputs(&self, stack: u8) -> Result<ResetReport, CommandError> {
        let (board, mut slot) = self.lock(stack)?;
        let mut report = ResetReport::default();

        for spec in catalog::signals(board.family) {
            let Some(safe) = spec.safe_value() else {
                continue;
            };
            for channel in 1..=spec.arity {
                report.attempted += 1;
                match slot.apply(board, spec, channel, safe) {
                    Ok(confirmed) => report.events.extend(confirmed.events),
                    Err(err) => {
                        report.failed += 1;
                        tracing::error!(
                            %board,
                            signal = spec.name,
                            channel,
                            value = %safe,
                            error = %err,
                            "Failed to reset output"
                        );
                    }
                }
            }
        }

        tracing::warn!(
            %board,
            attempted = report.attempted,
            failed = report.failed,
            "Board outputs forced to safe state"
        );
        Ok(report)
    }

    /// Bring every powered board's hardware watchdog to `settings`.
    pub fn configure_watchdogs(&self, settings: &WatchdogSettings) {
        self.for_each_powered("configure watchdog", |board, adapter| {
            let written = adapter.configure_watchdog(settings)?;
            if written > 0 {
                tracing::info!(%board, written, ?settings, "Watchdog reconfigured");
            }
            Ok(())
        });
    }

    /// Reload every powered board's hardware watchdog. Returns how many were reloaded.
    pub fn reload_watchdogs(&self) -> usize {
        self.for_each_powered("reload watchdog", |_, adapter| adapter.reload_watchdog())
    }

    /// Power readings of the first board, in stack order, that reports itself powered.
    #[must_use]
    pub fn telemetry(&self) -> Option<TelemetrySource> {
        for entry in self.boards.values() {
            let mut slot = entry.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.adapter.read_power_state() {
                Ok(power) if power.is_powered() => {
                    return Some(TelemetrySource {
                        board: entry.board,
                        power,
                    });
                }
                Ok(power) => {
                    tracing::debug!(
                        board = %entry.board,
                        supply = power.supply_voltage,
                        "Board unpowered"
                    );
                }
                Err(DeviceError::Unsupported { .. }) => {}
                Err(err) => {
                    tracing::warn!(
                        board = %entry.board,
                        error = %err,
                        "Failed to read power state"
                    );
                }
            }
        }
        None
    }

    /// Cached value of one channel.
    #[must_use]
    pub fn cached(
        &self,
        stack: u8,
        direction: Direction,
        signal: &str,
        channel: u8,
    ) -> Option<Value> {
        let (_, slot) = self.lock(stack).ok()?;
        slot.cache.get(direction, signal, channel)
    }

    fn for_each_powered<F>(&self, operation: &'static str, mut f: F) -> usize
    where
        F: FnMut(Board, &mut dyn DeviceAdapter) -> Result<(), DeviceError>,
    {
        let mut done = 0;
        for entry in self.boards.values() {
            let board = entry.board;
            let mut slot = entry.slot.lock().unwrap_or_else(PoisonError::into_inner);
            let adapter = slot.adapter.as_mut();
            let result = match adapter.read_power_state() {
                Ok(power) if power.is_powered() => f(board, adapter),
                Ok(_) => continue,
                Err(err) => Err(err),
            };
            match result {
                Ok(()) => done += 1,
                Err(DeviceError::Unsupported { .. }) => {}
                Err(err) => {
                    tracing::warn!(%board, operation, error = %err, "Watchdog operation failed");
                }
            }
        }
        done
    }
}

impl BoardSlot {
    /// Write a validated value, read it back and cache the confirmed result.
    fn apply(
        &mut self,
        board: Board,
        spec: &'static SignalSpec,
        channel: u8,
        value: Value,
    ) -> Result<Confirmed, DeviceError> {
        match spec.domain {
            Domain::EdgeEnable { edge, companion } => {
                // Companion bit comes from the cache: a bouncing input may change
                // the device register between the two edge commands.
                let other = self
                    .cache
                    .get(Direction::Response, companion, channel)
                    .and_then(Value::as_integer)
                    == Some(1);
                let mode = edge.compose(value.as_integer() == Some(1), other);
                self.adapter.write_edge_mode(spec, channel, mode)?;
                let read_back = self.adapter.read_edge_mode(spec, channel)?;
                let confirmed = Value::Int(i64::from(edge.enabled_in(read_back)));
                self.cache.set(spec.direction, spec.name, channel, confirmed);
                Ok(Confirmed {
                    value: confirmed,
                    events: vec![event(board, spec.direction, spec.name, channel, confirmed)],
                })
            }
            Domain::ResetPulse { counter } => {
                let counter_spec = catalog::find(board.family, Direction::Input, counter)
                    .ok_or(ValidationError::NotWritable { signal: spec.name })?;
                self.adapter.write_signal(spec, channel, value)?;
                let count = self.adapter.read_signal(counter_spec, channel)?.rounded();
                self.cache.set(Direction::Input, counter, channel, count);
                Ok(Confirmed {
                    value: count,
                    events: vec![
                        event(board, Direction::Response, spec.name, channel, Value::Int(1)),
                        event(board, Direction::Input, counter, channel, count),
                    ],
                })
            }
            _ => {
                self.adapter.write_signal(spec, channel, value)?;
                let confirmed = self.adapter.read_signal(spec, channel)?.rounded();
                self.cache.set(spec.direction, spec.name, channel, confirmed);
                Ok(Confirmed {
                    value: confirmed,
                    events: vec![event(board, spec.direction, spec.name, channel, confirmed)],
                })
            }
        }
    }
}

fn event(
    board: Board,
    direction: Direction,
    signal: &'static str,
    channel: u8,
    value: Value,
) -> PublishEvent {
    PublishEvent {
        board,
        direction,
        signal,
        channel,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;
    use crate::model::Family;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Register map shared between a test and the adapter it hands to the engine.
    #[derive(Default)]
    struct Registers {
        values: HashMap<(&'static str, u8), Value>,
        edge_modes: HashMap<u8, i64>,
        writes: usize,
        fail_writes: bool,
        fail_reads_of: Option<&'static str>,
    }

    struct MockAdapter {
        board: Board,
        regs: Arc<Mutex<Registers>>,
    }

    impl MockAdapter {
        fn boxed(family: Family, stack: u8) -> (Box<dyn DeviceAdapter>, Arc<Mutex<Registers>>) {
            let regs = Arc::new(Mutex::new(Registers::default()));
            let adapter = Self {
                board: Board::new(family, stack),
                regs: Arc::clone(&regs),
            };
            (Box::new(adapter), regs)
        }
    }

    impl DeviceAdapter for MockAdapter {
        fn board(&self) -> Board {
            self.board
        }

        fn read_signal(&mut self, signal: &SignalSpec, channel: u8) -> Result<Value, DeviceError> {
            let regs = self.regs.lock().unwrap();
            if regs.fail_reads_of == Some(signal.name) {
                return Err(DeviceError::bus(self.board, BusError::new("nack")));
            }
            if let Domain::EdgeEnable { edge, .. } = signal.domain {
                let mode = regs.edge_modes.get(&channel).copied().unwrap_or(0);
                return Ok(Value::Int(i64::from(edge.enabled_in(mode))));
            }
            let zero = match signal.domain {
                Domain::Analog { .. } | Domain::Measurement => Value::Float(0.0),
                _ => Value::Int(0),
            };
            Ok(regs
                .values
                .get(&(signal.name, channel))
                .copied()
                .unwrap_or(zero))
        }

        fn write_signal(
            &mut self,
            signal: &SignalSpec,
            channel: u8,
            value: Value,
        ) -> Result<(), DeviceError> {
            let value = signal.validate(value)?;
            let mut regs = self.regs.lock().unwrap();
            if regs.fail_writes {
                return Err(DeviceError::bus(self.board, BusError::new("write timeout")));
            }
            regs.writes += 1;
            match signal.domain {
                Domain::ResetPulse { counter } => {
                    regs.values.insert((counter, channel), Value::Int(0));
                }
                // Device quantizes analog outputs to 0.25 steps.
                Domain::Analog { .. } => {
                    let stepped = (value.as_f64() * 4.0).round() / 4.0;
                    regs.values.insert((signal.name, channel), Value::Float(stepped));
                }
                _ => {
                    regs.values.insert((signal.name, channel), value);
                }
            }
            Ok(())
        }

        fn read_edge_mode(&mut self, _: &SignalSpec, channel: u8) -> Result<i64, DeviceError> {
            Ok(self.regs.lock().unwrap().edge_modes.get(&channel).copied().unwrap_or(0))
        }

        fn write_edge_mode(
            &mut self,
            _: &SignalSpec,
            channel: u8,
            mode: i64,
        ) -> Result<(), DeviceError> {
            let mut regs = self.regs.lock().unwrap();
            if regs.fail_writes {
                return Err(DeviceError::bus(self.board, BusError::new("write timeout")));
            }
            regs.writes += 1;
            regs.edge_modes.insert(channel, mode);
            Ok(())
        }
    }

    fn engine_with(family: Family) -> (SyncEngine, Arc<Mutex<Registers>>) {
        let (adapter, regs) = MockAdapter::boxed(family, 0);
        (SyncEngine::new(vec![adapter]).unwrap(), regs)
    }

    #[test]
    fn poll_emits_only_changes() {
        let (engine, regs) = engine_with(Family::MegaInd);

        let all = engine.poll_and_publish(0, true).unwrap();
        assert_eq!(all.len(), 11 * 4);

        assert!(engine.poll_and_publish(0, false).unwrap().is_empty());

        regs.lock()
            .unwrap()
            .values
            .insert(("pm0_10", 3), Value::Float(-2.345_6));
        let changed = engine.poll_and_publish(0, false).unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].direction, Direction::Input);
        assert_eq!(changed[0].signal, "pm0_10");
        assert_eq!(changed[0].channel, 3);
        assert_eq!(changed[0].value, Value::Float(-2.35));

        // Sub-rounding noise is suppressed.
        regs.lock()
            .unwrap()
            .values
            .insert(("pm0_10", 3), Value::Float(-2.348));
        assert!(engine.poll_and_publish(0, false).unwrap().is_empty());
    }

    #[test]
    fn forced_poll_follows_catalog_order() {
        let (engine, _) = engine_with(Family::MegaBas);
        let events = engine.poll_and_publish(0, true).unwrap();

        let first_input = events
            .iter()
            .position(|e| e.direction == Direction::Input)
            .unwrap();
        assert!(events[..first_input]
            .iter()
            .all(|e| e.direction == Direction::Response));
        assert_eq!(events[0].signal, "0_10");
        assert_eq!(events[0].channel, 1);
        assert_eq!(events[3].channel, 4);
        assert_eq!(events[4].signal, "triac");
    }

    #[test]
    fn failed_read_skips_only_that_signal() {
        let (engine, regs) = engine_with(Family::MegaInd);
        regs.lock().unwrap().fail_reads_of = Some("led");
        let events = engine.poll_and_publish(0, true).unwrap();
        assert_eq!(events.len(), 10 * 4);
        assert!(events.iter().all(|e| e.signal != "led"));
    }

    #[test]
    fn command_publishes_read_back() {
        let (engine, _) = engine_with(Family::MegaInd);
        let confirmed = engine
            .apply_command(0, "0_10", 2, Value::Float(3.3))
            .unwrap();

        assert_eq!(confirmed.value, Value::Float(3.25));
        assert_eq!(confirmed.events.len(), 1);
        assert_eq!(confirmed.events[0].value, Value::Float(3.25));
        assert_eq!(
            engine.cached(0, Direction::Response, "0_10", 2),
            Some(Value::Float(3.25))
        );
        // The poll that follows has nothing new to say.
        assert!(engine.poll_and_publish(0, false).unwrap().is_empty());
    }

    #[test]
    fn out_of_range_is_rejected_before_device_access() {
        let (engine, regs) = engine_with(Family::MegaInd);

        let err = engine.apply_command(0, "0_10", 1, Value::Int(11)).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Invalid {
                source: ValidationError::OutOfDomain { .. },
                ..
            }
        ));

        let err = engine.apply_command(0, "led", 1, Value::Int(2)).unwrap_err();
        assert!(matches!(err, CommandError::Invalid { .. }));

        let err = engine.apply_command(0, "led", 5, Value::Int(1)).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Invalid {
                source: ValidationError::ChannelOutOfRange { .. },
                ..
            }
        ));

        let err = engine.apply_command(0, "triac", 1, Value::Int(1)).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Invalid {
                source: ValidationError::UnknownSignal { .. },
                ..
            }
        ));

        assert_eq!(regs.lock().unwrap().writes, 0);
    }

    #[test]
    fn failed_write_leaves_cache_untouched() {
        let (engine, regs) = engine_with(Family::Relay8);
        regs.lock().unwrap().fail_writes = true;

        let err = engine.apply_command(0, "relay", 4, Value::Int(1)).unwrap_err();
        assert!(matches!(err, CommandError::Device { channel: 4, .. }));
        assert_eq!(
            engine.cached(0, Direction::Response, "relay", 4),
            Some(Value::Int(0))
        );
    }

    #[test]
    fn failed_read_back_leaves_cache_untouched() {
        let (engine, regs) = engine_with(Family::Relay8);
        regs.lock().unwrap().fail_reads_of = Some("relay");

        assert!(engine.apply_command(0, "relay", 1, Value::Int(1)).is_err());
        assert_eq!(
            engine.cached(0, Direction::Response, "relay", 1),
            Some(Value::Int(0))
        );
    }

    #[test]
    fn edge_bits_are_independent() {
        let (engine, regs) = engine_with(Family::MegaBas);

        engine.apply_command(0, "cont_fce", 5, Value::Int(1)).unwrap();
        assert_eq!(regs.lock().unwrap().edge_modes[&5], 2);

        let confirmed = engine.apply_command(0, "cont_rce", 5, Value::Int(1)).unwrap();
        assert_eq!(confirmed.value, Value::Int(1));
        assert_eq!(regs.lock().unwrap().edge_modes[&5], 3);

        engine.apply_command(0, "cont_rce", 5, Value::Int(0)).unwrap();
        assert_eq!(regs.lock().unwrap().edge_modes[&5], 2);
        assert_eq!(
            engine.cached(0, Direction::Response, "cont_fce", 5),
            Some(Value::Int(1))
        );
    }

    #[test]
    fn edge_write_uses_cached_companion_not_device() {
        let (engine, regs) = engine_with(Family::MegaBas);
        engine.apply_command(0, "cont_fce", 1, Value::Int(1)).unwrap();

        // Register drifts underneath; the cached falling bit still wins.
        regs.lock().unwrap().edge_modes.insert(1, 0);
        engine.apply_command(0, "cont_rce", 1, Value::Int(1)).unwrap();
        assert_eq!(regs.lock().unwrap().edge_modes[&1], 3);
    }

    #[test]
    fn counter_reset_publishes_ack_and_count() {
        let (engine, regs) = engine_with(Family::MegaInd);
        regs.lock()
            .unwrap()
            .values
            .insert(("opto_count", 2), Value::Int(17));
        engine.poll_and_publish(0, false).unwrap();

        assert!(engine.apply_command(0, "opto_rst", 2, Value::Int(0)).is_err());

        let confirmed = engine.apply_command(0, "opto_rst", 2, Value::Int(1)).unwrap();
        assert_eq!(confirmed.events.len(), 2);
        assert_eq!(confirmed.events[0].direction, Direction::Response);
        assert_eq!(confirmed.events[0].signal, "opto_rst");
        assert_eq!(confirmed.events[0].value, Value::Int(1));
        assert_eq!(confirmed.events[1].direction, Direction::Input);
        assert_eq!(confirmed.events[1].signal, "opto_count");
        assert_eq!(confirmed.events[1].value, Value::Int(0));
        assert_eq!(
            engine.cached(0, Direction::Input, "opto_count", 2),
            Some(Value::Int(0))
        );
    }

    #[test]
    fn reset_drives_outputs_to_safe_values() {
        let (engine, regs) = engine_with(Family::MegaInd);
        engine.apply_command(0, "4_20", 1, Value::Int(12)).unwrap();
        engine.apply_command(0, "led", 3, Value::Int(1)).unwrap();

        let report = engine.reset_board_outputs(0).unwrap();
        // 0_10, 4_20, pwm, led, opto_rce, opto_fce
        assert_eq!(report.attempted, 6 * 4);
        assert_eq!(report.failed, 0);
        assert_eq!(
            engine.cached(0, Direction::Response, "4_20", 1),
            Some(Value::Float(4.0))
        );
        assert_eq!(
            engine.cached(0, Direction::Response, "led", 3),
            Some(Value::Int(0))
        );
        assert!(regs.lock().unwrap().writes >= 24);
    }

    #[test]
    fn reset_continues_past_failures() {
        let (engine, regs) = engine_with(Family::Relay8);
        regs.lock().unwrap().fail_reads_of = Some("relay");

        let report = engine.reset_board_outputs(0).unwrap();
        assert_eq!(report.attempted, 8);
        assert_eq!(report.failed, 8);
        assert_eq!(regs.lock().unwrap().writes, 8);
    }

    #[test]
    fn read_only_boards_have_nothing_to_reset() {
        let (engine, _) = engine_with(Family::Rtd);
        let report = engine.reset_board_outputs(0).unwrap();
        assert_eq!(report.attempted, 0);
    }

    #[test]
    fn duplicate_stack_is_rejected() {
        let (a, _) = MockAdapter::boxed(Family::Relay8, 2);
        let (b, _) = MockAdapter::boxed(Family::Rtd, 2);
        assert_eq!(SyncEngine::new(vec![a, b]).err(), Some(DuplicateStack(2)));
    }

    #[test]
    fn unknown_board_is_reported() {
        let (engine, _) = engine_with(Family::Relay8);
        assert_eq!(
            engine.apply_command(5, "relay", 1, Value::Int(1)).unwrap_err(),
            CommandError::UnknownBoard(5)
        );
    }

    #[test]
    fn unsupported_families_are_skipped_for_watchdog_and_telemetry() {
        let (engine, _) = engine_with(Family::Relay8);
        assert_eq!(engine.reload_watchdogs(), 0);
        assert!(engine.telemetry().is_none());
    }
}
