//! Heartbeat, hardware watchdog and telemetry cadences.
//!
//! The supervisor never reads a clock itself: every call takes `now` in Unix
//! seconds, so the same state machine runs against wall time in the agent and
//! against simulated time in tests.

use crate::engine::{PublishEvent, SyncEngine, TelemetrySource};
use crate::error::LivenessExpired;

/// Seconds between two unsolicited telemetry snapshots.
pub const TELEMETRY_PERIOD_SECS: u64 = 300;

/// Supervisor timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Seconds without a challenge before outputs are reset; 0 disables the check
    pub heartbeat_timeout: u64,
    /// Hardware watchdog period; boards are reloaded every third of it
    pub watchdog_timeout: u64,
}

/// Heartbeat state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heartbeat {
    /// Last challenge received at the given Unix second
    Alive {
        /// Unix seconds of the last challenge
        last: u64,
    },
    /// Timed out; outputs were reset and stay so until the next challenge
    Expired,
}

/// What the supervisor needs from the boards it guards.
pub trait Fleet {
    /// Stack addresses of all configured boards.
    fn stacks(&self) -> Vec<u8>;

    /// Force one board's outputs to their safe state, returning values to publish.
    fn reset_outputs(&self, stack: u8) -> Vec<PublishEvent>;

    /// Reload every hardware watchdog, returning how many boards were reloaded.
    fn reload_watchdogs(&self) -> usize;

    /// Power readings of the first powered board.
    fn telemetry(&self) -> Option<TelemetrySource>;
}

impl Fleet for SyncEngine {
    fn stacks(&self) -> Vec<u8> {
        self.boards().map(|board| board.stack).collect()
    }

    fn reset_outputs(&self, stack: u8) -> Vec<PublishEvent> {
        match self.reset_board_outputs(stack) {
            Ok(report) => report.events,
            Err(err) => {
                tracing::error!(stack, error = %err, "Failed to reset board outputs");
                Vec::new()
            }
        }
    }

    fn reload_watchdogs(&self) -> usize {
        SyncEngine::reload_watchdogs(self)
    }

    fn telemetry(&self) -> Option<TelemetrySource> {
        SyncEngine::telemetry(self)
    }
}

/// A telemetry snapshot fell due this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryTick {
    /// Readings of the first powered board, if any board is powered
    pub source: Option<TelemetrySource>,
}

/// Everything one supervisor tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Set when a telemetry snapshot is due
    pub telemetry: Option<TelemetryTick>,
    /// Whether the hardware watchdogs were reloaded
    pub watchdog_reloaded: bool,
    /// Safe values published after a heartbeat timeout
    pub reset_events: Vec<PublishEvent>,
    /// Set on the tick the heartbeat expired
    pub expired: Option<LivenessExpired>,
}

impl TickOutcome {
    /// Whether this tick calls for a full, forced republish of all channels.
    #[must_use]
    pub fn force_publish(&self) -> bool {
        self.telemetry.is_some()
    }
}

/// Tracks the three liveness clocks.
#[derive(Debug, Clone)]
pub struct LivenessSupervisor {
    config: LivenessConfig,
    heartbeat: Heartbeat,
    last_reload: Option<u64>,
    last_telemetry: Option<u64>,
    state_requested: bool,
}

impl LivenessSupervisor {
    /// Start supervision; the heartbeat counts as alive from `now`.
    #[must_use]
    pub fn new(config: LivenessConfig, now: u64) -> Self {
        Self {
            config,
            heartbeat: Heartbeat::Alive { last: now },
            last_reload: None,
            last_telemetry: None,
            state_requested: false,
        }
    }

    /// Current heartbeat state.
    #[must_use]
    pub fn heartbeat(&self) -> Heartbeat {
        self.heartbeat
    }

    /// Reset the reload and telemetry clocks for a fresh broker session so both
    /// fire on the first tick. The heartbeat state carries over.
    pub fn begin_session(&mut self) {
        self.last_reload = None;
        self.last_telemetry = None;
    }

    /// Record a heartbeat challenge. Returns the timestamp to answer with.
    pub fn on_challenge(&mut self, now: u64) -> u64 {
        if self.heartbeat == Heartbeat::Expired {
            tracing::info!(now, "Heartbeat restored");
        }
        self.heartbeat = Heartbeat::Alive { last: now };
        now
    }

    /// Ask for telemetry and a forced full republish on the next tick.
    pub fn request_state(&mut self) {
        self.state_requested = true;
    }

    /// Reload the hardware watchdogs if a third of the timeout has passed.
    pub fn keep_watchdog(&mut self, now: u64, fleet: &dyn Fleet) -> bool {
        let due = self
            .last_reload
            .map_or(true, |last| now.saturating_sub(last) >= self.config.watchdog_timeout / 3);
        if !due {
            return false;
        }
        let reloaded = fleet.reload_watchdogs();
        tracing::debug!(now, reloaded, "Watchdogs reloaded");
        self.last_reload = Some(now);
        true
    }

    /// Advance all three clocks to `now`.
    pub fn tick(&mut self, now: u64, fleet: &dyn Fleet) -> TickOutcome {
        let telemetry_due = self.state_requested
            || self
                .last_telemetry
                .map_or(true, |last| now.saturating_sub(last) >= TELEMETRY_PERIOD_SECS);
        let telemetry = if telemetry_due {
            let source = fleet.telemetry();
            if source.is_none() {
                tracing::debug!("No powered board to report telemetry");
            }
            self.last_telemetry = Some(now);
            self.state_requested = false;
            Some(TelemetryTick { source })
        } else {
            None
        };

        TickOutcome {
            telemetry,
            ..self.guard(now, fleet)
        }
    }

    /// Watchdog reload and heartbeat check without telemetry.
    ///
    /// Runs every second whether or not the broker is reachable, so a silent
    /// peer resets the outputs even while the bridge is disconnected.
    pub fn guard(&mut self, now: u64, fleet: &dyn Fleet) -> TickOutcome {
        let mut outcome = TickOutcome {
            watchdog_reloaded: self.keep_watchdog(now, fleet),
            ..TickOutcome::default()
        };

        if let Some(silent_secs) = self.heartbeat_overdue(now) {
            tracing::error!(
                silent_secs,
                timeout = self.config.heartbeat_timeout,
                "Heartbeat missing, resetting all board outputs"
            );
            for stack in fleet.stacks() {
                outcome.reset_events.extend(fleet.reset_outputs(stack));
            }
            self.heartbeat = Heartbeat::Expired;
            outcome.expired = Some(LivenessExpired { silent_secs });
        }

        outcome
    }

    fn heartbeat_overdue(&self, now: u64) -> Option<u64> {
        if self.config.heartbeat_timeout == 0 {
            return None;
        }
        match self.heartbeat {
            Heartbeat::Alive { last } => {
                let silent = now.saturating_sub(last);
                (silent > self.config.heartbeat_timeout).then_some(silent)
            }
            Heartbeat::Expired => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::PowerState;
    use crate::model::{Board, Family};
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeFleet {
        stacks: Vec<u8>,
        powered: Option<Board>,
        resets: RefCell<HashMap<u8, usize>>,
        reloads: RefCell<usize>,
        telemetry_reads: RefCell<usize>,
    }

    impl Fleet for FakeFleet {
        fn stacks(&self) -> Vec<u8> {
            self.stacks.clone()
        }

        fn reset_outputs(&self, stack: u8) -> Vec<PublishEvent> {
            *self.resets.borrow_mut().entry(stack).or_default() += 1;
            Vec::new()
        }

        fn reload_watchdogs(&self) -> usize {
            *self.reloads.borrow_mut() += 1;
            self.stacks.len()
        }

        fn telemetry(&self) -> Option<TelemetrySource> {
            *self.telemetry_reads.borrow_mut() += 1;
            self.powered.map(|board| TelemetrySource {
                board,
                power: PowerState {
                    supply_voltage: 24.1,
                    backup_voltage: 5.1,
                    firmware_version: "1.4".to_string(),
                    cpu_temp: 41.0,
                    watchdog_resets: 2,
                },
            })
        }
    }

    const START: u64 = 1_700_000_000;

    fn supervisor(heartbeat_timeout: u64, watchdog_timeout: u64) -> LivenessSupervisor {
        LivenessSupervisor::new(
            LivenessConfig {
                heartbeat_timeout,
                watchdog_timeout,
            },
            START,
        )
    }

    #[test]
    fn heartbeat_timeout_resets_every_board_once() {
        let fleet = FakeFleet {
            stacks: vec![0, 3, 7],
            ..Default::default()
        };
        let mut sup = supervisor(60, 90);

        let mut expired_at = None;
        for t in 1..=180 {
            let outcome = sup.tick(START + t, &fleet);
            if outcome.expired.is_some() {
                assert!(expired_at.is_none(), "expired twice");
                expired_at = Some(t);
            }
        }

        assert_eq!(expired_at, Some(61));
        assert_eq!(sup.heartbeat(), Heartbeat::Expired);
        let resets = fleet.resets.borrow();
        assert_eq!(resets.len(), 3);
        assert!(resets.values().all(|count| *count == 1));
    }

    #[test]
    fn challenge_keeps_heartbeat_alive() {
        let fleet = FakeFleet {
            stacks: vec![0],
            ..Default::default()
        };
        let mut sup = supervisor(60, 90);

        for t in 1..=300 {
            if t % 45 == 0 {
                assert_eq!(sup.on_challenge(START + t), START + t);
            }
            assert!(sup.tick(START + t, &fleet).expired.is_none());
        }
        assert!(fleet.resets.borrow().is_empty());
    }

    #[test]
    fn challenge_revives_expired_heartbeat() {
        let fleet = FakeFleet {
            stacks: vec![1],
            ..Default::default()
        };
        let mut sup = supervisor(10, 90);
        assert!(sup.tick(START + 11, &fleet).expired.is_some());

        sup.on_challenge(START + 20);
        assert_eq!(sup.heartbeat(), Heartbeat::Alive { last: START + 20 });
        assert!(sup.tick(START + 30, &fleet).expired.is_none());
        assert!(sup.tick(START + 31, &fleet).expired.is_some());
        assert_eq!(fleet.resets.borrow()[&1], 2);
    }

    #[test]
    fn zero_timeout_disables_heartbeat() {
        let fleet = FakeFleet {
            stacks: vec![0],
            ..Default::default()
        };
        let mut sup = supervisor(0, 90);
        assert!(sup.tick(START + 100_000, &fleet).expired.is_none());
    }

    #[test]
    fn watchdog_reloads_every_third_of_timeout() {
        let fleet = FakeFleet {
            stacks: vec![0],
            ..Default::default()
        };
        let mut sup = supervisor(0, 90);

        let mut reloads = Vec::new();
        for t in 0..=300 {
            // Alternate between connected ticks and disconnected keep-alives.
            let reloaded = if (t / 50) % 2 == 0 {
                sup.tick(START + t, &fleet).watchdog_reloaded
            } else {
                sup.keep_watchdog(START + t, &fleet)
            };
            if reloaded {
                reloads.push(t);
            }
        }

        assert_eq!(reloads.first(), Some(&0));
        assert!(reloads.windows(2).all(|pair| pair[1] - pair[0] <= 30));
        assert_eq!(reloads.len(), 11);
    }

    #[test]
    fn guard_expires_heartbeat_without_telemetry() {
        let fleet = FakeFleet {
            stacks: vec![0, 4],
            powered: Some(Board::new(Family::MegaInd, 0)),
            ..Default::default()
        };
        let mut sup = supervisor(2, 90);

        let first = sup.guard(START + 1, &fleet);
        assert!(first.watchdog_reloaded);
        assert!(first.expired.is_none());

        let outcome = sup.guard(START + 3, &fleet);
        assert_eq!(outcome.expired, Some(LivenessExpired { silent_secs: 3 }));
        assert!(outcome.telemetry.is_none());
        assert!(sup.guard(START + 30, &fleet).expired.is_none());

        assert_eq!(*fleet.telemetry_reads.borrow(), 0);
        let resets = fleet.resets.borrow();
        assert_eq!((resets[&0], resets[&4]), (1, 1));
    }

    #[test]
    fn telemetry_cadence_and_state_requests() {
        let fleet = FakeFleet {
            stacks: vec![2],
            powered: Some(Board::new(Family::MegaBas, 2)),
            ..Default::default()
        };
        let mut sup = supervisor(0, 90);

        let first = sup.tick(START, &fleet);
        assert!(first.force_publish());
        assert_eq!(
            first.telemetry.unwrap().source.unwrap().board,
            Board::new(Family::MegaBas, 2)
        );

        assert!(sup.tick(START + 299, &fleet).telemetry.is_none());
        assert!(sup.tick(START + 300, &fleet).telemetry.is_some());

        sup.request_state();
        assert!(sup.tick(START + 301, &fleet).force_publish());
        assert!(sup.tick(START + 302, &fleet).telemetry.is_none());
    }

    #[test]
    fn unpowered_fleet_still_advances_telemetry_clock() {
        let fleet = FakeFleet {
            stacks: vec![0],
            ..Default::default()
        };
        let mut sup = supervisor(0, 90);

        let outcome = sup.tick(START, &fleet);
        assert_eq!(outcome.telemetry, Some(TelemetryTick { source: None }));
        for t in 1..300 {
            assert!(sup.tick(START + t, &fleet).telemetry.is_none());
        }
        assert_eq!(*fleet.telemetry_reads.borrow(), 1);
    }

    #[test]
    fn new_session_fires_reload_and_telemetry_immediately() {
        let fleet = FakeFleet {
            stacks: vec![0],
            ..Default::default()
        };
        let mut sup = supervisor(60, 90);
        sup.tick(START, &fleet);
        let quiet = sup.tick(START + 1, &fleet);
        assert!(!quiet.watchdog_reloaded);
        assert!(quiet.telemetry.is_none());

        sup.begin_session();
        let fresh = sup.tick(START + 2, &fleet);
        assert!(fresh.watchdog_reloaded);
        assert!(fresh.telemetry.is_some());
    }
}
