//! # Sequent Bridge Core
//!
//! Board model and synchronization logic for the Sequent MQTT bridge.
//!
//! This crate provides:
//! - The signal catalog of every supported board family
//! - A uniform device adapter interface over the family drivers
//! - A per-board channel cache with diff-based publishing
//! - The sync engine that polls boards and applies inbound commands
//! - Liveness supervision: heartbeat, hardware watchdog and telemetry clocks

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod cache;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod liveness;
pub mod model;

pub use adapter::{DeviceAdapter, PowerState, WatchdogSettings, MIN_SUPPLY_VOLTAGE};
pub use cache::ChannelCache;
pub use catalog::{Domain, Edge, SignalSpec};
pub use engine::{Confirmed, DuplicateStack, PublishEvent, ResetReport, SyncEngine, TelemetrySource};
pub use error::{BusError, CommandError, DeviceError, LivenessExpired, ValidationError};
pub use liveness::{
    Fleet, Heartbeat, LivenessConfig, LivenessSupervisor, TelemetryTick, TickOutcome,
    TELEMETRY_PERIOD_SECS,
};
pub use model::{round2, Board, Direction, Family, UnknownFamily, Value, MAX_STACK};
