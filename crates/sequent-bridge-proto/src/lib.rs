//! # Sequent Bridge Protocol
//!
//! MQTT addressing and wire formats of the bridge.
//!
//! ## Topics
//!
//! - `<base>/<family>/<stack>/response/<signal>/<channel>`: confirmed output state
//! - `<base>/<family>/<stack>/input/<signal>/<channel>`: sensed values
//! - `<base>/<family>/<stack>/output/<signal>/<channel>`: inbound commands
//! - `<base>/tele/STATE`, `<base>/tele/LWT`, `<base>/tele/cmnd/state`
//!
//! Payloads are plain decimal literals; telemetry is a JSON object.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod messages;
pub mod payload;
pub mod topics;

pub use messages::{format_uptime, MessageError, TelemetryMessage, LWT_OFFLINE, LWT_ONLINE};
pub use payload::{format_value, parse_payload, PayloadError};
pub use topics::{CommandTopic, Inbound, TopicScheme, MAX_CHANNELS};
