//! # Sequent Bridge Agent
//!
//! Runtime pieces of the board bridge, shared by the agent binary and its
//! integration tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dispatch;
pub mod reconnect;
pub mod runtime;
pub mod transport;

pub use config::{BridgeConfig, ConfigError};
pub use dispatch::{dispatch, Control, Dispatch, Outbound};
pub use runtime::Bridge;
pub use transport::{parse_mqtt_url, Transport, TransportError};
