//! Bridge configuration.

use anyhow::{Context, Result};
use rumqttc::QoS;
use sequent_bridge_core::{Board, Family, LivenessConfig, WatchdogSettings, MAX_STACK};
use std::time::Duration;
use uuid::Uuid;

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Broker connection
    pub mqtt: MqttConfig,

    /// Boards, in stack order
    pub boards: Vec<Board>,

    /// Hardware watchdog settings
    pub watchdog: WatchdogSettings,

    /// Heartbeat contract
    pub heartbeat: HeartbeatConfig,
}

/// Broker connection configuration.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker address: `tcp://host:port`, `mqtt://host:port` or `host[:port]`
    pub broker: String,

    /// Base topic prefix
    pub topic: String,

    /// Username
    pub user: String,

    /// Password
    pub password: String,

    /// Quality of service for every publish and subscription
    pub qos: QoS,

    /// Keep-alive interval
    pub keep_alive: Duration,

    /// MQTT client identifier
    pub client_id: String,
}

/// Heartbeat configuration.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Seconds without a challenge before outputs are reset; 0 disables the check
    pub timeout: u64,

    /// Challenge topic suffix
    pub challenge: String,

    /// Response topic suffix
    pub response: String,
}

impl BridgeConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SEQUENT_MQTT_BROKER`: broker address
    /// - `SEQUENT_MQTT_TOPIC`: base topic
    /// - `SEQUENT_MQTT_USER`, `SEQUENT_MQTT_PASS`: credentials
    /// - `SEQUENT_MQTT_QOS`: 0, 1 or 2
    /// - `SEQUENT_MQTT_TIMEOUT`: keep-alive seconds
    /// - `SEQUENT_STACK0` .. `SEQUENT_STACK7`: board family per stack
    /// - `SEQUENT_WATCHDOG_TIMEOUT`, `_BOOT`, `_RESET`: watchdog seconds
    /// - `SEQUENT_HEARTBEAT_TIMEOUT`: seconds, 0 disables
    /// - `SEQUENT_HEARTBEAT_CHALLENGE`, `_RESPONSE`: heartbeat topic suffixes
    /// - `SEQUENT_CLIENT_ID`: optional MQTT client id
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok()).context("Invalid bridge configuration")
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for missing or unparsable values and when no
    /// board is configured.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let mut boards = Vec::new();
        for stack in 0..=MAX_STACK {
            let key = format!("SEQUENT_STACK{stack}");
            if let Some(name) = vars.optional(&key) {
                let family: Family = name.parse().map_err(|err| ConfigError::Invalid {
                    key: key.clone(),
                    value: name.clone(),
                    reason: format!("{err}"),
                })?;
                boards.push(Board::new(family, stack));
            }
        }
        if boards.is_empty() {
            return Err(ConfigError::NoBoards);
        }

        let qos = match vars.number::<u8>("SEQUENT_MQTT_QOS")? {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            2 => QoS::ExactlyOnce,
            other => {
                return Err(ConfigError::Invalid {
                    key: "SEQUENT_MQTT_QOS".to_string(),
                    value: other.to_string(),
                    reason: "expected 0, 1 or 2".to_string(),
                })
            }
        };

        let mqtt = MqttConfig {
            broker: vars.required("SEQUENT_MQTT_BROKER")?,
            topic: vars.required("SEQUENT_MQTT_TOPIC")?,
            user: vars.required("SEQUENT_MQTT_USER")?,
            password: vars.required("SEQUENT_MQTT_PASS")?,
            qos,
            keep_alive: Duration::from_secs(vars.number("SEQUENT_MQTT_TIMEOUT")?),
            client_id: vars
                .optional("SEQUENT_CLIENT_ID")
                .unwrap_or_else(|| format!("sequent-bridge-{}", Uuid::new_v4())),
        };

        let watchdog = WatchdogSettings {
            period: vars.number("SEQUENT_WATCHDOG_TIMEOUT")?,
            boot_period: vars.number("SEQUENT_WATCHDOG_BOOT")?,
            reset_interval: vars.number("SEQUENT_WATCHDOG_RESET")?,
        };

        let heartbeat = HeartbeatConfig {
            timeout: vars.number("SEQUENT_HEARTBEAT_TIMEOUT")?,
            challenge: vars.required("SEQUENT_HEARTBEAT_CHALLENGE")?,
            response: vars.required("SEQUENT_HEARTBEAT_RESPONSE")?,
        };

        Ok(Self {
            mqtt,
            boards,
            watchdog,
            heartbeat,
        })
    }

    /// Timing for the liveness supervisor.
    #[must_use]
    pub fn liveness(&self) -> LivenessConfig {
        LivenessConfig {
            heartbeat_timeout: self.heartbeat.timeout,
            watchdog_timeout: u64::from(self.watchdog.period),
        }
    }
}

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
    }

    fn number<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.required(key)?;
        value.parse().map_err(|err: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            reason: err.to_string(),
            value,
        })
    }
}

/// Configuration errors, all fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty
    #[error("{key} is not set")]
    Missing {
        /// Variable name
        key: String,
    },
    /// A variable holds an unusable value
    #[error("{key}='{value}': {reason}")]
    Invalid {
        /// Variable name
        key: String,
        /// Raw value
        value: String,
        /// What is wrong with it
        reason: String,
    },
    /// No `SEQUENT_STACKn` variable names a board
    #[error("no board configured, set at least one SEQUENT_STACK0..SEQUENT_STACK7")]
    NoBoards,
}
