//! Telemetry and availability messages.

use chrono::NaiveDateTime;
use sequent_bridge_core::{round2, TelemetrySource};
use serde::Serialize;
use std::time::Duration;

/// Retained payload announcing the bridge is connected.
pub const LWT_ONLINE: &str = "Online";

/// Last-will payload, also published on graceful shutdown.
pub const LWT_OFFLINE: &str = "Offline";

/// Telemetry snapshot published on `<base>/tele/STATE`.
///
/// Power fields are omitted when no board reports power.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryMessage {
    /// Board the readings come from, e.g. `megaind0`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,
    /// Firmware version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fw: Option<String>,
    /// Supply voltage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_in: Option<f64>,
    /// Voltage delivered to the host computer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_rsp: Option<f64>,
    /// Board CPU temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_temp: Option<f64>,
    /// Hardware watchdog reset count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wtd_resets: Option<u32>,
    /// Bridge uptime, `D'T'HH:MM:SS`
    #[serde(rename = "Uptime")]
    pub uptime: String,
    /// Local wall-clock time, `%Y-%m-%dT%H:%M:%S`
    #[serde(rename = "Time")]
    pub time: String,
}

impl TelemetryMessage {
    /// Build a snapshot from the reporting board, if any.
    #[must_use]
    pub fn new(source: Option<&TelemetrySource>, uptime: Duration, now: NaiveDateTime) -> Self {
        let mut message = Self {
            master: None,
            fw: None,
            power_in: None,
            power_rsp: None,
            cpu_temp: None,
            wtd_resets: None,
            uptime: format_uptime(uptime),
            time: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        };
        if let Some(source) = source {
            let power = &source.power;
            message.master = Some(source.board.to_string());
            message.fw = Some(power.firmware_version.clone());
            message.power_in = Some(round2(power.supply_voltage));
            message.power_rsp = Some(round2(power.backup_voltage));
            message.cpu_temp = Some(round2(power.cpu_temp));
            message.wtd_resets = Some(power.watchdog_resets);
        }
        message
    }

    /// Serialize to a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, MessageError> {
        serde_json::to_string(self).map_err(|e| MessageError::Serialize(e.to_string()))
    }
}

/// Format an uptime as days, `T`, then `HH:MM:SS`.
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = secs % 86_400 / 3_600;
    let minutes = secs % 3_600 / 60;
    let seconds = secs % 60;
    format!("{days}T{hours:02}:{minutes:02}:{seconds:02}")
}

/// Message errors.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),
}
