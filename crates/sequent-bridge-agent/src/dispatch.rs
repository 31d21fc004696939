//! Inbound message handling.

use chrono::NaiveDateTime;
use sequent_bridge_core::{PublishEvent, SyncEngine, TelemetrySource};
use sequent_bridge_proto::{
    format_value, parse_payload, CommandTopic, Inbound, MessageError, TelemetryMessage,
    TopicScheme,
};
use std::time::Duration;

/// A message ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Full topic
    pub topic: String,
    /// Text payload
    pub payload: String,
}

/// Inbound messages that need the session loop rather than the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Heartbeat challenge received
    Challenge,
    /// Telemetry and full state republish requested
    StateRequest,
    /// The broker connection dropped
    ConnectionLost(String),
}

/// Result of handling one inbound publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Confirmed state to publish
    Publish(Vec<Outbound>),
    /// Forward to the session loop
    Control(Control),
    /// Nothing to do; the reason has been logged
    Ignored,
}

/// Route one inbound publish.
pub fn dispatch(
    engine: &SyncEngine,
    scheme: &TopicScheme,
    topic: &str,
    payload: &[u8],
) -> Dispatch {
    match scheme.parse(topic) {
        Some(Inbound::Challenge) => Dispatch::Control(Control::Challenge),
        Some(Inbound::StateRequest) if payload.is_empty() => {
            Dispatch::Control(Control::StateRequest)
        }
        Some(Inbound::StateRequest) => {
            tracing::warn!(
                payload = %String::from_utf8_lossy(payload),
                "Ignoring state request with payload"
            );
            Dispatch::Ignored
        }
        Some(Inbound::Command(command)) => apply(engine, scheme, &command, payload),
        None => {
            tracing::warn!(topic, "Unknown MQTT topic");
            Dispatch::Ignored
        }
    }
}

fn apply(
    engine: &SyncEngine,
    scheme: &TopicScheme,
    command: &CommandTopic,
    payload: &[u8],
) -> Dispatch {
    let CommandTopic {
        board,
        signal,
        channel,
    } = command;

    if engine.board(board.stack) != Some(*board) {
        tracing::warn!(%board, signal, "Command for a board that is not configured");
        return Dispatch::Ignored;
    }

    let value = match parse_payload(payload) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(%board, signal, channel, error = %err, "Rejected command payload");
            return Dispatch::Ignored;
        }
    };

    match engine.apply_command(board.stack, signal, *channel, value) {
        Ok(confirmed) => Dispatch::Publish(state_messages(scheme, &confirmed.events)),
        Err(err) => {
            tracing::error!(%board, signal, channel, error = %err, "Command failed");
            Dispatch::Ignored
        }
    }
}

/// State topics for a batch of engine events.
#[must_use]
pub fn state_messages(scheme: &TopicScheme, events: &[PublishEvent]) -> Vec<Outbound> {
    events
        .iter()
        .map(|event| Outbound {
            topic: scheme.state(event.board, event.direction, event.signal, event.channel),
            payload: format_value(event.value),
        })
        .collect()
}

/// Telemetry snapshot for `<base>/tele/STATE`.
///
/// # Errors
///
/// Returns error if the snapshot cannot be serialized.
pub fn telemetry_message(
    scheme: &TopicScheme,
    source: Option<&TelemetrySource>,
    uptime: Duration,
    now: NaiveDateTime,
) -> Result<Outbound, MessageError> {
    Ok(Outbound {
        topic: scheme.tele_state(),
        payload: TelemetryMessage::new(source, uptime, now).to_json()?,
    })
}

/// Answer to a heartbeat challenge: the Unix time it was seen at.
#[must_use]
pub fn heartbeat_response(scheme: &TopicScheme, timestamp: u64) -> Outbound {
    Outbound {
        topic: scheme.heartbeat_response(),
        payload: timestamp.to_string(),
    }
}
