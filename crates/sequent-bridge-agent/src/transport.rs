//! Broker transport.

use crate::config::MqttConfig;
use crate::dispatch::Outbound;
use rumqttc::{AsyncClient, EventLoop, LastWill, MqttOptions, QoS};
use sequent_bridge_proto::{TopicScheme, LWT_OFFLINE, LWT_ONLINE};
use url::Url;

/// Handle for publishing and subscribing on one broker session.
///
/// Clones share the session's request queue.
#[derive(Clone)]
pub struct Transport {
    client: AsyncClient,
    qos: QoS,
}

impl Transport {
    /// Create a client and its event loop. Nothing touches the network until
    /// the event loop is polled.
    ///
    /// # Errors
    ///
    /// Returns error if the broker address is invalid.
    pub fn new(
        config: &MqttConfig,
        scheme: &TopicScheme,
    ) -> Result<(Self, EventLoop), TransportError> {
        let (host, port) = parse_mqtt_url(&config.broker)?;

        let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);
        mqtt_options.set_keep_alive(config.keep_alive);
        mqtt_options.set_credentials(&config.user, &config.password);
        mqtt_options.set_clean_session(true);
        mqtt_options.set_last_will(LastWill::new(
            scheme.lwt(),
            LWT_OFFLINE,
            QoS::AtMostOnce,
            true,
        ));

        let (client, eventloop) = AsyncClient::new(mqtt_options, 100);

        Ok((
            Self {
                client,
                qos: config.qos,
            },
            eventloop,
        ))
    }

    /// Queue a publish without waiting for queue space.
    ///
    /// A full queue or closed session is logged; state that did not make it
    /// out is republished by the next forced poll.
    pub fn publish(&self, message: Outbound) {
        let Outbound { topic, payload } = message;
        tracing::debug!(topic, payload, "Publishing");
        if let Err(err) = self.client.try_publish(&topic, self.qos, false, payload) {
            tracing::warn!(topic, error = %err, "Failed to queue publish");
        }
    }

    /// Publish every message in order.
    pub fn publish_all(&self, messages: impl IntoIterator<Item = Outbound>) {
        for message in messages {
            self.publish(message);
        }
    }

    /// Announce the bridge as online on the retained availability topic.
    pub fn announce_online(&self, scheme: &TopicScheme) {
        self.publish_availability(scheme, LWT_ONLINE);
    }

    fn publish_availability(&self, scheme: &TopicScheme, payload: &str) {
        if let Err(err) = self
            .client
            .try_publish(scheme.lwt(), QoS::AtMostOnce, true, payload)
        {
            tracing::warn!(payload, error = %err, "Failed to publish availability");
        }
    }

    /// Subscribe to every filter.
    ///
    /// # Errors
    ///
    /// Returns error if a subscription request cannot be queued.
    pub fn subscribe(&self, filters: &[String]) -> Result<(), TransportError> {
        for filter in filters {
            tracing::info!(filter, "Subscribing");
            self.client
                .try_subscribe(filter, self.qos)
                .map_err(|e| TransportError::Client(e.to_string()))?;
        }
        Ok(())
    }

    /// Graceful goodbye: unsubscribe, announce offline, disconnect.
    ///
    /// # Errors
    ///
    /// Returns error if a request cannot be queued.
    pub async fn shutdown(
        &self,
        scheme: &TopicScheme,
        filters: &[String],
    ) -> Result<(), TransportError> {
        for filter in filters {
            self.client
                .unsubscribe(filter)
                .await
                .map_err(|e| TransportError::Client(e.to_string()))?;
        }
        self.client
            .publish(scheme.lwt(), QoS::AtMostOnce, true, LWT_OFFLINE)
            .await
            .map_err(|e| TransportError::Client(e.to_string()))?;
        self.client
            .disconnect()
            .await
            .map_err(|e| TransportError::Client(e.to_string()))
    }
}

/// Parse MQTT URL into host and port.
///
/// # Errors
///
/// Returns [`TransportError::InvalidBrokerUrl`] for unsupported schemes,
/// missing hosts and bad ports.
pub fn parse_mqtt_url(input: &str) -> Result<(String, u16), TransportError> {
    if input.contains("://") {
        let url = Url::parse(input)
            .map_err(|e| TransportError::InvalidBrokerUrl(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(TransportError::InvalidBrokerUrl(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidBrokerUrl(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(1883);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| TransportError::InvalidBrokerUrl(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => 1883,
        Some(port) => port.parse().map_err(|_| {
            TransportError::InvalidBrokerUrl(format!("{input}: invalid port '{port}'"))
        })?,
    };
    if parts.next().is_some() {
        return Err(TransportError::InvalidBrokerUrl(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}

/// Errors that end a broker session.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Invalid MQTT broker URL
    #[error("invalid MQTT broker URL: {0}")]
    InvalidBrokerUrl(String),
    /// No connection after the allowed number of attempts
    #[error("no connection to broker after {attempts} attempts")]
    ConnectTimeout {
        /// Attempts made
        attempts: u32,
    },
    /// Broker connection dropped
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// Request could not be queued
    #[error("client error: {0}")]
    Client(String),
}
