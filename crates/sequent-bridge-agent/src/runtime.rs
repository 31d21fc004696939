//! Bridge runtime orchestration.

use crate::config::BridgeConfig;
use crate::dispatch::{
    dispatch, heartbeat_response, state_messages, telemetry_message, Control, Dispatch,
};
use crate::reconnect::{Reconnect, Step, SESSION_BACKOFF};
use crate::transport::{Transport, TransportError};
use anyhow::{Context, Result};
use rumqttc::{Event, EventLoop, Packet};
use sequent_bridge_core::{LivenessSupervisor, SyncEngine, TelemetrySource};
use sequent_bridge_proto::TopicScheme;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const TICK: Duration = Duration::from_secs(1);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// How a session ended without error.
enum SessionEnd {
    Shutdown,
}

/// Unix seconds anchored to the runtime clock.
#[derive(Debug, Clone, Copy)]
struct Clock {
    unix: u64,
    at: tokio::time::Instant,
}

impl Clock {
    fn start() -> Self {
        Self {
            unix: u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default(),
            at: tokio::time::Instant::now(),
        }
    }

    fn now(&self) -> u64 {
        self.unix + self.at.elapsed().as_secs()
    }
}

/// The bridge runtime.
pub struct Bridge {
    config: BridgeConfig,
    engine: Arc<SyncEngine>,
    scheme: TopicScheme,
    clock: Clock,
    started: Instant,
}

impl Bridge {
    /// Create a bridge over an engine holding the configured boards.
    #[must_use]
    pub fn new(config: BridgeConfig, engine: SyncEngine) -> Self {
        let scheme = TopicScheme::new(
            &config.mqtt.topic,
            &config.heartbeat.challenge,
            &config.heartbeat.response,
        );
        Self {
            config,
            engine: Arc::new(engine),
            scheme,
            clock: Clock::start(),
            started: Instant::now(),
        }
    }

    /// Run sessions until Ctrl-C.
    ///
    /// A failed session is logged and rebuilt after a back-off. The hardware
    /// watchdogs and the heartbeat check keep running meanwhile.
    ///
    /// # Errors
    ///
    /// Does not return an error for transient faults.
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            broker = %self.config.mqtt.broker,
            base = %self.scheme.base,
            boards = self.config.boards.len(),
            "Starting bridge runtime"
        );

        let mut supervisor = LivenessSupervisor::new(self.config.liveness(), self.clock.now());
        let mut reconnect = Reconnect::new();

        loop {
            match self.session(&mut supervisor, &mut reconnect).await {
                Ok(SessionEnd::Shutdown) => break,
                Err(err) => {
                    tracing::error!(error = %format!("{err:#}"), "Session ended");
                    if self.idle(SESSION_BACKOFF, &mut supervisor).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Bridge stopped");
        Ok(())
    }

    async fn session(
        &self,
        supervisor: &mut LivenessSupervisor,
        reconnect: &mut Reconnect,
    ) -> Result<SessionEnd> {
        let (transport, mut eventloop) = Transport::new(&self.config.mqtt, &self.scheme)
            .context("Failed to create MQTT client")?;

        if !self.connect(&mut eventloop, supervisor, reconnect).await? {
            return Ok(SessionEnd::Shutdown);
        }
        reconnect.on_connected();
        tracing::info!(broker = %self.config.mqtt.broker, "Connected to broker");

        let filters = self.scheme.subscriptions(self.engine.boards());
        transport.announce_online(&self.scheme);
        transport.subscribe(&filters)?;
        self.engine.configure_watchdogs(&self.config.watchdog);
        supervisor.begin_session();

        let (tx, mut rx) = mpsc::channel(32);
        let mut inbound = spawn_inbound(
            eventloop,
            Arc::clone(&self.engine),
            self.scheme.clone(),
            transport.clone(),
            tx,
        );

        let mut ticker = tokio::time::interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = supervisor.tick(self.clock.now(), self.engine.as_ref());
                    if let Some(telemetry) = &outcome.telemetry {
                        self.publish_telemetry(&transport, telemetry.source.as_ref());
                    }
                    transport.publish_all(state_messages(&self.scheme, &outcome.reset_events));
                    if let Some(expired) = outcome.expired {
                        self.close(&transport, &filters, &mut inbound).await;
                        break Err(expired.into());
                    }
                    let events = self.engine.poll_all(outcome.force_publish());
                    transport.publish_all(state_messages(&self.scheme, &events));
                }

                control = rx.recv() => match control {
                    Some(Control::Challenge) => {
                        let timestamp = supervisor.on_challenge(self.clock.now());
                        transport.publish(heartbeat_response(&self.scheme, timestamp));
                    }
                    Some(Control::StateRequest) => supervisor.request_state(),
                    Some(Control::ConnectionLost(reason)) => {
                        break Err(TransportError::ConnectionLost(reason).into());
                    }
                    None => {
                        let reason = "inbound task stopped".to_string();
                        break Err(TransportError::ConnectionLost(reason).into());
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    self.close(&transport, &filters, &mut inbound).await;
                    break Ok(SessionEnd::Shutdown);
                }
            }
        };

        inbound.abort();
        result
    }

    /// Unsubscribe, announce offline and disconnect, then let the inbound task
    /// flush everything queued so far for at most [`SHUTDOWN_GRACE`].
    async fn close(
        &self,
        transport: &Transport,
        filters: &[String],
        inbound: &mut JoinHandle<()>,
    ) {
        if let Err(err) = transport.shutdown(&self.scheme, filters).await {
            tracing::warn!(error = %err, "Graceful disconnect failed");
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, inbound).await.is_err() {
            tracing::warn!("Event loop did not drain before disconnect");
        }
    }

    /// Poll until the broker acknowledges the connection.
    ///
    /// Returns `false` if shutdown was requested while waiting.
    async fn connect(
        &self,
        eventloop: &mut EventLoop,
        supervisor: &mut LivenessSupervisor,
        reconnect: &mut Reconnect,
    ) -> Result<bool, TransportError> {
        let mut ticker = tokio::time::interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = {
                let poll = eventloop.poll();
                tokio::pin!(poll);
                loop {
                    tokio::select! {
                        event = &mut poll => break event,
                        _ = ticker.tick() => self.guard(supervisor),
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("Shutdown signal received while connecting");
                            return Ok(false);
                        }
                    }
                }
            };

            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(true),
                Ok(_) => {}
                Err(err) => match reconnect.on_failure() {
                    Step::Retry(delay) => {
                        tracing::warn!(
                            attempt = reconnect.attempts(),
                            error = %err,
                            "Connection attempt failed"
                        );
                        if self.idle(delay, supervisor).await {
                            return Ok(false);
                        }
                    }
                    Step::GiveUp { attempts, backoff } => {
                        tracing::error!(
                            attempts,
                            ?backoff,
                            error = %err,
                            "Giving up on broker session"
                        );
                        return Err(TransportError::ConnectTimeout { attempts });
                    }
                },
            }
        }
    }

    /// Wait `delay` in tick steps, guarding the boards on every step.
    ///
    /// Returns `true` if shutdown was requested.
    async fn idle(&self, delay: Duration, supervisor: &mut LivenessSupervisor) -> bool {
        let deadline = tokio::time::Instant::now() + delay;
        loop {
            self.guard(supervisor);
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let step = (deadline - now).min(TICK);
            tokio::select! {
                () = tokio::time::sleep(step) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    return true;
                }
            }
        }
    }

    /// Watchdog and heartbeat duty while no broker session is up.
    ///
    /// Safe values set here land in the cache and go out with the forced
    /// republish of the next session.
    fn guard(&self, supervisor: &mut LivenessSupervisor) {
        let outcome = supervisor.guard(self.clock.now(), self.engine.as_ref());
        if let Some(expired) = outcome.expired {
            tracing::error!(
                error = %expired,
                reset = outcome.reset_events.len(),
                "Outputs reset while disconnected"
            );
        }
    }

    fn publish_telemetry(&self, transport: &Transport, source: Option<&TelemetrySource>) {
        let now = chrono::Local::now().naive_local();
        match telemetry_message(&self.scheme, source, self.started.elapsed(), now) {
            Ok(message) => transport.publish(message),
            Err(err) => tracing::warn!(error = %err, "Failed to encode telemetry"),
        }
    }
}

/// Drive the event loop: apply commands in place, forward control messages.
fn spawn_inbound(
    mut eventloop: EventLoop,
    engine: Arc<SyncEngine>,
    scheme: TopicScheme,
    transport: Transport,
    tx: mpsc::Sender<Control>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    tracing::debug!(
                        topic = %publish.topic,
                        payload_len = publish.payload.len(),
                        "Received message"
                    );
                    match dispatch(&engine, &scheme, &publish.topic, &publish.payload) {
                        Dispatch::Publish(messages) => transport.publish_all(messages),
                        Dispatch::Control(control) => {
                            if tx.send(control).await.is_err() {
                                break;
                            }
                        }
                        Dispatch::Ignored => {}
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(error = %err, "MQTT error");
                    let _ = tx.send(Control::ConnectionLost(err.to_string())).await;
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequent_bridge_boards::{open, MegaBasDriver, SimBus};
    use sequent_bridge_core::Value;
    use std::collections::HashMap;

    fn config(heartbeat_timeout: &'static str) -> BridgeConfig {
        let vars = HashMap::from([
            ("SEQUENT_MQTT_BROKER", "tcp://127.0.0.1:1"),
            ("SEQUENT_MQTT_TOPIC", "plant"),
            ("SEQUENT_MQTT_USER", "bridge"),
            ("SEQUENT_MQTT_PASS", "secret"),
            ("SEQUENT_MQTT_QOS", "1"),
            ("SEQUENT_MQTT_TIMEOUT", "5"),
            ("SEQUENT_STACK0", "megabas"),
            ("SEQUENT_WATCHDOG_TIMEOUT", "30"),
            ("SEQUENT_WATCHDOG_BOOT", "60"),
            ("SEQUENT_WATCHDOG_RESET", "10"),
            ("SEQUENT_HEARTBEAT_TIMEOUT", heartbeat_timeout),
            ("SEQUENT_HEARTBEAT_CHALLENGE", "hb/challenge"),
            ("SEQUENT_HEARTBEAT_RESPONSE", "hb/response"),
        ]);
        BridgeConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap()
    }

    /// A bridge with triac 1 of the megabas at stack 0 switched on.
    fn energized_bridge(bus: &SimBus, heartbeat_timeout: &'static str) -> Bridge {
        let config = config(heartbeat_timeout);
        let adapters = config
            .boards
            .iter()
            .map(|board| open(*board, bus.clone()))
            .collect();
        let engine = SyncEngine::new(adapters).unwrap();
        engine.apply_command(0, "triac", 1, Value::Int(1)).unwrap();
        Bridge::new(config, engine)
    }

    fn triac_on(bus: &SimBus) -> bool {
        bus.clone().triacs(0).unwrap() & 1 != 0
    }

    #[tokio::test(start_paused = true)]
    async fn broker_outage_still_enforces_heartbeat() {
        let bus = SimBus::new();
        let bridge = energized_bridge(&bus, "2");
        assert!(triac_on(&bus));

        let run = tokio::time::timeout(Duration::from_secs(25), bridge.run()).await;

        assert!(run.is_err(), "bridge stopped on its own");
        assert!(!triac_on(&bus), "triac still energized after heartbeat timeout");
        assert!(bus.watchdog_reloads(0) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_heartbeat_leaves_outputs_during_outage() {
        let bus = SimBus::new();
        let bridge = energized_bridge(&bus, "0");

        let _ = tokio::time::timeout(Duration::from_secs(25), bridge.run()).await;

        assert!(triac_on(&bus));
        assert!(bus.watchdog_reloads(0) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clock_follows_runtime_time() {
        let clock = Clock::start();
        let before = clock.now();
        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(clock.now() - before, 90);
    }
}
