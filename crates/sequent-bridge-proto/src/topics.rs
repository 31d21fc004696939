//! MQTT topic scheme for board state and commands.
//!
//! Topic structure: `{base}/{family}/{stack}/{direction}/{signal}/{channel}`
//!
//! Telemetry and control live under `{base}/tele/`; the heartbeat topics are
//! configurable suffixes of `{base}`.

use sequent_bridge_core::{Board, Direction, Family, MAX_STACK};

/// Highest channel number any signal has.
pub const MAX_CHANNELS: u8 = 8;

/// Topic scheme configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScheme {
    /// Base topic prefix
    pub base: String,
    /// Heartbeat challenge suffix (subscribed)
    pub heartbeat_challenge: String,
    /// Heartbeat response suffix (published)
    pub heartbeat_response: String,
}

impl TopicScheme {
    /// Create a topic scheme under `base`.
    #[must_use]
    pub fn new(
        base: impl Into<String>,
        heartbeat_challenge: impl Into<String>,
        heartbeat_response: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            heartbeat_challenge: heartbeat_challenge.into(),
            heartbeat_response: heartbeat_response.into(),
        }
    }

    fn board_base(&self, board: Board) -> String {
        format!("{}/{}/{}", self.base, board.family, board.stack)
    }

    /// Topic a response or input value is published on.
    #[must_use]
    pub fn state(&self, board: Board, direction: Direction, signal: &str, channel: u8) -> String {
        format!("{}/{direction}/{signal}/{channel}", self.board_base(board))
    }

    /// Topic for telemetry snapshots.
    #[must_use]
    pub fn tele_state(&self) -> String {
        format!("{}/tele/STATE", self.base)
    }

    /// Retained online/offline topic, also used as last will.
    #[must_use]
    pub fn lwt(&self) -> String {
        format!("{}/tele/LWT", self.base)
    }

    /// Topic the heartbeat response is published on.
    #[must_use]
    pub fn heartbeat_response(&self) -> String {
        format!("{}/{}", self.base, self.heartbeat_response)
    }

    /// Topic the heartbeat challenge arrives on.
    #[must_use]
    pub fn heartbeat_challenge(&self) -> String {
        format!("{}/{}", self.base, self.heartbeat_challenge)
    }

    /// Wildcard subscription for telemetry commands.
    #[must_use]
    pub fn tele_commands(&self) -> String {
        format!("{}/tele/cmnd/+", self.base)
    }

    /// Wildcard subscription for all commands addressed to a board.
    #[must_use]
    pub fn board_outputs(&self, board: Board) -> String {
        format!("{}/output/#", self.board_base(board))
    }

    /// Every filter the bridge subscribes to for the given boards.
    #[must_use]
    pub fn subscriptions(&self, boards: impl IntoIterator<Item = Board>) -> Vec<String> {
        let mut filters = vec![self.tele_commands(), self.heartbeat_challenge()];
        filters.extend(boards.into_iter().map(|board| self.board_outputs(board)));
        filters
    }

    /// Parse an inbound topic.
    ///
    /// Returns `None` for anything outside the bridge's inbound namespace.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<Inbound> {
        let remainder = topic.strip_prefix(&self.base)?.strip_prefix('/')?;

        if remainder == self.heartbeat_challenge {
            return Some(Inbound::Challenge);
        }
        if remainder == "tele/cmnd/state" {
            return Some(Inbound::StateRequest);
        }

        let parts: Vec<&str> = remainder.split('/').collect();
        let [family, stack, "output", signal, channel] = parts.as_slice() else {
            return None;
        };

        let family: Family = family.parse().ok()?;
        let stack = parse_number(stack).filter(|stack| *stack <= MAX_STACK)?;
        let channel = parse_number(channel).filter(|ch| (1..=MAX_CHANNELS).contains(ch))?;
        if signal.is_empty() {
            return None;
        }

        Some(Inbound::Command(CommandTopic {
            board: Board::new(family, stack),
            signal: (*signal).to_string(),
            channel,
        }))
    }
}

fn parse_number(text: &str) -> Option<u8> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Address of an inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTopic {
    /// Addressed board, as named in the topic
    pub board: Board,
    /// Output signal name
    pub signal: String,
    /// Channel, 1-indexed
    pub channel: u8,
}

/// Messages the bridge reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Request for telemetry and a full state republish
    StateRequest,
    /// Heartbeat challenge
    Challenge,
    /// Write to a board output
    Command(CommandTopic),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> TopicScheme {
        TopicScheme::new("plant/io", "hb/ping", "hb/pong")
    }

    #[test]
    fn topic_generation() {
        let scheme = scheme();
        let board = Board::new(Family::MegaBas, 0);

        assert_eq!(
            scheme.state(board, Direction::Response, "triac", 2),
            "plant/io/megabas/0/response/triac/2"
        );
        assert_eq!(
            scheme.state(Board::new(Family::Rtd, 5), Direction::Input, "rtd", 8),
            "plant/io/rtd/5/input/rtd/8"
        );
        assert_eq!(scheme.tele_state(), "plant/io/tele/STATE");
        assert_eq!(scheme.lwt(), "plant/io/tele/LWT");
        assert_eq!(scheme.heartbeat_response(), "plant/io/hb/pong");
    }

    #[test]
    fn subscription_filters() {
        let scheme = scheme();
        let filters = scheme.subscriptions([
            Board::new(Family::MegaInd, 1),
            Board::new(Family::Relay8, 2),
        ]);

        assert_eq!(
            filters,
            vec![
                "plant/io/tele/cmnd/+",
                "plant/io/hb/ping",
                "plant/io/megaind/1/output/#",
                "plant/io/8relind/2/output/#",
            ]
        );
    }

    #[test]
    fn command_parsing() {
        let scheme = scheme();

        let parsed = scheme.parse("plant/io/megabas/0/output/triac/2").unwrap();
        assert_eq!(
            parsed,
            Inbound::Command(CommandTopic {
                board: Board::new(Family::MegaBas, 0),
                signal: "triac".to_string(),
                channel: 2,
            })
        );

        let parsed = scheme.parse("plant/io/8relind/7/output/relay/8").unwrap();
        assert!(matches!(parsed, Inbound::Command(cmd) if cmd.board.stack == 7));
    }

    #[test]
    fn control_parsing() {
        let scheme = scheme();

        assert_eq!(scheme.parse("plant/io/tele/cmnd/state"), Some(Inbound::StateRequest));
        assert_eq!(scheme.parse("plant/io/hb/ping"), Some(Inbound::Challenge));
        assert_eq!(scheme.parse("plant/io/tele/cmnd/power"), None);
    }

    #[test]
    fn rejects_foreign_and_malformed_topics() {
        let scheme = scheme();

        for topic in [
            "other/megabas/0/output/triac/2",
            "plant/iox/megabas/0/output/triac/2",
            "plant/io/megabas/8/output/triac/2",
            "plant/io/megabas/0/output/triac/0",
            "plant/io/megabas/0/output/triac/9",
            "plant/io/megabas/0/output/triac/+1",
            "plant/io/megabas/0/response/triac/2",
            "plant/io/megabas/0/output/triac/2/extra",
            "plant/io/dimmer/0/output/level/1",
            "plant/io/megabas/0/output//1",
        ] {
            assert_eq!(scheme.parse(topic), None, "{topic}");
        }
    }

    #[test]
    fn trailing_slash_in_base_is_ignored() {
        let scheme = TopicScheme::new("plant/", "ping", "pong");
        assert_eq!(scheme.lwt(), "plant/tele/LWT");
        assert_eq!(scheme.parse("plant/ping"), Some(Inbound::Challenge));
    }
}
