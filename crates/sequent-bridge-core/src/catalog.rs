//! Fixed per-family signal catalogs.
//!
//! Each family exposes a static table of signals. Table order is the order in
//! which a poll pass emits changes: response signals first, then inputs, then
//! the command-only pseudo signals that are never polled.

use crate::error::ValidationError;
use crate::model::{Direction, Family, Value};
use Direction::{Input, Output, Response};

/// Which transition a counter edge-enable bit selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Count rising edges
    Rising,
    /// Count falling edges
    Falling,
}

impl Edge {
    /// Bit of this edge inside a 2-bit edge mode (`0=none, 1=rising, 2=falling, 3=both`).
    #[must_use]
    pub fn bit(self) -> i64 {
        match self {
            Edge::Rising => 0b01,
            Edge::Falling => 0b10,
        }
    }

    /// Combine this edge's requested state with the other edge's state into a mode.
    #[must_use]
    pub fn compose(self, enabled: bool, other_enabled: bool) -> i64 {
        let other = match self {
            Edge::Rising => Edge::Falling,
            Edge::Falling => Edge::Rising,
        };
        let mut mode = 0;
        if enabled {
            mode |= self.bit();
        }
        if other_enabled {
            mode |= other.bit();
        }
        mode
    }

    /// Whether `mode` has this edge enabled.
    #[must_use]
    pub fn enabled_in(self, mode: i64) -> bool {
        mode & self.bit() != 0
    }
}

/// Value domain of a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    /// Writable analog output with an inclusive legal range
    Analog {
        /// Lowest legal value, also the safe value
        min: f64,
        /// Highest legal value
        max: f64,
    },
    /// Read-only analog measurement
    Measurement,
    /// On/off channel, `{0, 1}`
    Binary,
    /// Monotonic pulse counter
    Counter,
    /// One edge bit of a packed 2-bit-per-channel edge mode register
    EdgeEnable {
        /// Edge this signal controls
        edge: Edge,
        /// Signal holding the other edge bit of the same register
        companion: &'static str,
    },
    /// Command-only pulse that clears a counter; accepts the literal 1
    ResetPulse {
        /// Input signal holding the counter being cleared
        counter: &'static str,
    },
}

/// One named register group on a board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSpec {
    /// Topic direction this signal publishes under
    pub direction: Direction,
    /// Signal name as it appears in topics
    pub name: &'static str,
    /// Number of channels, addressed 1..=arity
    pub arity: u8,
    /// Value domain
    pub domain: Domain,
}

impl SignalSpec {
    const fn new(direction: Direction, name: &'static str, arity: u8, domain: Domain) -> Self {
        Self {
            direction,
            name,
            arity,
            domain,
        }
    }

    /// Whether a poll pass reads and publishes this signal.
    #[must_use]
    pub fn is_polled(&self) -> bool {
        self.direction != Direction::Output
    }

    /// Whether an inbound command may target this signal.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        match self.domain {
            Domain::Analog { .. } | Domain::Binary | Domain::EdgeEnable { .. } => {
                self.direction == Direction::Response
            }
            Domain::ResetPulse { .. } => true,
            Domain::Measurement | Domain::Counter => false,
        }
    }

    /// Value applied when outputs are forced to their safe state.
    ///
    /// `None` for signals that are not outputs.
    #[must_use]
    pub fn safe_value(&self) -> Option<Value> {
        if self.direction != Direction::Response {
            return None;
        }
        match self.domain {
            Domain::Analog { min, .. } => Some(Value::Float(min)),
            Domain::Binary | Domain::EdgeEnable { .. } => Some(Value::Int(0)),
            _ => None,
        }
    }

    /// Check a channel number against the signal's arity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ChannelOutOfRange`] for channels outside `1..=arity`.
    pub fn check_channel(&self, channel: u8) -> Result<(), ValidationError> {
        if (1..=self.arity).contains(&channel) {
            Ok(())
        } else {
            Err(ValidationError::ChannelOutOfRange {
                signal: self.name,
                channel,
                arity: self.arity,
            })
        }
    }

    /// Validate a requested value and normalize it to the signal's representation.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfDomain`] when the value is not legal for the
    /// signal and [`ValidationError::NotWritable`] for read-only signals.
    pub fn validate(&self, value: Value) -> Result<Value, ValidationError> {
        if !self.is_writable() {
            return Err(ValidationError::NotWritable { signal: self.name });
        }
        let out_of_domain = || ValidationError::OutOfDomain {
            signal: self.name,
            value,
        };
        match self.domain {
            Domain::Analog { min, max } => {
                let v = value.as_f64();
                if v.is_finite() && (min..=max).contains(&v) {
                    Ok(Value::Float(v))
                } else {
                    Err(out_of_domain())
                }
            }
            Domain::Binary | Domain::EdgeEnable { .. } => match value.as_integer() {
                Some(v @ (0 | 1)) => Ok(Value::Int(v)),
                _ => Err(out_of_domain()),
            },
            Domain::ResetPulse { .. } => match value.as_integer() {
                Some(1) => Ok(Value::Int(1)),
                _ => Err(out_of_domain()),
            },
            Domain::Measurement | Domain::Counter => Err(out_of_domain()),
        }
    }
}

const MEGAIND: &[SignalSpec] = &[
    SignalSpec::new(Response, "0_10", 4, Domain::Analog { min: 0.0, max: 10.0 }),
    SignalSpec::new(Response, "4_20", 4, Domain::Analog { min: 4.0, max: 20.0 }),
    SignalSpec::new(Response, "pwm", 4, Domain::Analog { min: 0.0, max: 100.0 }),
    SignalSpec::new(Response, "led", 4, Domain::Binary),
    SignalSpec::new(Response, "opto_rce", 4, Domain::Binary),
    SignalSpec::new(Response, "opto_fce", 4, Domain::Binary),
    SignalSpec::new(Input, "0_10", 4, Domain::Measurement),
    SignalSpec::new(Input, "pm0_10", 4, Domain::Measurement),
    SignalSpec::new(Input, "4_20", 4, Domain::Measurement),
    SignalSpec::new(Input, "opto", 4, Domain::Binary),
    SignalSpec::new(Input, "opto_count", 4, Domain::Counter),
    SignalSpec::new(
        Output,
        "opto_rst",
        4,
        Domain::ResetPulse {
            counter: "opto_count",
        },
    ),
];

const MEGABAS: &[SignalSpec] = &[
    SignalSpec::new(Response, "0_10", 4, Domain::Analog { min: 0.0, max: 10.0 }),
    SignalSpec::new(Response, "triac", 4, Domain::Binary),
    SignalSpec::new(
        Response,
        "cont_rce",
        8,
        Domain::EdgeEnable {
            edge: Edge::Rising,
            companion: "cont_fce",
        },
    ),
    SignalSpec::new(
        Response,
        "cont_fce",
        8,
        Domain::EdgeEnable {
            edge: Edge::Falling,
            companion: "cont_rce",
        },
    ),
    SignalSpec::new(Input, "0_10", 8, Domain::Measurement),
    SignalSpec::new(Input, "1k", 8, Domain::Measurement),
    SignalSpec::new(Input, "10k", 8, Domain::Measurement),
    SignalSpec::new(Input, "cont", 8, Domain::Binary),
    SignalSpec::new(Input, "cont_count", 8, Domain::Counter),
    SignalSpec::new(
        Output,
        "cont_rst",
        8,
        Domain::ResetPulse {
            counter: "cont_count",
        },
    ),
];

const RELAY8: &[SignalSpec] = &[SignalSpec::new(Response, "relay", 8, Domain::Binary)];

const INPUTS8: &[SignalSpec] = &[SignalSpec::new(Input, "opto", 8, Domain::Binary)];

const RTD: &[SignalSpec] = &[SignalSpec::new(Input, "rtd", 8, Domain::Measurement)];

/// Signal table for a family, in emission order.
#[must_use]
pub fn signals(family: Family) -> &'static [SignalSpec] {
    match family {
        Family::MegaInd => MEGAIND,
        Family::MegaBas => MEGABAS,
        Family::Relay8 => RELAY8,
        Family::Inputs8 => INPUTS8,
        Family::Rtd => RTD,
    }
}

/// Look up a signal by direction and name.
#[must_use]
pub fn find(family: Family, direction: Direction, name: &str) -> Option<&'static SignalSpec> {
    signals(family)
        .iter()
        .find(|spec| spec.direction == direction && spec.name == name)
}

/// Resolve the signal an `output/<name>` command addresses.
///
/// # Errors
///
/// Returns [`ValidationError::UnknownSignal`] if the family has no writable
/// signal by that name.
pub fn command_target(family: Family, name: &str) -> Result<&'static SignalSpec, ValidationError> {
    signals(family)
        .iter()
        .find(|spec| spec.name == name && spec.is_writable())
        .ok_or_else(|| ValidationError::UnknownSignal {
            family,
            signal: name.to_string(),
        })
}
