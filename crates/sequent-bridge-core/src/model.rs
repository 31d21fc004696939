//! Boards, families and channel values.

use std::fmt;
use std::str::FromStr;

/// Highest stack address a board can be jumpered to.
pub const MAX_STACK: u8 = 7;

/// Board family, one per vendor driver library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    /// Industrial automation card (analog I/O, PWM, opto inputs)
    MegaInd,
    /// Building automation card (triacs, universal inputs, dry contacts)
    MegaBas,
    /// Eight industrial relays
    Relay8,
    /// Eight opto-isolated digital inputs
    Inputs8,
    /// Eight RTD temperature inputs
    Rtd,
}

impl Family {
    /// All families, in a stable order.
    pub const ALL: [Family; 5] = [
        Family::MegaInd,
        Family::MegaBas,
        Family::Relay8,
        Family::Inputs8,
        Family::Rtd,
    ];

    /// Name used in topics and configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Family::MegaInd => "megaind",
            Family::MegaBas => "megabas",
            Family::Relay8 => "8relind",
            Family::Inputs8 => "8inputs",
            Family::Rtd => "rtd",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| UnknownFamily(s.to_string()))
    }
}

/// A family name that is not one of the supported boards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown board family '{0}'")]
pub struct UnknownFamily(pub String);

/// One physical expansion card at a fixed stack address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Board {
    /// Board family
    pub family: Family,
    /// Stack address (0-7)
    pub stack: u8,
}

impl Board {
    /// Create a board descriptor.
    #[must_use]
    pub fn new(family: Family, stack: u8) -> Self {
        Self { family, stack }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.family, self.stack)
    }
}

/// Topic direction segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Confirmed state of an output
    Response,
    /// Sensed value
    Input,
    /// Inbound command
    Output,
}

impl Direction {
    /// Topic segment for this direction.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Response => "response",
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel value as published to the broker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Integral reading (booleans, counters, relay states)
    Int(i64),
    /// Analog reading, rounded to two decimals
    Float(f64),
}

impl Value {
    /// Numeric view of the value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Int(v) => v as f64,
            Value::Float(v) => v,
        }
    }

    /// The value with floats rounded to two decimals.
    #[must_use]
    pub fn rounded(self) -> Self {
        match self {
            Value::Int(v) => Value::Int(v),
            Value::Float(v) => Value::Float(round2(v)),
        }
    }

    /// Integral view, if the value has no fractional part.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    pub fn as_integer(self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(v),
            Value::Float(v) if v.is_finite() && v.trunc() == v => Some(v as i64),
            Value::Float(_) => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Int(0)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => {
                let v = round2(v);
                if v.fract() == 0.0 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
        }
    }
}

/// Round to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_names_roundtrip() {
        for family in Family::ALL {
            assert_eq!(family.as_str().parse::<Family>().unwrap(), family);
        }
        assert!("megaio".parse::<Family>().is_err());
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Int(1).to_string(), "1");
        assert_eq!(Value::Float(5.0).to_string(), "5.0");
        assert_eq!(Value::Float(3.14159).to_string(), "3.14");
        assert_eq!(Value::Float(0.3).to_string(), "0.3");
    }

    #[test]
    fn value_integer_view() {
        assert_eq!(Value::Float(1.0).as_integer(), Some(1));
        assert_eq!(Value::Float(1.5).as_integer(), None);
        assert_eq!(Value::Int(7).as_integer(), Some(7));
    }

    #[test]
    fn board_display_is_telemetry_tag() {
        assert_eq!(Board::new(Family::MegaBas, 3).to_string(), "megabas3");
    }
}
