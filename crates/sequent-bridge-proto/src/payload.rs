//! Plain-text command and state payloads.

use sequent_bridge_core::Value;

/// A command payload that is not a plain decimal literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// Not of the form `123` or `12.5`
    #[error("malformed payload '{0}'")]
    Malformed(String),
}

/// Parse a command payload.
///
/// Accepts unsigned integers (`42`) and unsigned decimals with digits on both
/// sides of the point (`4.25`). Signs, exponents and surrounding whitespace
/// are rejected.
///
/// # Errors
///
/// Returns [`PayloadError::Malformed`] for anything else.
pub fn parse_payload(raw: &[u8]) -> Result<Value, PayloadError> {
    let malformed = || PayloadError::Malformed(String::from_utf8_lossy(raw).into_owned());
    let text = std::str::from_utf8(raw).map_err(|_| malformed())?;

    let is_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    match text.split_once('.') {
        None if is_digits(text) => text.parse().map(Value::Int).map_err(|_| malformed()),
        Some((whole, fraction)) if is_digits(whole) && is_digits(fraction) => {
            text.parse().map(Value::Float).map_err(|_| malformed())
        }
        _ => Err(malformed()),
    }
}

/// Textual form of a published value.
#[must_use]
pub fn format_value(value: Value) -> String {
    value.to_string()
}
