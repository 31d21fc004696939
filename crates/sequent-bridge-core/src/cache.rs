//! Last-published value per channel.

use crate::catalog::{self, SignalSpec};
use crate::model::{Direction, Family, Value};

/// Per-board cache of the last value sent to the broker for every
/// `(direction, signal, channel)`.
///
/// Entries are created zeroed from the family catalog and only ever
/// overwritten, never removed.
#[derive(Debug, Clone)]
pub struct ChannelCache {
    family: Family,
    entries: Vec<CacheRow>,
}

impl ChannelCache {
    /// Create a zeroed cache shaped after the family's polled signals.
    #[must_use]
    pub fn new(family: Family) -> Self {
        let entries = catalog::signals(family)
            .iter()
            .filter(|spec| spec.is_polled())
            .map(|spec| CacheRow {
                direction: spec.direction,
                signal: spec.name,
                values: vec![zero(spec); usize::from(spec.arity)],
            })
            .collect();
        Self { family, entries }
    }

    fn row(&self, direction: Direction, signal: &str) -> Option<&CacheRow> {
        self.entries
            .iter()
            .find(|row| row.direction == direction && row.signal == signal)
    }

    /// Family the cache is shaped for.
    #[must_use]
    pub fn family(&self) -> Family {
        self.family
    }

    /// Cached value, if the triple exists.
    #[must_use]
    pub fn get(&self, direction: Direction, signal: &str, channel: u8) -> Option<Value> {
        let index = usize::from(channel.checked_sub(1)?);
        self.row(direction, signal)
            .and_then(|row| row.values.get(index))
            .copied()
    }

    /// Overwrite an entry. Returns `false` if the triple does not exist.
    pub fn set(&mut self, direction: Direction, signal: &str, channel: u8, value: Value) -> bool {
        let Some(index) = channel.checked_sub(1).map(usize::from) else {
            return false;
        };
        match self
            .entries
            .iter_mut()
            .find(|row| row.direction == direction && row.signal == signal)
            .and_then(|row| row.values.get_mut(index))
        {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Store `value` if it differs from the cached entry or `force` is set.
    /// A NaN reading counts as unchanged against a cached NaN.
    ///
    /// Returns whether the value must be published.
    pub fn update(
        &mut self,
        direction: Direction,
        signal: &str,
        channel: u8,
        value: Value,
        force: bool,
    ) -> bool {
        let changed = !matches!(
            self.get(direction, signal, channel),
            Some(cached) if same_reading(cached, value)
        );
        if changed || force {
            self.set(direction, signal, channel, value);
            true
        } else {
            false
        }
    }

    /// Number of cached channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().map(|row| row.values.len()).sum()
    }

    /// Whether the cache holds no channels (read-only families always hold some).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct CacheRow {
    direction: Direction,
    signal: &'static str,
    values: Vec<Value>,
}

fn same_reading(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) if x.is_nan() && y.is_nan() => true,
        _ => a == b,
    }
}

fn zero(spec: &SignalSpec) -> Value {
    match spec.domain {
        catalog::Domain::Analog { .. } | catalog::Domain::Measurement => Value::Float(0.0),
        _ => Value::Int(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_follows_catalog() {
        let cache = ChannelCache::new(Family::MegaBas);
        // 4 + 4 + 8 + 8 response, 5 * 8 input
        assert_eq!(cache.len(), 24 + 40);
        assert_eq!(
            cache.get(Direction::Input, "cont_count", 8),
            Some(Value::Int(0))
        );
        assert_eq!(cache.get(Direction::Input, "cont_count", 9), None);
        assert_eq!(cache.get(Direction::Output, "cont_rst", 1), None);
    }

    #[test]
    fn update_reports_changes_only() {
        let mut cache = ChannelCache::new(Family::Relay8);
        assert!(!cache.update(Direction::Response, "relay", 1, Value::Int(0), false));
        assert!(cache.update(Direction::Response, "relay", 1, Value::Int(1), false));
        assert!(!cache.update(Direction::Response, "relay", 1, Value::Int(1), false));
        assert!(cache.update(Direction::Response, "relay", 1, Value::Int(1), true));
    }

    #[test]
    fn nan_reading_published_once() {
        let mut cache = ChannelCache::new(Family::Rtd);
        assert!(cache.update(Direction::Input, "rtd", 2, Value::Float(f64::NAN), false));
        assert!(!cache.update(Direction::Input, "rtd", 2, Value::Float(f64::NAN), false));
        assert!(!cache.update(Direction::Input, "rtd", 2, Value::Float(-f64::NAN), false));
        assert!(cache.update(Direction::Input, "rtd", 2, Value::Float(21.5), false));
        assert!(cache.update(Direction::Input, "rtd", 2, Value::Float(f64::NAN), true));
    }

    #[test]
    fn channel_zero_is_not_addressable() {
        let mut cache = ChannelCache::new(Family::Rtd);
        assert_eq!(cache.get(Direction::Input, "rtd", 0), None);
        assert!(!cache.set(Direction::Input, "rtd", 0, Value::Float(1.0)));
    }
}
