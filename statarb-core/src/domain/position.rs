//! Position state of a single pair.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the spread is held.
///
/// Long spread: long `instrument_a`, short `hedge_ratio` units of `instrument_b`.
/// Short spread is the mirror image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    LongSpread,
    ShortSpread,
}

impl Direction {
    /// Units held in `instrument_a`: +1 long spread, -1 short spread.
    pub fn sign(self) -> f64 {
        match self {
            Direction::LongSpread => 1.0,
            Direction::ShortSpread => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LongSpread => write!(f, "long_spread"),
            Direction::ShortSpread => write!(f, "short_spread"),
        }
    }
}

/// Context recorded when a position is opened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub date: NaiveDate,
    pub index: usize,
    pub z_score: f64,
    /// Fixed for the life of the position.
    pub hedge_ratio: f64,
}

/// Position held at the close of a date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PositionState {
    Flat,
    LongSpread(Entry),
    ShortSpread(Entry),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            PositionState::Flat => None,
            PositionState::LongSpread(_) => Some(Direction::LongSpread),
            PositionState::ShortSpread(_) => Some(Direction::ShortSpread),
        }
    }

    pub fn entry(&self) -> Option<&Entry> {
        match self {
            PositionState::Flat => None,
            PositionState::LongSpread(e) | PositionState::ShortSpread(e) => Some(e),
        }
    }

    /// Leg sizes `(a, b)`: a is +1/-1/0, b is `-hedge_ratio * a`.
    pub fn legs(&self) -> (f64, f64) {
        match (self.direction(), self.entry()) {
            (Some(dir), Some(entry)) => {
                let a = dir.sign();
                (a, -entry.hedge_ratio * a)
            }
            _ => (0.0, 0.0),
        }
    }

    /// Numeric signal as exported: 1 long spread, -1 short spread, 0 flat.
    pub fn signal(&self) -> i8 {
        match self {
            PositionState::Flat => 0,
            PositionState::LongSpread(_) => 1,
            PositionState::ShortSpread(_) => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(h: f64) -> Entry {
        Entry {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            index: 10,
            z_score: 2.3,
            hedge_ratio: h,
        }
    }

    #[test]
    fn flat_has_no_legs() {
        assert_eq!(PositionState::Flat.legs(), (0.0, 0.0));
        assert!(PositionState::Flat.direction().is_none());
    }

    #[test]
    fn short_spread_legs() {
        let s = PositionState::ShortSpread(entry(1.5));
        assert_eq!(s.legs(), (-1.0, 1.5));
        assert_eq!(s.signal(), -1);
    }

    #[test]
    fn long_spread_legs() {
        let s = PositionState::LongSpread(entry(0.8));
        assert_eq!(s.legs(), (1.0, -0.8));
        assert_eq!(s.direction(), Some(Direction::LongSpread));
    }

    #[test]
    fn serializes_with_state_tag() {
        let json = serde_json::to_string(&PositionState::Flat).unwrap();
        assert_eq!(json, r#"{"state":"flat"}"#);
    }
}
