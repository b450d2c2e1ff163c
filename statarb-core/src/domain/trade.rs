//! Trade: a completed round trip on one pair.

use super::position::Direction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    /// |z| fell to the exit threshold.
    MeanReversion,
    /// |z| reached the stop-loss threshold.
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::MeanReversion => write!(f, "mean_reversion"),
            ExitReason::StopLoss => write!(f, "stop_loss"),
        }
    }
}

/// A round trip: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub pair_id: String,
    pub direction: Direction,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_z: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_date: NaiveDate,
    pub exit_z: f64,
    pub exit_reason: ExitReason,

    /// Compounded strategy return over the periods held.
    pub pnl_pct: f64,
    pub periods_held: usize,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl_pct > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl_pct < 0.0
    }
}
