//! Spread position state machine.
//!
//! One step per date, starting flat:
//!
//! | state      | condition                    | next         |
//! |------------|------------------------------|--------------|
//! | Flat       | z > entry                    | ShortSpread  |
//! | Flat       | z < -entry                   | LongSpread   |
//! | LongSpread / ShortSpread | \|z\| <= exit  | Flat (mean reversion) |
//! | LongSpread / ShortSpread | \|z\| >= stop  | Flat (stop loss)      |
//! | any        | z undefined                  | unchanged    |
//!
//! Nothing else transitions: a position is never flipped in one step and a
//! position that exits is not re-entered on the same date.

use super::StrategyParams;
use crate::domain::{Direction, Entry, ExitReason, PositionState};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What happened on a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Hold,
    Enter(Direction),
    Exit(ExitReason),
}

/// Inputs to one step of the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub index: usize,
    pub z_score: Option<f64>,
    pub hedge_ratio: f64,
}

/// Advance the position by one date.
pub fn transition(
    state: PositionState,
    obs: &Observation,
    params: &StrategyParams,
) -> (PositionState, Transition) {
    let Some(z) = obs.z_score else {
        return (state, Transition::Hold);
    };

    match state {
        PositionState::Flat => {
            let entry = Entry {
                date: obs.date,
                index: obs.index,
                z_score: z,
                hedge_ratio: obs.hedge_ratio,
            };
            if z > params.entry_threshold {
                (
                    PositionState::ShortSpread(entry),
                    Transition::Enter(Direction::ShortSpread),
                )
            } else if z < -params.entry_threshold {
                (
                    PositionState::LongSpread(entry),
                    Transition::Enter(Direction::LongSpread),
                )
            } else {
                (state, Transition::Hold)
            }
        }
        PositionState::LongSpread(_) | PositionState::ShortSpread(_) => {
            if z.abs() <= params.exit_threshold {
                (
                    PositionState::Flat,
                    Transition::Exit(ExitReason::MeanReversion),
                )
            } else if z.abs() >= params.stop_loss {
                (PositionState::Flat, Transition::Exit(ExitReason::StopLoss))
            } else {
                (state, Transition::Hold)
            }
        }
    }
}

/// Run the state machine over a z-score series.
///
/// Returns the position held at the close of each date and the transition
/// that produced it.
pub fn evaluate_positions(
    dates: &[NaiveDate],
    z_scores: &[Option<f64>],
    hedge_ratio: f64,
    params: &StrategyParams,
) -> (Vec<PositionState>, Vec<Transition>) {
    let mut state = PositionState::Flat;
    let mut positions = Vec::with_capacity(z_scores.len());
    let mut transitions = Vec::with_capacity(z_scores.len());

    for (index, (&date, &z_score)) in dates.iter().zip(z_scores).enumerate() {
        let obs = Observation {
            date,
            index,
            z_score,
            hedge_ratio,
        };
        let (next, event) = transition(state, &obs, params);
        state = next;
        positions.push(state);
        transitions.push(event);
    }

    (positions, transitions)
}
