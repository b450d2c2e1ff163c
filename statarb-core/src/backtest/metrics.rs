//! Performance metrics: pure functions over an equity curve and trade list.
//!
//! Degenerate inputs (single point, zero variance, no trades) give 0.0.

use crate::domain::{ExitReason, Trade};
use crate::stats::{mean, sample_std};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trading periods per year for daily data.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary statistics of one pair backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    pub max_drawdown: f64,
    pub calmar_ratio: f64,
    pub win_rate: f64,
    pub average_win: f64,
    /// Mean return of losing trades (negative).
    pub average_loss: f64,
    pub number_of_trades: usize,
    pub profit_factor: f64,
    pub stop_loss_exits: usize,
    pub average_holding_periods: f64,
    /// Fraction of periods with a position on.
    pub exposure: f64,
    pub max_consecutive_losses: usize,
}

impl SummaryMetrics {
    /// Compute every metric. `periods_in_market` counts simulated periods
    /// that started with a non-flat position.
    pub fn compute(
        equity_curve: &[f64],
        trades: &[Trade],
        periods_in_market: usize,
        periods_per_year: f64,
    ) -> Self {
        let periods = equity_curve.len().saturating_sub(1);
        let ann_return = annualized_return(equity_curve, periods_per_year);
        let ann_vol = annualized_volatility(equity_curve, periods_per_year);
        let mdd = max_drawdown(equity_curve);

        Self {
            total_return: total_return(equity_curve),
            annualized_return: ann_return,
            annualized_volatility: ann_vol,
            sharpe_ratio: sharpe_ratio(ann_return, ann_vol),
            max_drawdown: mdd,
            calmar_ratio: calmar_ratio(ann_return, mdd),
            win_rate: win_rate(trades),
            average_win: average_win(trades),
            average_loss: average_loss(trades),
            number_of_trades: trades.len(),
            profit_factor: profit_factor(trades),
            stop_loss_exits: trades
                .iter()
                .filter(|t| t.exit_reason == ExitReason::StopLoss)
                .count(),
            average_holding_periods: average_holding_periods(trades),
            exposure: if periods == 0 {
                0.0
            } else {
                periods_in_market as f64 / periods as f64
            },
            max_consecutive_losses: max_consecutive_losses(trades),
        }
    }

    /// Flat name → value map, for comparison tables and CSV export.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("total_return", self.total_return),
            ("annualized_return", self.annualized_return),
            ("annualized_volatility", self.annualized_volatility),
            ("sharpe_ratio", self.sharpe_ratio),
            ("max_drawdown", self.max_drawdown),
            ("calmar_ratio", self.calmar_ratio),
            ("win_rate", self.win_rate),
            ("average_win", self.average_win),
            ("average_loss", self.average_loss),
            ("number_of_trades", self.number_of_trades as f64),
            ("profit_factor", self.profit_factor),
            ("stop_loss_exits", self.stop_loss_exits as f64),
            ("average_holding_periods", self.average_holding_periods),
            ("exposure", self.exposure),
            ("max_consecutive_losses", self.max_consecutive_losses as f64),
        ])
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: final / initial − 1.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    let (Some(&initial), Some(&last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if initial <= 0.0 {
        return 0.0;
    }
    last / initial - 1.0
}

/// `(1 + total_return)^(periods_per_year / n) − 1` with `n` simulated periods.
///
/// -1.0 if the equity was wiped out.
pub fn annualized_return(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let periods = equity_curve.len().saturating_sub(1);
    if periods == 0 {
        return 0.0;
    }
    let growth = 1.0 + total_return(equity_curve);
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(periods_per_year / periods as f64) - 1.0
}

/// Sample standard deviation of period returns, scaled by √periods_per_year.
pub fn annualized_volatility(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    sample_std(&period_returns(equity_curve)) * periods_per_year.sqrt()
}

/// Annualized return over annualized volatility. 0.0 when volatility is zero.
pub fn sharpe_ratio(annualized_return: f64, annualized_volatility: f64) -> f64 {
    if annualized_volatility < 1e-15 {
        return 0.0;
    }
    annualized_return / annualized_volatility
}

/// Annualized return over |max drawdown|. 0.0 when there was no drawdown.
pub fn calmar_ratio(annualized_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown == 0.0 {
        return 0.0;
    }
    annualized_return / max_drawdown.abs()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = eq / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Fraction of trades with a positive return.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Mean return of winning trades.
pub fn average_win(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.pnl_pct)
        .collect();
    mean(&wins)
}

/// Mean return of losing trades.
pub fn average_loss(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.pnl_pct)
        .collect();
    mean(&losses)
}

/// Profit factor: gross gains / gross losses of trade returns.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.pnl_pct > 0.0)
        .map(|t| t.pnl_pct)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl_pct < 0.0)
        .map(|t| t.pnl_pct.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub fn average_holding_periods(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.periods_held).sum::<usize>() as f64 / trades.len() as f64
}

/// Longest run of consecutive non-winning trades.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if !trade.is_winner() {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Period-over-period returns of an equity curve.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}
