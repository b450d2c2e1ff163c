//! Pair backtester: turns a position sequence into returns, equity and trades.
//!
//! Positions are taken at the close, so the return for period `t` uses the
//! legs held at `t-1`:
//!
//! ```text
//! r[t] = leg_a[t-1] · ret_a[t] + leg_b[t-1] · ret_b[t]
//! ```
//!
//! Equity compounds multiplicatively from the initial capital. There are no
//! transaction costs.

pub mod metrics;

pub use metrics::{SummaryMetrics, TRADING_DAYS_PER_YEAR};

use crate::domain::{Direction, Trade};
use crate::signal::{StrategyOutput, Transition};
use crate::stats::simple_returns;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One point of the equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// A position still open when the data ends. Not counted as a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub direction: Direction,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_z: f64,
    pub unrealized_pct: f64,
    pub periods_held: usize,
}

/// Result of backtesting one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub pair_label: String,
    pub initial_capital: f64,
    pub periods_per_year: f64,
    /// One point per spread date.
    pub equity_curve: Vec<EquityPoint>,
    /// Strategy return per date; the first is 0.
    pub returns: Vec<f64>,
    pub trades: Vec<Trade>,
    pub open_position: Option<OpenPosition>,
    pub metrics: SummaryMetrics,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(self.initial_capital, |p| p.equity)
    }

    /// Text block with every summary metric.
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let rule = "=".repeat(60);
        let mut lines = vec![
            rule.clone(),
            format!("Backtest Summary: {}", self.pair_label),
            rule.clone(),
            format!("Initial Capital:        {:.2}", self.initial_capital),
            format!("Final Equity:           {:.2}", self.final_equity()),
            format!("Total Return:           {:.2}%", m.total_return * 100.0),
            format!("Annualized Return:      {:.2}%", m.annualized_return * 100.0),
            format!(
                "Annualized Volatility:  {:.2}%",
                m.annualized_volatility * 100.0
            ),
            format!("Sharpe Ratio:           {:.2}", m.sharpe_ratio),
            format!("Maximum Drawdown:       {:.2}%", m.max_drawdown * 100.0),
            format!("Calmar Ratio:           {:.2}", m.calmar_ratio),
            String::new(),
            "Trading Statistics:".to_string(),
            format!("Number of Trades:       {}", m.number_of_trades),
            format!("Win Rate:               {:.2}%", m.win_rate * 100.0),
            format!("Average Win:            {:.4}", m.average_win),
            format!("Average Loss:           {:.4}", m.average_loss),
            format!("Profit Factor:          {:.2}", m.profit_factor),
            format!("Stop-Loss Exits:        {}", m.stop_loss_exits),
            format!("Avg Holding Periods:    {:.1}", m.average_holding_periods),
            format!("Exposure:               {:.2}%", m.exposure * 100.0),
            format!("Max Consecutive Losses: {}", m.max_consecutive_losses),
        ];
        if let Some(open) = &self.open_position {
            lines.push(format!(
                "Open Position:          {} since {} ({:+.2}%)",
                open.direction,
                open.entry_date,
                open.unrealized_pct * 100.0
            ));
        }
        lines.push(rule);
        lines.join("\n")
    }
}

/// Simulates pair P&L from a strategy output.
#[derive(Debug, Clone, PartialEq)]
pub struct Backtester {
    initial_capital: f64,
    periods_per_year: f64,
}

impl Default for Backtester {
    fn default() -> Self {
        Self::new(100_000.0)
    }
}

impl Backtester {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }

    pub fn with_periods_per_year(mut self, periods_per_year: f64) -> Self {
        self.periods_per_year = periods_per_year;
        self
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Backtest one pair. Pure: the same output always gives the same result.
    pub fn backtest_pair(&self, output: &StrategyOutput, pair_label: &str) -> BacktestResult {
        let n = output.len();
        let ret_a = simple_returns(&output.prices_a);
        let ret_b = simple_returns(&output.prices_b);

        let mut returns = Vec::with_capacity(n);
        let mut equity = Vec::with_capacity(n);
        let mut periods_in_market = 0;
        for t in 0..n {
            let r = if t == 0 {
                0.0
            } else {
                let (leg_a, leg_b) = output.positions[t - 1].legs();
                if leg_a != 0.0 {
                    periods_in_market += 1;
                }
                leg_a * ret_a[t] + leg_b * ret_b[t]
            };
            let prev = equity.last().copied().unwrap_or(self.initial_capital);
            returns.push(r);
            equity.push(if t == 0 { prev } else { prev * (1.0 + r) });
        }

        let trades = extract_trades(output, &returns, pair_label);
        let open_position = open_position(output, &returns);
        let metrics =
            SummaryMetrics::compute(&equity, &trades, periods_in_market, self.periods_per_year);

        let equity_curve = output
            .dates()
            .zip(equity)
            .map(|(date, equity)| EquityPoint { date, equity })
            .collect();

        BacktestResult {
            pair_label: pair_label.to_string(),
            initial_capital: self.initial_capital,
            periods_per_year: self.periods_per_year,
            equity_curve,
            returns,
            trades,
            open_position,
            metrics,
        }
    }
}

// ── Helpers ──

/// Compounded return over periods `from+1..=to`.
fn compound(returns: &[f64], from: usize, to: usize) -> f64 {
    returns[from + 1..=to]
        .iter()
        .fold(1.0, |acc, r| acc * (1.0 + r))
        - 1.0
}

fn extract_trades(output: &StrategyOutput, returns: &[f64], pair_label: &str) -> Vec<Trade> {
    let mut trades = Vec::new();
    for (t, transition) in output.transitions.iter().enumerate() {
        let Transition::Exit(reason) = transition else {
            continue;
        };
        // An exit at `t` closes the position held at `t-1`.
        let Some(prev) = t.checked_sub(1).map(|p| output.positions[p]) else {
            continue;
        };
        let (Some(direction), Some(entry)) = (prev.direction(), prev.entry()) else {
            continue;
        };
        let point = &output.spread[t];
        trades.push(Trade {
            pair_id: pair_label.to_string(),
            direction,
            entry_index: entry.index,
            entry_date: entry.date,
            entry_z: entry.z_score,
            exit_index: t,
            exit_date: point.date,
            exit_z: point.z_score.unwrap_or(0.0),
            exit_reason: *reason,
            pnl_pct: compound(returns, entry.index, t),
            periods_held: t - entry.index,
        });
    }
    trades
}

fn open_position(output: &StrategyOutput, returns: &[f64]) -> Option<OpenPosition> {
    let last = output.positions.last()?;
    let (direction, entry) = (last.direction()?, last.entry()?);
    let end = output.len() - 1;
    Some(OpenPosition {
        direction,
        entry_index: entry.index,
        entry_date: entry.date,
        entry_z: entry.z_score,
        unrealized_pct: compound(returns, entry.index, end),
        periods_held: end - entry.index,
    })
}
