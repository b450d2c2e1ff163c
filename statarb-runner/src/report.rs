//! Human-readable reports: terminal tables and a Markdown run report.

use statarb_core::{PairCandidate, SkippedPair, COLLINEAR_STATISTIC};

use crate::runner::{PairRun, PipelineReport};

const RULE_WIDTH: usize = 80;

/// Test statistic with `decimals` places; collinear pairs show as `-inf`.
pub fn format_statistic(statistic: f64, decimals: usize) -> String {
    if statistic == COLLINEAR_STATISTIC {
        "-inf".into()
    } else {
        format!("{statistic:.decimals$}")
    }
}

/// Ranked candidate list, one block per pair.
pub fn format_pair_table(candidates: &[PairCandidate]) -> String {
    let mut out = String::new();
    out.push_str("Top Cointegrated Pairs:\n");
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');
    if candidates.is_empty() {
        out.push_str("No cointegrated pairs found.\n");
        return out;
    }
    for (rank, c) in candidates.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} vs {}\n",
            rank + 1,
            c.instrument_a,
            c.instrument_b
        ));
        out.push_str(&format!(
            "   Cointegration p-value: {:.6} (t = {}, lag {})\n",
            c.p_value,
            format_statistic(c.test_statistic, 3),
            c.used_lag
        ));
        out.push_str(&format!("   Hedge ratio: {:.4}\n", c.hedge_ratio));
        out.push_str(&format!("   Correlation: {:.4}\n", c.correlation));
        out.push_str(&format!(
            "   Spread mean: {:.4}, std: {:.4}\n\n",
            c.spread_mean, c.spread_std
        ));
    }
    out
}

/// Side-by-side headline metrics for every backtested pair.
pub fn format_comparison(runs: &[PairRun]) -> String {
    let width = runs
        .iter()
        .map(|r| r.label.len())
        .max()
        .unwrap_or(0)
        .max("pair".len());

    let mut out = String::new();
    out.push_str(&format!(
        "{:<width$}  {:>12}  {:>12}  {:>8}  {:>12}  {:>8}  {:>6}\n",
        "pair", "total_return", "annual_return", "sharpe", "max_drawdown", "win_rate", "trades"
    ));
    for r in runs {
        let m = &r.result.metrics;
        out.push_str(&format!(
            "{:<width$}  {:>11.2}%  {:>12.2}%  {:>8.2}  {:>11.2}%  {:>7.1}%  {:>6}\n",
            r.label,
            m.total_return * 100.0,
            m.annualized_return * 100.0,
            m.sharpe_ratio,
            m.max_drawdown * 100.0,
            m.win_rate * 100.0,
            m.number_of_trades
        ));
    }
    out
}

/// One line per pair the screen could not test.
pub fn format_skipped(skipped: &[SkippedPair]) -> String {
    let mut out = String::new();
    for s in skipped {
        out.push_str(&format!(
            "  {} / {}: {}\n",
            s.instrument_a, s.instrument_b, s.reason
        ));
    }
    out
}

/// Full terminal output for a pipeline run.
pub fn format_report(report: &PipelineReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Data: {} instruments, {} to {}\n",
        report.instruments.len(),
        report.start_date,
        report.end_date
    ));
    if report.has_synthetic {
        out.push_str("WARNING: results include SYNTHETIC prices\n");
    }
    out.push_str(&format!(
        "Screened {} pairs: {} cointegrated at {}, {} skipped\n\n",
        report.screen.tested,
        report.screen.candidates.len(),
        report.screen.significance_level,
        report.screen.skipped.len()
    ));

    let selected: Vec<PairCandidate> = report.runs.iter().map(|r| r.candidate.clone()).collect();
    out.push_str(&format_pair_table(&selected));

    if !report.runs.is_empty() {
        out.push_str("\nBacktest Results Summary:\n");
        for run in &report.runs {
            out.push('\n');
            out.push_str(&run.result.summary());
            out.push('\n');
        }
        out.push_str("\nComparative Performance Metrics:\n");
        out.push_str(&"-".repeat(RULE_WIDTH));
        out.push('\n');
        out.push_str(&format_comparison(&report.runs));
    }

    if !report.failures.is_empty() {
        out.push_str("\nFailed pairs:\n");
        for f in &report.failures {
            out.push_str(&format!("  {}: {}\n", f.label, f.error));
        }
    }
    if !report.data_failures.is_empty() {
        out.push_str("\nSymbols not loaded:\n");
        for f in &report.data_failures {
            out.push_str(&format!("  {}: {}\n", f.symbol, f.reason));
        }
    }
    out
}

// ─── Markdown ───────────────────────────────────────────────────────

/// Markdown report for a pipeline run.
pub fn generate_markdown(report: &PipelineReport) -> String {
    let mut md = String::with_capacity(4096);
    md.push_str("# Pairs Trading Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run ID | {} |\n", report.run_id));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        report.start_date, report.end_date
    ));
    md.push_str(&format!("| Instruments | {} |\n", report.instruments.len()));
    md.push_str(&format!(
        "| Pairs Tested | {} ({} skipped) |\n",
        report.screen.tested,
        report.screen.skipped.len()
    ));
    md.push_str(&format!(
        "| Significance | {} |\n",
        report.screen.significance_level
    ));
    if let Some(hash) = &report.dataset_hash {
        md.push_str(&format!("| Dataset Hash | {hash} |\n"));
    }
    if report.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Cointegrated Pairs\n\n");
    md.push_str("| Rank | Pair | p-value | Statistic | Hedge Ratio | Correlation |\n");
    md.push_str("| ---: | --- | ---: | ---: | ---: | ---: |\n");
    for (i, c) in report.screen.candidates.iter().enumerate() {
        md.push_str(&format!(
            "| {} | {} | {:.6} | {} | {:.4} | {:.4} |\n",
            i + 1,
            c.label(),
            c.p_value,
            format_statistic(c.test_statistic, 3),
            c.hedge_ratio,
            c.correlation
        ));
    }
    md.push('\n');

    md.push_str("## Performance\n\n");
    md.push_str("| Pair | Total Return | Sharpe | Max Drawdown | Win Rate | Trades |\n");
    md.push_str("| --- | ---: | ---: | ---: | ---: | ---: |\n");
    for r in &report.runs {
        let m = &r.result.metrics;
        md.push_str(&format!(
            "| {} | {:.2}% | {:.3} | {:.2}% | {:.1}% | {} |\n",
            r.label,
            m.total_return * 100.0,
            m.sharpe_ratio,
            m.max_drawdown * 100.0,
            m.win_rate * 100.0,
            m.number_of_trades
        ));
    }
    md.push('\n');

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use statarb_core::SkipReason;

    fn candidate(a: &str, b: &str, p: f64) -> PairCandidate {
        PairCandidate {
            instrument_a: a.into(),
            instrument_b: b.into(),
            p_value: p,
            test_statistic: -4.2,
            hedge_ratio: 1.25,
            intercept: 3.0,
            correlation: 0.93,
            spread_mean: 0.0,
            spread_std: 2.5,
            used_lag: 1,
            n_obs: 500,
        }
    }

    #[test]
    fn pair_table_lists_ranked_pairs() {
        let text = format_pair_table(&[
            candidate("HDFCBANK.NS", "ICICIBANK.NS", 0.001),
            candidate("TCS.NS", "INFY.NS", 0.02),
        ]);
        assert!(text.contains("1. HDFCBANK.NS vs ICICIBANK.NS"));
        assert!(text.contains("2. TCS.NS vs INFY.NS"));
        assert!(text.contains("Cointegration p-value: 0.001000"));
        assert!(text.contains("Hedge ratio: 1.2500"));
    }

    #[test]
    fn collinear_statistic_prints_as_negative_infinity() {
        let mut c = candidate("A", "B", 0.0);
        c.test_statistic = COLLINEAR_STATISTIC;
        assert!(format_pair_table(&[c]).contains("(t = -inf, lag 1)"));
        assert_eq!(format_statistic(-4.12345, 2), "-4.12");
    }

    #[test]
    fn empty_pair_table_says_so() {
        assert!(format_pair_table(&[]).contains("No cointegrated pairs found."));
    }

    #[test]
    fn skipped_pairs_show_reason() {
        let text = format_skipped(&[SkippedPair {
            instrument_a: "A".into(),
            instrument_b: "B".into(),
            reason: SkipReason::InsufficientData {
                required: 60,
                actual: 12,
            },
        }]);
        assert!(text.contains("A / B"));
        assert!(text.contains("12"));
    }
}
