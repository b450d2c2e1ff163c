//! Artifact export: JSON and CSV.
//!
//! - **JSON**: the full `PipelineReport` with schema versioning
//! - **CSV**: ranked pairs, the comparison table, and per pair the trade
//!   tape, equity curve and spread/z-score series
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use statarb_core::backtest::EquityPoint;
use statarb_core::{PairCandidate, StrategyOutput, Trade};

use crate::report::{format_statistic, generate_markdown};
use crate::runner::{PairRun, PipelineReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `PipelineReport` to pretty JSON.
pub fn export_json(report: &PipelineReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize PipelineReport to JSON")
}

/// Deserialize a `PipelineReport`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<PipelineReport> {
    let report: PipelineReport =
        serde_json::from_str(json).context("failed to deserialize PipelineReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

/// Ranked pairs with every screen statistic.
pub fn export_pairs_csv(candidates: &[PairCandidate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "instrument_a",
        "instrument_b",
        "p_value",
        "test_statistic",
        "hedge_ratio",
        "intercept",
        "correlation",
        "spread_mean",
        "spread_std",
        "used_lag",
        "n_obs",
    ])?;
    for (i, c) in candidates.iter().enumerate() {
        wtr.write_record([
            &(i + 1).to_string(),
            &c.instrument_a,
            &c.instrument_b,
            &format!("{:.8}", c.p_value),
            &format_statistic(c.test_statistic, 6),
            &format!("{:.6}", c.hedge_ratio),
            &format!("{:.6}", c.intercept),
            &format!("{:.6}", c.correlation),
            &format!("{:.6}", c.spread_mean),
            &format!("{:.6}", c.spread_std),
            &c.used_lag.to_string(),
            &c.n_obs.to_string(),
        ])?;
    }
    finish(wtr)
}

/// One row per pair with every summary metric.
pub fn export_comparison_csv(runs: &[PairRun]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let Some(first) = runs.first() else {
        wtr.write_record(["pair_name"])?;
        return finish(wtr);
    };
    let keys: Vec<&str> = first.result.metrics.to_map().keys().copied().collect();

    let mut header = vec!["pair_name"];
    header.extend(&keys);
    wtr.write_record(&header)?;

    for r in runs {
        let mut row = vec![r.label.clone()];
        row.extend(
            r.result
                .metrics
                .to_map()
                .values()
                .map(|v| format!("{v:.6}")),
        );
        wtr.write_record(&row)?;
    }
    finish(wtr)
}

/// Trade tape for one pair.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "pair_id",
        "direction",
        "entry_index",
        "entry_date",
        "entry_z",
        "exit_index",
        "exit_date",
        "exit_z",
        "exit_reason",
        "pnl_pct",
        "periods_held",
    ])?;
    for t in trades {
        wtr.write_record([
            &t.pair_id,
            &t.direction.to_string(),
            &t.entry_index.to_string(),
            &t.entry_date.to_string(),
            &format!("{:.4}", t.entry_z),
            &t.exit_index.to_string(),
            &t.exit_date.to_string(),
            &format!("{:.4}", t.exit_z),
            &t.exit_reason.to_string(),
            &format!("{:.6}", t.pnl_pct),
            &t.periods_held.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Dated equity curve.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity"])?;
    for p in equity_curve {
        wtr.write_record([p.date.to_string(), format!("{:.2}", p.equity)])?;
    }
    finish(wtr)
}

/// Spread, rolling statistics, z-score and position signal per date.
pub fn export_spread_csv(output: &StrategyOutput) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "spread", "rolling_mean", "rolling_std", "z_score", "position"])?;
    for (p, state) in output.spread.iter().zip(&output.positions) {
        wtr.write_record([
            p.date.to_string(),
            format!("{:.6}", p.spread),
            opt(p.rolling_mean),
            opt(p.rolling_std),
            opt(p.z_score),
            state.signal().to_string(),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a pipeline run.
///
/// Creates `{run_id prefix}_{timestamp}/` under `output_dir` containing:
/// - `report.json`: the full `PipelineReport`
/// - `report.md`: Markdown summary
/// - `pairs.csv`: every cointegrated pair in rank order
/// - `comparison.csv`: summary metrics per backtested pair
/// - `{pair}/result.json`, `trades.csv`, `equity.csv`, `spread.csv`
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &PipelineReport, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = report.run_id.chars().take(12).collect();
    let dirname = format!(
        "{prefix}_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("report.md"), generate_markdown(report))?;
    std::fs::write(
        run_dir.join("pairs.csv"),
        export_pairs_csv(&report.screen.candidates)?,
    )?;
    std::fs::write(
        run_dir.join("comparison.csv"),
        export_comparison_csv(&report.runs)?,
    )?;

    for run in &report.runs {
        let pair_dir = run_dir.join(&run.label);
        std::fs::create_dir_all(&pair_dir)
            .with_context(|| format!("failed to create pair dir: {}", pair_dir.display()))?;
        let result_json = serde_json::to_string_pretty(&run.result)
            .with_context(|| format!("failed to serialize result for {}", run.label))?;
        std::fs::write(pair_dir.join("result.json"), result_json)?;
        std::fs::write(
            pair_dir.join("trades.csv"),
            export_trades_csv(&run.result.trades)?,
        )?;
        std::fs::write(
            pair_dir.join("equity.csv"),
            export_equity_csv(&run.result.equity_curve)?,
        )?;
        std::fs::write(pair_dir.join("spread.csv"), export_spread_csv(&run.output)?)?;
    }

    Ok(run_dir)
}

/// Load a `PipelineReport` from an artifact directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<PipelineReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
