//! Integration tests for the signal engine.

use chrono::{Duration, NaiveDate};
use statarb_core::domain::{Direction, ExitReason, PositionState};
use statarb_core::signal::{evaluate_positions, Transition};
use statarb_core::{PriceMatrix, SignalEngine, StrategyError, StrategyParams};

fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

#[test]
fn reference_z_path_enters_short_and_reverts() {
    let z: Vec<Option<f64>> = [0.0, 1.0, 2.5, 2.1, 0.3, -0.2].map(Some).to_vec();
    let (positions, transitions) =
        evaluate_positions(&dates(6), &z, 1.5, &StrategyParams::default());

    assert_eq!(transitions[2], Transition::Enter(Direction::ShortSpread));
    assert_eq!(transitions[4], Transition::Exit(ExitReason::MeanReversion));
    let entries = transitions
        .iter()
        .filter(|t| matches!(t, Transition::Enter(_)))
        .count();
    assert_eq!(entries, 1);

    assert!(positions[..2].iter().all(PositionState::is_flat));
    assert_eq!(positions[2].direction(), Some(Direction::ShortSpread));
    assert_eq!(positions[3].direction(), Some(Direction::ShortSpread));
    assert!(positions[4].is_flat() && positions[5].is_flat());

    let entry = positions[3].entry().unwrap();
    assert_eq!(entry.index, 2);
    assert_eq!(entry.z_score, 2.5);
    assert_eq!(entry.hedge_ratio, 1.5);
}

#[test]
fn spread_and_zscores_follow_the_lookback() {
    let n = 40;
    let b: Vec<f64> = (0..n).map(|i| 50.0 + (i as f64 * 0.3).sin()).collect();
    // Spread a - 2b oscillates with a slow drift.
    let a: Vec<f64> = b
        .iter()
        .enumerate()
        .map(|(i, pb)| 2.0 * pb + 10.0 + (i as f64 * 0.9).cos())
        .collect();
    let prices = PriceMatrix::new(dates(n), vec![("A".into(), a), ("B".into(), b)]).unwrap();
    let params = StrategyParams {
        lookback: 10,
        ..StrategyParams::default()
    };
    let out = SignalEngine::new(params)
        .unwrap()
        .run_strategy(&prices, "A", "B", 2.0)
        .unwrap();

    assert_eq!(out.len(), n);
    assert_eq!(out.spread.len(), out.positions.len());
    assert!(out.spread[..9].iter().all(|p| p.z_score.is_none()));
    assert!(out.spread[9..].iter().all(|p| p.z_score.is_some()));
    for p in &out.spread[9..] {
        let (m, s, z) = (p.rolling_mean.unwrap(), p.rolling_std.unwrap(), p.z_score.unwrap());
        assert!((z - (p.spread - m) / s).abs() < 1e-9);
    }
    assert_eq!(out.label(), "A_vs_B");
    assert!(out.dates().eq(prices.dates().iter().copied()));
}

#[test]
fn history_shorter_than_lookback_stays_flat() {
    let prices = PriceMatrix::new(
        dates(5),
        vec![
            ("A".into(), vec![10.0, 12.0, 9.0, 15.0, 8.0]),
            ("B".into(), vec![5.0, 5.0, 5.0, 5.0, 5.0]),
        ],
    )
    .unwrap();
    let out = SignalEngine::new(StrategyParams::default())
        .unwrap()
        .run_strategy(&prices, "A", "B", 1.0)
        .unwrap();
    assert!(out.spread.iter().all(|p| p.z_score.is_none()));
    assert!(out.positions.iter().all(PositionState::is_flat));
    assert_eq!(out.entry_count(), 0);
}

#[test]
fn rejects_bad_inputs() {
    let prices = PriceMatrix::new(
        dates(3),
        vec![("A".into(), vec![1.0, 2.0, 3.0]), ("B".into(), vec![1.0, 1.0, 1.0])],
    )
    .unwrap();
    let engine = SignalEngine::new(StrategyParams::default()).unwrap();
    assert!(matches!(
        engine.run_strategy(&prices, "A", "B", 0.0),
        Err(StrategyError::DegenerateHedgeRatio(_))
    ));
    assert!(matches!(
        engine.run_strategy(&prices, "A", "B", f64::NAN),
        Err(StrategyError::DegenerateHedgeRatio(_))
    ));
    assert!(matches!(
        engine.run_strategy(&prices, "A", "ZZZ", 1.0),
        Err(StrategyError::UnknownInstrument(_))
    ));

    let inverted = StrategyParams {
        entry_threshold: 0.4,
        ..StrategyParams::default()
    };
    assert!(SignalEngine::new(inverted).is_err());
}
