//! Unit tests for the valuation engine and portfolio aggregation

use perpwatch::services::{aggregate, EngineConfig, ValuationEngine, ValuationError};
use perpwatch::types::{ClosingFee, Direction, FeeSchedule, Position, Valuation};

fn position(direction: Direction, collateral: f64, leverage: f64, entry_price: f64) -> Position {
    Position {
        pair_index: 0,
        trade_index: 0,
        direction,
        collateral,
        leverage,
        entry_price,
        take_profit: None,
        stop_loss: None,
        liquidation_price: None,
        fees: None,
    }
}

fn fee_schedule(closing: ClosingFee, rollover: f64, rebate: f64) -> FeeSchedule {
    FeeSchedule {
        closing,
        rollover_accrued: rollover,
        referral_rate: 0.0,
        loss_protection_rebate: rebate,
    }
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_fee_adjusted_worked_example() {
    // collateral 100, 10x long from 2000, priced at 2100, 0.1% closing fee.
    let mut p = position(Direction::Long, 100.0, 10.0, 2000.0);
    p.fees = Some(fee_schedule(ClosingFee::Rate(0.001), 0.0, 0.0));

    let engine = ValuationEngine::default();
    let valuation = engine
        .valuate(&p, |_| Some(2100.0), None)
        .unwrap()
        .unwrap();

    match valuation {
        Valuation::FeeAdjusted {
            gross_pnl,
            gross_pnl_percent,
            closing_fee,
            rollover_fee,
            net_pnl,
            net_pnl_percent,
        } => {
            assert_close(gross_pnl, 50.0);
            assert_close(gross_pnl_percent.unwrap(), 50.0);
            assert_close(closing_fee, 1.0);
            assert_close(rollover_fee, 0.0);
            assert_close(net_pnl, 49.0);
            assert_close(net_pnl_percent.unwrap(), 49.0);
        }
        other => panic!("expected fee-adjusted valuation, got {other:?}"),
    }
}

#[test]
fn test_simple_valuation_uses_flat_rate() {
    let p = position(Direction::Long, 100.0, 10.0, 2000.0);
    let engine = ValuationEngine::new(EngineConfig {
        flat_fee_rate: 0.001,
    });

    let valuation = engine
        .valuate(&p, |_| Some(2100.0), None)
        .unwrap()
        .unwrap();

    match valuation {
        Valuation::Simple {
            gross_pnl,
            fee,
            pnl,
            pnl_percent,
            ..
        } => {
            assert_close(gross_pnl, 50.0);
            assert_close(fee, 1.0);
            assert_close(pnl, 49.0);
            assert_close(pnl_percent.unwrap(), 49.0);
        }
        other => panic!("expected simple valuation, got {other:?}"),
    }
}

#[test]
fn test_gross_pnl_sign_by_direction() {
    let engine = ValuationEngine::default();
    let long = position(Direction::Long, 100.0, 10.0, 2000.0);
    let short = position(Direction::Short, 100.0, 10.0, 2000.0);

    let up = |_| Some(2100.0);
    let down = |_| Some(1900.0);

    assert!(engine.valuate(&long, up, None).unwrap().unwrap().gross_pnl() > 0.0);
    assert!(engine.valuate(&long, down, None).unwrap().unwrap().gross_pnl() < 0.0);
    assert!(engine.valuate(&short, up, None).unwrap().unwrap().gross_pnl() < 0.0);
    assert!(engine.valuate(&short, down, None).unwrap().unwrap().gross_pnl() > 0.0);
}

#[test]
fn test_gross_pnl_zero_at_entry() {
    let engine = ValuationEngine::default();
    let p = position(Direction::Long, 100.0, 10.0, 2000.0);
    let valuation = engine.valuate(&p, |_| Some(2000.0), None).unwrap().unwrap();
    assert_eq!(valuation.gross_pnl(), 0.0);
}

#[test]
fn test_net_never_exceeds_gross_without_rebate() {
    let engine = ValuationEngine::default();
    for price in [1500.0, 1999.0, 2000.0, 2001.0, 2500.0] {
        let mut p = position(Direction::Long, 250.0, 5.0, 2000.0);
        p.fees = Some(fee_schedule(ClosingFee::Rate(0.0005), 0.75, 0.0));
        let v = engine.valuate(&p, |_| Some(price), None).unwrap().unwrap();
        assert!(v.net_pnl() <= v.gross_pnl());
    }
}

#[test]
fn test_loss_protection_rebate_raises_net() {
    let engine = ValuationEngine::default();
    let mut p = position(Direction::Long, 100.0, 10.0, 2000.0);
    p.fees = Some(fee_schedule(ClosingFee::Absolute(2.0), 1.0, 5.0));

    let v = engine.valuate(&p, |_| Some(2100.0), None).unwrap().unwrap();
    // net = 50 - 2 - 1 + 5
    assert_close(v.net_pnl(), 52.0);
}

#[test]
fn test_pending_when_no_price() {
    let engine = ValuationEngine::default();
    let p = position(Direction::Long, 100.0, 10.0, 2000.0);
    assert!(engine.valuate(&p, |_| None, None).unwrap().is_none());
}

#[test]
fn test_exit_price_override_beats_lookup() {
    let engine = ValuationEngine::default();
    let p = position(Direction::Long, 100.0, 10.0, 2000.0);
    let v = engine
        .valuate(&p, |_| None, Some(2100.0))
        .unwrap()
        .unwrap();
    assert_close(v.gross_pnl(), 50.0);
}

#[test]
fn test_rejects_zero_leverage() {
    let engine = ValuationEngine::default();
    let p = position(Direction::Long, 100.0, 0.0, 2000.0);
    assert!(matches!(
        engine.valuate(&p, |_| Some(2100.0), None),
        Err(ValuationError::InvalidLeverage(_))
    ));
}

#[test]
fn test_rejects_zero_entry_price() {
    let engine = ValuationEngine::default();
    let p = position(Direction::Long, 100.0, 10.0, 0.0);
    assert!(matches!(
        engine.valuate(&p, |_| Some(2100.0), None),
        Err(ValuationError::InvalidEntryPrice(_))
    ));
}

#[test]
fn test_zero_collateral_yields_undefined_percentages() {
    let engine = ValuationEngine::default();
    let p = position(Direction::Long, 0.0, 10.0, 2000.0);
    let v = engine.valuate(&p, |_| Some(2100.0), None).unwrap().unwrap();
    // No NaN/Infinity: the percentage is simply undefined.
    assert_eq!(v.net_pnl_percent(), None);
    assert!(v.net_pnl().is_finite());
}

#[test]
fn test_liquidation_price_approximation() {
    let engine = ValuationEngine::default();

    let long = position(Direction::Long, 100.0, 10.0, 2000.0);
    assert_close(engine.liquidation_price(&long).unwrap(), 1800.0);

    let short = position(Direction::Short, 100.0, 10.0, 2000.0);
    assert_close(engine.liquidation_price(&short).unwrap(), 2200.0);
}

#[test]
fn test_authoritative_liquidation_price_passes_through() {
    let engine = ValuationEngine::default();
    let mut p = position(Direction::Long, 100.0, 10.0, 2000.0);
    p.liquidation_price = Some(1850.0);
    assert_close(engine.liquidation_price(&p).unwrap(), 1850.0);
}

#[test]
fn test_aggregate_tolerates_pending_positions() {
    let engine = ValuationEngine::default();

    // Position A: priced, absolute fee 1 with gross 11 => net 10.
    let mut a = position(Direction::Long, 100.0, 10.0, 2000.0);
    a.pair_index = 0;
    a.fees = Some(fee_schedule(ClosingFee::Absolute(1.0), 0.0, 0.0));

    // Position B: no price yet.
    let mut b = position(Direction::Short, 50.0, 5.0, 300.0);
    b.pair_index = 1;

    let lookup = |idx: u32| (idx == 0).then_some(2022.0);
    let totals = aggregate(&engine, &[a, b], lookup);

    assert_eq!(totals.open_positions, 2);
    assert_eq!(totals.pending, 1);
    assert_close(totals.total_collateral, 150.0);
    assert_close(totals.total_net_pnl, 10.0);
    assert!(totals.total_net_pnl.is_finite());
}

#[test]
fn test_aggregate_skips_invalid_positions() {
    let engine = ValuationEngine::default();

    let mut good = position(Direction::Long, 100.0, 10.0, 2000.0);
    good.fees = Some(fee_schedule(ClosingFee::Absolute(1.0), 0.0, 0.0));
    let bad = position(Direction::Long, 100.0, 0.0, 2000.0);

    let totals = aggregate(&engine, &[good, bad], |_| Some(2022.0));

    assert_eq!(totals.open_positions, 2);
    assert_close(totals.total_net_pnl, 10.0);
    assert_close(totals.total_collateral, 200.0);
}

#[test]
fn test_aggregate_empty_portfolio() {
    let engine = ValuationEngine::default();
    let totals = aggregate(&engine, &[], |_| Some(2000.0));
    assert_eq!(totals.open_positions, 0);
    assert_eq!(totals.total_collateral, 0.0);
    assert_eq!(totals.total_net_pnl, 0.0);
}
