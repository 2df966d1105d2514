//! Unit tests for the types module

use perpwatch::types::*;
use serde_json::json;

fn raw_price(price: serde_json::Value, expo: serde_json::Value) -> RawPrice {
    serde_json::from_value(json!({ "price": price, "expo": expo })).unwrap()
}

#[test]
fn test_decode_string_mantissa() {
    let raw = raw_price(json!("123450"), json!(-2));
    let unit = decode_price(&raw).unwrap();
    assert!((unit - 1234.50).abs() < 1e-9);
}

#[test]
fn test_decode_number_mantissa() {
    let raw = raw_price(json!(123450), json!(-2));
    let unit = decode_price(&raw).unwrap();
    assert!((unit - 1234.50).abs() < 1e-9);
}

#[test]
fn test_decode_positive_exponent() {
    let raw = raw_price(json!("5"), json!(3));
    assert_eq!(decode_price(&raw), Some(5000.0));
}

#[test]
fn test_decode_non_numeric_mantissa() {
    let raw = raw_price(json!("abc"), json!(-2));
    assert_eq!(decode_price(&raw), None);
}

#[test]
fn test_decode_missing_mantissa() {
    let raw: RawPrice = serde_json::from_value(json!({ "expo": -2 })).unwrap();
    assert_eq!(decode_price(&raw), None);
}

#[test]
fn test_decode_missing_exponent() {
    let raw: RawPrice = serde_json::from_value(json!({ "price": "123450" })).unwrap();
    assert_eq!(decode_price(&raw), None);
}

#[test]
fn test_decode_fractional_exponent_rejected() {
    let raw = raw_price(json!("123450"), json!(-2.5));
    assert_eq!(decode_price(&raw), None);
}

#[test]
fn test_decode_null_mantissa() {
    let raw = raw_price(json!(null), json!(-2));
    assert_eq!(decode_price(&raw), None);
}

#[test]
fn test_feed_id_normalization() {
    assert_eq!(FeedId::new("0xE62DF6C8"), FeedId::new("e62df6c8"));
    assert_eq!(FeedId::new("0xE62DF6C8").as_str(), "e62df6c8");
    assert_eq!(FeedId::new("  0xAB  ").as_str(), "ab");
}

#[test]
fn test_feed_id_normalization_idempotent() {
    let once = FeedId::new("0xABCdef01");
    let twice = FeedId::new(once.as_str());
    assert_eq!(once, twice);
}

fn raw_trade(overrides: serde_json::Value) -> RawTradeRecord {
    let mut base = json!({
        "pairIndex": 0,
        "index": 1,
        "buy": true,
        "openPrice": 20_000_000_000_000i64,
        "collateral": 100_000_000i64,
        "leverage": 100_000_000_000i64
    });
    base.as_object_mut()
        .unwrap()
        .extend(overrides.as_object().unwrap().clone());
    serde_json::from_value(base).unwrap()
}

#[test]
fn test_position_descaling() {
    let raw = raw_trade(json!({
        "tp": 23_000_000_000_000i64,
        "sl": 0,
        "liquidationPrice": 18_500_000_000_000i64
    }));
    let position = Position::from_raw(&raw, Some((1.0, 75.0))).unwrap();

    assert_eq!(position.direction, Direction::Long);
    assert!((position.entry_price - 2000.0).abs() < 1e-9);
    assert!((position.collateral - 100.0).abs() < 1e-9);
    assert!((position.leverage - 10.0).abs() < 1e-9);
    assert!((position.position_size() - 1000.0).abs() < 1e-9);
    assert!((position.take_profit.unwrap() - 2300.0).abs() < 1e-9);
    // A zero trigger level means not set.
    assert_eq!(position.stop_loss, None);
    assert!((position.liquidation_price.unwrap() - 1850.0).abs() < 1e-9);
}

#[test]
fn test_position_rejects_zero_collateral() {
    let raw = raw_trade(json!({ "collateral": 0 }));
    assert!(matches!(
        Position::from_raw(&raw, None),
        Err(PositionError::InvalidCollateral(_))
    ));
}

#[test]
fn test_position_rejects_zero_entry_price() {
    let raw = raw_trade(json!({ "openPrice": 0 }));
    assert!(matches!(
        Position::from_raw(&raw, None),
        Err(PositionError::InvalidEntryPrice(_))
    ));
}

#[test]
fn test_position_rejects_zero_leverage() {
    let raw = raw_trade(json!({ "leverage": 0 }));
    assert!(matches!(
        Position::from_raw(&raw, None),
        Err(PositionError::InvalidLeverage(_))
    ));
}

#[test]
fn test_position_rejects_leverage_outside_bounds() {
    // 100x against a [1, 75] pair.
    let raw = raw_trade(json!({ "leverage": 1_000_000_000_000i64 }));
    assert!(matches!(
        Position::from_raw(&raw, Some((1.0, 75.0))),
        Err(PositionError::LeverageOutOfBounds { .. })
    ));
    // Without bounds the record is accepted.
    assert!(Position::from_raw(&raw, None).is_ok());
}

#[test]
fn test_fee_schedule_prefers_absolute_closing_fee() {
    let raw = raw_trade(json!({
        "fees": {
            "closingFeeRate": 0.001,
            "closingFee": 2_500_000i64,
            "rolloverFee": 1_000_000i64
        }
    }));
    let position = Position::from_raw(&raw, None).unwrap();
    let fees = position.fees.unwrap();
    assert_eq!(fees.closing, ClosingFee::Absolute(2.5));
    assert!((fees.rollover_accrued - 1.0).abs() < 1e-9);
}

#[test]
fn test_fee_schedule_rate_fallback() {
    let raw = raw_trade(json!({ "fees": { "closingFeeRate": 0.001 } }));
    let position = Position::from_raw(&raw, None).unwrap();
    let fees = position.fees.unwrap();
    assert_eq!(fees.closing, ClosingFee::Rate(0.001));
    assert!((fees.closing.amount(1000.0) - 1.0).abs() < 1e-9);
}

#[test]
fn test_trigger_checks_long() {
    let raw = raw_trade(json!({
        "tp": 21_000_000_000_000i64,
        "sl": 19_000_000_000_000i64,
        "liquidationPrice": 18_000_000_000_000i64
    }));
    let position = Position::from_raw(&raw, None).unwrap();

    assert!(position.hit_take_profit(2100.0));
    assert!(!position.hit_take_profit(2099.0));
    assert!(position.hit_stop_loss(1900.0));
    assert!(!position.hit_stop_loss(1901.0));
    assert!(position.breached_liquidation(1799.0));
    assert!(!position.breached_liquidation(1801.0));
}

#[test]
fn test_trigger_checks_short() {
    let raw = raw_trade(json!({
        "buy": false,
        "tp": 19_000_000_000_000i64,
        "sl": 21_000_000_000_000i64
    }));
    let position = Position::from_raw(&raw, None).unwrap();

    assert!(position.hit_take_profit(1900.0));
    assert!(!position.hit_take_profit(1901.0));
    assert!(position.hit_stop_loss(2100.0));
    assert!(!position.hit_stop_loss(2099.0));
    // No authoritative level supplied.
    assert!(!position.breached_liquidation(5000.0));
}

#[test]
fn test_pending_order_descaling() {
    let raw: RawOrderRecord = serde_json::from_value(json!({
        "pairIndex": 3,
        "index": 0,
        "buy": false,
        "price": 15_000_000_000_000i64,
        "leverage": 50_000_000_000i64
    }))
    .unwrap();
    let order = PendingOrder::from_raw(&raw);

    assert_eq!(order.pair_index, 3);
    assert_eq!(order.direction, Direction::Short);
    assert!((order.limit_price.unwrap() - 1500.0).abs() < 1e-9);
    assert!((order.leverage.unwrap() - 5.0).abs() < 1e-9);
}

#[test]
fn test_valuation_serializes_with_type_tag() {
    let valuation = Valuation::FeeAdjusted {
        gross_pnl: 50.0,
        gross_pnl_percent: Some(50.0),
        closing_fee: 1.0,
        rollover_fee: 0.0,
        net_pnl: 49.0,
        net_pnl_percent: Some(49.0),
    };
    let json = serde_json::to_string(&valuation).unwrap();
    assert!(json.contains(r#""type":"feeAdjusted""#));
    assert!(json.contains(r#""netPnl":49.0"#));

    let simple = Valuation::Simple {
        gross_pnl: 50.0,
        gross_pnl_percent: Some(50.0),
        fee: 1.0,
        pnl: 49.0,
        pnl_percent: Some(49.0),
    };
    let json = serde_json::to_string(&simple).unwrap();
    assert!(json.contains(r#""type":"simple""#));
}
