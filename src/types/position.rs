use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Price-like record fields arrive scaled by 1e10.
pub const PRICE_SCALE: f64 = 1e10;
/// USDC-denominated record fields arrive scaled by 1e6.
pub const USDC_SCALE: f64 = 1e6;

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Errors raised while validating a raw position record.
#[derive(Debug, Error)]
pub enum PositionError {
    #[error("collateral must be positive, got {0}")]
    InvalidCollateral(f64),

    #[error("entry price must be positive, got {0}")]
    InvalidEntryPrice(f64),

    #[error("leverage must be positive, got {0}")]
    InvalidLeverage(f64),

    #[error("leverage {requested}x outside pair bounds [{min}, {max}]")]
    LeverageOutOfBounds { requested: f64, min: f64, max: f64 },
}

/// Closing fee quote: either a rate applied to position size or an absolute
/// amount already computed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosingFee {
    Rate(f64),
    Absolute(f64),
}

impl ClosingFee {
    /// Resolve to an absolute fee for a given position size.
    pub fn amount(&self, position_size: f64) -> f64 {
        match *self {
            ClosingFee::Rate(rate) => rate * position_size,
            ClosingFee::Absolute(amount) => amount,
        }
    }
}

/// Fee schedule for non-zero-fee instruments. Absent on fee-free pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    pub closing: ClosingFee,
    /// Funding cost accrued so far, USDC units.
    pub rollover_accrued: f64,
    /// Carried for display; the quoted closing fee already reflects it.
    pub referral_rate: f64,
    /// Partial refund reducing a realized loss, USDC units.
    pub loss_protection_rebate: f64,
}

/// An open leveraged position, descaled to unit values. Immutable snapshot;
/// the list feed replaces the whole set on every poll.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub pair_index: u32,
    pub trade_index: u32,
    pub direction: Direction,
    /// Collateral backing the position, USDC units.
    pub collateral: f64,
    pub leverage: f64,
    pub entry_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    /// Authoritative liquidation level when the backend supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidation_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<FeeSchedule>,
}

impl Position {
    /// Validate and descale a raw record.
    ///
    /// `leverage_bounds` comes from the pair directory when the pair is
    /// known; records outside the bounds are rejected rather than valued.
    pub fn from_raw(
        raw: &RawTradeRecord,
        leverage_bounds: Option<(f64, f64)>,
    ) -> Result<Self, PositionError> {
        let collateral = raw.collateral as f64 / USDC_SCALE;
        if collateral <= 0.0 {
            return Err(PositionError::InvalidCollateral(collateral));
        }

        let entry_price = raw.open_price as f64 / PRICE_SCALE;
        if entry_price <= 0.0 {
            return Err(PositionError::InvalidEntryPrice(entry_price));
        }

        let leverage = raw.leverage as f64 / PRICE_SCALE;
        if leverage <= 0.0 {
            return Err(PositionError::InvalidLeverage(leverage));
        }
        if let Some((min, max)) = leverage_bounds {
            if leverage < min || leverage > max {
                return Err(PositionError::LeverageOutOfBounds {
                    requested: leverage,
                    min,
                    max,
                });
            }
        }

        Ok(Self {
            pair_index: raw.pair_index,
            trade_index: raw.index,
            direction: if raw.buy {
                Direction::Long
            } else {
                Direction::Short
            },
            collateral,
            leverage,
            entry_price,
            take_profit: descale_trigger(raw.tp),
            stop_loss: descale_trigger(raw.sl),
            liquidation_price: raw
                .liquidation_price
                .map(|p| p as f64 / PRICE_SCALE)
                .filter(|p| *p > 0.0),
            fees: raw.fees.as_ref().map(FeeSchedule::from_raw),
        })
    }

    /// Notional exposure: collateral times leverage.
    pub fn position_size(&self) -> f64 {
        self.collateral * self.leverage
    }

    /// Check if take profit has been reached at the given price.
    pub fn hit_take_profit(&self, current_price: f64) -> bool {
        match (self.take_profit, self.direction) {
            (Some(tp), Direction::Long) => current_price >= tp,
            (Some(tp), Direction::Short) => current_price <= tp,
            (None, _) => false,
        }
    }

    /// Check if stop loss has been reached at the given price.
    pub fn hit_stop_loss(&self, current_price: f64) -> bool {
        match (self.stop_loss, self.direction) {
            (Some(sl), Direction::Long) => current_price <= sl,
            (Some(sl), Direction::Short) => current_price >= sl,
            (None, _) => false,
        }
    }

    /// Check if the price has crossed the liquidation level. Only meaningful
    /// when the backend supplied an authoritative level.
    pub fn breached_liquidation(&self, current_price: f64) -> bool {
        match (self.liquidation_price, self.direction) {
            (Some(liq), Direction::Long) => current_price <= liq,
            (Some(liq), Direction::Short) => current_price >= liq,
            (None, _) => false,
        }
    }
}

/// A trigger level of zero means "not set".
fn descale_trigger(raw: Option<i64>) -> Option<f64> {
    raw.map(|v| v as f64 / PRICE_SCALE).filter(|v| *v > 0.0)
}

impl FeeSchedule {
    fn from_raw(raw: &RawFees) -> Self {
        let closing = match (raw.closing_fee, raw.closing_fee_rate) {
            (Some(absolute), _) => ClosingFee::Absolute(absolute as f64 / USDC_SCALE),
            (None, Some(rate)) => ClosingFee::Rate(rate),
            (None, None) => ClosingFee::Rate(0.0),
        };
        Self {
            closing,
            rollover_accrued: raw.rollover_fee as f64 / USDC_SCALE,
            referral_rate: raw.referral_fee_rate,
            loss_protection_rebate: raw.loss_protection_rebate as f64 / USDC_SCALE,
        }
    }
}

/// Raw open-position record as served by the backend list feed.
/// Fixed-point: see [`PRICE_SCALE`] and [`USDC_SCALE`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTradeRecord {
    pub pair_index: u32,
    pub index: u32,
    /// true = long.
    pub buy: bool,
    pub open_price: i64,
    pub collateral: i64,
    pub leverage: i64,
    #[serde(default)]
    pub tp: Option<i64>,
    #[serde(default)]
    pub sl: Option<i64>,
    #[serde(default)]
    pub liquidation_price: Option<i64>,
    #[serde(default)]
    pub fees: Option<RawFees>,
}

/// Raw fee fields accompanying non-zero-fee instruments.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFees {
    #[serde(default)]
    pub closing_fee_rate: Option<f64>,
    /// Absolute closing fee, USDC-scaled; preferred over the rate if set.
    #[serde(default)]
    pub closing_fee: Option<i64>,
    #[serde(default)]
    pub rollover_fee: i64,
    #[serde(default)]
    pub referral_fee_rate: f64,
    #[serde(default)]
    pub loss_protection_rebate: i64,
}

/// Raw pending limit order. Orders are never valued, but their pair
/// references keep the corresponding feeds subscribed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrderRecord {
    pub pair_index: u32,
    pub index: u32,
    pub buy: bool,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub leverage: Option<i64>,
}

/// A descaled pending limit order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrder {
    pub pair_index: u32,
    pub order_index: u32,
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage: Option<f64>,
}

impl PendingOrder {
    pub fn from_raw(raw: &RawOrderRecord) -> Self {
        Self {
            pair_index: raw.pair_index,
            order_index: raw.index,
            direction: if raw.buy {
                Direction::Long
            } else {
                Direction::Short
            },
            limit_price: descale_trigger(raw.price),
            leverage: raw.leverage.map(|l| l as f64 / PRICE_SCALE),
        }
    }
}
