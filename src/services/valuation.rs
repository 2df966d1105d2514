use crate::types::{Direction, Position, Valuation};
use thiserror::Error;

/// Valuation errors. These are input-validation failures: a position that
/// would divide by zero is rejected, never silently valued as NaN/Infinity.
#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("cannot value position with leverage {0}")]
    InvalidLeverage(f64),

    #[error("cannot value position with entry price {0}")]
    InvalidEntryPrice(f64),
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Flat closing-fee rate applied to position size on instruments
    /// without a fee schedule.
    pub flat_fee_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flat_fee_rate: 0.001, // 0.1%
        }
    }
}

/// Values one position snapshot against a current price.
///
/// Stateless apart from configuration; every call is a pure computation
/// over the snapshot and whatever price the lookup resolves.
#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    config: EngineConfig,
}

impl ValuationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Value a position.
    ///
    /// `exit_price` overrides the live lookup (used when quoting a close at
    /// a chosen price). Returns `Ok(None)` while no price is available;
    /// callers treat that as "not yet computable", never as zero PnL.
    pub fn valuate<F>(
        &self,
        position: &Position,
        price_lookup: F,
        exit_price: Option<f64>,
    ) -> Result<Option<Valuation>, ValuationError>
    where
        F: Fn(u32) -> Option<f64>,
    {
        if position.leverage <= 0.0 {
            return Err(ValuationError::InvalidLeverage(position.leverage));
        }
        if position.entry_price <= 0.0 {
            return Err(ValuationError::InvalidEntryPrice(position.entry_price));
        }

        let current_price = match exit_price.or_else(|| price_lookup(position.pair_index)) {
            Some(p) if p.is_finite() && p > 0.0 => p,
            _ => return Ok(None),
        };

        let position_size = position.position_size();
        let price_delta = match position.direction {
            Direction::Long => (current_price - position.entry_price) / position.entry_price,
            Direction::Short => (position.entry_price - current_price) / position.entry_price,
        };
        let gross_pnl = position_size * price_delta;
        let gross_pnl_percent = percent_of_collateral(gross_pnl, position.collateral);

        let valuation = match position.fees {
            Some(fees) => {
                let closing_fee = fees.closing.amount(position_size);
                let rollover_fee = fees.rollover_accrued;
                let net_pnl =
                    gross_pnl - closing_fee - rollover_fee + fees.loss_protection_rebate;
                Valuation::FeeAdjusted {
                    gross_pnl,
                    gross_pnl_percent,
                    closing_fee,
                    rollover_fee,
                    net_pnl,
                    net_pnl_percent: percent_of_collateral(net_pnl, position.collateral),
                }
            }
            None => {
                let fee = self.config.flat_fee_rate * position_size;
                let pnl = gross_pnl - fee;
                Valuation::Simple {
                    gross_pnl,
                    gross_pnl_percent,
                    fee,
                    pnl,
                    pnl_percent: percent_of_collateral(pnl, position.collateral),
                }
            }
        };

        Ok(Some(valuation))
    }

    /// Liquidation price for a position.
    ///
    /// An authoritative backend value passes through unchanged. Otherwise
    /// the fee-ignoring approximation: the price move that consumes the
    /// full collateral, `entry * (1 -/+ 1/leverage)` by direction.
    pub fn liquidation_price(&self, position: &Position) -> Result<f64, ValuationError> {
        if let Some(authoritative) = position.liquidation_price {
            return Ok(authoritative);
        }

        if position.leverage <= 0.0 {
            return Err(ValuationError::InvalidLeverage(position.leverage));
        }
        if position.entry_price <= 0.0 {
            return Err(ValuationError::InvalidEntryPrice(position.entry_price));
        }

        let unit_move = 1.0 / position.leverage;
        Ok(match position.direction {
            Direction::Long => position.entry_price * (1.0 - unit_move),
            Direction::Short => position.entry_price * (1.0 + unit_move),
        })
    }
}

/// Percentage of collateral, undefined (not NaN) when collateral is zero.
fn percent_of_collateral(value: f64, collateral: f64) -> Option<f64> {
    (collateral > 0.0).then(|| value / collateral * 100.0)
}
