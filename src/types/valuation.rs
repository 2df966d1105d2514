use serde::Serialize;

/// Result of valuing one position at a price.
///
/// Fee-free instruments get the `Simple` shape; instruments with a fee
/// schedule get the `FeeAdjusted` breakdown. The tag is part of the wire
/// shape so downstream consumers pick the right breakdown to display.
///
/// Percentage fields are `None` when collateral is zero; totals must never
/// carry `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Valuation {
    #[serde(rename_all = "camelCase")]
    Simple {
        gross_pnl: f64,
        gross_pnl_percent: Option<f64>,
        fee: f64,
        pnl: f64,
        pnl_percent: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    FeeAdjusted {
        gross_pnl: f64,
        gross_pnl_percent: Option<f64>,
        closing_fee: f64,
        rollover_fee: f64,
        net_pnl: f64,
        net_pnl_percent: Option<f64>,
    },
}

impl Valuation {
    /// Profit/loss after fees, whichever variant.
    pub fn net_pnl(&self) -> f64 {
        match *self {
            Valuation::Simple { pnl, .. } => pnl,
            Valuation::FeeAdjusted { net_pnl, .. } => net_pnl,
        }
    }

    /// Net PnL as a percentage of collateral, when defined.
    pub fn net_pnl_percent(&self) -> Option<f64> {
        match *self {
            Valuation::Simple { pnl_percent, .. } => pnl_percent,
            Valuation::FeeAdjusted {
                net_pnl_percent, ..
            } => net_pnl_percent,
        }
    }

    /// Price-movement-only PnL before fees.
    pub fn gross_pnl(&self) -> f64 {
        match *self {
            Valuation::Simple { gross_pnl, .. } => gross_pnl,
            Valuation::FeeAdjusted { gross_pnl, .. } => gross_pnl,
        }
    }
}

/// Portfolio-level aggregates over every open position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    /// Sum of collateral across all open positions.
    pub total_collateral: f64,
    /// Sum of net PnL across positions with a computable valuation.
    pub total_net_pnl: f64,
    /// Count of open positions, including pending ones.
    pub open_positions: usize,
    /// Positions currently awaiting a first price.
    pub pending: usize,
}

impl PortfolioTotals {
    pub fn empty() -> Self {
        Self {
            total_collateral: 0.0,
            total_net_pnl: 0.0,
            open_positions: 0,
            pending: 0,
        }
    }
}
