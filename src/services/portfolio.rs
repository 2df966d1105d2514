use crate::services::ValuationEngine;
use crate::types::{PortfolioTotals, Position};
use tracing::warn;

/// Fold valuation results over every open position.
///
/// A pure recomputation, no incremental state: the caller invokes it on
/// every price tick or position-list change. Positions without a price yet
/// contribute zero to net PnL (but still count, and still contribute their
/// collateral); positions that fail validation are logged and skipped the
/// same way, so totals stay finite under partial data.
pub fn aggregate<F>(
    engine: &ValuationEngine,
    positions: &[Position],
    price_lookup: F,
) -> PortfolioTotals
where
    F: Fn(u32) -> Option<f64>,
{
    let mut totals = PortfolioTotals::empty();
    totals.open_positions = positions.len();

    for position in positions {
        totals.total_collateral += position.collateral;

        match engine.valuate(position, &price_lookup, None) {
            Ok(Some(valuation)) => totals.total_net_pnl += valuation.net_pnl(),
            Ok(None) => totals.pending += 1,
            Err(e) => {
                warn!(
                    "skipping position {}:{} in totals: {}",
                    position.pair_index, position.trade_index, e
                );
            }
        }
    }

    totals
}
