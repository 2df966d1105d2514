use crate::error::Result;
use crate::types::{FeedId, Pair, PairDirectory, PendingOrder, Position, RawOrderRecord, RawTradeRecord};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Pair metadata as served by the backend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPairRecord {
    index: u32,
    name: String,
    feed: RawFeedRef,
    #[serde(default)]
    leverages: Option<RawLeverages>,
    #[serde(default)]
    zero_fee: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeedRef {
    feed_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLeverages {
    min_leverage: f64,
    max_leverage: f64,
}

/// The position/order list for one trader.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeList {
    #[serde(default)]
    pub positions: Vec<RawTradeRecord>,
    #[serde(default)]
    pub limit_orders: Vec<RawOrderRecord>,
}

/// A prior daily close for one pair.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastPriceEntry {
    pair_index: u32,
    /// Prior daily close price.
    c: f64,
}

impl TradeList {
    /// Validate and descale the open positions. Records that fail
    /// validation are logged and dropped; one corrupt record never poisons
    /// the list.
    pub fn open_positions(&self, directory: &PairDirectory) -> Vec<Position> {
        self.positions
            .iter()
            .filter_map(|raw| {
                let bounds = directory.leverage_bounds(raw.pair_index);
                match Position::from_raw(raw, bounds) {
                    Ok(position) => Some(position),
                    Err(e) => {
                        warn!(
                            "dropping position record {}:{}: {}",
                            raw.pair_index, raw.index, e
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// Descale the pending limit orders.
    pub fn pending_orders(&self) -> Vec<PendingOrder> {
        self.limit_orders.iter().map(PendingOrder::from_raw).collect()
    }
}

/// REST client for the backend that serves pair metadata, the raw
/// position/order list, and daily closes. The backend builds and signs
/// transactions too, but none of that surface is consumed here.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    trader_address: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, trader_address: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            trader_address: trader_address.into(),
        }
    }

    /// Fetch the pair catalog. Pairs without usable leverage bounds default
    /// to [1, 75].
    pub async fn pairs(&self) -> Result<Vec<Pair>> {
        let url = format!("{}/pairs", self.base_url);
        let raw: Vec<RawPairRecord> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let pairs = raw
            .into_iter()
            .map(|p| {
                let (min_leverage, max_leverage) = p
                    .leverages
                    .map(|l| (l.min_leverage, l.max_leverage))
                    .unwrap_or((1.0, 75.0));
                Pair {
                    index: p.index,
                    name: p.name,
                    feed_id: FeedId::new(&p.feed.feed_id),
                    min_leverage,
                    max_leverage,
                    zero_fee: p.zero_fee,
                }
            })
            .collect();
        Ok(pairs)
    }

    /// Fetch the trader's open positions and pending limit orders.
    pub async fn trades(&self) -> Result<TradeList> {
        let url = format!("{}/trades", self.base_url);
        let list: TradeList = self
            .client
            .get(&url)
            .query(&[("trader_address", self.trader_address.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            "trade list: {} positions, {} pending orders",
            list.positions.len(),
            list.limit_orders.len()
        );
        Ok(list)
    }

    /// Fetch prior daily closes for all pairs, keyed by pair index. Used
    /// only for the 24h change display.
    pub async fn daily_closes(&self) -> Result<HashMap<u32, f64>> {
        let url = format!("{}/api/price-feeds/last-price", self.base_url);
        let entries: Vec<LastPriceEntry> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(entries
            .into_iter()
            .filter(|e| e.c.is_finite() && e.c > 0.0)
            .map(|e| (e.pair_index, e.c))
            .collect())
    }
}
