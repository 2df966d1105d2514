use crate::types::{FeedId, PriceSample};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Latest-price board shared between the feed source and valuation.
///
/// Keeps exactly one sample per feed (last write wins, no history) plus a
/// per-pair mirror maintained by the fan-out step, so valuation can resolve
/// a pair index without re-walking the subscription mapping. Samples are
/// broadcast to any registered consumer on every accepted update.
pub struct PriceBoard {
    /// Most recent sample per feed id.
    by_feed: DashMap<FeedId, PriceSample>,
    /// Most recent unit price per consumer pair index.
    by_pair: DashMap<u32, f64>,
    /// Prior daily close per pair, for the 24h change display.
    daily_close: DashMap<u32, f64>,
    tx: broadcast::Sender<PriceSample>,
}

impl PriceBoard {
    pub fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(1024);
        Arc::new(Self {
            by_feed: DashMap::new(),
            by_pair: DashMap::new(),
            daily_close: DashMap::new(),
            tx,
        })
    }

    /// Subscribe to decoded price updates.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<PriceSample> {
        self.tx.subscribe()
    }

    /// Record a decoded sample and fan it out to every consumer pair index
    /// mapped to its feed. Rejects non-positive or non-finite prices; a bad
    /// sample must never reach the board.
    pub fn publish(&self, sample: PriceSample, pair_indices: &[u32]) {
        if !sample.unit_price.is_finite() || sample.unit_price <= 0.0 {
            return;
        }

        for pair_index in pair_indices {
            self.by_pair.insert(*pair_index, sample.unit_price);
        }
        self.by_feed.insert(sample.feed_id.clone(), sample.clone());

        // Ignore lagging/absent receivers.
        let _ = self.tx.send(sample);
    }

    /// Latest unit price for a feed, if any sample has arrived.
    pub fn price_of_feed(&self, feed_id: &FeedId) -> Option<f64> {
        self.by_feed.get(feed_id).map(|s| s.unit_price)
    }

    /// Latest unit price for a consumer pair index.
    pub fn price_of_pair(&self, pair_index: u32) -> Option<f64> {
        self.by_pair.get(&pair_index).map(|p| *p)
    }

    /// Store the prior daily close for a pair.
    pub fn set_daily_close(&self, pair_index: u32, close: f64) {
        if close.is_finite() && close > 0.0 {
            self.daily_close.insert(pair_index, close);
        }
    }

    /// 24h change percentage for a pair; `None` until both a live price and
    /// a usable prior close exist. Display-only, not used in valuation.
    pub fn change_24h(&self, pair_index: u32) -> Option<f64> {
        let current = self.price_of_pair(pair_index)?;
        let close = self.daily_close.get(&pair_index).map(|c| *c)?;
        Some((current - close) / close * 100.0)
    }

    /// Number of feeds with at least one sample.
    pub fn feed_count(&self) -> usize {
        self.by_feed.len()
    }
}
