use crate::types::FeedId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Metadata for one tradable pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    /// Pair index as used by the position list feed.
    pub index: u32,
    /// Display name, e.g. "ETH/USD".
    pub name: String,
    /// Oracle feed this pair prices from. Several pairs may share one feed.
    pub feed_id: FeedId,
    /// Minimum allowed leverage.
    pub min_leverage: f64,
    /// Maximum allowed leverage.
    pub max_leverage: f64,
    /// Whether this instrument carries closing/rollover fees.
    #[serde(default)]
    pub zero_fee: bool,
}

/// Lookup table from pair index to pair metadata.
///
/// Built once from the backend's pair list; read-only afterwards. The
/// directory is the single place pair indices are resolved to feed ids, so
/// the feed set derived from a position list always uses canonical ids.
#[derive(Debug, Default)]
pub struct PairDirectory {
    pairs: DashMap<u32, Pair>,
}

impl PairDirectory {
    pub fn new(pairs: Vec<Pair>) -> Self {
        let map = DashMap::new();
        for pair in pairs {
            map.insert(pair.index, pair);
        }
        Self { pairs: map }
    }

    pub fn get(&self, index: u32) -> Option<Pair> {
        self.pairs.get(&index).map(|p| p.clone())
    }

    pub fn feed_id(&self, index: u32) -> Option<FeedId> {
        self.pairs.get(&index).map(|p| p.feed_id.clone())
    }

    pub fn name(&self, index: u32) -> Option<String> {
        self.pairs.get(&index).map(|p| p.name.clone())
    }

    /// Leverage bounds for a pair, if known.
    pub fn leverage_bounds(&self, index: u32) -> Option<(f64, f64)> {
        self.pairs
            .get(&index)
            .map(|p| (p.min_leverage, p.max_leverage))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
