use crate::types::{FeedId, PairDirectory, PendingOrder, Position};
use std::collections::{HashMap, HashSet};

/// Outbound reconciliation result: which feed ids to subscribe and which to
/// unsubscribe, each batched into a single message by the caller.
#[derive(Debug, Default, PartialEq)]
pub struct SubscriptionDelta {
    pub subscribe: Vec<FeedId>,
    pub unsubscribe: Vec<FeedId>,
}

impl SubscriptionDelta {
    pub fn is_empty(&self) -> bool {
        self.subscribe.is_empty() && self.unsubscribe.is_empty()
    }
}

/// The live subscription set: feed id -> consumer pair indices.
///
/// Many pairs can share one feed; exactly one outbound subscription exists
/// per distinct feed id regardless of how many consumers reference it. An
/// identifier leaves the set only when its last consumer does.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    consumers: HashMap<FeedId, HashSet<u32>>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile against the full wanted mapping, returning the deltas the
    /// connection must send. Feeds already subscribed produce no traffic;
    /// consumer churn within a still-wanted feed produces no traffic.
    pub fn reconcile(&mut self, wanted: HashMap<FeedId, HashSet<u32>>) -> SubscriptionDelta {
        let mut delta = SubscriptionDelta::default();

        for feed_id in self.consumers.keys() {
            if !wanted.contains_key(feed_id) {
                delta.unsubscribe.push(feed_id.clone());
            }
        }

        for feed_id in wanted.keys() {
            if !self.consumers.contains_key(feed_id) {
                delta.subscribe.push(feed_id.clone());
            }
        }

        self.consumers = wanted;
        delta
    }

    /// Consumers mapped to a feed, for inbound fan-out.
    pub fn consumers_of(&self, feed_id: &FeedId) -> Vec<u32> {
        self.consumers
            .get(feed_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every feed id currently active, for full resubscription on reopen.
    pub fn active_feeds(&self) -> Vec<FeedId> {
        self.consumers.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }
}

/// Derive the wanted feed mapping from the current position and order
/// lists. Pending orders count as consumers too: an order on an otherwise
/// unreferenced pair keeps its feed subscribed. Pairs unknown to the
/// directory contribute nothing.
pub fn required_feeds(
    positions: &[Position],
    orders: &[PendingOrder],
    directory: &PairDirectory,
) -> HashMap<FeedId, HashSet<u32>> {
    let mut wanted: HashMap<FeedId, HashSet<u32>> = HashMap::new();

    let pair_indices = positions
        .iter()
        .map(|p| p.pair_index)
        .chain(orders.iter().map(|o| o.pair_index));

    for pair_index in pair_indices {
        if let Some(feed_id) = directory.feed_id(pair_index) {
            wanted.entry(feed_id).or_default().insert(pair_index);
        }
    }

    wanted
}
