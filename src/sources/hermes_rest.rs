use crate::error::Result;
use crate::types::{decode_price, FeedId, PriceSample, RawPrice};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// One parsed feed entry in the latest-price response.
#[derive(Debug, Deserialize)]
struct ParsedFeed {
    id: String,
    #[serde(default)]
    price: Option<RawPrice>,
}

#[derive(Debug, Deserialize)]
struct LatestPriceResponse {
    #[serde(default)]
    parsed: Vec<ParsedFeed>,
}

/// One-shot REST client against the oracle's latest-price endpoint.
///
/// Used to seed the price board at startup so positions don't sit in the
/// pending state until the stream delivers its first tick. Same decoder and
/// id normalization as the stream path.
#[derive(Clone)]
pub struct HermesRest {
    client: Client,
    base_url: String,
}

impl HermesRest {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch the latest known price for each feed. Feeds that fail to
    /// decode are skipped with a warning, never an error.
    pub async fn latest_prices(&self, feed_ids: &[FeedId]) -> Result<Vec<PriceSample>> {
        if feed_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: Vec<(&str, String)> = feed_ids
            .iter()
            .map(|id| ("ids[]", id.as_str().to_string()))
            .collect();
        query.push(("encoding", "hex".to_string()));
        query.push(("parsed", "true".to_string()));

        let url = format!("{}/v2/updates/price/latest", self.base_url);
        let response: LatestPriceResponse = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut samples = Vec::new();
        for feed in response.parsed {
            let feed_id = FeedId::new(&feed.id);
            match feed.price.as_ref().and_then(decode_price) {
                Some(price) if price > 0.0 => {
                    debug!("seeded price for feed {}: {}", feed_id, price);
                    samples.push(PriceSample::now(feed_id, price));
                }
                _ => {
                    warn!("latest-price entry for feed {} did not decode", feed_id);
                }
            }
        }
        Ok(samples)
    }
}
