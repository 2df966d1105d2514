use anyhow::Context;
use perpwatch::config::Config;
use perpwatch::services::{self, required_feeds, EngineConfig, PriceBoard, ValuationEngine};
use perpwatch::sources::{BackendClient, HermesRest, HermesWs};
use perpwatch::types::PairDirectory;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "perpwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let trader_address = config
        .trader_address
        .clone()
        .context("TRADER_ADDRESS must be set")?;
    info!("Starting perpwatch for trader {}", trader_address);

    let backend = BackendClient::new(config.backend_api_url.clone(), trader_address);
    let directory = Arc::new(PairDirectory::new(backend.pairs().await?));
    info!("loaded {} pairs", directory.len());

    let board = PriceBoard::new();
    let feed = HermesWs::new(config.hermes_ws_url.clone(), board.clone());
    let engine = ValuationEngine::new(EngineConfig {
        flat_fee_rate: config.flat_fee_rate,
    });

    // Daily closes drive the 24h change display only; fine to start without.
    match backend.daily_closes().await {
        Ok(closes) => {
            for (pair_index, close) in closes {
                board.set_daily_close(pair_index, close);
            }
        }
        Err(e) => warn!("could not fetch daily closes: {}", e),
    }

    let trade_list = backend.trades().await?;
    let mut positions = trade_list.open_positions(&directory);
    let mut orders = trade_list.pending_orders();
    let wanted = required_feeds(&positions, &orders, &directory);

    // Seed the board over REST so positions don't sit pending until the
    // stream's first tick.
    let seed_ids: Vec<_> = wanted.keys().cloned().collect();
    let rest = HermesRest::new(config.hermes_api_url.clone());
    match rest.latest_prices(&seed_ids).await {
        Ok(samples) => {
            for sample in samples {
                let consumers: Vec<u32> = wanted
                    .get(&sample.feed_id)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default();
                board.publish(sample, &consumers);
            }
        }
        Err(e) => warn!("price seed failed: {}", e),
    }

    feed.set_active_feeds(wanted).await;

    let mut price_rx = board.subscribe_updates();
    let mut poll = tokio::time::interval(tokio::time::Duration::from_secs(
        config.poll_interval_secs,
    ));
    poll.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            _ = poll.tick() => {
                match backend.trades().await {
                    Ok(list) => {
                        positions = list.open_positions(&directory);
                        orders = list.pending_orders();
                        feed.set_active_feeds(required_feeds(&positions, &orders, &directory)).await;
                    }
                    // Keep the previous snapshot; the backend will come back.
                    Err(e) => warn!("trade list poll failed: {}", e),
                }

                let totals = services::aggregate(&engine, &positions, |idx| board.price_of_pair(idx));
                info!(
                    "portfolio: {} positions ({} pending), collateral ${:.2}, net PnL ${:+.2}",
                    totals.open_positions, totals.pending,
                    totals.total_collateral, totals.total_net_pnl
                );

                for position in &positions {
                    if let Some(price) = board.price_of_pair(position.pair_index) {
                        if let Some(change) = board.change_24h(position.pair_index) {
                            debug!(
                                "{} at {} ({:+.2}% 24h)",
                                directory.name(position.pair_index).unwrap_or_default(),
                                price, change
                            );
                        }
                        if position.breached_liquidation(price) {
                            warn!(
                                "position {}:{} past liquidation level at {}",
                                position.pair_index, position.trade_index, price
                            );
                        }
                    }
                }
            }
            update = price_rx.recv() => {
                match update {
                    Ok(sample) => {
                        let totals = services::aggregate(&engine, &positions, |idx| board.price_of_pair(idx));
                        debug!(
                            "tick {} = {}: net PnL ${:+.2}",
                            sample.feed_id, sample.unit_price, totals.total_net_pnl
                        );
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!("price receiver lagged by {} updates", n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    feed.close();
    Ok(())
}
