use crate::services::{PriceBoard, SubscriptionSet};
use crate::types::{decode_price, FeedId, PriceSample, StreamMessage, SubscribeMessage};
use futures_util::{SinkExt, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

const RECONNECT_DELAY_SECS: u64 = 5;

/// Why a connection attempt ended.
enum ConnectionEnd {
    /// `close()` was called; stop for good.
    Shutdown,
    /// The server dropped us; retry after the flat delay.
    Dropped,
}

/// Streaming price-feed client.
///
/// Owns the single connection for one view's worth of subscriptions and the
/// mapping from feed ids to consumer pair indices. Decoded samples go to
/// the shared [`PriceBoard`], which fans them out to consumers. The
/// connection is lazy: nothing is opened until the first non-empty feed
/// set, and `close()` tears down both the socket and any pending reconnect.
#[derive(Clone)]
pub struct HermesWs {
    url: String,
    board: Arc<PriceBoard>,
    subscriptions: Arc<RwLock<SubscriptionSet>>,
    pending_subscribe: Arc<RwLock<Vec<FeedId>>>,
    pending_unsubscribe: Arc<RwLock<Vec<FeedId>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    started: Arc<AtomicBool>,
}

impl HermesWs {
    pub fn new(url: impl Into<String>, board: Arc<PriceBoard>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            url: url.into(),
            board,
            subscriptions: Arc::new(RwLock::new(SubscriptionSet::new())),
            pending_subscribe: Arc::new(RwLock::new(Vec::new())),
            pending_unsubscribe: Arc::new(RwLock::new(Vec::new())),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reconcile the live subscription set against the full wanted mapping.
    ///
    /// Newly required feeds are queued for one batched subscribe; feeds
    /// whose last consumer disappeared are queued for one batched
    /// unsubscribe. The first non-empty set starts the connection task.
    pub async fn set_active_feeds(&self, wanted: HashMap<FeedId, HashSet<u32>>) {
        let delta = self.subscriptions.write().await.reconcile(wanted);

        if !delta.subscribe.is_empty() {
            self.pending_subscribe.write().await.extend(delta.subscribe);
        }
        if !delta.unsubscribe.is_empty() {
            self.pending_unsubscribe
                .write()
                .await
                .extend(delta.unsubscribe);
        }

        if !self.subscriptions.read().await.is_empty() {
            self.spawn_connection();
        }
    }

    /// Number of distinct feeds currently subscribed.
    pub async fn active_feed_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Tear down: close the socket and cancel any pending reconnect.
    /// Idempotent; the manager cannot be restarted afterwards.
    pub fn close(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    fn spawn_connection(&self) {
        if *self.shutdown_rx.borrow() {
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let client = self.clone();
        tokio::spawn(async move {
            client.run().await;
        });
    }

    /// Connection loop: connect, stream, and on drop retry after a flat
    /// delay. Recovery after a drop comes from resubscribing the full
    /// active set on reopen, not from the retry schedule.
    async fn run(&self) {
        let mut shutdown = self.shutdown_rx.clone();
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_connection(&mut shutdown).await {
                Ok(ConnectionEnd::Shutdown) => break,
                Ok(ConnectionEnd::Dropped) => {
                    warn!(
                        "price stream disconnected, reconnecting in {}s",
                        RECONNECT_DELAY_SECS
                    );
                }
                Err(e) => {
                    error!(
                        "price stream error: {}, reconnecting in {}s",
                        e, RECONNECT_DELAY_SECS
                    );
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(RECONNECT_DELAY_SECS)) => {}
                _ = shutdown.changed() => break,
            }
        }
        debug!("price stream task stopped");
    }

    async fn run_connection(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> anyhow::Result<ConnectionEnd> {
        info!("connecting to price stream at {}", self.url);
        let (ws_stream, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();
        info!("connected to price stream");

        // The server holds no state across reconnects: resubscribe the
        // entire active set in one batch, superseding any queued deltas.
        // Queues are cleared before the snapshot; a reconcile racing this
        // window at worst duplicates a subscribe.
        self.pending_subscribe.write().await.clear();
        self.pending_unsubscribe.write().await.clear();
        let active = self.subscriptions.read().await.active_feeds();
        if !active.is_empty() {
            let msg = SubscribeMessage::subscribe(active);
            write
                .send(Message::Text(serde_json::to_string(&msg)?))
                .await?;
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(ConnectionEnd::Shutdown);
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_message(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("price stream closed by server");
                            return Ok(ConnectionEnd::Dropped);
                        }
                        Some(Err(e)) => {
                            error!("price stream read error: {}", e);
                            return Ok(ConnectionEnd::Dropped);
                        }
                        None => {
                            return Ok(ConnectionEnd::Dropped);
                        }
                        _ => {}
                    }
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_millis(100)) => {
                    let to_subscribe: Vec<FeedId> = {
                        let mut pending = self.pending_subscribe.write().await;
                        pending.drain(..).collect()
                    };
                    if !to_subscribe.is_empty() {
                        let msg = SubscribeMessage::subscribe(to_subscribe);
                        if let Ok(json) = serde_json::to_string(&msg) {
                            let _ = write.send(Message::Text(json)).await;
                        }
                    }

                    let to_unsubscribe: Vec<FeedId> = {
                        let mut pending = self.pending_unsubscribe.write().await;
                        pending.drain(..).collect()
                    };
                    if !to_unsubscribe.is_empty() {
                        let msg = SubscribeMessage::unsubscribe(to_unsubscribe);
                        if let Ok(json) = serde_json::to_string(&msg) {
                            let _ = write.send(Message::Text(json)).await;
                        }
                    }
                }
            }
        }
    }

    /// Decode one inbound message and publish the sample. Malformed
    /// messages and samples for feeds we no longer consume are dropped;
    /// neither is ever fatal to the stream.
    async fn handle_message(&self, text: &str) {
        let msg: StreamMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(e) => {
                debug!("dropping malformed stream message: {}", e);
                return;
            }
        };

        if msg.msg_type != "price_update" {
            return;
        }

        let payload = match msg.price_feed {
            Some(p) => p,
            None => {
                debug!("price_update without price_feed payload");
                return;
            }
        };

        let feed_id = FeedId::new(&payload.id);

        let unit_price = match payload.price.as_ref().and_then(decode_price) {
            Some(p) if p > 0.0 => p,
            _ => {
                debug!("dropping undecodable sample for feed {}", feed_id);
                return;
            }
        };

        let consumers = self.subscriptions.read().await.consumers_of(&feed_id);
        if consumers.is_empty() {
            debug!("sample for unsubscribed feed {}", feed_id);
            return;
        }

        debug!("price update: {} = {}", feed_id, unit_price);
        self.board
            .publish(PriceSample::now(feed_id, unit_price), &consumers);
    }
}
