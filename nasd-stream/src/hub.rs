//! Streaming hub (§4.5): one WebSocket endpoint per concern, subscription
//! control frames, cadence-driven or event-driven emission, fingerprint
//! dedup, and a bounded write queue with drop-oldest backpressure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use nasd_cache::SingleflightCache;
use nasd_core::envelope::Metadata;
use serde::{Deserialize, Serialize};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::channel::ChannelRegistry;
use crate::queue::ConnectionQueue;
use crate::subscription::{fingerprint, SubscriptionState};

const DEFAULT_QUEUE_CAPACITY: usize = 64;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlFrame {
    Subscribe {
        channel: String,
        #[serde(default)]
        params: serde_json::Value,
    },
    Unsubscribe {
        channel: String,
    },
    Ping,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutgoingControl<'a> {
    Subscribed { channel: &'a str },
    Unsubscribed { channel: &'a str },
    Pong,
    Error { message: String },
}

#[derive(Debug, Serialize)]
struct DataFrame<'a> {
    channel: &'a str,
    sequence: u64,
    data: serde_json::Value,
    metadata: Metadata,
}

/// Subscription manager delivering provider snapshots to WebSocket clients.
/// Cloned handles share the channel catalogue and snapshot cache; each
/// `serve()` call owns one connection's lifecycle independently.
#[derive(Clone)]
pub struct StreamHub {
    registry: ChannelRegistry,
    cache: Arc<SingleflightCache<String, Arc<serde_json::Value>>>,
    queue_capacity: usize,
    idle_timeout: Duration,
    version: String,
    next_connection_id: Arc<AtomicU64>,
    /// channel name -> connection id -> (subscription state, queue), for
    /// push-only channels fed externally via [`StreamHub::publish`].
    push_subscribers: Arc<DashMap<String, DashMap<u64, (Arc<SubscriptionState>, Arc<ConnectionQueue>)>>>,
    /// Invoked with the channel name whenever a connection's write queue
    /// drops a frame to stay within capacity — lets the daemon binary
    /// bridge the count into its own metrics registry without this crate
    /// depending on `prometheus` itself.
    on_frame_dropped: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl StreamHub {
    pub fn new(registry: ChannelRegistry) -> Self {
        Self {
            registry,
            cache: Arc::new(SingleflightCache::new()),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            version: "1".to_string(),
            next_connection_id: Arc::new(AtomicU64::new(1)),
            push_subscribers: Arc::new(DashMap::new()),
            on_frame_dropped: None,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_drop_callback(mut self, callback: Arc<dyn Fn(&str) + Send + Sync>) -> Self {
        self.on_frame_dropped = Some(callback);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Push a snapshot to every connection currently subscribed to a
    /// push-only channel. Intended to be called from an event-bus handler
    /// wired up in the daemon binary (container lifecycle changes, etc.).
    pub fn publish(&self, channel: &str, payload: serde_json::Value) {
        if let Some(subs) = self.push_subscribers.get(channel) {
            for entry in subs.iter() {
                let (state, queue) = entry.value();
                let frame = DataFrame {
                    channel,
                    sequence: state.next_sequence(),
                    data: payload.clone(),
                    metadata: Metadata::new(nasd_core::ids::new_correlation_id(), self.version.clone()),
                };
                if let Ok(text) = serde_json::to_string(&frame) {
                    if queue.push_data(Message::Text(text.into())) {
                        if let Some(cb) = &self.on_frame_dropped {
                            cb(channel);
                        }
                    }
                }
            }
        }
    }

    /// Drive one connection's full lifecycle: handshake is assumed already
    /// complete (the caller upgraded the HTTP request); this owns the
    /// session loop, emission scheduling, and shutdown.
    pub async fn serve(&self, socket: WebSocket) {
        self.serve_inner(socket, None).await
    }

    /// Same lifecycle as [`StreamHub::serve`], but auto-subscribes the
    /// connection to a single fixed channel before entering the control
    /// loop — backs the per-concern `/ws/system`, `/ws/docker`, `/ws/storage`
    /// aliases, which are thin wrappers over the unified `/ws` endpoint.
    pub async fn serve_fixed_channel(&self, socket: WebSocket, channel: &str) {
        self.serve_inner(socket, Some(channel.to_string())).await
    }

    async fn serve_inner(&self, socket: WebSocket, fixed_channel: Option<String>) {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::SeqCst);
        let queue = Arc::new(ConnectionQueue::new(self.queue_capacity));
        let connection_cancel = CancellationToken::new();
        let subscriptions: Arc<DashMap<String, (Arc<SubscriptionState>, CancellationToken)>> =
            Arc::new(DashMap::new());

        if let Some(channel) = fixed_channel {
            self.start_subscription(
                connection_id,
                channel,
                serde_json::json!({}),
                queue.clone(),
                &subscriptions,
                &connection_cancel,
            );
        }

        let (mut sink, mut stream) = socket.split();

        let writer_queue = queue.clone();
        let writer_cancel = connection_cancel.clone();
        let writer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    message = writer_queue.pop() => {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        loop {
            let next = tokio::time::timeout(self.idle_timeout, stream.next()).await;
            match next {
                Ok(Some(Ok(Message::Text(text)))) => {
                    self.handle_control_frame(
                        &text,
                        connection_id,
                        &queue,
                        &subscriptions,
                        &connection_cancel,
                    );
                }
                Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
                Ok(Some(Ok(_))) => continue,
                Ok(Some(Err(_))) => break,
                Err(_elapsed) => break,
            }
        }

        for entry in subscriptions.iter() {
            entry.value().1.cancel();
        }
        for channel_subs in self.push_subscribers.iter() {
            channel_subs.value().remove(&connection_id);
        }
        connection_cancel.cancel();
        let _ = writer.await;
    }

    fn handle_control_frame(
        &self,
        text: &str,
        connection_id: u64,
        queue: &Arc<ConnectionQueue>,
        subscriptions: &Arc<DashMap<String, (Arc<SubscriptionState>, CancellationToken)>>,
        connection_cancel: &CancellationToken,
    ) {
        let frame: ControlFrame = match serde_json::from_str(text) {
            Ok(f) => f,
            Err(e) => {
                let control = OutgoingControl::Error {
                    message: format!("malformed control frame: {e}"),
                };
                if let Ok(json) = serde_json::to_string(&control) {
                    queue.push_control(Message::Text(json.into()));
                }
                return;
            }
        };

        match frame {
            ControlFrame::Ping => {
                if let Ok(json) = serde_json::to_string(&OutgoingControl::Pong) {
                    queue.push_control(Message::Text(json.into()));
                }
            }
            ControlFrame::Subscribe { channel, params } => {
                self.start_subscription(
                    connection_id,
                    channel.clone(),
                    params,
                    queue.clone(),
                    subscriptions,
                    connection_cancel,
                );
                if let Ok(json) = serde_json::to_string(&OutgoingControl::Subscribed {
                    channel: &channel,
                }) {
                    queue.push_control(Message::Text(json.into()));
                }
            }
            ControlFrame::Unsubscribe { channel } => {
                if let Some((_, (_, token))) = subscriptions.remove(&channel) {
                    token.cancel();
                }
                if let Some(subs) = self.push_subscribers.get(&channel) {
                    subs.remove(&connection_id);
                }
                if let Ok(json) = serde_json::to_string(&OutgoingControl::Unsubscribed {
                    channel: &channel,
                }) {
                    queue.push_control(Message::Text(json.into()));
                }
            }
        }
    }

    fn start_subscription(
        &self,
        connection_id: u64,
        channel: String,
        params: serde_json::Value,
        queue: Arc<ConnectionQueue>,
        subscriptions: &Arc<DashMap<String, (Arc<SubscriptionState>, CancellationToken)>>,
        connection_cancel: &CancellationToken,
    ) {
        let Some((policy, snapshot_fn)) = self.registry.get(&channel) else {
            return;
        };
        let state = Arc::new(SubscriptionState::new(channel.clone(), params));
        let token = connection_cancel.child_token();
        subscriptions.insert(channel.clone(), (state.clone(), token.clone()));

        match policy.cadence {
            Some(cadence) => {
                let cache = self.cache.clone();
                let suppress = policy.suppress_duplicate_fingerprints;
                let channel_name = channel.clone();
                let version = self.version.clone();
                let on_frame_dropped = self.on_frame_dropped.clone();
                tokio::spawn(async move {
                    let mut ticker = interval(cadence);
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = ticker.tick() => {
                                let key = channel_name.clone();
                                let produce = || {
                                    let snapshot_fn = snapshot_fn.clone();
                                    async move {
                                        let value = snapshot_fn().await?;
                                        Ok::<_, nasd_core::AppError>(nasd_cache::Produced::new(
                                            Arc::new(value),
                                            cadence,
                                        ))
                                    }
                                };
                                let Ok(value) = cache.get(key, produce).await else { continue };
                                let serialized = serde_json::to_string(&*value).unwrap_or_default();
                                let fp = fingerprint(&serialized);
                                if suppress && !state.advance_fingerprint(fp) {
                                    continue;
                                }
                                if !suppress {
                                    state.advance_fingerprint(fp);
                                }
                                let frame = DataFrame {
                                    channel: &channel_name,
                                    sequence: state.next_sequence(),
                                    data: (*value).clone(),
                                    metadata: Metadata::new(nasd_core::ids::new_correlation_id(), version.clone()),
                                };
                                if let Ok(json) = serde_json::to_string(&frame) {
                                    if queue.push_data(Message::Text(json.into())) {
                                        if let Some(cb) = &on_frame_dropped {
                                            cb(&channel_name);
                                        }
                                    }
                                }
                            }
                        }
                    }
                });
            }
            None => {
                let entry = self
                    .push_subscribers
                    .entry(channel)
                    .or_insert_with(DashMap::new);
                entry.insert(connection_id, (state, queue));
            }
        }
    }
}
