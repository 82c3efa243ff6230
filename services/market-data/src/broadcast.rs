//! WebSocket snapshot broadcaster
//!
//! The producer task owns the generator and the book (single writer),
//! paces itself at the target frame rate, and publishes each encoded
//! snapshot into a `watch` slot, the latest-wins mailbox. Every subscriber
//! gets its own task consuming that slot, so one slow socket can only skip
//! frames, never delay anyone else.
//!
//! Admission beyond the subscriber cap is rejected at the handshake, before
//! the upgrade.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use simulation::MarketGenerator;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::metrics::FeedMetrics;
use crate::snapshot::SnapshotSampler;
use crate::wire;

/// Broadcaster configuration.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastConfig {
    /// Snapshot frame rate
    pub target_hz: u16,
    /// Depth cap per snapshot side
    pub depth: u16,
    /// Admission cap; connections beyond it are rejected at handshake
    pub max_subscribers: u16,
    /// Generator ticks advanced between consecutive frames
    pub steps_per_frame: u32,
    /// Deadline for draining in-flight writes at shutdown
    pub shutdown_grace: Duration,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            target_hz: 30,
            depth: 50,
            max_subscribers: 64,
            steps_per_frame: 16,
            shutdown_grace: Duration::from_secs(1),
        }
    }
}

/// One encoded snapshot in flight.
#[derive(Debug, Clone)]
pub struct Frame {
    pub seq: u64,
    pub bytes: Bytes,
}

/// Tracks connected subscribers against the admission cap.
pub struct SubscriberRegistry {
    clients: DashMap<u64, ()>,
    next_id: AtomicU64,
    cap: u16,
}

impl SubscriberRegistry {
    pub fn new(cap: u16) -> Self {
        Self {
            clients: DashMap::new(),
            next_id: AtomicU64::new(1),
            cap,
        }
    }

    /// Admit a subscriber, or None when the cap is reached.
    pub fn try_register(&self) -> Option<u64> {
        if self.clients.len() >= usize::from(self.cap) {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients.insert(id, ());
        Some(id)
    }

    pub fn release(&self, id: u64) {
        self.clients.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn cap(&self) -> u16 {
        self.cap
    }
}

/// Shared state behind the axum router.
#[derive(Clone)]
pub struct FeedState {
    frames: watch::Receiver<Option<Frame>>,
    shutdown: watch::Receiver<bool>,
    registry: Arc<SubscriberRegistry>,
    metrics: Arc<FeedMetrics>,
    grace: Duration,
}

/// Handle to the running feed: producer task plus shutdown signal.
pub struct FeedHandle {
    producer: JoinHandle<()>,
    shutdown: Arc<watch::Sender<bool>>,
    pub metrics: Arc<FeedMetrics>,
}

impl FeedHandle {
    /// A cloneable trigger for signalling shutdown from another task.
    pub fn trigger(&self) -> Arc<watch::Sender<bool>> {
        Arc::clone(&self.shutdown)
    }

    /// Signal shutdown and wait for the producer to finish its tick.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.producer.await;
    }
}

/// Build the feed: spawns the producer task and returns the router plus a
/// handle for shutdown.
pub fn feed_app(generator: MarketGenerator, config: BroadcastConfig) -> (Router, FeedHandle) {
    let (frame_tx, frame_rx) = watch::channel(None);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = Arc::new(FeedMetrics::new());
    let registry = Arc::new(SubscriberRegistry::new(config.max_subscribers));

    let producer = spawn_producer(
        generator,
        config,
        frame_tx,
        Arc::clone(&metrics),
        shutdown_rx.clone(),
    );

    let state = FeedState {
        frames: frame_rx,
        shutdown: shutdown_rx,
        registry,
        metrics: Arc::clone(&metrics),
        grace: config.shutdown_grace,
    };

    let router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let handle = FeedHandle {
        producer,
        shutdown: Arc::new(shutdown_tx),
        metrics,
    };
    (router, handle)
}

/// Writer task: advance the generator, sample, encode, publish.
///
/// The interval skips missed ticks instead of bursting, so the published
/// frame is always built from the latest book state.
fn spawn_producer(
    mut generator: MarketGenerator,
    config: BroadcastConfig,
    frames: watch::Sender<Option<Frame>>,
    metrics: Arc<FeedMetrics>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sampler = SnapshotSampler::new(usize::from(config.depth), generator.book().grid());
        let period = Duration::from_micros(1_000_000 / u64::from(config.target_hz.max(1)));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            target_hz = config.target_hz,
            depth = config.depth,
            "snapshot producer started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    for _ in 0..config.steps_per_frame {
                        generator.step();
                    }
                    let snapshot = sampler.sample(generator.book(), generator.now());
                    FeedMetrics::incr(&metrics.snapshots_built);

                    match wire::encode_snapshot(&snapshot).map_err(FeedError::from) {
                        Ok(bytes) => {
                            let _ = frames.send(Some(Frame {
                                seq: snapshot.seq,
                                bytes: Bytes::from(bytes),
                            }));
                        }
                        Err(error) => warn!(%error, seq = snapshot.seq, "snapshot encode failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(ticks = generator.ticks_run(), "producer shutting down");
                        break;
                    }
                }
            }
        }
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Upgrade handler: admission check happens before the upgrade.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<FeedState>) -> Response {
    let Some(id) = state.registry.try_register() else {
        FeedMetrics::incr(&state.metrics.subscribers_rejected);
        warn!(connected = state.registry.len(), "subscriber rejected at handshake");
        return FeedError::SubscriberLimit(state.registry.cap()).into_response();
    };

    ws.on_upgrade(move |socket| handle_subscriber(socket, state, id))
}

/// Per-subscriber task: consume the latest-wins slot, write frames,
/// account for skipped sequences, drop the connection on send failure.
async fn handle_subscriber(socket: WebSocket, state: FeedState, id: u64) {
    FeedMetrics::incr(&state.metrics.subscribers_connected);
    debug!(subscriber = id, "subscriber connected");

    let (mut sink, mut stream) = socket.split();
    let mut frames = state.frames.clone();
    let mut shutdown = state.shutdown.clone();
    let mut last_seq: Option<u64> = None;
    let mut skipped: u64 = 0;

    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    break; // producer gone
                }
                let frame = frames.borrow_and_update().clone();
                let Some(frame) = frame else { continue };

                if let Some(last) = last_seq {
                    let gap = frame.seq.saturating_sub(last + 1);
                    if gap > 0 {
                        skipped += gap;
                        FeedMetrics::add(&state.metrics.frames_dropped, gap);
                        debug!(subscriber = id, gap, "slot overwritten before consume");
                    }
                }
                last_seq = Some(frame.seq);

                if send_with_retry(&mut sink, &frame).await.is_err() {
                    let error =
                        FeedError::SubscriberUnhealthy(format!("send failed after retry (id {id})"));
                    warn!(%error, "dropping subscriber");
                    FeedMetrics::incr(&state.metrics.subscribers_dropped);
                    break;
                }
                FeedMetrics::incr(&state.metrics.frames_sent);
            }
            msg = stream.next() => {
                match msg {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    // The server never reads client payloads; ignore them
                    Some(Ok(_)) => {}
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    let _ = tokio::time::timeout(state.grace, sink.send(Message::Close(None))).await;
                    break;
                }
            }
        }
    }

    state.registry.release(id);
    debug!(subscriber = id, skipped, "subscriber disconnected");
}

/// One write attempt plus one retry before the subscriber is declared
/// unhealthy.
async fn send_with_retry(
    sink: &mut (impl SinkExt<Message> + Unpin),
    frame: &Frame,
) -> Result<(), ()> {
    if sink.send(Message::Binary(frame.bytes.to_vec())).await.is_ok() {
        return Ok(());
    }
    sink.send(Message::Binary(frame.bytes.to_vec()))
        .await
        .map_err(|_| ())
}
