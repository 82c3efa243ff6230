//! Market data pipeline
//!
//! Samples the live book into bounded-depth snapshots, encodes them as
//! MessagePack frames, and fans them out to WebSocket subscribers with a
//! latest-wins mailbox per connection.
//!
//! # Architecture
//!
//! ```text
//! MarketGenerator ──steps──▶ OrderBook
//!        │ (single writer task)
//!    Sampler ──▶ encode ──▶ watch slot (latest wins)
//!                               │
//!              ┌────────────────┼────────────────┐
//!         subscriber task  subscriber task  subscriber task
//!              │                │                │
//!           /ws socket       /ws socket      /ws socket
//! ```
//!
//! A slow subscriber only skips frames; it never delays the producer or
//! any other subscriber.

pub mod broadcast;
pub mod error;
pub mod metrics;
pub mod snapshot;
pub mod wire;

pub use broadcast::{feed_app, BroadcastConfig, FeedHandle};
pub use error::FeedError;
pub use snapshot::{DepthSnapshot, SnapshotSampler};
