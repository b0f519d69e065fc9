//! # NodeDoc Sync
//!
//! Live synchronization: a server-push event stream, channel subscriptions,
//! and the engine that turns proposal frames into document revisions.
//!
//! ## Components
//!
//! - [`EventStreamClient`]: one SSE connection with observer lists
//! - [`ChannelSubscriptionRegistry`]: idempotent subscribe/unsubscribe
//! - [`FrameRouter`]: envelope decoding and channel filtering
//! - [`SyncEngine`]: router → processor → revision store, publishes [`SyncEvent`]s
//! - [`SyncSession`]: owns all of the above for one credential

pub mod client;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod registry;
pub mod router;
pub mod session;
pub mod sse;

pub use client::{ConnectionState, EventStreamClient, ObserverId};
pub use config::{SyncConfig, DEFAULT_CONFIG_NAME};
pub use credentials::{CredentialSource, EnvCredential, StaticCredential};
pub use engine::{SyncEngine, SyncEvent};
pub use error::{ConfigError, LoadError, SubscriptionError, TransportError};
pub use registry::{
    ChannelSubscriptionRegistry, HttpSubscriptionTransport, SubscriptionOutcome,
    SubscriptionTransport,
};
pub use router::{route, Frame, FrameRouter, Route};
pub use session::{CredentialChange, RefreshReport, RunExit, StartReport, SyncSession};
pub use sse::{SseFrame, SseParser};
