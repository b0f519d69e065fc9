//! # Sync Session
//!
//! The authenticated-session object. It owns the one stream connection and
//! the subscription registry, and tears both down in `shutdown`.
//!
//! ```rust,ignore
//! let session = SyncSession::new(config, Arc::new(EnvCredential::default()))?;
//! session.load_file("doc-1", Path::new("notes.json"))?;
//! let events = session.events();
//! session.start().await;
//!
//! // Runs until Ctrl-C or a transport error, then shuts the session down
//! let exit = session
//!     .run(events, |event| {
//!         println!("{:?}", event);
//!         Ok::<_, Infallible>(())
//!     })
//!     .await;
//! ```

use crate::client::{ConnectionState, EventStreamClient, ObserverId};
use crate::config::SyncConfig;
use crate::credentials::CredentialSource;
use crate::engine::{SyncEngine, SyncEvent};
use crate::error::{LoadError, SubscriptionError, TransportError};
use crate::registry::{
    ChannelSubscriptionRegistry, HttpSubscriptionTransport, SubscriptionOutcome,
    SubscriptionTransport,
};
use nodedoc_editor::{Revision, RevisionStore};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Result of [`SyncSession::start`]
#[derive(Debug, Default)]
pub struct StartReport {
    pub connected: bool,
    pub subscribed: Vec<String>,
    pub failed: Vec<SubscriptionError>,
}

/// What a credential refresh did to the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialChange {
    Unchanged,
    Reconnected,
    /// Credential went away; connection closed
    Revoked,
}

/// Result of [`SyncSession::refresh_credential`]
#[derive(Debug)]
pub struct RefreshReport {
    pub change: CredentialChange,
    /// Channels (re)confirmed after a reconnect
    pub subscribed: Vec<String>,
    pub failed: Vec<SubscriptionError>,
}

/// Why [`SyncSession::run`] returned
#[derive(Debug)]
pub enum RunExit<E> {
    /// Ctrl-C
    Interrupted,
    /// Event channel closed
    Closed,
    Transport(TransportError),
    Handler(E),
}

pub struct SyncSession {
    config: SyncConfig,
    client: EventStreamClient,
    registry: Arc<ChannelSubscriptionRegistry>,
    engine: Arc<SyncEngine>,
    credential: Arc<dyn CredentialSource>,
    active_token: Mutex<Option<String>>,
    observers: Vec<ObserverId>,
}

impl SyncSession {
    /// Session talking HTTP to the configured endpoints
    pub fn new(
        config: SyncConfig,
        credential: Arc<dyn CredentialSource>,
    ) -> Result<Self, TransportError> {
        let transport = HttpSubscriptionTransport::new(&config, Arc::clone(&credential))
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Self::with_transport(config, credential, Arc::new(transport))
    }

    pub fn with_transport(
        config: SyncConfig,
        credential: Arc<dyn CredentialSource>,
        transport: Arc<dyn SubscriptionTransport>,
    ) -> Result<Self, TransportError> {
        let client = EventStreamClient::new(&config)?;
        let registry = Arc::new(ChannelSubscriptionRegistry::new(transport));
        let store = RevisionStore::with_history_limit(config.history_limit);
        let engine = Arc::new(SyncEngine::new(Arc::clone(&registry), store));
        let observers = engine.attach(&client);

        Ok(Self {
            config,
            client,
            registry,
            engine,
            credential,
            active_token: Mutex::new(None),
            observers,
        })
    }

    /// Connect and subscribe the configured channels
    ///
    /// Without a credential nothing is connected or subscribed.
    pub async fn start(&self) -> StartReport {
        let mut report = StartReport::default();

        let token = self.credential.credential();
        report.connected = self.client.connect(token.as_deref());
        self.set_active_token(token);

        if !report.connected {
            return report;
        }

        let (subscribed, failed) = self.subscribe_known_channels().await;
        report.subscribed = subscribed;
        report.failed = failed;

        tracing::info!(
            subscribed = report.subscribed.len(),
            failed = report.failed.len(),
            "Sync session started"
        );
        report
    }

    /// Re-read the credential and reconnect if it changed
    ///
    /// A reconnect also subscribes the configured channels (and re-confirms
    /// any already active), so a session started before a credential existed
    /// catches up here.
    pub async fn refresh_credential(&self) -> RefreshReport {
        let token = self.credential.credential();
        let previous = self.active_token();

        let mut report = RefreshReport {
            change: CredentialChange::Unchanged,
            subscribed: Vec::new(),
            failed: Vec::new(),
        };
        if token == previous {
            return report;
        }

        self.set_active_token(token.clone());
        match token {
            Some(token) => {
                tracing::info!("Credential changed, reconnecting");
                self.client.connect(Some(&token));
                report.change = CredentialChange::Reconnected;

                let (subscribed, failed) = self.subscribe_known_channels().await;
                report.subscribed = subscribed;
                report.failed = failed;
            }
            None => {
                tracing::info!("Credential revoked, closing stream");
                self.client.close();
                report.change = CredentialChange::Revoked;
            }
        }
        report
    }

    pub async fn subscribe(&self, channel: &str) -> Result<SubscriptionOutcome, SubscriptionError> {
        self.registry.subscribe(channel).await
    }

    pub async fn unsubscribe(
        &self,
        channel: &str,
    ) -> Result<SubscriptionOutcome, SubscriptionError> {
        self.registry.unsubscribe(channel).await
    }

    /// Read a NodeDoc file and make it revision 0 of `doc_id`
    pub fn load_file(&self, doc_id: impl Into<String>, path: &Path) -> Result<Revision, LoadError> {
        let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.engine
            .load_json(doc_id, &source)
            .map_err(|source| LoadError::Document {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Feed `events` to `handle` until Ctrl-C, a transport error, or a
    /// handler error, then shut the session down
    ///
    /// A transport error is passed to `handle` before the loop ends.
    pub async fn run<E, F>(&self, mut events: broadcast::Receiver<SyncEvent>, mut handle: F) -> RunExit<E>
    where
        F: FnMut(&SyncEvent) -> Result<(), E>,
    {
        let exit = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break RunExit::Interrupted,
                event = events.recv() => match event {
                    Ok(event) => {
                        if let Err(error) = handle(&event) {
                            break RunExit::Handler(error);
                        }
                        if let SyncEvent::TransportError(error) = event {
                            break RunExit::Transport(error);
                        }
                    }
                    Err(RecvError::Lagged(n)) => tracing::warn!("Event consumer lagged by {} events", n),
                    Err(RecvError::Closed) => break RunExit::Closed,
                },
            }
        };

        self.shutdown();
        exit
    }

    /// Close the stream and the registry; in-flight subscriptions go stale
    pub fn shutdown(&self) {
        for id in &self.observers {
            self.client.remove_observer(*id);
        }
        self.client.close();
        self.registry.close();
        self.set_active_token(None);
        tracing::info!("Sync session shut down");
    }

    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.engine.subscribe()
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn registry(&self) -> &Arc<ChannelSubscriptionRegistry> {
        &self.registry
    }

    pub fn client(&self) -> &EventStreamClient {
        &self.client
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.client.state()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Configured channels followed by any subscribed at runtime
    async fn subscribe_known_channels(&self) -> (Vec<String>, Vec<SubscriptionError>) {
        let mut channels: Vec<String> = self
            .config
            .channels
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        for channel in self.registry.channels() {
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }

        let mut subscribed = Vec::new();
        let mut failed = Vec::new();
        for channel in channels {
            match self.registry.subscribe(&channel).await {
                Ok(SubscriptionOutcome::Subscribed | SubscriptionOutcome::AlreadySubscribed) => {
                    subscribed.push(channel)
                }
                Ok(outcome) => tracing::debug!(channel = %channel, ?outcome, "Channel skipped"),
                Err(error) => {
                    tracing::warn!(%error, "Subscription failed");
                    failed.push(error);
                }
            }
        }
        (subscribed, failed)
    }

    fn active_token(&self) -> Option<String> {
        match self.active_token.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_active_token(&self, token: Option<String>) {
        match self.active_token.lock() {
            Ok(mut slot) => *slot = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}
