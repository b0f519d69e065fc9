//! # Channel Subscriptions
//!
//! Tracks which channels are subscribed server-side and issues the
//! subscribe/unsubscribe round trips.
//!
//! The active set is only mutated after the server acknowledged a request,
//! and the lock guarding it is never held across an `.await`, so requests
//! for different channels run concurrently.

use crate::config::SyncConfig;
use crate::credentials::CredentialSource;
use crate::error::SubscriptionError;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Server side of the subscription protocol
#[async_trait]
pub trait SubscriptionTransport: Send + Sync {
    async fn subscribe(&self, channel: &str) -> Result<(), SubscriptionError>;
    async fn unsubscribe(&self, channel: &str) -> Result<(), SubscriptionError>;
}

/// `POST {"channel": ...}` to the configured endpoints
pub struct HttpSubscriptionTransport {
    http: reqwest::Client,
    subscribe_url: String,
    unsubscribe_url: String,
    credential: Arc<dyn CredentialSource>,
}

impl HttpSubscriptionTransport {
    pub fn new(
        config: &SyncConfig,
        credential: Arc<dyn CredentialSource>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            subscribe_url: config.subscribe_url(),
            unsubscribe_url: config.unsubscribe_url(),
            credential,
        })
    }

    async fn post(&self, url: &str, channel: &str) -> Result<(), SubscriptionError> {
        let mut request = self.http.post(url).json(&json!({ "channel": channel }));
        if let Some(token) = self.credential.credential() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SubscriptionError::Transport {
                channel: channel.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubscriptionError::Rejected {
                channel: channel.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionTransport for HttpSubscriptionTransport {
    async fn subscribe(&self, channel: &str) -> Result<(), SubscriptionError> {
        self.post(&self.subscribe_url, channel).await
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), SubscriptionError> {
        self.post(&self.unsubscribe_url, channel).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    Subscribed,
    /// Server re-confirmed a channel already in the set
    AlreadySubscribed,
    Unsubscribed,
    /// Server acknowledged, but the channel was not in the set
    NotSubscribed,
    /// Channel name was empty after trimming; nothing was sent
    Ignored,
    /// Registry was closed before the request completed; nothing recorded
    Stale,
}

#[derive(Debug, Default)]
struct Inner {
    active: BTreeSet<String>,
    closed: bool,
}

pub struct ChannelSubscriptionRegistry {
    transport: Arc<dyn SubscriptionTransport>,
    inner: Mutex<Inner>,
}

impl ChannelSubscriptionRegistry {
    pub fn new(transport: Arc<dyn SubscriptionTransport>) -> Self {
        Self {
            transport,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub async fn subscribe(&self, channel: &str) -> Result<SubscriptionOutcome, SubscriptionError> {
        let channel = channel.trim();
        if channel.is_empty() {
            tracing::warn!("Ignoring subscribe with empty channel name");
            return Ok(SubscriptionOutcome::Ignored);
        }

        if self.lock().closed {
            return Ok(SubscriptionOutcome::Stale);
        }

        // Sent even for known channels so the server re-confirms interest
        self.transport.subscribe(channel).await?;

        let mut inner = self.lock();
        if inner.closed {
            tracing::debug!(channel, "Subscribe completed after close");
            return Ok(SubscriptionOutcome::Stale);
        }
        if !inner.active.insert(channel.to_string()) {
            tracing::debug!(channel, "Subscription re-confirmed");
            return Ok(SubscriptionOutcome::AlreadySubscribed);
        }

        tracing::info!(channel, "Subscribed");
        Ok(SubscriptionOutcome::Subscribed)
    }

    pub async fn unsubscribe(
        &self,
        channel: &str,
    ) -> Result<SubscriptionOutcome, SubscriptionError> {
        let channel = channel.trim();
        if channel.is_empty() {
            tracing::warn!("Ignoring unsubscribe with empty channel name");
            return Ok(SubscriptionOutcome::Ignored);
        }

        if self.lock().closed {
            return Ok(SubscriptionOutcome::Stale);
        }

        self.transport.unsubscribe(channel).await?;

        let mut inner = self.lock();
        if inner.closed {
            tracing::debug!(channel, "Unsubscribe completed after close");
            return Ok(SubscriptionOutcome::Stale);
        }
        if !inner.active.remove(channel) {
            return Ok(SubscriptionOutcome::NotSubscribed);
        }

        tracing::info!(channel, "Unsubscribed");
        Ok(SubscriptionOutcome::Unsubscribed)
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.lock().active.contains(channel.trim())
    }

    /// Active channels, sorted
    pub fn channels(&self) -> Vec<String> {
        self.lock().active.iter().cloned().collect()
    }

    /// Forget every channel; in-flight requests finish as `Stale`
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.active.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
