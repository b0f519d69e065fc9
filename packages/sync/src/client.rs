//! # Event Stream Client
//!
//! Owns at most one long-lived `text/event-stream` connection.
//!
//! ## Lifecycle
//!
//! ```text
//!  Disconnected ──connect──▶ Connecting ──2xx──▶ Open ──read error / end──▶ Errored
//!        ▲                        │                │
//!        │                        └──non-2xx───────┼──────────────────────▶ Errored
//!        └────────────────── close (any state) ◀───┘  ──────────────────▶ Closed
//! ```
//!
//! There is no automatic reconnect. Callers reconnect explicitly, usually
//! after a credential refresh.
//!
//! Observers are lists, not slots: registering a second message observer
//! never replaces the first one.

use crate::config::SyncConfig;
use crate::credentials;
use crate::error::TransportError;
use crate::sse::SseParser;
use futures::StreamExt;
use reqwest::Url;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Errored,
    Closed,
}

/// Handle returned when registering an observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type OpenObserver = Arc<dyn Fn() + Send + Sync>;
type MessageObserver = Arc<dyn Fn(&str) + Send + Sync>;
type ErrorObserver = Arc<dyn Fn(&TransportError) + Send + Sync>;

#[derive(Default)]
struct Observers {
    open: Vec<(ObserverId, OpenObserver)>,
    message: Vec<(ObserverId, MessageObserver)>,
    error: Vec<(ObserverId, ErrorObserver)>,
    consumers: Vec<mpsc::UnboundedSender<String>>,
}

/// State shared between the client handle and its reader task
struct Shared {
    observers: Mutex<Observers>,
    state: watch::Sender<ConnectionState>,
    /// Bumped by every connect/close; stale reader tasks compare against it
    generation: AtomicU64,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_state(&self, generation: u64, next: ConnectionState) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) || *state == next {
                return false;
            }
            *state = next;
            true
        })
    }

    fn notify_open(&self, generation: u64) {
        if !self.set_state(generation, ConnectionState::Open) {
            return;
        }
        let observers: Vec<OpenObserver> = match self.observers.lock() {
            Ok(observers) => observers.open.iter().map(|(_, f)| Arc::clone(f)).collect(),
            Err(_) => return,
        };
        for observer in observers {
            observer();
        }
    }

    fn notify_message(&self, generation: u64, frame: &str) {
        if !self.is_current(generation) {
            return;
        }
        let observers: Vec<MessageObserver> = match self.observers.lock() {
            Ok(mut observers) => {
                observers
                    .consumers
                    .retain(|consumer| consumer.send(frame.to_string()).is_ok());
                observers
                    .message
                    .iter()
                    .map(|(_, f)| Arc::clone(f))
                    .collect()
            }
            Err(_) => return,
        };
        for observer in observers {
            observer(frame);
        }
    }

    fn notify_error(&self, generation: u64, error: TransportError) {
        if !self.set_state(generation, ConnectionState::Errored) {
            return;
        }
        tracing::warn!(%error, "Event stream failed");
        let observers: Vec<ErrorObserver> = match self.observers.lock() {
            Ok(observers) => observers.error.iter().map(|(_, f)| Arc::clone(f)).collect(),
            Err(_) => return,
        };
        for observer in observers {
            observer(&error);
        }
    }
}

pub struct EventStreamClient {
    http: reqwest::Client,
    stream_url: Url,
    token_param: String,
    shared: Arc<Shared>,
    next_observer: AtomicU64,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl EventStreamClient {
    pub fn new(config: &SyncConfig) -> Result<Self, TransportError> {
        let stream_url = Url::parse(&config.stream_url())
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.stream_url(), e)))?;

        // Only the connect phase is bounded; the body is read for as long as the server streams.
        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            http,
            stream_url,
            token_param: config.token_param.clone(),
            shared: Arc::new(Shared {
                observers: Mutex::new(Observers::default()),
                state,
                generation: AtomicU64::new(0),
            }),
            next_observer: AtomicU64::new(1),
            reader: Mutex::new(None),
        })
    }

    /// Open the stream with `credential`
    ///
    /// A missing or blank credential is a silent no-op (logged, no error, no
    /// request). Otherwise any existing connection is closed first and
    /// exactly one new request is started. Returns whether a connection
    /// attempt was started. Must be called inside a tokio runtime.
    pub fn connect(&self, credential: Option<&str>) -> bool {
        let Some(token) = credentials::normalize(credential) else {
            tracing::info!("No credential available, not connecting event stream");
            return false;
        };

        let mut reader = match self.reader.lock() {
            Ok(reader) => reader,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = reader.take() {
            previous.abort();
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.state.send_replace(ConnectionState::Connecting);

        let mut url = self.stream_url.clone();
        url.query_pairs_mut().append_pair(&self.token_param, &token);

        tracing::info!(url = %self.stream_url, "Connecting event stream");

        let request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let shared = Arc::clone(&self.shared);
        *reader = Some(tokio::spawn(read_stream(request, shared, generation)));
        true
    }

    /// Tear down the connection; safe to call any number of times
    pub fn close(&self) {
        let handle = match self.reader.lock() {
            Ok(mut reader) => reader.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = handle {
            handle.abort();
            tracing::info!("Event stream closed");
        }

        let current = *self.shared.state.borrow();
        if current != ConnectionState::Disconnected {
            self.shared.state.send_replace(ConnectionState::Closed);
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Subscribe to state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn on_open(&self, observer: impl Fn() + Send + Sync + 'static) -> ObserverId {
        let id = self.next_id();
        self.with_observers(|o| o.open.push((id, Arc::new(observer))));
        id
    }

    pub fn on_message(&self, observer: impl Fn(&str) + Send + Sync + 'static) -> ObserverId {
        let id = self.next_id();
        self.with_observers(|o| o.message.push((id, Arc::new(observer))));
        id
    }

    pub fn on_error(
        &self,
        observer: impl Fn(&TransportError) + Send + Sync + 'static,
    ) -> ObserverId {
        let id = self.next_id();
        self.with_observers(|o| o.error.push((id, Arc::new(observer))));
        id
    }

    /// Detach an observer; returns whether it was registered
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut removed = false;
        self.with_observers(|o| {
            let before = o.open.len() + o.message.len() + o.error.len();
            o.open.retain(|(existing, _)| *existing != id);
            o.message.retain(|(existing, _)| *existing != id);
            o.error.retain(|(existing, _)| *existing != id);
            removed = o.open.len() + o.message.len() + o.error.len() < before;
        });
        removed
    }

    /// Channel receiving every frame in arrival order
    pub fn frames(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.with_observers(|o| o.consumers.push(tx));
        rx
    }

    fn next_id(&self) -> ObserverId {
        ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed))
    }

    fn with_observers(&self, f: impl FnOnce(&mut Observers)) {
        match self.shared.observers.lock() {
            Ok(mut observers) => f(&mut observers),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl Drop for EventStreamClient {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_stream(request: reqwest::RequestBuilder, shared: Arc<Shared>, generation: u64) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            shared.notify_error(generation, TransportError::from_reqwest(&e));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        shared.notify_error(
            generation,
            TransportError::Status {
                status: status.as_u16(),
            },
        );
        return;
    }

    shared.notify_open(generation);

    let mut parser = SseParser::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                for frame in parser.feed(&bytes) {
                    tracing::trace!(event = ?frame.event, id = ?frame.id, "Frame received");
                    shared.notify_message(generation, &frame.data);
                }
            }
            Err(e) => {
                shared.notify_error(generation, TransportError::Read(e.to_string()));
                return;
            }
        }
    }

    shared.notify_error(generation, TransportError::Ended);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn client() -> EventStreamClient {
        EventStreamClient::new(&SyncConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_connect_without_credential_is_noop() {
        let client = client();
        assert!(!client.connect(None));
        assert!(!client.connect(Some("")));
        assert!(!client.connect(Some("   ")));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_close_is_idempotent() {
        let client = client();
        client.close();
        client.close();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_observers_accumulate_and_detach() {
        let client = client();
        let hits = Arc::new(AtomicUsize::new(0));

        let first = {
            let hits = Arc::clone(&hits);
            client.on_message(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let second = {
            let hits = Arc::clone(&hits);
            client.on_message(move |_| {
                hits.fetch_add(10, Ordering::SeqCst);
            })
        };

        client.shared.notify_message(0, "frame");
        assert_eq!(hits.load(Ordering::SeqCst), 11);

        assert!(client.remove_observer(first));
        assert!(!client.remove_observer(first));
        client.shared.notify_message(0, "frame");
        assert_eq!(hits.load(Ordering::SeqCst), 21);

        assert!(client.remove_observer(second));
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let client = client();
        let mut frames = client.frames();

        client.shared.notify_message(0, "kept");
        client.shared.generation.fetch_add(1, Ordering::SeqCst);
        client.shared.notify_message(0, "dropped");
        client.shared.notify_error(0, TransportError::Ended);

        assert_eq!(frames.try_recv().ok().as_deref(), Some("kept"));
        assert!(frames.try_recv().is_err());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_invalid_url() {
        let config = SyncConfig {
            base_url: "http://bad host".to_string(),
            ..SyncConfig::default()
        };
        assert!(matches!(
            EventStreamClient::new(&config),
            Err(TransportError::InvalidUrl(_))
        ));
    }
}
