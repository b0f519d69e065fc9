//! # Sync Engine
//!
//! Glues the stream to the documents:
//!
//! ```text
//! EventStreamClient ──frame──▶ FrameRouter ──proposal──▶ ProposalProcessor ──▶ RevisionStore
//!                                   │                           │
//!                                   └──message──┐               ├──applied──┐
//!                                               ▼               ▼           ▼
//!                                           broadcast::Sender<SyncEvent>
//! ```
//!
//! Frames are handled synchronously on the reader task, one at a time, in
//! arrival order.

use crate::client::{EventStreamClient, ObserverId};
use crate::error::TransportError;
use crate::registry::ChannelSubscriptionRegistry;
use crate::router::{Frame, FrameRouter, Route};
use nodedoc_document::NodeDoc;
use nodedoc_editor::{ApplyError, ProcessOutcome, ProposalProcessor, Revision, RevisionStore};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// What consumers observe from a running session
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Opened,
    Message(Frame),
    Revision(Revision),
    Rejected { raw: String, error: ApplyError },
    TransportError(TransportError),
}

struct Documents {
    store: RevisionStore,
    processor: ProposalProcessor,
}

pub struct SyncEngine {
    router: FrameRouter,
    documents: Mutex<Documents>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    pub fn new(registry: Arc<ChannelSubscriptionRegistry>, store: RevisionStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            router: FrameRouter::new(registry),
            documents: Mutex::new(Documents {
                store,
                processor: ProposalProcessor::new(),
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Route and process one raw frame, publishing the resulting event
    pub fn handle_frame(&self, raw: &str) -> Option<SyncEvent> {
        let event = match self.router.route(raw) {
            Route::Ignored | Route::Unsubscribed { .. } => return None,
            Route::Message(frame) => SyncEvent::Message(frame),
            Route::Proposal { proposal, .. } => {
                let outcome = {
                    let mut documents = self.lock();
                    let Documents { store, processor } = &mut *documents;
                    processor.process_proposal(proposal, store)
                };
                match outcome {
                    ProcessOutcome::Applied(revision) => SyncEvent::Revision(revision),
                    ProcessOutcome::Rejected { error, .. } => SyncEvent::Rejected {
                        raw: raw.to_string(),
                        error,
                    },
                    ProcessOutcome::NoProposal => return None,
                }
            }
        };

        self.publish(event.clone());
        Some(event)
    }

    /// Register this engine's observers on `client`
    pub fn attach(self: &Arc<Self>, client: &EventStreamClient) -> Vec<ObserverId> {
        let on_open = {
            let engine = Arc::clone(self);
            client.on_open(move || engine.publish(SyncEvent::Opened))
        };
        let on_message = {
            let engine = Arc::clone(self);
            client.on_message(move |raw| {
                engine.handle_frame(raw);
            })
        };
        let on_error = {
            let engine = Arc::clone(self);
            client.on_error(move |error| engine.publish(SyncEvent::TransportError(error.clone())))
        };
        vec![on_open, on_message, on_error]
    }

    pub fn load_document(
        &self,
        doc_id: impl Into<String>,
        document: NodeDoc,
    ) -> Result<Revision, ApplyError> {
        self.lock().store.insert(doc_id, document)
    }

    pub fn load_json(&self, doc_id: impl Into<String>, source: &str) -> Result<Revision, ApplyError> {
        self.lock().store.load_json(doc_id, source)
    }

    pub fn document(&self, doc_id: &str) -> Option<Arc<NodeDoc>> {
        self.lock().store.document(doc_id)
    }

    pub fn current(&self, doc_id: &str) -> Option<Revision> {
        self.lock().store.current(doc_id).cloned()
    }

    pub fn rollback(&self, doc_id: &str) -> Option<Revision> {
        let revision = self.lock().store.rollback(doc_id)?;
        self.publish(SyncEvent::Revision(revision.clone()));
        Some(revision)
    }

    /// Retained revisions of `doc_id`, oldest first
    pub fn history(&self, doc_id: &str) -> Vec<Revision> {
        self.lock().store.history(doc_id).into_iter().cloned().collect()
    }

    pub fn stats(&self) -> nodedoc_editor::ProcessorStats {
        self.lock().processor.stats()
    }

    fn publish(&self, event: SyncEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Documents> {
        match self.documents.lock() {
            Ok(documents) => documents,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
