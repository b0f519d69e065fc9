//! # NodeDoc Editor
//!
//! Turns server-issued edit proposals into new document revisions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ proposal: message metadata → EditProposal   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ apply: target → checks → block → schema     │
//! │        → citation integrity → policy        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ store: Arc<NodeDoc> revisions + rollback    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **All or nothing**: a rejected proposal leaves the current revision untouched
//! 2. **Stable identity**: blocks are addressed by id; indexes resolve once
//! 3. **Server authority**: proposals come from the server and are never retried
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nodedoc_editor::{ProposalProcessor, RevisionStore, ProcessOutcome};
//!
//! let mut store = RevisionStore::new();
//! store.load_json("doc-1", &source)?;
//!
//! let mut processor = ProposalProcessor::new();
//! match processor.process(&metadata, &mut store) {
//!     ProcessOutcome::Applied(revision) => render(&revision.document),
//!     ProcessOutcome::Rejected { error, .. } => eprintln!("{}", error),
//!     ProcessOutcome::NoProposal => {}
//! }
//! ```

mod apply;
mod errors;
mod history;
mod policy;
mod processor;
pub mod proposal;
mod store;

pub use apply::{apply, resolve_target, BlockLocator};
pub use errors::{ApplyError, EditorError, TargetRef};
pub use history::RevisionHistory;
pub use policy::enforce as enforce_citation_policy;
pub use processor::{ProcessOutcome, ProcessorStats, ProposalProcessor, ProposalState};
pub use proposal::{
    parse, parse_str, CitationPolicy, EditProposal, ProposalAction, RequestedKind,
};
pub use store::{Revision, RevisionStore};

// Re-export document types for convenience
pub use nodedoc_document::{Block, BlockId, BlockKind, Citation, CitationLoc, NodeDoc};
