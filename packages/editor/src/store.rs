//! # Revision Store
//!
//! Holds the current revision of every known document by `doc_id`.
//!
//! Documents are shared as `Arc<NodeDoc>` snapshots; a commit swaps in a new
//! snapshot and never mutates the one readers may still hold. Revision 0 is
//! the initial load and every accepted proposal increments the number by one.

use crate::apply::apply;
use crate::errors::ApplyError;
use crate::history::RevisionHistory;
use crate::proposal::EditProposal;
use chrono::{DateTime, Utc};
use nodedoc_document::{check_document, citations, diff_blocks, BlockChange, NodeDoc};
use std::collections::HashMap;
use std::sync::Arc;

/// One immutable document version
#[derive(Debug, Clone)]
pub struct Revision {
    pub doc_id: String,
    pub number: u64,
    pub document: Arc<NodeDoc>,
    /// Block-level changes relative to the revision this one superseded
    pub changes: Vec<BlockChange>,
    /// Proposal that produced this revision (`None` for loads)
    pub proposal: Option<EditProposal>,
    pub applied_at: DateTime<Utc>,
}

impl Revision {
    pub fn initial(doc_id: impl Into<String>, document: NodeDoc) -> Self {
        Self {
            doc_id: doc_id.into(),
            number: 0,
            document: Arc::new(document),
            changes: Vec::new(),
            proposal: None,
            applied_at: Utc::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_number(mut self, number: u64) -> Self {
        self.number = number;
        self
    }
}

#[derive(Debug)]
struct Entry {
    current: Revision,
    history: RevisionHistory,
    next_number: u64,
}

#[derive(Debug)]
pub struct RevisionStore {
    entries: HashMap<String, Entry>,
    history_limit: usize,
}

impl RevisionStore {
    pub fn new() -> Self {
        Self::with_history_limit(50)
    }

    /// `0` keeps unlimited history
    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            history_limit,
        }
    }

    /// Register a document as revision 0, replacing anything held under `doc_id`
    ///
    /// The document is re-checked against the schema and citation rules; a
    /// rejected document is never stored.
    pub fn insert(
        &mut self,
        doc_id: impl Into<String>,
        document: NodeDoc,
    ) -> Result<Revision, ApplyError> {
        check_document(&document)?;
        citations::check_document(&document)?;

        let doc_id = doc_id.into();
        let revision = Revision::initial(doc_id.clone(), document);

        tracing::debug!(doc_id = %doc_id, blocks = revision.document.len(), "Loaded document");

        self.entries.insert(
            doc_id,
            Entry {
                current: revision.clone(),
                history: RevisionHistory::with_max_levels(self.history_limit),
                next_number: 1,
            },
        );
        Ok(revision)
    }

    /// Validate `source` and register it as revision 0
    pub fn load_json(
        &mut self,
        doc_id: impl Into<String>,
        source: &str,
    ) -> Result<Revision, ApplyError> {
        let document = NodeDoc::from_json(source)?;
        self.insert(doc_id, document)
    }

    pub fn current(&self, doc_id: &str) -> Option<&Revision> {
        self.entries.get(doc_id).map(|entry| &entry.current)
    }

    pub fn document(&self, doc_id: &str) -> Option<Arc<NodeDoc>> {
        self.current(doc_id).map(|revision| Arc::clone(&revision.document))
    }

    /// Apply `proposal` to its document and make the result current
    ///
    /// On rejection the current revision is left exactly as it was.
    pub fn commit(&mut self, proposal: &EditProposal) -> Result<Revision, ApplyError> {
        let document = self
            .document(&proposal.doc_id)
            .ok_or_else(|| ApplyError::UnknownDocument(proposal.doc_id.clone()))?;

        let next = apply(proposal, &document)?;
        self.push(&proposal.doc_id, next, Some(proposal.clone()))
    }

    /// Make a document produced by `apply` the next revision of `doc_id`
    fn push(
        &mut self,
        doc_id: &str,
        document: NodeDoc,
        proposal: Option<EditProposal>,
    ) -> Result<Revision, ApplyError> {
        let entry = self
            .entries
            .get_mut(doc_id)
            .ok_or_else(|| ApplyError::UnknownDocument(doc_id.to_string()))?;

        let revision = Revision {
            doc_id: doc_id.to_string(),
            number: entry.next_number,
            changes: diff_blocks(&entry.current.document, &document),
            document: Arc::new(document),
            proposal,
            applied_at: Utc::now(),
        };

        entry.next_number += 1;
        let superseded = std::mem::replace(&mut entry.current, revision.clone());
        entry.history.record(superseded);

        Ok(revision)
    }

    /// Roll back to the previous revision; returns the revision now current
    pub fn rollback(&mut self, doc_id: &str) -> Option<Revision> {
        let entry = self.entries.get_mut(doc_id)?;
        if !entry.history.can_undo() {
            return None;
        }

        let current = entry.current.clone();
        match entry.history.undo(current) {
            Ok(previous) => {
                tracing::info!(doc_id, number = previous.number, "Rolled back");
                entry.current = previous.clone();
                Some(previous)
            }
            Err(_) => None,
        }
    }

    /// Alias for [`RevisionStore::rollback`]
    pub fn undo(&mut self, doc_id: &str) -> Option<Revision> {
        self.rollback(doc_id)
    }

    /// Re-apply the most recently rolled-back revision
    pub fn redo(&mut self, doc_id: &str) -> Option<Revision> {
        let entry = self.entries.get_mut(doc_id)?;
        if !entry.history.can_redo() {
            return None;
        }

        let current = entry.current.clone();
        match entry.history.redo(current) {
            Ok(next) => {
                entry.current = next.clone();
                Some(next)
            }
            Err(_) => None,
        }
    }

    /// Retained revisions of `doc_id`, oldest first, ending with the current one
    pub fn history(&self, doc_id: &str) -> Vec<&Revision> {
        self.entries
            .get(doc_id)
            .map(|entry| {
                entry
                    .history
                    .past()
                    .iter()
                    .chain(std::iter::once(&entry.current))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn remove(&mut self, doc_id: &str) -> Option<Revision> {
        self.entries.remove(doc_id).map(|entry| entry.current)
    }

    /// Known document ids, sorted
    pub fn doc_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RevisionStore {
    fn default() -> Self {
        Self::new()
    }
}
