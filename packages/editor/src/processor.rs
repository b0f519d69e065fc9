//! # Proposal Processor
//!
//! Drives one proposal through its lifecycle against a [`RevisionStore`]:
//!
//! ```text
//! Received ─▶ Parsed ─▶ Validated ─▶ Applied
//!                 │          │
//!                 └──────────┴──────▶ Rejected
//! ```
//!
//! Proposals are never retried. A rejected proposal is reported once and
//! dropped; the document keeps its current revision.

use crate::errors::ApplyError;
use crate::proposal::{self, EditProposal};
use crate::store::{Revision, RevisionStore};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalState {
    Received,
    Parsed,
    Validated,
    Applied,
    Rejected,
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProposalState::Received => "received",
            ProposalState::Parsed => "parsed",
            ProposalState::Validated => "validated",
            ProposalState::Applied => "applied",
            ProposalState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Result of processing one metadata payload
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// Metadata carried no usable proposal
    NoProposal,
    Applied(Revision),
    Rejected {
        proposal: EditProposal,
        error: ApplyError,
    },
}

impl ProcessOutcome {
    pub fn state(&self) -> Option<ProposalState> {
        match self {
            ProcessOutcome::NoProposal => None,
            ProcessOutcome::Applied(_) => Some(ProposalState::Applied),
            ProcessOutcome::Rejected { .. } => Some(ProposalState::Rejected),
        }
    }
}

/// Running totals across processed payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub received: u64,
    pub applied: u64,
    pub rejected: u64,
}

#[derive(Debug, Default)]
pub struct ProposalProcessor {
    stats: ProcessorStats,
}

impl ProposalProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse, apply and commit the proposal carried by `metadata`, if any
    pub fn process(&mut self, metadata: &Value, store: &mut RevisionStore) -> ProcessOutcome {
        let Some(proposal) = proposal::parse(metadata) else {
            return ProcessOutcome::NoProposal;
        };
        self.process_proposal(proposal, store)
    }

    /// Run an already parsed proposal through the remaining states
    pub fn process_proposal(
        &mut self,
        proposal: EditProposal,
        store: &mut RevisionStore,
    ) -> ProcessOutcome {
        self.stats.received += 1;
        trace_state(&proposal, ProposalState::Received);
        trace_state(&proposal, ProposalState::Parsed);

        if store.current(&proposal.doc_id).is_none() {
            return self.reject(proposal.clone(), ApplyError::UnknownDocument(proposal.doc_id));
        }
        trace_state(&proposal, ProposalState::Validated);

        match store.commit(&proposal) {
            Ok(revision) => {
                self.stats.applied += 1;
                tracing::info!(
                    doc_id = %revision.doc_id,
                    revision = revision.number,
                    action = %proposal.action,
                    changes = revision.changes.len(),
                    "Proposal applied"
                );
                ProcessOutcome::Applied(revision)
            }
            Err(error) => self.reject(proposal, error),
        }
    }

    pub fn stats(&self) -> ProcessorStats {
        self.stats
    }

    fn reject(&mut self, proposal: EditProposal, error: ApplyError) -> ProcessOutcome {
        self.stats.rejected += 1;
        tracing::warn!(
            doc_id = %proposal.doc_id,
            action = %proposal.action,
            code = error.code(),
            %error,
            "Proposal rejected"
        );
        ProcessOutcome::Rejected { proposal, error }
    }
}

fn trace_state(proposal: &EditProposal, state: ProposalState) {
    tracing::debug!(
        doc_id = %proposal.doc_id,
        action = %proposal.action,
        %state,
        "Proposal lifecycle"
    );
}
