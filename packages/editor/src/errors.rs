//! Error types for the editor

use crate::proposal::CitationPolicy;
use nodedoc_document::{BlockId, BlockKind, CitationError, SchemaError};
use std::fmt;
use thiserror::Error;

/// How a proposal addressed its target block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    Id(String),
    Index(usize),
    Unspecified,
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Id(id) => write!(f, "block id `{}`", id),
            TargetRef::Index(index) => write!(f, "block index {}", index),
            TargetRef::Unspecified => f.write_str("no block id or index"),
        }
    }
}

/// Why a single proposal was rejected
///
/// A rejection never touches the document it was applied against.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyError {
    #[error("Target not found: {0}")]
    TargetNotFound(TargetRef),

    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Block type mismatch: proposal names {expected}, block is {found}")]
    BlockTypeMismatch { expected: BlockKind, found: BlockKind },

    #[error("Stale proposal: text of block {block_id} no longer matches")]
    StaleProposal { block_id: BlockId },

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Citation error: {0}")]
    Citation(#[from] CitationError),

    #[error("Citation policy `{policy}` violated (added: {added:?}, removed: {removed:?})")]
    CitationPolicy {
        policy: CitationPolicy,
        added: Vec<String>,
        removed: Vec<String>,
    },
}

impl ApplyError {
    /// Stable machine-readable code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            ApplyError::TargetNotFound(_) => "target_not_found",
            ApplyError::UnknownDocument(_) => "unknown_document",
            ApplyError::InvalidProposal(_) => "invalid_proposal",
            ApplyError::BlockTypeMismatch { .. } => "block_type_mismatch",
            ApplyError::StaleProposal { .. } => "stale_proposal",
            ApplyError::Schema(_) => "schema_violation",
            ApplyError::Citation(_) => "citation_structure",
            ApplyError::CitationPolicy { .. } => "citation_policy",
        }
    }
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),
}
