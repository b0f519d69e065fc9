//! # NodeDoc Document Model
//!
//! Typed, versioned content documents made of ordered blocks.
//!
//! ## Pipeline
//!
//! ```text
//! JSON ──validate──▶ NodeDoc ──serialize──▶ JSON
//!                       │
//!                       ├── citations::check   (structural provenance)
//!                       └── diff_blocks        (block-level changes)
//! ```
//!
//! Documents are plain values. Editing happens elsewhere (see the editor
//! crate) by producing a new `NodeDoc` and re-validating it.

pub mod citations;
pub mod differ;
pub mod error;
pub mod id_generator;
pub mod model;
pub mod validator;

pub use differ::{diff_blocks, BlockChange};
pub use error::{CitationError, SchemaError, SchemaResult};
pub use id_generator::{content_seed, BlockIdGenerator};
pub use model::{
    Block, BlockContent, BlockId, BlockKind, Citation, CitationLoc, NodeDoc, UnknownBlockKind,
    SCHEMA_VERSION,
};
pub use validator::{check_document, validate, validate_block, validate_block_at, ValidatedBlock};

/// Serialize a document to its wire representation
pub fn serialize(doc: &NodeDoc) -> serde_json::Value {
    doc.to_value()
}
