use crate::model::{BlockId, BlockKind};
use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Reasons a candidate document or block fails schema validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    #[error("Document must be a JSON object")]
    NotAnObject,

    #[error("Unsupported schema version: {found}")]
    UnsupportedVersion { found: String },

    #[error("Missing document field `{0}`")]
    MissingField(&'static str),

    #[error("Invalid document field `{field}`: {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("Block {index}: expected a JSON object")]
    BlockNotObject { index: usize },

    #[error("Block {index}: missing `type`")]
    MissingBlockType { index: usize },

    #[error("Block {index}: unknown block kind `{kind}`")]
    UnknownBlockKind { index: usize, kind: String },

    #[error("Block {index} ({kind}): missing field `{field}`")]
    MissingBlockField {
        index: usize,
        kind: BlockKind,
        field: &'static str,
    },

    #[error("Block {index} ({kind}): {message}")]
    InvalidBlockField {
        index: usize,
        kind: BlockKind,
        message: String,
    },

    #[error("Block {index}: heading level {level} is not one of 2, 3, 4")]
    InvalidHeadingLevel { index: usize, level: u8 },

    #[error("Block {index}: duplicate block id `{id}`")]
    DuplicateBlockId { index: usize, id: BlockId },
}

impl SchemaError {
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }

    pub fn invalid_block_field(index: usize, kind: BlockKind, message: impl Into<String>) -> Self {
        Self::InvalidBlockField {
            index,
            kind,
            message: message.into(),
        }
    }
}

/// Structural problems with a block's citations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CitationError {
    #[error("Block {block_id}: citation {index} has an empty chunkId")]
    EmptyChunkId { block_id: BlockId, index: usize },

    #[error("Block {block_id}: citation {index} has an empty quote")]
    EmptyQuote { block_id: BlockId, index: usize },

    #[error("Block {block_id}: citation {index} range is inverted ({start} > {end})")]
    InvertedRange {
        block_id: BlockId,
        index: usize,
        start: u64,
        end: u64,
    },
}
