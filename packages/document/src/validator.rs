//! # Schema Validation
//!
//! Turns untyped JSON into a `NodeDoc`, or explains precisely why it can't.
//!
//! Validation order:
//! 1. Root shape and `schemaVersion == 1` (future versions are rejected)
//! 2. Document metadata fields
//! 3. Each block: `type` tag, required fields, typed decode, semantic checks
//! 4. Block identity: explicit IDs must be unique, missing IDs are assigned
//!
//! Unknown block kinds fail validation instead of being dropped.

use crate::error::{SchemaError, SchemaResult};
use crate::id_generator::BlockIdGenerator;
use crate::model::{Block, BlockContent, BlockId, BlockKind, NodeDoc, SCHEMA_VERSION};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

/// A single block that passed validation, before it is placed in a document
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBlock {
    /// Explicit ID carried by the candidate, if any
    pub id: Option<BlockId>,
    pub content: BlockContent,
}

/// Validate a candidate document
pub fn validate(candidate: &Value) -> SchemaResult<NodeDoc> {
    let object = candidate.as_object().ok_or(SchemaError::NotAnObject)?;

    let version = object
        .get("schemaVersion")
        .ok_or(SchemaError::MissingField("schemaVersion"))?;
    if version.as_u64() != Some(SCHEMA_VERSION) {
        return Err(SchemaError::UnsupportedVersion {
            found: version.to_string(),
        });
    }

    let title = required_string(object, "title")?;
    let summary = optional_string(object, "summary")?.unwrap_or_default();
    let concept_keys = concept_keys(object)?;
    let estimated_minutes = estimated_minutes(object)?;

    let items = object
        .get("blocks")
        .ok_or(SchemaError::MissingField("blocks"))?
        .as_array()
        .ok_or_else(|| SchemaError::invalid_field("blocks", "expected an array"))?;

    let mut validated = Vec::with_capacity(items.len());
    let mut taken: HashSet<String> = HashSet::new();

    for (index, item) in items.iter().enumerate() {
        let block = validate_block_at(index, item)?;
        if let Some(id) = &block.id {
            if !taken.insert(id.as_str().to_string()) {
                return Err(SchemaError::DuplicateBlockId {
                    index,
                    id: id.clone(),
                });
            }
        }
        validated.push(block);
    }

    // Assign IDs only after every explicit ID is known
    let mut generator = BlockIdGenerator::new(&title);
    let blocks = validated
        .into_iter()
        .map(|block| {
            let id = block
                .id
                .unwrap_or_else(|| BlockId::from(generator.next_unused(|c| taken.contains(c))));
            Block::new(id, block.content)
        })
        .collect();

    Ok(NodeDoc {
        schema_version: SCHEMA_VERSION,
        title,
        summary,
        concept_keys,
        estimated_minutes,
        blocks,
    })
}

/// Validate a single candidate block
pub fn validate_block(candidate: &Value) -> SchemaResult<ValidatedBlock> {
    validate_block_at(0, candidate)
}

/// Re-check an already typed document
///
/// Typed construction guarantees field presence; this covers the semantic
/// rules the type system can't express.
pub fn check_document(doc: &NodeDoc) -> SchemaResult<()> {
    if doc.schema_version != SCHEMA_VERSION {
        return Err(SchemaError::UnsupportedVersion {
            found: doc.schema_version.to_string(),
        });
    }

    if !doc.estimated_minutes.is_finite() || doc.estimated_minutes < 0.0 {
        return Err(SchemaError::invalid_field(
            "estimatedMinutes",
            "expected a non-negative number",
        ));
    }

    let mut seen = HashSet::new();
    for (index, block) in doc.blocks.iter().enumerate() {
        if block.id.as_str().trim().is_empty() {
            return Err(SchemaError::invalid_block_field(
                index,
                block.kind(),
                "block id must not be empty",
            ));
        }
        if !seen.insert(block.id.as_str()) {
            return Err(SchemaError::DuplicateBlockId {
                index,
                id: block.id.clone(),
            });
        }
        check_content(index, &block.content)?;
    }

    Ok(())
}

/// Validate a candidate block destined for position `index`; errors carry that index
pub fn validate_block_at(index: usize, candidate: &Value) -> SchemaResult<ValidatedBlock> {
    let object = candidate
        .as_object()
        .ok_or(SchemaError::BlockNotObject { index })?;

    let kind = match object.get("type") {
        None | Some(Value::Null) => return Err(SchemaError::MissingBlockType { index }),
        Some(Value::String(tag)) => {
            tag.parse::<BlockKind>()
                .map_err(|_| SchemaError::UnknownBlockKind {
                    index,
                    kind: tag.clone(),
                })?
        }
        Some(other) => {
            return Err(SchemaError::UnknownBlockKind {
                index,
                kind: other.to_string(),
            })
        }
    };

    for field in kind.required_fields() {
        let present = object.contains_key(*field)
            || (*field == "answerIndex" && object.contains_key("answer_index"));
        if !present {
            return Err(SchemaError::MissingBlockField { index, kind, field });
        }
    }

    let content = BlockContent::deserialize(candidate)
        .map_err(|e| SchemaError::invalid_block_field(index, kind, e.to_string()))?;
    check_content(index, &content)?;

    let id = match object.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) if id.trim().is_empty() => None,
        Some(Value::String(id)) => Some(BlockId::from(id.as_str())),
        Some(_) => {
            return Err(SchemaError::invalid_block_field(
                index,
                kind,
                "`id` must be a string",
            ))
        }
    };

    Ok(ValidatedBlock { id, content })
}

fn check_content(index: usize, content: &BlockContent) -> SchemaResult<()> {
    match content {
        BlockContent::Heading { level, .. } => {
            if !(2..=4).contains(level) {
                return Err(SchemaError::InvalidHeadingLevel {
                    index,
                    level: *level,
                });
            }
        }
        BlockContent::Paragraph { .. }
        | BlockContent::Callout { .. }
        | BlockContent::Code { .. }
        | BlockContent::Figure { .. }
        | BlockContent::Video { .. }
        | BlockContent::Diagram { .. }
        | BlockContent::Table { .. }
        | BlockContent::Equation { .. }
        | BlockContent::QuickCheck { .. }
        | BlockContent::Flashcard { .. }
        | BlockContent::Divider => {}
    }

    Ok(())
}

fn required_string(object: &Map<String, Value>, field: &'static str) -> SchemaResult<String> {
    match object.get(field) {
        None => Err(SchemaError::MissingField(field)),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(SchemaError::invalid_field(field, "expected a string")),
    }
}

fn optional_string(object: &Map<String, Value>, field: &'static str) -> SchemaResult<Option<String>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(SchemaError::invalid_field(field, "expected a string")),
    }
}

fn concept_keys(object: &Map<String, Value>) -> SchemaResult<BTreeSet<String>> {
    match object.get("conceptKeys") {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    SchemaError::invalid_field("conceptKeys", "expected an array of strings")
                })
            })
            .collect(),
        Some(_) => Err(SchemaError::invalid_field(
            "conceptKeys",
            "expected an array of strings",
        )),
    }
}

fn estimated_minutes(object: &Map<String, Value>) -> SchemaResult<f64> {
    match object.get("estimatedMinutes") {
        None | Some(Value::Null) => Ok(0.0),
        Some(value) => value
            .as_f64()
            .filter(|minutes| minutes.is_finite() && *minutes >= 0.0)
            .ok_or_else(|| {
                SchemaError::invalid_field("estimatedMinutes", "expected a non-negative number")
            }),
    }
}
