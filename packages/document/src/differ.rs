//! Block-level diffing between two document revisions.
//!
//! Blocks are matched by ID. A block whose content differs in any way is
//! reported as `Changed`; there is no sub-block diffing.

use crate::model::{BlockId, NodeDoc};
use serde::Serialize;
use std::collections::HashMap;

/// A single block-level change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockChange {
    /// Block present only in the new document (index in new document)
    Inserted { id: BlockId, index: usize },

    /// Block present only in the old document (index in old document)
    Removed { id: BlockId, index: usize },

    /// Block present in both with different content (index in new document)
    Changed { id: BlockId, index: usize },
}

impl BlockChange {
    pub fn id(&self) -> &BlockId {
        match self {
            BlockChange::Inserted { id, .. }
            | BlockChange::Removed { id, .. }
            | BlockChange::Changed { id, .. } => id,
        }
    }
}

/// Diff two documents at block granularity
///
/// Removals come first in old-document order, followed by insertions and
/// changes in new-document order.
pub fn diff_blocks(old: &NodeDoc, new: &NodeDoc) -> Vec<BlockChange> {
    let old_index: HashMap<&BlockId, usize> = old
        .blocks
        .iter()
        .enumerate()
        .map(|(i, b)| (&b.id, i))
        .collect();
    let new_ids: HashMap<&BlockId, usize> = new
        .blocks
        .iter()
        .enumerate()
        .map(|(i, b)| (&b.id, i))
        .collect();

    let mut changes = Vec::new();

    for (index, block) in old.blocks.iter().enumerate() {
        if !new_ids.contains_key(&block.id) {
            changes.push(BlockChange::Removed {
                id: block.id.clone(),
                index,
            });
        }
    }

    for (index, block) in new.blocks.iter().enumerate() {
        match old_index.get(&block.id) {
            None => changes.push(BlockChange::Inserted {
                id: block.id.clone(),
                index,
            }),
            Some(&old_pos) if old.blocks[old_pos].content != block.content => {
                changes.push(BlockChange::Changed {
                    id: block.id.clone(),
                    index,
                })
            }
            Some(_) => {}
        }
    }

    changes
}
