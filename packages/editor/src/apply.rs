//! # Applying Proposals
//!
//! `apply` is pure: it takes a document snapshot and a proposal and returns
//! either a brand new document or a typed rejection. The input snapshot is
//! never modified, so a rejection leaves the caller's current revision intact.
//!
//! ## Gate order
//!
//! ```text
//! resolve target ─▶ proposal checks ─▶ build block ─▶ schema ─▶ citation
//!                   (kind, staleness)   (strip here)  (whole     integrity
//!                                                      doc)         │
//!                                                                   ▼
//!                                                           citation policy
//! ```
//!
//! The citation policy is always checked last so rejections are
//! reproducible: a proposal that is both malformed and policy-violating
//! reports the structural problem.

use crate::errors::{ApplyError, TargetRef};
use crate::policy;
use crate::proposal::{CitationPolicy, EditProposal, ProposalAction};
use nodedoc_document::{
    check_document, citations, content_seed, validate_block_at, Block, BlockContent, BlockId,
    BlockIdGenerator, BlockKind, Citation, NodeDoc,
};

/// Resolved position of a proposal's target block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLocator {
    pub index: usize,
    pub id: BlockId,
}

/// Find the block a proposal addresses
///
/// A non-empty `block_id` wins and is never second-guessed by the index;
/// otherwise an in-range `block_index` is used.
pub fn resolve_target(proposal: &EditProposal, doc: &NodeDoc) -> Result<BlockLocator, ApplyError> {
    let block_id = proposal
        .block_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    if let Some(id) = block_id {
        return doc
            .position_of(id)
            .map(|index| BlockLocator {
                index,
                id: doc.blocks[index].id.clone(),
            })
            .ok_or_else(|| ApplyError::TargetNotFound(TargetRef::Id(id.to_string())));
    }

    match proposal.block_index {
        Some(index) if index < doc.blocks.len() => Ok(BlockLocator {
            index,
            id: doc.blocks[index].id.clone(),
        }),
        Some(index) => Err(ApplyError::TargetNotFound(TargetRef::Index(index))),
        None => Err(ApplyError::TargetNotFound(TargetRef::Unspecified)),
    }
}

/// Apply a proposal, producing the next document
pub fn apply(proposal: &EditProposal, doc: &NodeDoc) -> Result<NodeDoc, ApplyError> {
    let target = resolve_target(proposal, doc)?;
    let kind = requested_kind(proposal)?;
    let current = &doc.blocks[target.index];

    if proposal.action.touches_target() {
        if current.kind() != kind {
            return Err(ApplyError::BlockTypeMismatch {
                expected: kind,
                found: current.kind(),
            });
        }
        check_not_stale(proposal, current)?;
    }

    let mut blocks = doc.blocks.clone();
    let affected = match proposal.action {
        ProposalAction::Delete => {
            blocks.remove(target.index);
            None
        }
        ProposalAction::Replace => {
            let block = build_block(proposal, kind, Some(current), current.id.clone(), target.index)?;
            blocks[target.index] = block.clone();
            Some((block, current.citations()))
        }
        ProposalAction::InsertBefore | ProposalAction::InsertAfter => {
            let at = if proposal.action == ProposalAction::InsertBefore {
                target.index
            } else {
                target.index + 1
            };
            let block = build_block(proposal, kind, None, fresh_block_id(proposal, doc), at)?;
            blocks.insert(at, block.clone());
            Some((block, &[][..]))
        }
    };

    let next = NodeDoc {
        schema_version: doc.schema_version,
        title: doc.title.clone(),
        summary: doc.summary.clone(),
        concept_keys: doc.concept_keys.clone(),
        estimated_minutes: doc.estimated_minutes,
        blocks,
    };

    check_document(&next)?;

    if let Some((block, before)) = affected {
        citations::check(&block)?;
        policy::enforce(proposal.citation_policy, before, block.citations())?;
    }

    Ok(next)
}

fn requested_kind(proposal: &EditProposal) -> Result<BlockKind, ApplyError> {
    proposal.block_type.known().ok_or_else(|| {
        ApplyError::InvalidProposal(format!("unknown block type `{}`", proposal.block_type))
    })
}

fn check_not_stale(proposal: &EditProposal, current: &Block) -> Result<(), ApplyError> {
    let Some(expected) = proposal.before_block_text.as_deref() else {
        return Ok(());
    };

    let actual = current.content.primary_text().unwrap_or("");
    if expected.trim() != actual.trim() {
        return Err(ApplyError::StaleProposal {
            block_id: current.id.clone(),
        });
    }

    Ok(())
}

/// Build the block a replace/insert leaves behind at position `index`
fn build_block(
    proposal: &EditProposal,
    kind: BlockKind,
    existing: Option<&Block>,
    id: BlockId,
    index: usize,
) -> Result<Block, ApplyError> {
    let mut content = if let Some(candidate) = &proposal.after_block {
        validate_block_at(index, candidate)?.content
    } else if let Some(text) = &proposal.after_block_text {
        match existing {
            Some(block) => {
                let mut content = block.content.clone();
                if !content.set_primary_text(text.clone()) {
                    return Err(ApplyError::InvalidProposal(format!(
                        "{} blocks have no text to replace",
                        kind
                    )));
                }
                content
            }
            None => BlockContent::from_text(kind, text.clone()).ok_or_else(|| {
                ApplyError::InvalidProposal(format!(
                    "a {} block can't be built from text alone",
                    kind
                ))
            })?,
        }
    } else if existing.is_none() && kind == BlockKind::Divider {
        BlockContent::Divider
    } else {
        return Err(ApplyError::InvalidProposal(
            "proposal carries no replacement content".to_string(),
        ));
    };

    if content.kind() != kind {
        return Err(ApplyError::BlockTypeMismatch {
            expected: kind,
            found: content.kind(),
        });
    }

    if proposal.citation_policy == CitationPolicy::Strip {
        if let Some(slot) = content.citations_mut() {
            slot.clear();
        }
    } else if let Some(requested) = &proposal.after_citations {
        set_citations(&mut content, requested)?;
    }

    Ok(Block::new(id, content))
}

fn set_citations(content: &mut BlockContent, requested: &[Citation]) -> Result<(), ApplyError> {
    let kind = content.kind();
    match content.citations_mut() {
        Some(slot) => {
            *slot = requested.to_vec();
            Ok(())
        }
        None if requested.is_empty() => Ok(()),
        None => Err(ApplyError::InvalidProposal(format!(
            "{} blocks can't carry citations",
            kind
        ))),
    }
}

/// Derive an ID for an inserted block from the proposal's content
fn fresh_block_id(proposal: &EditProposal, doc: &NodeDoc) -> BlockId {
    let fingerprint = format!(
        "{}|{}|{}|{}|{}|{}",
        proposal.doc_id,
        proposal.path_node_id,
        proposal.action,
        proposal.instruction,
        proposal.after_block_text.as_deref().unwrap_or(""),
        proposal
            .after_block
            .as_ref()
            .map(|b| b.to_string())
            .unwrap_or_default(),
    );

    let mut generator = BlockIdGenerator::from_seed(content_seed(&fingerprint));
    BlockId::from(generator.next_unused(|candidate| doc.contains_block(candidate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::RequestedKind;
    use nodedoc_document::{validate, CitationLoc, SchemaError};
    use serde_json::json;

    fn sample_doc() -> NodeDoc {
        validate(&json!({
            "schemaVersion": 1,
            "title": "Enzymes",
            "blocks": [
                {
                    "id": "p-1",
                    "type": "paragraph",
                    "text": "Enzymes lower activation energy.",
                    "citations": [
                        { "chunkId": "bio-1", "quote": "activation energy", "loc": { "page": 3, "start": 10, "end": 27 } }
                    ]
                },
                { "id": "h-1", "type": "heading", "level": 3, "text": "Inhibitors" },
                { "id": "p-2", "type": "paragraph", "text": "Competitive inhibitors bind the active site." }
            ]
        }))
        .unwrap()
    }

    fn cite(chunk: &str) -> Citation {
        Citation::new(chunk, "quote", CitationLoc::new(0, 1, 2))
    }

    #[test]
    fn test_resolve_prefers_block_id_over_index() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::Delete, BlockKind::Heading)
            .with_block_id("h-1")
            .with_block_index(0);

        assert_eq!(
            resolve_target(&proposal, &doc),
            Ok(BlockLocator {
                index: 1,
                id: "h-1".into()
            })
        );
    }

    #[test]
    fn test_resolve_missing_id_does_not_fall_back_to_index() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::Delete, BlockKind::Paragraph)
            .with_block_id("missing")
            .with_block_index(0);

        assert_eq!(
            resolve_target(&proposal, &doc),
            Err(ApplyError::TargetNotFound(TargetRef::Id("missing".to_string())))
        );
    }

    #[test]
    fn test_resolve_out_of_range_index() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::Delete, BlockKind::Paragraph)
            .with_block_index(3);

        assert_eq!(
            resolve_target(&proposal, &doc),
            Err(ApplyError::TargetNotFound(TargetRef::Index(3)))
        );

        let unaddressed = EditProposal::new("d", ProposalAction::Delete, BlockKind::Paragraph);
        assert_eq!(
            resolve_target(&unaddressed, &doc),
            Err(ApplyError::TargetNotFound(TargetRef::Unspecified))
        );
    }

    #[test]
    fn test_replace_text_keeps_id_and_citations() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::Replace, BlockKind::Paragraph)
            .with_block_index(0)
            .with_after_text("Enzymes speed up reactions.");

        let next = apply(&proposal, &doc).unwrap();
        assert_eq!(next.blocks[0].id.as_str(), "p-1");
        assert_eq!(
            next.blocks[0].content.primary_text(),
            Some("Enzymes speed up reactions.")
        );
        assert_eq!(next.blocks[0].citations(), doc.blocks[0].citations());
    }

    #[test]
    fn test_insert_after_last_block() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::InsertAfter, BlockKind::Callout)
            .with_block_index(2)
            .with_after_text("Allosteric sites are elsewhere.");

        let next = apply(&proposal, &doc).unwrap();
        assert_eq!(next.blocks.len(), 4);
        assert_eq!(next.blocks[3].kind(), BlockKind::Callout);
        assert!(!doc.contains_block(next.blocks[3].id.as_str()));
    }

    #[test]
    fn test_insert_before_first_block() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::InsertBefore, BlockKind::Heading)
            .with_block_id("p-1")
            .with_after_text("Introduction");

        let next = apply(&proposal, &doc).unwrap();
        assert_eq!(next.blocks[0].kind(), BlockKind::Heading);
        assert_eq!(next.blocks[1].id.as_str(), "p-1");
    }

    #[test]
    fn test_insert_with_citations_under_preserve_is_rejected() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::InsertAfter, BlockKind::Paragraph)
            .with_block_index(0)
            .with_after_text("New claim.")
            .with_after_citations(vec![cite("bio-9")]);

        assert!(matches!(
            apply(&proposal, &doc),
            Err(ApplyError::CitationPolicy {
                policy: CitationPolicy::Preserve,
                ..
            })
        ));
    }

    #[test]
    fn test_kind_mismatch_on_replace() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::Replace, BlockKind::Heading)
            .with_block_index(0)
            .with_after_text("x");

        assert_eq!(
            apply(&proposal, &doc),
            Err(ApplyError::BlockTypeMismatch {
                expected: BlockKind::Heading,
                found: BlockKind::Paragraph
            })
        );
    }

    #[test]
    fn test_stale_before_text_is_rejected() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::Replace, BlockKind::Paragraph)
            .with_block_index(0)
            .with_before_text("Something else entirely.")
            .with_after_text("x");

        assert_eq!(
            apply(&proposal, &doc),
            Err(ApplyError::StaleProposal {
                block_id: "p-1".into()
            })
        );

        let fresh = proposal.with_before_text("  Enzymes lower activation energy. ");
        assert!(apply(&fresh, &doc).is_ok());
    }

    #[test]
    fn test_after_block_is_schema_validated() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::Replace, BlockKind::Heading)
            .with_block_id("h-1")
            .with_after_block(json!({ "type": "heading", "level": 7, "text": "Too deep" }));

        assert_eq!(
            apply(&proposal, &doc),
            Err(ApplyError::Schema(SchemaError::InvalidHeadingLevel {
                index: 1,
                level: 7
            }))
        );
    }

    #[test]
    fn test_after_block_errors_name_the_insert_position() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::InsertAfter, BlockKind::Heading)
            .with_block_id("p-2")
            .with_after_block(json!({ "type": "heading", "text": "No level" }));

        assert_eq!(
            apply(&proposal, &doc),
            Err(ApplyError::Schema(SchemaError::MissingBlockField {
                index: 3,
                kind: BlockKind::Heading,
                field: "level"
            }))
        );
    }

    #[test]
    fn test_unknown_block_type_is_invalid_proposal() {
        let doc = sample_doc();
        let mut proposal = EditProposal::new("d", ProposalAction::Replace, BlockKind::Paragraph)
            .with_block_id("p-2")
            .with_after_text("x");
        proposal.block_type = RequestedKind::Unknown("sidebar".to_string());

        assert_eq!(
            apply(&proposal, &doc),
            Err(ApplyError::InvalidProposal(
                "unknown block type `sidebar`".to_string()
            ))
        );

        let unresolvable = proposal.with_block_id("nope");
        assert!(matches!(
            apply(&unresolvable, &doc),
            Err(ApplyError::TargetNotFound(_))
        ));
    }

    #[test]
    fn test_after_block_cannot_change_kind() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::Replace, BlockKind::Paragraph)
            .with_block_id("p-2")
            .with_after_block(json!({ "type": "code", "code": "x = 1" }));

        assert!(matches!(
            apply(&proposal, &doc),
            Err(ApplyError::BlockTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed_citation_rejects_whole_apply() {
        let doc = sample_doc();
        let bad = Citation::new("bio-2", "quote", CitationLoc::new(0, 9, 3));
        let proposal = EditProposal::new("d", ProposalAction::Replace, BlockKind::Paragraph)
            .with_block_id("p-2")
            .with_policy(CitationPolicy::AllowNew)
            .with_after_text("x")
            .with_after_citations(vec![bad]);

        assert!(matches!(apply(&proposal, &doc), Err(ApplyError::Citation(_))));
    }

    #[test]
    fn test_text_on_divider_target_is_invalid() {
        let mut doc = sample_doc();
        doc.blocks.push(Block::new("d-1", BlockContent::Divider));

        let proposal = EditProposal::new("d", ProposalAction::Replace, BlockKind::Divider)
            .with_block_id("d-1")
            .with_after_text("x");

        assert!(matches!(
            apply(&proposal, &doc),
            Err(ApplyError::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_missing_content_is_invalid() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::Replace, BlockKind::Paragraph)
            .with_block_index(0);

        assert!(matches!(
            apply(&proposal, &doc),
            Err(ApplyError::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_insert_divider_needs_no_content() {
        let doc = sample_doc();
        let proposal = EditProposal::new("d", ProposalAction::InsertAfter, BlockKind::Divider)
            .with_block_index(0);

        let next = apply(&proposal, &doc).unwrap();
        assert_eq!(next.blocks[1].kind(), BlockKind::Divider);
    }
}
