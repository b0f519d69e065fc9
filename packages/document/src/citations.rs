//! Structural citation checks.
//!
//! Only shape is verified here. Whether a quote really appears in the source
//! corpus is a question for the corpus owner, not this crate.

use crate::error::CitationError;
use crate::model::{Block, NodeDoc};

/// Check every citation on a single block
pub fn check(block: &Block) -> Result<(), CitationError> {
    for (index, citation) in block.citations().iter().enumerate() {
        if citation.chunk_id.trim().is_empty() {
            return Err(CitationError::EmptyChunkId {
                block_id: block.id.clone(),
                index,
            });
        }

        if citation.quote.trim().is_empty() {
            return Err(CitationError::EmptyQuote {
                block_id: block.id.clone(),
                index,
            });
        }

        if citation.loc.start > citation.loc.end {
            return Err(CitationError::InvertedRange {
                block_id: block.id.clone(),
                index,
                start: citation.loc.start,
                end: citation.loc.end,
            });
        }
    }

    Ok(())
}

/// Check every block of a document, stopping at the first failure
pub fn check_document(doc: &NodeDoc) -> Result<(), CitationError> {
    doc.blocks.iter().try_for_each(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockContent, Citation, CitationLoc};

    fn paragraph(citations: Vec<Citation>) -> Block {
        Block::new(
            "p-1",
            BlockContent::Paragraph {
                text: "Mitochondria produce ATP.".to_string(),
                citations,
            },
        )
    }

    #[test]
    fn test_well_formed_citations_pass() {
        let block = paragraph(vec![
            Citation::new("chunk-7", "produce ATP", CitationLoc::new(3, 10, 21)),
            Citation::new("chunk-8", "ATP", CitationLoc::new(0, 5, 5)),
        ]);

        assert_eq!(check(&block), Ok(()));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let block = paragraph(vec![Citation::new(
            "chunk-7",
            "produce ATP",
            CitationLoc::new(3, 21, 10),
        )]);

        assert_eq!(
            check(&block),
            Err(CitationError::InvertedRange {
                block_id: "p-1".into(),
                index: 0,
                start: 21,
                end: 10,
            })
        );
    }

    #[test]
    fn test_blank_chunk_id_and_quote_rejected() {
        let block = paragraph(vec![Citation::new("  ", "q", CitationLoc::new(0, 0, 1))]);
        assert!(matches!(check(&block), Err(CitationError::EmptyChunkId { .. })));

        let block = paragraph(vec![Citation::new("c", "", CitationLoc::new(0, 0, 1))]);
        assert!(matches!(check(&block), Err(CitationError::EmptyQuote { .. })));
    }

    #[test]
    fn test_blocks_without_citations_pass() {
        let block = Block::new("d-1", BlockContent::Divider);
        assert_eq!(check(&block), Ok(()));
    }
}
