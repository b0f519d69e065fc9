//! Citation policy enforcement.
//!
//! Compares the citation set of the affected block before and after a
//! proposal. This is the last gate an apply passes through.

use crate::errors::ApplyError;
use crate::proposal::CitationPolicy;
use nodedoc_document::Citation;
use std::collections::BTreeSet;

/// Check the resulting citations against the proposal's policy
pub fn enforce(
    policy: CitationPolicy,
    before: &[Citation],
    after: &[Citation],
) -> Result<(), ApplyError> {
    let before_set: BTreeSet<&Citation> = before.iter().collect();
    let after_set: BTreeSet<&Citation> = after.iter().collect();

    let violated = match policy {
        CitationPolicy::Preserve => before_set != after_set,
        CitationPolicy::AllowNew => false,
        CitationPolicy::Strip => !after_set.is_empty(),
    };

    if !violated {
        return Ok(());
    }

    Err(ApplyError::CitationPolicy {
        policy,
        added: after_set
            .difference(&before_set)
            .map(|c| c.chunk_id.clone())
            .collect(),
        removed: before_set
            .difference(&after_set)
            .map(|c| c.chunk_id.clone())
            .collect(),
    })
}
