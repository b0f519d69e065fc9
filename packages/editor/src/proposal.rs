//! # Edit Proposals
//!
//! Server-issued requests to change exactly one block of one document.
//!
//! Proposals ride along in the `metadata` of chat/event messages. Most
//! messages on a channel carry no proposal at all, so [`parse`] answers
//! `None` for anything it can't use instead of failing.
//!
//! ## Actions
//!
//! - `insert_before` / `insert_after`: new block next to an existing anchor
//! - `replace`: swap the target's content, keeping its block id
//! - `delete`: remove the target

use nodedoc_document::{BlockKind, Citation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Metadata keys a proposal may live under, in lookup order
pub const PROPOSAL_KEYS: [&str; 2] = ["proposal", "edit_proposal"];

/// A request to edit one block of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditProposal {
    #[serde(default, alias = "pathNodeId")]
    pub path_node_id: String,

    #[serde(default, alias = "pathId")]
    pub path_id: String,

    #[serde(alias = "docId")]
    pub doc_id: String,

    #[serde(default, alias = "blockId", skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,

    #[serde(default, alias = "blockIndex", skip_serializing_if = "Option::is_none")]
    pub block_index: Option<usize>,

    /// Kind of the affected block (target for replace/delete, new block for inserts)
    #[serde(alias = "blockType")]
    pub block_type: RequestedKind,

    pub action: ProposalAction,

    #[serde(default, alias = "citationPolicy")]
    pub citation_policy: CitationPolicy,

    #[serde(default)]
    pub instruction: String,

    #[serde(default, alias = "beforeBlockText", skip_serializing_if = "Option::is_none")]
    pub before_block_text: Option<String>,

    #[serde(default, alias = "afterBlockText", skip_serializing_if = "Option::is_none")]
    pub after_block_text: Option<String>,

    /// Full replacement block, authored by the proposer
    #[serde(default, alias = "afterBlock", skip_serializing_if = "Option::is_none")]
    pub after_block: Option<Value>,

    /// Exact citation list for the resulting block
    #[serde(default, alias = "afterCitations", skip_serializing_if = "Option::is_none")]
    pub after_citations: Option<Vec<Citation>>,
}

impl EditProposal {
    /// Minimal proposal addressed by index; remaining fields start empty
    pub fn new(doc_id: impl Into<String>, action: ProposalAction, block_type: BlockKind) -> Self {
        Self {
            path_node_id: String::new(),
            path_id: String::new(),
            doc_id: doc_id.into(),
            block_id: None,
            block_index: None,
            block_type: block_type.into(),
            action,
            citation_policy: CitationPolicy::default(),
            instruction: String::new(),
            before_block_text: None,
            after_block_text: None,
            after_block: None,
            after_citations: None,
        }
    }

    pub fn with_block_id(mut self, id: impl Into<String>) -> Self {
        self.block_id = Some(id.into());
        self
    }

    pub fn with_block_index(mut self, index: usize) -> Self {
        self.block_index = Some(index);
        self
    }

    pub fn with_policy(mut self, policy: CitationPolicy) -> Self {
        self.citation_policy = policy;
        self
    }

    pub fn with_after_text(mut self, text: impl Into<String>) -> Self {
        self.after_block_text = Some(text.into());
        self
    }

    pub fn with_before_text(mut self, text: impl Into<String>) -> Self {
        self.before_block_text = Some(text.into());
        self
    }

    pub fn with_after_block(mut self, block: Value) -> Self {
        self.after_block = Some(block);
        self
    }

    pub fn with_after_citations(mut self, citations: Vec<Citation>) -> Self {
        self.after_citations = Some(citations);
        self
    }
}

/// Block kind named by a proposal
///
/// Names outside the twelve known kinds still parse, so the proposal can be
/// rejected with a reason instead of vanishing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestedKind {
    Known(BlockKind),
    Unknown(String),
}

impl RequestedKind {
    pub fn known(&self) -> Option<BlockKind> {
        match self {
            RequestedKind::Known(kind) => Some(*kind),
            RequestedKind::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RequestedKind::Known(kind) => kind.as_str(),
            RequestedKind::Unknown(name) => name,
        }
    }
}

impl From<BlockKind> for RequestedKind {
    fn from(kind: BlockKind) -> Self {
        RequestedKind::Known(kind)
    }
}

impl fmt::Display for RequestedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalAction {
    InsertBefore,
    InsertAfter,
    Replace,
    Delete,
}

impl ProposalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalAction::InsertBefore => "insert_before",
            ProposalAction::InsertAfter => "insert_after",
            ProposalAction::Replace => "replace",
            ProposalAction::Delete => "delete",
        }
    }

    /// Whether the action rewrites or removes the target itself
    pub fn touches_target(&self) -> bool {
        matches!(self, ProposalAction::Replace | ProposalAction::Delete)
    }
}

impl fmt::Display for ProposalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the resulting block may do with citations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationPolicy {
    /// Citation set must be identical before and after
    #[default]
    Preserve,
    /// Citations may be added
    AllowNew,
    /// Resulting block carries no citations
    Strip,
}

impl CitationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationPolicy::Preserve => "preserve",
            CitationPolicy::AllowNew => "allow_new",
            CitationPolicy::Strip => "strip",
        }
    }
}

impl fmt::Display for CitationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract a proposal from message metadata
///
/// `raw_metadata` may be an object or a string holding JSON. Returns `None`
/// when the payload isn't a keyed structure, carries neither `proposal` nor
/// `edit_proposal`, or the proposal under those keys is malformed.
pub fn parse(raw_metadata: &Value) -> Option<EditProposal> {
    let decoded;
    let object = match raw_metadata {
        Value::Object(map) => map,
        Value::String(text) => {
            decoded = serde_json::from_str::<Value>(text).ok()?;
            decoded.as_object()?
        }
        _ => return None,
    };

    PROPOSAL_KEYS
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(decode_proposal)
}

/// Convenience wrapper for metadata that arrives as text
pub fn parse_str(raw_metadata: &str) -> Option<EditProposal> {
    let value = serde_json::from_str::<Value>(raw_metadata)
        .unwrap_or_else(|_| Value::String(raw_metadata.to_string()));
    parse(&value)
}

fn decode_proposal(candidate: &Value) -> Option<EditProposal> {
    let result = match candidate {
        Value::Object(_) => EditProposal::deserialize(candidate),
        Value::String(text) => serde_json::from_str::<EditProposal>(text),
        _ => return None,
    };

    match result {
        Ok(proposal) => Some(proposal),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed proposal payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn proposal_json() -> Value {
        json!({
            "path_node_id": "node-9",
            "path_id": "path-2",
            "doc_id": "doc-1",
            "block_index": 0,
            "block_type": "paragraph",
            "action": "replace",
            "citation_policy": "allow_new",
            "instruction": "Tighten the intro",
            "after_block_text": "Shorter intro."
        })
    }

    #[test]
    fn test_parse_object_under_proposal_key() {
        let metadata = json!({ "proposal": proposal_json() });
        let proposal = parse(&metadata).expect("Should parse");

        assert_eq!(proposal.doc_id, "doc-1");
        assert_eq!(proposal.block_index, Some(0));
        assert_eq!(proposal.action, ProposalAction::Replace);
        assert_eq!(proposal.citation_policy, CitationPolicy::AllowNew);
        assert_eq!(proposal.block_type, RequestedKind::Known(BlockKind::Paragraph));
    }

    #[test]
    fn test_parse_edit_proposal_key_from_string_metadata() {
        let metadata = json!({ "edit_proposal": proposal_json() }).to_string();
        let proposal = parse(&Value::String(metadata)).expect("Should parse");

        assert_eq!(proposal.path_node_id, "node-9");
    }

    #[test]
    fn test_parse_accepts_camel_case_fields() {
        let metadata = json!({
            "proposal": {
                "pathNodeId": "n",
                "pathId": "p",
                "docId": "d",
                "blockId": "b-1",
                "blockType": "heading",
                "action": "delete",
                "citationPolicy": "strip",
                "instruction": ""
            }
        });

        let proposal = parse(&metadata).unwrap();
        assert_eq!(proposal.block_id.as_deref(), Some("b-1"));
        assert_eq!(proposal.citation_policy, CitationPolicy::Strip);
    }

    #[test]
    fn test_parse_proposal_encoded_as_string() {
        let metadata = json!({ "proposal": proposal_json().to_string() });
        assert!(parse(&metadata).is_some());
    }

    #[test]
    fn test_parse_returns_none_for_non_proposals() {
        assert_eq!(parse(&json!({ "kind": "chat" })), None);
        assert_eq!(parse(&json!("not json at all")), None);
        assert_eq!(parse(&json!(42)), None);
        assert_eq!(parse(&json!(["proposal"])), None);
        assert_eq!(parse(&json!({ "proposal": null })), None);
    }

    #[test]
    fn test_parse_returns_none_for_malformed_proposal() {
        let mut bad = proposal_json();
        bad["action"] = json!("rewrite");
        assert_eq!(parse(&json!({ "proposal": bad })), None);

        let mut untyped = proposal_json();
        untyped["block_type"] = json!(3);
        assert_eq!(parse(&json!({ "proposal": untyped })), None);
    }

    #[test]
    fn test_unknown_block_type_still_parses() {
        let mut sidebar = proposal_json();
        sidebar["block_type"] = json!("sidebar");

        let proposal = parse(&json!({ "proposal": sidebar })).unwrap();
        assert_eq!(proposal.block_type, RequestedKind::Unknown("sidebar".to_string()));
        assert_eq!(proposal.block_type.known(), None);
        assert_eq!(proposal.block_type.to_string(), "sidebar");
    }

    #[test]
    fn test_falls_back_to_edit_proposal_when_proposal_is_malformed() {
        let metadata = json!({
            "proposal": { "nonsense": true },
            "edit_proposal": proposal_json()
        });

        assert_eq!(parse(&metadata).map(|p| p.doc_id), Some("doc-1".to_string()));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let metadata = json!({ "proposal": proposal_json() });
        assert_eq!(parse(&metadata), parse(&metadata));
        assert_eq!(parse_str(&metadata.to_string()), parse(&metadata));
    }

    #[test]
    fn test_default_policy_is_preserve() {
        let mut body = proposal_json();
        body.as_object_mut().unwrap().remove("citation_policy");

        let proposal = parse(&json!({ "proposal": body })).unwrap();
        assert_eq!(proposal.citation_policy, CitationPolicy::Preserve);
    }
}
