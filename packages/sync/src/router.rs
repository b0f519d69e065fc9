//! Frame decoding and routing.
//!
//! Frames are JSON envelopes:
//!
//! ```json
//! { "channel": "thread-42", "type": "message", "metadata": { "proposal": { ... } } }
//! ```
//!
//! Every field is optional. A frame without a channel is delivered to
//! everyone; a frame for a channel this client hasn't subscribed to is
//! dropped.

use crate::registry::ChannelSubscriptionRegistry;
use nodedoc_editor::EditProposal;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Decoded frame envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub channel: Option<String>,
    pub kind: Option<String>,
    pub metadata: Option<Value>,
    /// The complete envelope as received
    pub body: Map<String, Value>,
}

impl Frame {
    /// Decode an envelope; `None` for non-JSON or non-object frames
    pub fn decode(raw: &str) -> Option<Self> {
        let body = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(body)) => body,
            Ok(_) => return None,
            Err(_) => return None,
        };

        let text_field = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let channel = text_field("channel");
        let kind = text_field("type");
        let metadata = body.get("metadata").filter(|m| !m.is_null()).cloned();

        Some(Self {
            channel,
            kind,
            metadata,
            body,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Not a JSON object
    Ignored,
    /// Addressed to a channel that isn't subscribed
    Unsubscribed { channel: String },
    Proposal {
        frame: Frame,
        proposal: EditProposal,
    },
    Message(Frame),
}

/// Route one raw frame given a subscription predicate
pub fn route(raw: &str, is_subscribed: impl Fn(&str) -> bool) -> Route {
    let Some(frame) = Frame::decode(raw) else {
        tracing::debug!(len = raw.len(), "Ignoring non-object frame");
        return Route::Ignored;
    };

    if let Some(channel) = &frame.channel {
        if !is_subscribed(channel) {
            tracing::debug!(channel = %channel, "Dropping frame for unsubscribed channel");
            return Route::Unsubscribed {
                channel: channel.clone(),
            };
        }
    }

    match frame.metadata.as_ref().and_then(nodedoc_editor::parse) {
        Some(proposal) => Route::Proposal { frame, proposal },
        None => Route::Message(frame),
    }
}

/// Routes frames against a registry's active channels
pub struct FrameRouter {
    registry: Arc<ChannelSubscriptionRegistry>,
}

impl FrameRouter {
    pub fn new(registry: Arc<ChannelSubscriptionRegistry>) -> Self {
        Self { registry }
    }

    pub fn route(&self, raw: &str) -> Route {
        route(raw, |channel| self.registry.is_subscribed(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodedoc_editor::ProposalAction;
    use serde_json::json;

    fn subscribed(channel: &str) -> bool {
        channel == "thread-42"
    }

    #[test]
    fn test_non_objects_are_ignored() {
        assert_eq!(route("ping", subscribed), Route::Ignored);
        assert_eq!(route("[1,2]", subscribed), Route::Ignored);
        assert_eq!(route("\"text\"", subscribed), Route::Ignored);
        assert_eq!(route("", subscribed), Route::Ignored);
    }

    #[test]
    fn test_unsubscribed_channel_is_dropped() {
        let raw = json!({ "channel": "thread-7", "type": "message" }).to_string();
        assert_eq!(
            route(&raw, subscribed),
            Route::Unsubscribed {
                channel: "thread-7".to_string()
            }
        );
    }

    #[test]
    fn test_frames_without_channel_pass() {
        let raw = json!({ "type": "presence" }).to_string();
        let Route::Message(frame) = route(&raw, subscribed) else {
            panic!("expected a message route");
        };
        assert_eq!(frame.kind.as_deref(), Some("presence"));
        assert_eq!(frame.channel, None);
    }

    #[test]
    fn test_proposal_in_object_metadata() {
        let raw = json!({
            "channel": "thread-42",
            "metadata": {
                "proposal": {
                    "doc_id": "d",
                    "block_index": 0,
                    "block_type": "paragraph",
                    "action": "delete"
                }
            }
        })
        .to_string();

        let Route::Proposal { frame, proposal } = route(&raw, subscribed) else {
            panic!("expected a proposal route");
        };
        assert_eq!(frame.channel.as_deref(), Some("thread-42"));
        assert_eq!(proposal.action, ProposalAction::Delete);
    }

    #[test]
    fn test_proposal_in_string_metadata() {
        let metadata = json!({
            "edit_proposal": {
                "doc_id": "d",
                "block_id": "b",
                "block_type": "heading",
                "action": "replace",
                "after_block_text": "New"
            }
        })
        .to_string();
        let raw = json!({ "channel": " thread-42 ", "metadata": metadata }).to_string();

        assert!(matches!(route(&raw, subscribed), Route::Proposal { .. }));
    }

    #[test]
    fn test_malformed_proposal_is_plain_message() {
        let raw = json!({
            "channel": "thread-42",
            "metadata": { "proposal": { "action": "explode" } }
        })
        .to_string();

        assert!(matches!(route(&raw, subscribed), Route::Message(_)));
    }
}
