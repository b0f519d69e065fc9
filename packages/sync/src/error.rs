//! Error types for the sync layer

use nodedoc_editor::ApplyError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of the event stream connection
///
/// Delivered to `on_error` observers; the client never reconnects by itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Stream endpoint answered with status {status}")]
    Status { status: u16 },

    #[error("Stream read failed: {0}")]
    Read(String),

    #[error("Stream ended by server")]
    Ended,

    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    pub(crate) fn from_reqwest(error: &reqwest::Error) -> Self {
        match error.status() {
            Some(status) => TransportError::Status {
                status: status.as_u16(),
            },
            None => TransportError::Request(error.to_string()),
        }
    }
}

/// Failure of a subscribe/unsubscribe round trip
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Subscription request for `{channel}` failed: {message}")]
    Transport { channel: String, message: String },

    #[error("Subscription request for `{channel}` rejected with status {status}")]
    Rejected { channel: String, status: u16 },
}

impl SubscriptionError {
    pub fn channel(&self) -> &str {
        match self {
            SubscriptionError::Transport { channel, .. }
            | SubscriptionError::Rejected { channel, .. } => channel,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Failure loading a document file into a session
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid document {}: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: ApplyError,
    },
}
