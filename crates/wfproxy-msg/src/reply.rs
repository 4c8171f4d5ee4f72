//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Reply layer carrying the correlation id and optional error."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::envelope::{MessageType, ProxyMessage};
use crate::properties::{FromProperty, PropertyBag, PropertyError, ToProperty};
use crate::request::REQUEST_ID_KEY;

/// Property key holding the reply error.
pub const ERROR_KEY: &str = "Error";

/// Classification of an error reported by the peer runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The operation was cancelled.
    Cancelled,
    /// Application-defined failure.
    Custom,
    /// Unclassified failure.
    Generic,
    /// The peer panicked while handling the request.
    Panic,
    /// The workflow or activity was terminated.
    Terminated,
    /// The operation exceeded its deadline.
    Timeout,
}

impl ErrorKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Custom => "custom",
            ErrorKind::Generic => "generic",
            ErrorKind::Panic => "panic",
            ErrorKind::Terminated => "terminated",
            ErrorKind::Timeout => "timeout",
        }
    }
}

/// Error carried by a failed reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{} error: {message}", .kind.as_str())]
pub struct ProxyError {
    /// Error classification.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Human readable message.
    pub message: String,
    /// Optional extra context, e.g. a stack trace.
    #[serde(default)]
    pub details: Option<String>,
}

impl ProxyError {
    /// Construct an error without details.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

// Errors are stored as a JSON object so the peer can read them without a
// second framing layer.
impl ToProperty for ProxyError {
    fn to_property(&self) -> String {
        serde_json::json!({
            "type": self.kind.as_str(),
            "message": self.message,
            "details": self.details,
        })
        .to_string()
    }
}

impl FromProperty for ProxyError {
    const TYPE_NAME: &'static str = "error";

    fn from_property(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

/// Envelope specialised for replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyReply {
    message: ProxyMessage,
}

impl ProxyReply {
    /// Create a reply envelope of `message_type`.
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message: ProxyMessage::new(message_type),
        }
    }

    /// Underlying envelope.
    pub fn message(&self) -> &ProxyMessage {
        &self.message
    }

    /// Mutable underlying envelope.
    pub fn message_mut(&mut self) -> &mut ProxyMessage {
        &mut self.message
    }

    /// Wire type id.
    pub fn message_type(&self) -> MessageType {
        self.message.message_type()
    }

    /// Property storage.
    pub fn properties(&self) -> &PropertyBag {
        self.message.properties()
    }

    /// Mutable property storage.
    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        self.message.properties_mut()
    }

    /// Correlation id; equals the id of the request being answered.
    pub fn request_id(&self) -> Result<Option<i64>, PropertyError> {
        self.properties().get(REQUEST_ID_KEY)
    }

    /// Set or clear the correlation id.
    pub fn set_request_id(&mut self, value: Option<i64>) {
        self.properties_mut().set(REQUEST_ID_KEY, value.as_ref());
    }

    /// Error reported by the peer; `None` means success.
    pub fn error(&self) -> Result<Option<ProxyError>, PropertyError> {
        self.properties().get(ERROR_KEY)
    }

    /// Set or clear the error.
    pub fn set_error(&mut self, value: Option<&ProxyError>) {
        self.properties_mut().set(ERROR_KEY, value);
    }

    /// Whether the reply reports success.
    pub fn is_success(&self) -> bool {
        !self.properties().contains(ERROR_KEY)
    }

    /// Copy the reply-level fields into `target`.
    ///
    /// The correlation id follows the same rule as requests; the error is
    /// always copied so a successful source yields a successful target.
    /// Stored text is copied as-is, unreadable or not.
    pub fn copy_to(&self, target: &mut ProxyReply) {
        if self.properties().contains(REQUEST_ID_KEY) {
            self.properties().copy_key(REQUEST_ID_KEY, target.properties_mut());
        }
        self.properties().copy_key(ERROR_KEY, target.properties_mut());
    }
}
