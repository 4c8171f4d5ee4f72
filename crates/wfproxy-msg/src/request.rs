//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Request layer carrying the correlation id and expected reply type."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use crate::envelope::{MessageType, ProxyMessage};
use crate::properties::{PropertyBag, PropertyError};

/// Property key holding the correlation id.
pub const REQUEST_ID_KEY: &str = "RequestId";

/// Envelope specialised for requests.
///
/// Adds a correlation id, assigned by the sender and unique among its
/// in-flight requests, and the reply type the sender will wait for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    message: ProxyMessage,
    reply_type: MessageType,
}

impl ProxyRequest {
    /// Create a request envelope of `message_type` answered by `reply_type`.
    pub fn new(message_type: MessageType, reply_type: MessageType) -> Self {
        Self {
            message: ProxyMessage::new(message_type),
            reply_type,
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

    /// Type id of the reply this request expects.
    pub fn reply_type(&self) -> MessageType {
        self.reply_type
    }

    /// Property storage.
    pub fn properties(&self) -> &PropertyBag {
        self.message.properties()
    }

    /// Mutable property storage.
    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        self.message.properties_mut()
    }

    /// Correlation id.
    pub fn request_id(&self) -> Result<Option<i64>, PropertyError> {
        self.properties().get(REQUEST_ID_KEY)
    }

    /// Set or clear the correlation id.
    pub fn set_request_id(&mut self, value: Option<i64>) {
        self.properties_mut().set(REQUEST_ID_KEY, value.as_ref());
    }

    /// Copy the request-level fields into `target`.
    ///
    /// The correlation id is only copied when this request carries one, so a
    /// target keeps its own id when the source has none. The stored text is
    /// copied as-is, unreadable or not.
    pub fn copy_to(&self, target: &mut ProxyRequest) {
        if self.properties().contains(REQUEST_ID_KEY) {
            self.properties().copy_key(REQUEST_ID_KEY, target.properties_mut());
        }
    }
}
