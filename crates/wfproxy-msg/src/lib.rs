//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Proxy message envelopes, type registry and request correlation."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
//! Generic message envelope shared by both sides of the workflow proxy.
//!
//! Every operation exchanged with the proxy is a [`ProxyMessage`]: a wire
//! type id plus a [`PropertyBag`]. Requests and replies layer a correlation
//! id on top, and concrete kinds under [`messages`] expose typed accessors
//! over well-known property keys. Decoding goes through a [`TypeRegistry`]
//! populated once at start-up.
#![warn(missing_docs)]

pub mod codec;
pub mod envelope;
pub mod logging;
pub mod messages;
pub mod pending;
pub mod properties;
pub mod registry;
pub mod reply;
pub mod request;
pub mod supervisor;
pub mod transport;

use envelope::MessageType;

/// Shared result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;

/// Errors raised by the envelope core and the request correlation layer.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// The wire type id has no registered prototype.
    #[error("unknown message type: {0}")]
    UnknownMessageType(MessageType),
    /// A message type was registered twice.
    #[error("message type {0} is already registered")]
    DuplicateMessageType(MessageType),
    /// A property could not be parsed as the requested type.
    #[error(transparent)]
    Property(#[from] properties::PropertyError),
    /// The frame bytes do not follow the wire layout.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// The frame exceeds the configured maximum size.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Declared or encoded size of the frame body.
        size: usize,
        /// Configured limit.
        max: usize,
    },
    /// A request or reply does not carry a correlation id.
    #[error("{0} message carries no request id")]
    MissingRequestId(MessageType),
    /// A message was sent as a request but is not one.
    #[error("{0} is not a request message")]
    NotARequest(MessageType),
    /// A message was handed to the correlation layer but is not a reply.
    #[error("{0} is not a reply message")]
    NotAReply(MessageType),
    /// A request id is already in flight.
    #[error("request id {0} is already pending")]
    DuplicateRequestId(i64),
    /// A reply arrived for a request id nobody is waiting on.
    #[error("orphan reply for request id {request_id} ({message_type})")]
    OrphanReply {
        /// Correlation id carried by the reply.
        request_id: i64,
        /// Wire type of the reply.
        message_type: MessageType,
    },
    /// The pending request was cancelled before a reply arrived.
    #[error("request {request_id} was cancelled")]
    Cancelled {
        /// Correlation id of the cancelled request.
        request_id: i64,
    },
    /// The pending request did not receive a reply in time.
    #[error("request {request_id} timed out")]
    TimedOut {
        /// Correlation id of the expired request.
        request_id: i64,
    },
    /// The transport peer is gone.
    #[error("transport closed: {0}")]
    TransportClosed(&'static str),
    /// Wrapper for IO errors raised by stream transports.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub use codec::{decode, encode, encode_message, ProxyCodec, DEFAULT_MAX_FRAME_SIZE};
pub use envelope::{Message, ProxyMessage};
pub use logging::{log_message, MessageDirection, MessagingMetricsExporter};
pub use pending::{PendingReply, PendingRequests};
pub use properties::{FromProperty, PropertyBag, PropertyError, ToProperty};
pub use registry::{RegistryBuilder, TypeRegistry};
pub use reply::{ErrorKind, ProxyError, ProxyReply};
pub use request::ProxyRequest;
pub use supervisor::{BridgeMetrics, Inbound, ProxyBridge};
pub use transport::{InMemoryTransport, Transport};
