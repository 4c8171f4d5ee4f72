//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Cancel request/reply pair."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use crate::envelope::{Message, MessageType};
use crate::properties::PropertyError;
use crate::registry::RegistryBuilder;
use crate::reply::ProxyReply;
use crate::request::ProxyRequest;
use crate::{reply_message_base, request_message_base, Result};

const TARGET_REQUEST_ID_KEY: &str = "TargetRequestId";
const WAS_CANCELLED_KEY: &str = "WasCancelled";

/// Register the cancel family.
pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    builder
        .register(CancelRequest::new())?
        .register(CancelReply::new())?;
    Ok(())
}

/// Asks the peer to abandon another in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRequest {
    base: ProxyRequest,
}

impl CancelRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self {
            base: ProxyRequest::new(MessageType::CANCEL_REQUEST, MessageType::CANCEL_REPLY),
        }
    }

    /// Request layer.
    pub fn request(&self) -> &ProxyRequest {
        &self.base
    }

    /// Mutable request layer.
    pub fn request_mut(&mut self) -> &mut ProxyRequest {
        &mut self.base
    }

    /// Correlation id of the request to cancel.
    pub fn target_request_id(&self) -> std::result::Result<Option<i64>, PropertyError> {
        self.base.properties().get(TARGET_REQUEST_ID_KEY)
    }

    /// Set or clear the target request id.
    pub fn set_target_request_id(&mut self, value: Option<i64>) {
        self.base
            .properties_mut()
            .set(TARGET_REQUEST_ID_KEY, value.as_ref());
    }
}

impl Default for CancelRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl Message for CancelRequest {
    request_message_base!(base);

    fn clone_message(&self) -> Box<dyn Message> {
        let mut clone = CancelRequest::new();
        self.copy_to(&mut clone);
        Box::new(clone)
    }

    fn copy_to(&self, target: &mut dyn Message) {
        if let Some(base) = target.as_request_mut() {
            self.base.copy_to(base);
        }
        if let Some(target) = target.downcast_mut::<CancelRequest>() {
            self.base
                .properties()
                .copy_key(TARGET_REQUEST_ID_KEY, target.base.properties_mut());
        }
    }
}

/// Answers [`CancelRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReply {
    base: ProxyReply,
}

impl CancelReply {
    /// Create an empty reply.
    pub fn new() -> Self {
        Self {
            base: ProxyReply::new(MessageType::CANCEL_REPLY),
        }
    }

    /// Reply layer.
    pub fn reply(&self) -> &ProxyReply {
        &self.base
    }

    /// Mutable reply layer.
    pub fn reply_mut(&mut self) -> &mut ProxyReply {
        &mut self.base
    }

    /// Whether the target request was still pending and got cancelled.
    pub fn was_cancelled(&self) -> std::result::Result<Option<bool>, PropertyError> {
        self.base.properties().get(WAS_CANCELLED_KEY)
    }

    /// Set or clear the cancellation outcome.
    pub fn set_was_cancelled(&mut self, value: Option<bool>) {
        self.base
            .properties_mut()
            .set(WAS_CANCELLED_KEY, value.as_ref());
    }
}

impl Default for CancelReply {
    fn default() -> Self {
        Self::new()
    }
}

impl Message for CancelReply {
    reply_message_base!(base);

    fn clone_message(&self) -> Box<dyn Message> {
        let mut clone = CancelReply::new();
        self.copy_to(&mut clone);
        Box::new(clone)
    }

    fn copy_to(&self, target: &mut dyn Message) {
        if let Some(base) = target.as_reply_mut() {
            self.base.copy_to(base);
        }
        if let Some(target) = target.downcast_mut::<CancelReply>() {
            self.base
                .properties()
                .copy_key(WAS_CANCELLED_KEY, target.base.properties_mut());
        }
    }
}
