//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Echo request/reply pair used as a connectivity check."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use crate::envelope::{Message, MessageType};
use crate::properties::PropertyError;
use crate::registry::RegistryBuilder;
use crate::reply::ProxyReply;
use crate::request::ProxyRequest;
use crate::{reply_message_base, request_message_base, Result};

const PAYLOAD_KEY: &str = "Payload";

/// Register the echo family.
pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    builder
        .register(EchoRequest::new())?
        .register(EchoReply::new())?;
    Ok(())
}

/// Asks the peer to send the payload straight back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoRequest {
    base: ProxyRequest,
}

impl EchoRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self {
            base: ProxyRequest::new(MessageType::ECHO_REQUEST, MessageType::ECHO_REPLY),
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

    /// Opaque payload.
    pub fn payload(&self) -> std::result::Result<Option<Vec<u8>>, PropertyError> {
        self.base.properties().get(PAYLOAD_KEY)
    }

    /// Set or clear the payload.
    pub fn set_payload(&mut self, value: Option<&[u8]>) {
        self.base.properties_mut().set(PAYLOAD_KEY, value);
    }
}

impl Default for EchoRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl Message for EchoRequest {
    request_message_base!(base);

    fn clone_message(&self) -> Box<dyn Message> {
        let mut clone = EchoRequest::new();
        self.copy_to(&mut clone);
        Box::new(clone)
    }

    fn copy_to(&self, target: &mut dyn Message) {
        if let Some(base) = target.as_request_mut() {
            self.base.copy_to(base);
        }
        if let Some(target) = target.downcast_mut::<EchoRequest>() {
            self.base
                .properties()
                .copy_key(PAYLOAD_KEY, target.base.properties_mut());
        }
    }
}

/// Answers [`EchoRequest`] with the same payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoReply {
    base: ProxyReply,
}

impl EchoReply {
    /// Create an empty reply.
    pub fn new() -> Self {
        Self {
            base: ProxyReply::new(MessageType::ECHO_REPLY),
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

    /// Echoed payload.
    pub fn payload(&self) -> std::result::Result<Option<Vec<u8>>, PropertyError> {
        self.base.properties().get(PAYLOAD_KEY)
    }

    /// Set or clear the payload.
    pub fn set_payload(&mut self, value: Option<&[u8]>) {
        self.base.properties_mut().set(PAYLOAD_KEY, value);
    }
}

impl Default for EchoReply {
    fn default() -> Self {
        Self::new()
    }
}

impl Message for EchoReply {
    reply_message_base!(base);

    fn clone_message(&self) -> Box<dyn Message> {
        let mut clone = EchoReply::new();
        self.copy_to(&mut clone);
        Box::new(clone)
    }

    fn copy_to(&self, target: &mut dyn Message) {
        if let Some(base) = target.as_reply_mut() {
            self.base.copy_to(base);
        }
        if let Some(target) = target.downcast_mut::<EchoReply>() {
            self.base
                .properties()
                .copy_key(PAYLOAD_KEY, target.base.properties_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_is_present() {
        let mut request = EchoRequest::new();
        request.set_payload(Some(&b""[..]));
        assert_eq!(request.payload().unwrap(), Some(Vec::new()));
        request.set_payload(None);
        assert_eq!(request.payload().unwrap(), None);
    }

    #[test]
    fn clone_preserves_binary_payload() {
        let mut reply = EchoReply::new();
        reply.set_payload(Some(&[0, 159, 146, 150, 255][..]));
        reply.reply_mut().set_request_id(Some(6));

        let clone = reply.clone_message();
        let typed = clone.downcast_ref::<EchoReply>().unwrap();
        assert_eq!(typed.payload().unwrap(), Some(vec![0, 159, 146, 150, 255]));
        assert_eq!(typed.reply().request_id().unwrap(), Some(6));
    }
}
