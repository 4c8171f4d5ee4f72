//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Initialize request/reply pair."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
//! The proxy sends `InitializeRequest` once it is up, telling the library
//! where to send callbacks. This pair is the reference for how a concrete
//! kind is put together: a base layer, typed accessors that project onto
//! fixed property keys, and hand-written clone/copy.
use crate::envelope::{Message, MessageType};
use crate::registry::RegistryBuilder;
use crate::reply::ProxyReply;
use crate::request::ProxyRequest;
use crate::{reply_message_base, request_message_base, Result};

const LIBRARY_ADDRESS_KEY: &str = "LibraryAddress";
const LIBRARY_PORT_KEY: &str = "LibraryPort";

/// Register the initialize family.
pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    builder
        .register(InitializeRequest::new())?
        .register(InitializeReply::new())?;
    Ok(())
}

/// Announces the library's callback endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeRequest {
    base: ProxyRequest,
}

impl InitializeRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self {
            base: ProxyRequest::new(
                MessageType::INITIALIZE_REQUEST,
                MessageType::INITIALIZE_REPLY,
            ),
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

    /// Address the library listens on.
    pub fn library_address(&self) -> Option<String> {
        self.base.properties().text(LIBRARY_ADDRESS_KEY).map(str::to_owned)
    }

    /// Set or clear the library address.
    pub fn set_library_address(&mut self, value: Option<&str>) {
        self.base.properties_mut().set(LIBRARY_ADDRESS_KEY, value);
    }

    /// Port the library listens on, kept as text.
    pub fn library_port(&self) -> Option<String> {
        self.base.properties().text(LIBRARY_PORT_KEY).map(str::to_owned)
    }

    /// Set or clear the library port.
    pub fn set_library_port(&mut self, value: Option<&str>) {
        self.base.properties_mut().set(LIBRARY_PORT_KEY, value);
    }
}

impl Default for InitializeRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl Message for InitializeRequest {
    request_message_base!(base);

    fn clone_message(&self) -> Box<dyn Message> {
        let mut clone = InitializeRequest::new();
        self.copy_to(&mut clone);
        Box::new(clone)
    }

    fn copy_to(&self, target: &mut dyn Message) {
        if let Some(base) = target.as_request_mut() {
            self.base.copy_to(base);
        }
        if let Some(target) = target.downcast_mut::<InitializeRequest>() {
            target.set_library_address(self.library_address().as_deref());
            target.set_library_port(self.library_port().as_deref());
        }
    }
}

/// Acknowledges [`InitializeRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeReply {
    base: ProxyReply,
}

impl InitializeReply {
    /// Create an empty reply.
    pub fn new() -> Self {
        Self {
            base: ProxyReply::new(MessageType::INITIALIZE_REPLY),
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
}

impl Default for InitializeReply {
    fn default() -> Self {
        Self::new()
    }
}

impl Message for InitializeReply {
    reply_message_base!(base);

    fn clone_message(&self) -> Box<dyn Message> {
        let mut clone = InitializeReply::new();
        self.copy_to(&mut clone);
        Box::new(clone)
    }

    fn copy_to(&self, target: &mut dyn Message) {
        if let Some(base) = target.as_reply_mut() {
            self.base.copy_to(base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::EchoRequest;
    use crate::reply::{ErrorKind, ProxyError};

    fn populated() -> InitializeRequest {
        let mut request = InitializeRequest::new();
        request.set_library_address(Some("127.0.0.1"));
        request.set_library_port(Some("7933"));
        request
    }

    #[test]
    fn accessors_project_onto_properties() {
        let request = populated();
        assert_eq!(request.message_type(), MessageType::INITIALIZE_REQUEST);
        assert_eq!(request.request().reply_type(), MessageType::INITIALIZE_REPLY);
        assert_eq!(request.library_address().as_deref(), Some("127.0.0.1"));
        assert_eq!(request.properties().text("LibraryPort"), Some("7933"));
    }

    #[test]
    fn copy_to_same_kind_keeps_target_request_id() {
        let source = populated();
        let mut target = InitializeRequest::new();
        target.request_mut().set_request_id(Some(88));

        source.copy_to(&mut target);
        assert_eq!(target.library_address().as_deref(), Some("127.0.0.1"));
        assert_eq!(target.library_port().as_deref(), Some("7933"));
        assert_eq!(target.request().request_id().unwrap(), Some(88));
    }

    #[test]
    fn copy_carries_absent_fields_as_absent() {
        let mut source = InitializeRequest::new();
        source.set_library_address(Some("10.0.0.1"));
        let mut target = populated();

        source.copy_to(&mut target);
        assert_eq!(target.library_address().as_deref(), Some("10.0.0.1"));
        assert_eq!(target.library_port(), None);
    }

    #[test]
    fn copy_to_other_kind_only_copies_request_layer() {
        let mut source = populated();
        source.request_mut().set_request_id(Some(4));
        let mut target = EchoRequest::new();

        source.copy_to(&mut target);
        assert_eq!(target.request().request_id().unwrap(), Some(4));
        assert!(!target.properties().contains("LibraryAddress"));
        assert_eq!(target.message_type(), MessageType::ECHO_REQUEST);
    }

    #[test]
    fn clone_is_independent() {
        let mut original = populated();
        original.request_mut().set_request_id(Some(1));
        let mut clone = original.clone_message();
        assert_eq!(clone.message_type(), MessageType::INITIALIZE_REQUEST);

        let typed = clone.downcast_mut::<InitializeRequest>().unwrap();
        assert_eq!(typed.request().request_id().unwrap(), Some(1));
        typed.set_library_port(Some("9999"));
        typed.set_library_address(None);

        assert_eq!(original.library_port().as_deref(), Some("7933"));
        assert_eq!(original.library_address().as_deref(), Some("127.0.0.1"));

        original.set_library_port(Some("1"));
        let typed = clone.downcast_ref::<InitializeRequest>().unwrap();
        assert_eq!(typed.library_port().as_deref(), Some("9999"));
    }

    #[test]
    fn reply_clone_keeps_error_and_id() {
        let mut reply = InitializeReply::new();
        reply.reply_mut().set_request_id(Some(12));
        reply
            .reply_mut()
            .set_error(Some(&ProxyError::new(ErrorKind::Custom, "bad port")));

        let clone = reply.clone_message();
        let layer = clone.as_reply().unwrap();
        assert_eq!(layer.request_id().unwrap(), Some(12));
        assert_eq!(layer.error().unwrap().unwrap().message, "bad port");
    }
}
