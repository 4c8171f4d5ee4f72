//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Connect request/reply pair."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::time::Duration;

use crate::envelope::{Message, MessageType};
use crate::properties::PropertyError;
use crate::registry::RegistryBuilder;
use crate::reply::ProxyReply;
use crate::request::ProxyRequest;
use crate::{reply_message_base, request_message_base, Result};

const ENDPOINTS_KEY: &str = "Endpoints";
const IDENTITY_KEY: &str = "Identity";
const CLIENT_TIMEOUT_KEY: &str = "ClientTimeout";
const CREATE_DOMAIN_KEY: &str = "CreateDomain";

/// Register the connect family.
pub fn register(builder: &mut RegistryBuilder) -> Result<()> {
    builder
        .register(ConnectRequest::new())?
        .register(ConnectReply::new())?;
    Ok(())
}

/// Asks the proxy to open a client connection to the workflow cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    base: ProxyRequest,
}

impl ConnectRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self {
            base: ProxyRequest::new(MessageType::CONNECT_REQUEST, MessageType::CONNECT_REPLY),
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

    /// Comma separated cluster endpoints.
    pub fn endpoints(&self) -> Option<String> {
        self.base.properties().text(ENDPOINTS_KEY).map(str::to_owned)
    }

    /// Set or clear the cluster endpoints.
    pub fn set_endpoints(&mut self, value: Option<&str>) {
        self.base.properties_mut().set(ENDPOINTS_KEY, value);
    }

    /// Client identity reported to the cluster.
    pub fn identity(&self) -> Option<String> {
        self.base.properties().text(IDENTITY_KEY).map(str::to_owned)
    }

    /// Set or clear the client identity.
    pub fn set_identity(&mut self, value: Option<&str>) {
        self.base.properties_mut().set(IDENTITY_KEY, value);
    }

    /// Timeout applied to cluster calls.
    pub fn client_timeout(&self) -> std::result::Result<Option<Duration>, PropertyError> {
        self.base.properties().get(CLIENT_TIMEOUT_KEY)
    }

    /// Set or clear the client timeout.
    pub fn set_client_timeout(&mut self, value: Option<Duration>) {
        self.base
            .properties_mut()
            .set(CLIENT_TIMEOUT_KEY, value.as_ref());
    }

    /// Whether the default domain should be created when missing.
    pub fn create_domain(&self) -> std::result::Result<Option<bool>, PropertyError> {
        self.base.properties().get(CREATE_DOMAIN_KEY)
    }

    /// Set or clear the create-domain flag.
    pub fn set_create_domain(&mut self, value: Option<bool>) {
        self.base
            .properties_mut()
            .set(CREATE_DOMAIN_KEY, value.as_ref());
    }
}

impl Default for ConnectRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl Message for ConnectRequest {
    request_message_base!(base);

    fn clone_message(&self) -> Box<dyn Message> {
        let mut clone = ConnectRequest::new();
        self.copy_to(&mut clone);
        Box::new(clone)
    }

    fn copy_to(&self, target: &mut dyn Message) {
        if let Some(base) = target.as_request_mut() {
            self.base.copy_to(base);
        }
        if let Some(target) = target.downcast_mut::<ConnectRequest>() {
            target.set_endpoints(self.endpoints().as_deref());
            target.set_identity(self.identity().as_deref());
            let properties = self.base.properties();
            properties.copy_key(CLIENT_TIMEOUT_KEY, target.base.properties_mut());
            properties.copy_key(CREATE_DOMAIN_KEY, target.base.properties_mut());
        }
    }
}

/// Answers [`ConnectRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReply {
    base: ProxyReply,
}

impl ConnectReply {
    /// Create an empty reply.
    pub fn new() -> Self {
        Self {
            base: ProxyReply::new(MessageType::CONNECT_REPLY),
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

impl Default for ConnectReply {
    fn default() -> Self {
        Self::new()
    }
}

impl Message for ConnectReply {
    reply_message_base!(base);

    fn clone_message(&self) -> Box<dyn Message> {
        let mut clone = ConnectReply::new();
        self.copy_to(&mut clone);
        Box::new(clone)
    }

    fn copy_to(&self, target: &mut dyn Message) {
        if let Some(base) = target.as_reply_mut() {
            self.base.copy_to(base);
        }
    }
}
