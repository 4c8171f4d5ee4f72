//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Wire type id to message prototype registry."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::collections::HashMap;

use tracing::debug;

use crate::envelope::{Message, MessageType};
use crate::{MessagingError, Result};

/// Mutable registry used during start-up.
///
/// Each message family contributes its prototypes with one `register` call;
/// [`RegistryBuilder::build`] then freezes the mapping.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    prototypes: HashMap<MessageType, Box<dyn Message>>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prototype under its own type id.
    ///
    /// Fails if the id is already taken, keeping the mapping injective.
    pub fn register<M: Message>(&mut self, prototype: M) -> Result<&mut Self> {
        self.register_boxed(Box::new(prototype))
    }

    /// Boxed variant of [`RegistryBuilder::register`].
    pub fn register_boxed(&mut self, prototype: Box<dyn Message>) -> Result<&mut Self> {
        let message_type = prototype.message_type();
        if self.prototypes.contains_key(&message_type) {
            return Err(MessagingError::DuplicateMessageType(message_type));
        }
        debug!(%message_type, "registered message prototype");
        self.prototypes.insert(message_type, prototype);
        Ok(self)
    }

    /// Freeze the mapping.
    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            prototypes: self.prototypes,
        }
    }
}

/// Read-only mapping from wire type id to message prototype.
///
/// Built once before any frame is decoded and never mutated afterwards, so it
/// can be shared across workers behind an `Arc` without locking.
#[derive(Debug)]
pub struct TypeRegistry {
    prototypes: HashMap<MessageType, Box<dyn Message>>,
}

impl TypeRegistry {
    /// Start a new registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Prototype registered for `message_type`.
    pub fn lookup(&self, message_type: MessageType) -> Result<&dyn Message> {
        self.prototypes
            .get(&message_type)
            .map(|prototype| prototype.as_ref())
            .ok_or(MessagingError::UnknownMessageType(message_type))
    }

    /// Fresh instance of the registered kind, cloned from its prototype.
    pub fn instantiate(&self, message_type: MessageType) -> Result<Box<dyn Message>> {
        Ok(self.lookup(message_type)?.clone_message())
    }

    /// Whether `message_type` is registered.
    pub fn contains(&self, message_type: MessageType) -> bool {
        self.prototypes.contains_key(&message_type)
    }

    /// Registered ids in ascending order.
    pub fn registered_types(&self) -> Vec<MessageType> {
        let mut types: Vec<_> = self.prototypes.keys().copied().collect();
        types.sort();
        types
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }
}
