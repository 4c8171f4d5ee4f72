//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Generic proxy message envelope and the polymorphic message trait."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::any::Any;
use std::fmt;

use crate::properties::PropertyBag;
use crate::reply::ProxyReply;
use crate::request::ProxyRequest;

/// Wire type id identifying a concrete message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageType(i32);

impl MessageType {
    /// Never registered; decoding it always fails.
    pub const UNSPECIFIED: Self = Self(0);
    /// Proxy announces the library callback endpoint.
    pub const INITIALIZE_REQUEST: Self = Self(1);
    /// Answer to [`MessageType::INITIALIZE_REQUEST`].
    pub const INITIALIZE_REPLY: Self = Self(2);
    /// Library asks the proxy to connect to the workflow cluster.
    pub const CONNECT_REQUEST: Self = Self(3);
    /// Answer to [`MessageType::CONNECT_REQUEST`].
    pub const CONNECT_REPLY: Self = Self(4);
    /// Cancel another in-flight request.
    pub const CANCEL_REQUEST: Self = Self(5);
    /// Answer to [`MessageType::CANCEL_REQUEST`].
    pub const CANCEL_REPLY: Self = Self(6);
    /// Connectivity check carrying an opaque payload.
    pub const ECHO_REQUEST: Self = Self(7);
    /// Answer to [`MessageType::ECHO_REQUEST`].
    pub const ECHO_REPLY: Self = Self(8);

    /// Wrap a raw wire id.
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Raw wire id.
    pub const fn id(self) -> i32 {
        self.0
    }

    /// Name of a well-known type id.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::UNSPECIFIED => "Unspecified",
            Self::INITIALIZE_REQUEST => "InitializeRequest",
            Self::INITIALIZE_REPLY => "InitializeReply",
            Self::CONNECT_REQUEST => "ConnectRequest",
            Self::CONNECT_REPLY => "ConnectReply",
            Self::CANCEL_REQUEST => "CancelRequest",
            Self::CANCEL_REPLY => "CancelReply",
            Self::ECHO_REQUEST => "EchoRequest",
            Self::ECHO_REPLY => "EchoReply",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}({})", self.0),
            None => write!(f, "MessageType({})", self.0),
        }
    }
}

impl From<i32> for MessageType {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Type id plus property bag; the storage shared by every message kind.
///
/// The type id is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyMessage {
    message_type: MessageType,
    properties: PropertyBag,
}

impl ProxyMessage {
    /// Create an envelope with an empty property bag.
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            properties: PropertyBag::new(),
        }
    }

    /// Wire type id.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Property storage.
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// Mutable property storage. Concrete kinds and the decoder write through this.
    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }
}

impl fmt::Display for ProxyMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message_type)?;
        writeln!(f, "{{")?;
        write!(f, "{}", self.properties)?;
        writeln!(f, "}}")
    }
}

/// Capabilities shared by every concrete message kind.
///
/// Decoded messages travel as `Box<dyn Message>`; callers route on
/// [`Message::message_type`] and reach request/reply fields through
/// [`Message::as_request`] and [`Message::as_reply`].
pub trait Message: Any + Send + Sync + fmt::Debug {
    /// Underlying envelope.
    fn envelope(&self) -> &ProxyMessage;

    /// Mutable access to the underlying envelope.
    ///
    /// Reserved for the frame decoder and for kind implementations; writing
    /// raw text here bypasses the typed accessors. Provided by
    /// [`request_message_base!`] and [`reply_message_base!`].
    #[doc(hidden)]
    fn envelope_mut(&mut self) -> &mut ProxyMessage;

    /// Allocate a fresh instance of the same kind and copy every field into it.
    fn clone_message(&self) -> Box<dyn Message>;

    /// Copy the fields `target` understands.
    ///
    /// Kind-specific fields are copied only when `target` is the same
    /// concrete kind; request/reply base fields are copied whenever `target`
    /// shares that layer. Anything else is silently left alone.
    fn copy_to(&self, target: &mut dyn Message);

    /// Request layer, when this kind is a request.
    fn as_request(&self) -> Option<&ProxyRequest> {
        None
    }

    /// Mutable request layer.
    fn as_request_mut(&mut self) -> Option<&mut ProxyRequest> {
        None
    }

    /// Reply layer, when this kind is a reply.
    fn as_reply(&self) -> Option<&ProxyReply> {
        None
    }

    /// Mutable reply layer.
    fn as_reply_mut(&mut self) -> Option<&mut ProxyReply> {
        None
    }

    /// Upcast for downcasting to the concrete kind.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete kind.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Wire type id.
    fn message_type(&self) -> MessageType {
        self.envelope().message_type()
    }

    /// Property storage.
    fn properties(&self) -> &PropertyBag {
        self.envelope().properties()
    }
}

impl<'a> dyn Message + 'a {
    /// Borrow as a concrete kind.
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow as a concrete kind.
    pub fn downcast_mut<T: Message>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Whether this message is of concrete kind `T`.
    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Raw property storage of a freshly instantiated message, for the decoder.
pub(crate) fn raw_properties_mut(message: &mut dyn Message) -> &mut PropertyBag {
    message.envelope_mut().properties_mut()
}

impl Clone for Box<dyn Message> {
    fn clone(&self) -> Self {
        self.clone_message()
    }
}

impl fmt::Display for dyn Message + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.envelope(), f)
    }
}

/// Implements the envelope and downcast plumbing of [`Message`] for a
/// request kind that stores its [`ProxyRequest`] in `$base`.
#[macro_export]
macro_rules! request_message_base {
    ($base:ident) => {
        fn envelope(&self) -> &$crate::envelope::ProxyMessage {
            self.$base.message()
        }

        fn envelope_mut(&mut self) -> &mut $crate::envelope::ProxyMessage {
            self.$base.message_mut()
        }

        fn as_request(&self) -> Option<&$crate::request::ProxyRequest> {
            Some(&self.$base)
        }

        fn as_request_mut(&mut self) -> Option<&mut $crate::request::ProxyRequest> {
            Some(&mut self.$base)
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}

/// Reply counterpart of [`request_message_base!`].
#[macro_export]
macro_rules! reply_message_base {
    ($base:ident) => {
        fn envelope(&self) -> &$crate::envelope::ProxyMessage {
            self.$base.message()
        }

        fn envelope_mut(&mut self) -> &mut $crate::envelope::ProxyMessage {
            self.$base.message_mut()
        }

        fn as_reply(&self) -> Option<&$crate::reply::ProxyReply> {
            Some(&self.$base)
        }

        fn as_reply_mut(&mut self) -> Option<&mut $crate::reply::ProxyReply> {
            Some(&mut self.$base)
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}
