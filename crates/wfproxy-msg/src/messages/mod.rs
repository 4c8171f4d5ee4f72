//! ---
//! wfp_section: "02-messaging-ipc-data-model"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Concrete proxy message families."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
//! Concrete message kinds.
//!
//! Each family lives in its own module and exposes a `register` function
//! that adds its request and reply prototypes to a [`RegistryBuilder`].
//! Adding a family never touches the decode or dispatch path.

pub mod cancel;
pub mod connect;
pub mod echo;
pub mod initialize;

use crate::registry::RegistryBuilder;
use crate::Result;

pub use cancel::{CancelReply, CancelRequest};
pub use connect::{ConnectReply, ConnectRequest};
pub use echo::{EchoReply, EchoRequest};
pub use initialize::{InitializeReply, InitializeRequest};

/// Register every built-in family.
pub fn register_all(builder: &mut RegistryBuilder) -> Result<()> {
    initialize::register(builder)?;
    connect::register(builder)?;
    cancel::register(builder)?;
    echo::register(builder)?;
    Ok(())
}
