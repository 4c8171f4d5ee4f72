//! ---
//! wfp_section: "05-networking-external-interfaces"
//! wfp_subsection: "binary"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Frame inspection subcommands."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use wfproxy_common::config::AppConfig;
use wfproxy_msg::messages::InitializeRequest;
use wfproxy_msg::{decode, encode, TypeRegistry};

/// Print `id  name` for every registered type, in id order.
pub fn list_types(registry: &TypeRegistry) -> Result<()> {
    for message_type in registry.registered_types() {
        println!(
            "{:>4}  {}",
            message_type.id(),
            message_type.name().unwrap_or("<unnamed>")
        );
    }
    Ok(())
}

#[derive(Debug, Args)]
pub struct EncodeInitializeCommand {
    /// Library address; defaults to `proxy.library_address`.
    #[arg(long, value_name = "ADDR")]
    address: Option<String>,

    /// Library port; defaults to `proxy.library_port`.
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Correlation id to stamp on the request.
    #[arg(long = "request-id", value_name = "ID")]
    request_id: Option<i64>,
}

impl EncodeInitializeCommand {
    pub fn execute(self, config: &AppConfig) -> Result<()> {
        let address = self
            .address
            .unwrap_or_else(|| config.proxy.library_address.clone());
        let port = self.port.unwrap_or(config.proxy.library_port).to_string();

        let mut request = InitializeRequest::new();
        request.set_library_address(Some(address.as_str()));
        request.set_library_port(Some(port.as_str()));
        request.request_mut().set_request_id(self.request_id);

        let frame = encode(&request);
        info!(bytes = frame.len(), %address, %port, "encoded initialize request");
        println!("{}", hex::encode(&frame));
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct DecodeCommand {
    /// Frame bytes as hex; whitespace is ignored.
    #[arg(value_name = "HEX")]
    frame: String,
}

impl DecodeCommand {
    pub fn execute(self, registry: &TypeRegistry) -> Result<()> {
        let compact: String = self.frame.split_whitespace().collect();
        let bytes = hex::decode(&compact).context("frame is not valid hex")?;
        let message = decode(&bytes, registry).context("failed to decode frame")?;
        print!("{message}");
        Ok(())
    }
}
