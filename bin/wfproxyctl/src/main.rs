//! ---
//! wfp_section: "05-networking-external-interfaces"
//! wfp_subsection: "binary"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Control CLI for inspecting and exercising proxy messages."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use wfproxy_common::config::AppConfig;
use wfproxy_common::logging::init_tracing;
use wfproxy_msg::messages;
use wfproxy_msg::{RegistryBuilder, TypeRegistry};

mod frames;
mod loopback;

const DEFAULT_CONFIG_CANDIDATES: &[&str] = &["configs/wfproxy.toml", "/etc/wfproxy/wfproxy.toml"];

#[derive(Debug, Parser)]
#[command(author, version, about = "Workflow proxy message utility", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every registered message type.
    Types,
    /// Encode an initialize request and print the frame as hex.
    EncodeInitialize(frames::EncodeInitializeCommand),
    /// Decode a hex frame and print its type and properties.
    Decode(frames::DecodeCommand),
    /// Run an initialize request/reply round trip over an in-process stream.
    Loopback(loopback::LoopbackCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_tracing("wfproxyctl", &config.logging)?;

    let registry = Arc::new(build_registry()?);
    match cli.command {
        Commands::Types => frames::list_types(&registry),
        Commands::EncodeInitialize(cmd) => cmd.execute(&config),
        Commands::Decode(cmd) => cmd.execute(&registry),
        Commands::Loopback(cmd) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(cmd.execute(&config, registry))
        }
    }
}

/// An explicit `--config` must exist; otherwise fall back to the default
/// candidates and then to built-in defaults.
fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    if let Some(path) = path {
        return AppConfig::load(&[path]);
    }
    let overridden = std::env::var(AppConfig::ENV_CONFIG_PATH)
        .map(|path| !path.trim().is_empty())
        .unwrap_or(false);
    let present = DEFAULT_CONFIG_CANDIDATES
        .iter()
        .any(|candidate| std::path::Path::new(candidate).exists());
    if overridden || present {
        AppConfig::load(DEFAULT_CONFIG_CANDIDATES)
    } else {
        Ok(AppConfig::default())
    }
}

fn build_registry() -> Result<TypeRegistry> {
    let mut builder = RegistryBuilder::new();
    messages::register_all(&mut builder)?;
    Ok(builder.build())
}
