//! ---
//! wfp_section: "01-core-functionality"
//! wfp_subsection: "module"
//! wfp_type: "source"
//! wfp_scope: "code"
//! wfp_description: "Shared primitives and utilities for the proxy runtime."
//! wfp_version: "v0.0.0-prealpha"
//! wfp_owner: "tbd"
//! ---
//! Shared runtime primitives for the workflow proxy workspace.
//! This crate exposes configuration loading and tracing set-up consumed by
//! the binaries.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LoadedAppConfig, LoggingConfig, ProxyConfig};
pub use logging::{init_tracing, LogFormat};
