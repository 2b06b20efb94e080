//! Paramlab Server - HTTP proxy in front of the experiment backend
//!
//! Exposes the `/api` routes used by the experiment workbench and relays
//! them to the configured backend, normalizing every failure into the
//! `{"success": false, "error": ...}` envelope. Also ships [`client::ProxyClient`],
//! an [`paramlab_core::api::ExperimentApi`] implementation over those routes.

/// Version of the paramlab-server crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod relay;
pub mod retry;
pub mod server;

// Re-export commonly used types
pub use client::ProxyClient;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{create_router, ParamlabServer, ServerState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{client::*, config::*, error::*, handlers::*, middleware::*, relay::*, server::*};
}
