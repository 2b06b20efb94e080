//! Core server implementation

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    handlers,
    middleware::{body_limit_middleware, cors_layer, logging_middleware},
    relay::Relay,
};

/// Shared handler state
#[derive(Debug, Clone)]
pub struct ServerState {
    pub config: Arc<ServerConfig>,
    pub relay: Relay,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate().map_err(ServerError::Config)?;
        let relay = Relay::new(&config.backend)?;
        Ok(Self {
            config: Arc::new(config),
            relay,
        })
    }
}

/// Build the router with all routes and middleware
pub fn create_router(state: ServerState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/experiments",
            get(handlers::list_experiments).delete(handlers::delete_experiment),
        )
        .route("/experiments/:id", delete(handlers::delete_experiment_by_path))
        .route("/generate", post(handlers::generate))
        .route("/export", post(handlers::export));

    let mut router = Router::new()
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(logging_middleware))
        .layer(RequestBodyLimitLayer::new(state.config.limits.max_body_size))
        .layer(axum::middleware::from_fn(body_limit_middleware));

    if let Some(cors) = cors_layer(&state.config.cors) {
        router = router.layer(cors);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Paramlab HTTP proxy
pub struct ParamlabServer {
    state: ServerState,
}

impl ParamlabServer {
    /// Create a new server instance
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Ok(Self {
            state: ServerState::new(config)?,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(
            backend = %self.state.relay.base_url(),
            "Paramlab server listening on {}", addr
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn start(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config().bind).await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}

/// Create a server from a configuration file, or from the environment
pub fn create_server_from_config(config_path: Option<std::path::PathBuf>) -> ServerResult<ParamlabServer> {
    let config = match config_path {
        Some(path) => ServerConfig::from_file(&path),
        None => ServerConfig::from_env(),
    }
    .map_err(|e| ServerError::Config(format!("Failed to load config: {}", e)))?;

    ParamlabServer::new(config)
}

/// Run server until Ctrl-C, draining in-flight requests
pub async fn run_server(server: ParamlabServer) -> ServerResult<()> {
    let result = server.start().await;
    if let Err(e) = &result {
        warn!("Server error: {}", e);
    }
    result
}
