//! Web Risk Server - HTTP surface of the lookup server.
//!
//! ## Endpoints
//!
//! - `/status` - Engine statistics and last error (any method)
//! - `POST /v1/uris:search` - Look up one URI, JSON or protobuf
//! - `/r?url=...` - Redirect to safe URLs, warning page for unsafe ones
//! - `GET /public/{*path}` - Static files from the asset store
//!
//! Everything else answers 404.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use webrisk_server::{AppState, Server, ServerConfig, TerminationSignals};
//! # use webrisk_core::{EngineError, Stats, ThreatEngine, ThreatMatch};
//! # struct Engine;
//! # #[async_trait::async_trait]
//! # impl ThreatEngine for Engine {
//! #     async fn lookup_urls(&self, urls: &[String]) -> Result<Vec<Vec<ThreatMatch>>, EngineError> {
//! #         Ok(vec![Vec::new(); urls.len()])
//! #     }
//! #     fn status(&self) -> (Stats, Option<EngineError>) { (Stats::default(), None) }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::new(Arc::new(Engine));
//!     let signals = TerminationSignals::subscribe().unwrap();
//!
//!     let mut handle = Server::new(ServerConfig::default(), state).start().unwrap();
//!     handle.shutdown_on(async move {
//!         signals.recv().await;
//!     });
//!     handle.wait().await.unwrap();
//! }
//! ```

pub mod assets;
pub mod error;
mod handlers;
pub mod lifecycle;
pub mod models;
pub mod render;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;

use axum::routing::{any, get};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use assets::{AssetError, AssetStore, EmbeddedAssets};
pub use error::{ApiError, Result};
pub use lifecycle::{ServerHandle, TerminationSignals, SHUTDOWN_TIMEOUT};
pub use render::RenderError;
pub use state::AppState;

/// Default listen address.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub addr: SocketAddr,
    /// Deadline for draining in-flight requests on shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8080)))
    }
}

impl ServerConfig {
    /// Creates a config for `addr` with the standard shutdown deadline.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }

    /// Sets the shutdown deadline.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    Bind(SocketAddr, std::io::Error),

    /// In-flight requests did not finish before the deadline.
    #[error("server shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", any(handlers::status))
        .route("/v1/uris:search", any(handlers::search_uris))
        .route("/r", any(handlers::redirector))
        .route("/public/{*path}", get(handlers::public_asset))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The HTTP server.
pub struct Server {
    router: Router,
    config: ServerConfig,
}

impl Server {
    /// Creates a server over `state`.
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self {
            router: router(state),
            config,
        }
    }

    /// Returns the configured address.
    pub fn addr(&self) -> SocketAddr {
        self.config.addr
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    fn bind(&self) -> std::result::Result<tokio::net::TcpListener, ServerError> {
        let addr = self.config.addr;
        let bind_err = |e| ServerError::Bind(addr, e);

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(bind_err)?;

        // Allow quick restarts while old sockets sit in TIME_WAIT
        socket.set_reuse_address(true).map_err(bind_err)?;

        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.listen(1024).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;

        let std_listener: std::net::TcpListener = socket.into();
        tokio::net::TcpListener::from_std(std_listener).map_err(bind_err)
    }

    /// Binds the listener and starts serving in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> std::result::Result<ServerHandle, ServerError> {
        let listener = self.bind()?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(self.config.addr, e))?;

        info!("Starting server at {}", addr);

        Ok(lifecycle::spawn(
            listener,
            addr,
            self.router,
            self.config.shutdown_timeout,
        ))
    }
}
