//! HTTP entry point: WebSocket upgrade, banner fallback, CORS and lifecycle

use crate::config::RelayConfig;
use crate::error::{ServerError, ServerResult};
use crate::transport::serve_socket;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::{header, Method},
    response::{IntoResponse, Response},
    Router,
};
use relay_core::{ConnectionHandler, MessageRouter};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

pub const BANNER: &str = "WebSocket server running";

/// Shared state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<dyn ConnectionHandler>,
    pub config: Arc<RelayConfig>,
}

/// The relay server
pub struct RelayServer {
    config: RelayConfig,
    router: Arc<MessageRouter>,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            router: Arc::new(MessageRouter::new()),
        }
    }

    /// The message router backing this server
    pub fn message_router(&self) -> Arc<MessageRouter> {
        self.router.clone()
    }

    /// Build the axum application
    pub fn app(&self) -> Router {
        build_app(AppState {
            handler: self.router.clone(),
            config: Arc::new(self.config.clone()),
        })
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn listen(self) -> ServerResult<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        info!("WebSocket server running on {}", addr);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)
    }
}

/// Build the router: every path upgrades WebSocket requests and answers
/// anything else with a plain banner.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .fallback(entry)
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn entry(State(state): State<AppState>, ws: Option<WebSocketUpgrade>) -> Response {
    let Some(ws) = ws else {
        return BANNER.into_response();
    };

    let handler = state.handler.clone();
    let ping_interval = state.config.ping_interval();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| serve_socket(socket, handler, ping_interval))
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            warn!("Received terminate signal, shutting down gracefully...");
        },
    }
}
