use crate::config::ConfigError;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors that stop the relay server from starting or serving
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
