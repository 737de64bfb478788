//! # relay-server
//!
//! WebSocket front end for [`relay_core`]. Accepts upgrades on any path,
//! decodes JSON text frames for the [`MessageRouter`](relay_core::MessageRouter)
//! and writes its replies back as text frames. Plain HTTP requests get a
//! short banner; all responses carry permissive CORS headers.

pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod transport;

pub use config::{ConfigError, ConfigSource, RelayConfig};
pub use error::{ServerError, ServerResult};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use server::{build_app, shutdown_signal, AppState, RelayServer, BANNER};
