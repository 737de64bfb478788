use relay_server::{init_logging, LoggingConfig, RelayConfig, RelayServer, ServerError};
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = RelayConfig::from_env()?;

    init_logging(&LoggingConfig::default().with_format(config.log_format))
        .map_err(|e| ServerError::Logging(e.to_string()))?;

    let server = RelayServer::new(config);
    if let Err(e) = server.listen().await {
        error!("Relay server stopped: {}", e);
        return Err(e);
    }

    Ok(())
}
