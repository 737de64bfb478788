//! Per-socket loop bridging an axum WebSocket and the relay core

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use relay_core::{Connection, ConnectionHandler, ConnectionState, ServerMessage};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tracing::{debug, error, info, warn};

/// Drive one upgraded socket until it closes.
///
/// Inbound text (and UTF-8 binary) frames are decoded as JSON and handed to
/// the handler; payloads that fail to decode are logged and dropped.
pub async fn serve_socket(
    socket: WebSocket,
    handler: Arc<dyn ConnectionHandler>,
    ping_interval: Option<Duration>,
) {
    let (connection, outbound) = Connection::new();
    let (sink, mut stream) = socket.split();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let id = connection.id;

    let writer = tokio::spawn(write_loop(
        connection.clone(),
        sink,
        outbound,
        shutdown_rx,
        ping_interval,
    ));

    handler.on_open(&connection).await;

    while let Some(frame) = stream.next().await {
        match read_frame(&connection, frame).await {
            Inbound::Payload(payload) => handler.on_message(&connection, payload).await,
            Inbound::Skip => {}
            Inbound::Stop => break,
        }
    }

    connection.mark_closed().await;
    handler.on_close(&connection).await;

    // The writer may already be gone after a failed send
    let _ = shutdown_tx.send(());
    if let Err(e) = writer.await {
        debug!("Writer task for {} ended abnormally: {}", id, e);
    }

    info!("WebSocket connection handler finished: {}", id);
}

/// What the read loop should do with one frame
#[derive(Debug, PartialEq)]
enum Inbound {
    Payload(Value),
    Skip,
    Stop,
}

async fn read_frame(connection: &Connection, frame: Result<Message, axum::Error>) -> Inbound {
    match frame {
        Ok(Message::Text(text)) => {
            decode(connection, text.as_bytes()).map_or(Inbound::Skip, Inbound::Payload)
        }
        Ok(Message::Binary(data)) => {
            decode(connection, &data).map_or(Inbound::Skip, Inbound::Payload)
        }
        Ok(Message::Close(_)) => {
            debug!("Received close frame for connection: {}", connection.id);
            connection.set_state(ConnectionState::Closing).await;
            Inbound::Stop
        }
        // Ping/pong replies are handled by the protocol layer
        Ok(_) => Inbound::Skip,
        Err(e) => {
            warn!("WebSocket error for {}: {}", connection.id, e);
            connection
                .set_state(ConnectionState::Failed(e.to_string()))
                .await;
            Inbound::Stop
        }
    }
}

fn decode(connection: &Connection, raw: &[u8]) -> Option<Value> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Error handling message from {}: {}", connection.id, e);
            None
        }
    }
}

async fn write_loop<S>(
    connection: Connection,
    mut sink: S,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
    mut shutdown: oneshot::Receiver<()>,
    ping_interval: Option<Duration>,
) where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    let mut ping = ping_interval.map(|period| {
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        interval
    });

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                // Flushes the close reply queued when the peer's close frame was read
                if let Err(e) = sink.close().await {
                    debug!("Close handshake for {} not completed: {}", connection.id, e);
                }
                break;
            }

            message = outbound.recv() => {
                let Some(message) = message else {
                    debug!("Outbound queue closed for: {}", connection.id);
                    break;
                };
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize message for {}: {}", connection.id, e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    warn!("Failed to send message for {}: {}", connection.id, e);
                    connection.set_state(ConnectionState::Failed(e.to_string())).await;
                    break;
                }
            }

            _ = async {
                match ping.as_mut() {
                    Some(interval) => {
                        interval.tick().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            } => {
                if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                    warn!("Failed to send ping for {}: {}", connection.id, e);
                    break;
                }
                debug!("Sent ping to connection: {}", connection.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_decode_failure_is_logged_and_dropped() {
        let (connection, _outbound) = Connection::new();

        assert_eq!(
            decode(&connection, br#"{"type":"list_channels"}"#),
            Some(json!({"type": "list_channels"}))
        );
        assert!(decode(&connection, b"{oops").is_none());
        assert!(decode(&connection, &[0xff, 0xfe]).is_none());
        assert!(logs_contain("Error handling message from"));
    }

    #[tokio::test]
    async fn test_close_frame_moves_connection_to_closing() {
        let (connection, _outbound) = Connection::new();

        let outcome = read_frame(&connection, Ok(Message::Close(None))).await;

        assert_eq!(outcome, Inbound::Stop);
        assert_eq!(connection.state().await, ConnectionState::Closing);
        assert!(!connection.is_active().await);

        connection.mark_closed().await;
        assert_eq!(connection.state().await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_read_error_marks_connection_failed() {
        let (connection, _outbound) = Connection::new();
        let error = axum::Error::new(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"));

        assert_eq!(read_frame(&connection, Err(error)).await, Inbound::Stop);
        assert!(matches!(connection.state().await, ConnectionState::Failed(_)));

        connection.mark_closed().await;
        assert!(matches!(connection.state().await, ConnectionState::Failed(_)));
    }

    #[tokio::test]
    async fn test_frames_map_to_payload_or_skip() {
        let (connection, _outbound) = Connection::new();

        assert_eq!(
            read_frame(&connection, Ok(Message::Text(r#"{"type":"join"}"#.to_string()))).await,
            Inbound::Payload(json!({"type": "join"}))
        );
        assert_eq!(
            read_frame(&connection, Ok(Message::Binary(b"[1]".to_vec()))).await,
            Inbound::Payload(json!([1]))
        );
        assert_eq!(
            read_frame(&connection, Ok(Message::Ping(Vec::new()))).await,
            Inbound::Skip
        );
        assert_eq!(connection.state().await, ConnectionState::Connected);
    }
}
