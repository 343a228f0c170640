//! Per-connection handler: decodes client frames, forwards them to the
//! coordinator, and writes room events back out.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. Room actors push events into the connection's
//! unbounded channel; the handler drains it while it waits for the next
//! client frame, so a slow room never blocks reading.

use std::sync::Arc;

use quizwire_protocol::{ClientEvent, Codec, ErrorCode, ServerEvent};
use quizwire_room::SessionCoordinator;
use quizwire_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::QuizwireError;

/// Handles a single connection from accept to close.
///
/// However the loop ends, the connection is removed from its room.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    coordinator: Arc<SessionCoordinator>,
    codec: C,
) -> Result<(), QuizwireError> {
    let connection_id = conn.id().clone();
    tracing::debug!(%connection_id, peer = %conn.peer_addr(), "handling new connection");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let result = loop {
        tokio::select! {
            incoming = conn.recv() => {
                let data = match incoming {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%connection_id, "connection closed cleanly");
                        break Ok(());
                    }
                    Err(e) => break Err(QuizwireError::Transport(e)),
                };

                match codec.decode::<ClientEvent>(&data) {
                    Ok(event) => coordinator.handle(&connection_id, &events_tx, event).await,
                    Err(e) => {
                        tracing::debug!(%connection_id, error = %e, "failed to decode client frame");
                        let _ = events_tx.send(ServerEvent::Error {
                            code: ErrorCode::InvalidEvent,
                            message: e.to_string(),
                        });
                    }
                }
            }
            Some(event) = events_rx.recv() => {
                let bytes = match codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(%connection_id, event = event.name(), error = %e, "failed to encode event");
                        continue;
                    }
                };
                if let Err(e) = conn.send(&bytes).await {
                    break Err(QuizwireError::Transport(e));
                }
            }
        }
    };

    coordinator.disconnect(&connection_id).await;
    let _ = conn.close().await;
    result
}
