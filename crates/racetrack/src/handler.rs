//! Per-connection handler: register, pump events both ways, unregister.
//!
//! Each accepted connection gets its own Tokio task running this handler:
//!   1. Register with race control and receive the initial snapshot
//!   2. Spawn a writer that encodes outbound events onto the socket
//!   3. Loop: receive frames, decode them, hand them to race control
//!   4. Close the socket once the loop ends

use std::sync::Arc;

use racetrack_protocol::{ClientEvent, Codec};
use racetrack_race::RaceControlHandle;
use racetrack_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::RacetrackError;

/// Drop guard that unregisters the connection when the handler exits.
///
/// Runs even if the handler returns early with an error. `Drop` is
/// synchronous, so the unregister call is spawned.
struct DisconnectGuard {
    conn: ConnectionId,
    race: RaceControlHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn = self.conn;
        let race = self.race.clone();
        tokio::spawn(async move {
            let _ = race.disconnect(conn).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec + Clone>(
    conn: WebSocketConnection,
    race: RaceControlHandle,
    codec: C,
) -> Result<(), RacetrackError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, "client connected");

    let (tx, mut rx) = mpsc::unbounded_channel();
    race.connect(conn_id, tx).await?;
    let _guard = DisconnectGuard {
        conn: conn_id,
        race: race.clone(),
    };

    let writer = {
        let conn = Arc::clone(&conn);
        let codec = codec.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let bytes = match codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "failed to encode event");
                        continue;
                    }
                };
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
                    break;
                }
            }
        })
    };

    let result = loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "client disconnected");
                break Ok(());
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break Ok(());
            }
        };

        let event: ClientEvent = match codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping undecodable frame");
                continue;
            }
        };

        tracing::trace!(%conn_id, event = event.name(), "event received");
        if let Err(e) = race.submit(conn_id, event).await {
            break Err(RacetrackError::from(e));
        }
    };

    writer.abort();
    // Already closed by the peer in the common case.
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after read loop");
    }
    // _guard drops here → race control forgets the connection.
    result
}
