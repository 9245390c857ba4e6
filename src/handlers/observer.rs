use log::{debug, error, info};
use warp::ws::WebSocket;

use crate::core::transport::{Connection, MessageReader};
use crate::core::SharedHub;

// Handle an observer WebSocket connection
pub async fn handle_observer(ws: WebSocket, hub: SharedHub) {
    let connection = Connection::from_websocket(ws);

    let (observer_id, reader) = match hub.add(connection) {
        Ok(added) => added,
        Err(e) => {
            error!("Failed to register observer: {}", e);
            return;
        }
    };

    relay_observer(hub, observer_id, reader).await;
}

/// Drive an observer's inbound side: every payload is relayed to all observers,
/// and the observer is removed once its socket stops reading.
pub async fn relay_observer(hub: SharedHub, observer_id: String, mut reader: Box<dyn MessageReader>) {
    loop {
        match reader.read_message().await {
            Ok(Some(data)) => {
                if let Err(e) = hub.broadcast(&data) {
                    error!("Failed to relay message from {}: {}", observer_id, e);
                }
            }
            Ok(None) => {
                info!("Observer {} closed the connection", observer_id);
                break;
            }
            Err(e) => {
                debug!("Observer {} read error: {}", observer_id, e);
                break;
            }
        }
    }

    if let Err(e) = hub.remove(&observer_id) {
        error!("Error removing observer {}: {}", observer_id, e);
    }
}
