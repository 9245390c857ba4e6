use log::{error, info};
use warp::ws::WebSocket;

use crate::core::transport::Connection;
use crate::core::SharedBridge;

// Hand the game server's socket to the bridge, replacing any previous one
pub async fn handle_peer(ws: WebSocket, bridge: SharedBridge) {
    let connection = Connection::from_websocket(ws);
    let connection_id = connection.id.clone();

    match bridge.attach(connection).await {
        Ok(generation) => info!(
            "Game server connected via WebSocket: {} (generation {})",
            connection_id, generation
        ),
        Err(e) => error!("Failed to attach game server {}: {}", connection_id, e),
    }
}
