//! Observer connection management
//! Handles the lifecycle of passive observer connections

use log::warn;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use warp::ws::Message;

/// Represents the state of a single observer connection
pub struct ObserverConnection {
    pub id: String,
    pub sender: mpsc::UnboundedSender<Message>,
    pub connected_at: Instant,
}

impl ObserverConnection {
    /// Create a connection for an already assigned id
    pub fn with_id(id: String, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id,
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Send a message through this connection
    pub fn send(&self, message: Message) -> bool {
        match self.sender.send(message) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to send message to observer {}", self.id);
                false
            }
        }
    }

    /// Calculate the connection duration
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
