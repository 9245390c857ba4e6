//! Observer hub: fan-out of raw payloads to passive sockets
//!
//! The hub knows nothing about frames or correlation ids. Each observer is an
//! outbound channel drained by a writer task; dropping the channel closes the
//! socket.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{debug, info, warn};
use tokio::sync::mpsc;
use warp::ws::Message as WsMessage;

use crate::core::connection::ObserverConnection;
use crate::core::transport::{Connection, MessageReader, MessageWriter};
use crate::error::Result;

/// Registry of observer connections
pub struct Hub {
    observers: RwLock<HashMap<String, ObserverConnection>>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
        }
    }

    /// Register an observer socket.
    ///
    /// Spawns the task writing to the socket and returns the observer id
    /// together with the reader half, which the caller drives until it fails.
    pub fn add(&self, connection: Connection) -> Result<(String, Box<dyn MessageReader>)> {
        let (id, reader, writer) = connection.into_parts();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(forward_to_socket(id.clone(), rx, writer));

        self.register(id.clone(), tx)?;
        Ok((id, reader))
    }

    /// Register an observer by its outbound channel
    pub fn register(&self, id: String, sender: mpsc::UnboundedSender<WsMessage>) -> Result<()> {
        let mut observers = self.observers.write()?;
        observers.insert(id.clone(), ObserverConnection::with_id(id.clone(), sender));
        info!("Observer connected: {} ({} total)", id, observers.len());
        Ok(())
    }

    /// Remove an observer and close its socket. Removing twice is a no-op.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.observers.write()?.remove(id);
        match removed {
            Some(observer) => {
                info!(
                    "Observer disconnected: {} after {:?}",
                    id,
                    observer.connection_duration()
                );
                // Dropping the sender ends the writer task, which closes the socket
                drop(observer);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Send a payload to every observer.
    ///
    /// A failed send is logged and skipped; the observer stays registered until
    /// its own read loop ends. Returns the number of successful deliveries.
    pub fn broadcast(&self, payload: &[u8]) -> Result<usize> {
        let message = match std::str::from_utf8(payload) {
            Ok(text) => WsMessage::text(text),
            Err(_) => WsMessage::binary(payload.to_vec()),
        };

        let observers = self.observers.read()?;
        let mut success_count = 0;

        for observer in observers.values() {
            if observer.send(message.clone()) {
                success_count += 1;
            }
        }

        debug!(
            "Broadcast {} bytes to {}/{} observers",
            payload.len(),
            success_count,
            observers.len()
        );
        Ok(success_count)
    }

    /// Get current observer count
    pub fn observer_count(&self) -> usize {
        self.observers.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.observers
            .read()
            .map(|o| o.contains_key(id))
            .unwrap_or(false)
    }
}

// Drain the observer channel into the socket, closing it once the channel ends
async fn forward_to_socket(
    id: String,
    mut rx: mpsc::UnboundedReceiver<WsMessage>,
    mut writer: Box<dyn MessageWriter>,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = writer.send(message).await {
            warn!("Failed to write to observer {}: {}", id, e);
        }
    }

    if let Err(e) = writer.close().await {
        debug!("Closing observer {} failed: {}", id, e);
    }
}

// Thread-safe hub wrapper
pub type SharedHub = Arc<Hub>;

pub fn create_hub() -> SharedHub {
    Arc::new(Hub::new())
}
