//! Transport abstractions for bridge and observer sockets
//!
//! The bridge and the hub only ever see a [`MessageReader`] / [`MessageWriter`]
//! pair. Production sockets are warp WebSockets; [`in_memory`] builds a
//! channel-backed pair for embedding the bridge without a listener.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use crate::core::frame::{self, Frame};
use crate::error::{BridgeError, Result};

/// Trait for async reading from a transport
#[async_trait]
pub trait MessageReader: Send {
    /// Read the next data payload (text or binary).
    /// Returns `Ok(None)` once the remote side closed the connection.
    async fn read_message(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait MessageWriter: Send {
    /// Write one complete message
    async fn send(&mut self, message: Message) -> Result<()>;

    /// Close the outbound side
    async fn close(&mut self) -> Result<()>;
}

/// Reader half of a warp WebSocket
pub struct WsReader(SplitStream<WebSocket>);

/// Writer half of a warp WebSocket
pub struct WsWriter(SplitSink<WebSocket, Message>);

#[async_trait]
impl MessageReader for WsReader {
    async fn read_message(&mut self) -> Result<Option<Vec<u8>>> {
        while let Some(result) = self.0.next().await {
            let msg = result.map_err(|e| BridgeError::ConnectionError(e.to_string()))?;
            if msg.is_close() {
                return Ok(None);
            }
            if msg.is_text() || msg.is_binary() {
                return Ok(Some(msg.into_bytes()));
            }
            // Ping/pong
        }
        Ok(None)
    }
}

#[async_trait]
impl MessageWriter for WsWriter {
    async fn send(&mut self, message: Message) -> Result<()> {
        self.0
            .send(message)
            .await
            .map_err(|e| BridgeError::TransportWrite(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.0
            .close()
            .await
            .map_err(|e| BridgeError::ConnectionError(e.to_string()))
    }
}

/// A socket split into its two halves, tagged with a unique id
pub struct Connection {
    pub id: String,
    reader: Box<dyn MessageReader>,
    writer: Box<dyn MessageWriter>,
}

impl Connection {
    pub fn new(
        reader: impl MessageReader + 'static,
        writer: impl MessageWriter + 'static,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    pub fn from_websocket(ws: WebSocket) -> Self {
        let (ws_tx, ws_rx) = ws.split();
        Self::new(WsReader(ws_rx), WsWriter(ws_tx))
    }

    pub fn into_parts(self) -> (String, Box<dyn MessageReader>, Box<dyn MessageWriter>) {
        (self.id, self.reader, self.writer)
    }
}

/// Channel-backed reader used by [`in_memory`]
pub struct MemoryReader {
    receiver: mpsc::UnboundedReceiver<Result<Message>>,
}

/// Channel-backed writer used by [`in_memory`]
pub struct MemoryWriter {
    sender: Option<mpsc::UnboundedSender<Message>>,
}

#[async_trait]
impl MessageReader for MemoryReader {
    async fn read_message(&mut self) -> Result<Option<Vec<u8>>> {
        while let Some(item) = self.receiver.recv().await {
            let msg = item?;
            if msg.is_close() {
                return Ok(None);
            }
            if msg.is_text() || msg.is_binary() {
                return Ok(Some(msg.into_bytes()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl MessageWriter for MemoryWriter {
    async fn send(&mut self, message: Message) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| BridgeError::TransportWrite("connection closed".to_string()))?;
        sender
            .send(message)
            .map_err(|_| BridgeError::TransportWrite("remote end dropped".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.sender.take();
        Ok(())
    }
}

/// Remote end of an in-memory connection, acting as the game server
pub struct MemoryPeer {
    to_local: mpsc::UnboundedSender<Result<Message>>,
    from_local: mpsc::UnboundedReceiver<Message>,
}

impl MemoryPeer {
    /// Push raw text to the local side
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.to_local
            .send(Ok(Message::text(text.into())))
            .map_err(|_| BridgeError::ConnectionError("local end dropped".to_string()))
    }

    /// Push a frame to the local side
    pub fn send_frame(&self, frame: &Frame) -> Result<()> {
        self.send_text(frame::encode(frame)?)
    }

    /// Make the local reader fail as if the socket broke
    pub fn fail(&self, reason: impl Into<String>) {
        let _ = self
            .to_local
            .send(Err(BridgeError::ConnectionError(reason.into())));
    }

    /// Stop accepting messages; later writes from the local side fail
    pub fn close_receiving(&mut self) {
        self.from_local.close();
    }

    /// Next message written by the local side, `None` once it closed
    pub async fn recv(&mut self) -> Option<Message> {
        self.from_local.recv().await
    }

    /// Next decodable frame written by the local side
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        while let Some(msg) = self.recv().await {
            match frame::decode(msg.as_bytes()) {
                Ok(frame) => return Some(frame),
                Err(e) => log::debug!("Peer skipped undecodable message: {}", e),
            }
        }
        None
    }
}

/// Build a connected in-memory pair: the local [`Connection`] and its remote end
pub fn in_memory() -> (Connection, MemoryPeer) {
    let (to_local, local_rx) = mpsc::unbounded_channel();
    let (local_tx, from_local) = mpsc::unbounded_channel();

    let connection = Connection::new(
        MemoryReader { receiver: local_rx },
        MemoryWriter {
            sender: Some(local_tx),
        },
    );

    (connection, MemoryPeer { to_local, from_local })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let (connection, mut peer) = in_memory();
        let (_, mut reader, mut writer) = connection.into_parts();

        writer.send(Message::text("hello")).await.unwrap();
        assert_eq!(peer.recv().await.unwrap().as_bytes(), b"hello");

        peer.send_text("world").unwrap();
        assert_eq!(reader.read_message().await.unwrap(), Some(b"world".to_vec()));
    }

    #[tokio::test]
    async fn test_in_memory_close_and_failure() {
        let (connection, mut peer) = in_memory();
        let (_, mut reader, mut writer) = connection.into_parts();

        writer.close().await.unwrap();
        assert!(peer.recv().await.is_none());
        assert!(matches!(
            writer.send(Message::text("late")).await,
            Err(BridgeError::TransportWrite(_))
        ));

        peer.fail("reset by peer");
        assert!(matches!(
            reader.read_message().await,
            Err(BridgeError::ConnectionError(_))
        ));

        drop(peer);
        assert_eq!(reader.read_message().await.unwrap(), None);
    }
}
