//! Core functionality for the bridge

pub mod bridge;
pub mod connection;
pub mod frame;
pub mod hub;
pub mod transport;

// Re-export main components for convenience
pub use bridge::{create_bridge, Bridge, BridgeStatus, EventHandler, SharedBridge};
pub use connection::ObserverConnection;
pub use frame::{Frame, FrameKind};
pub use hub::{create_hub, Hub, SharedHub};
pub use transport::{in_memory, Connection, MemoryPeer, MessageReader, MessageWriter};
