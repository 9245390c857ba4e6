//! Rotaria Bridge - WebSocket bridge between a community bot and a game server
//!
//! This library provides the correlated command channel to the game server,
//! the observer hub, and the warp routes that expose both.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;

// Re-export main components
pub use config::*;
pub use constants::*;
pub use error::{BridgeError, Result};
