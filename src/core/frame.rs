//! Wire frames exchanged with the game server
//!
//! One JSON object per WebSocket message:
//! `{"type":"CMD","id":"..","body":".."}`, `{"type":"RES","id":"..","body":".."}`,
//! `{"type":"ERR","id":"..","msg":".."}`, `{"type":"EVT","topic":"..","body":".."}`.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Frame discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    #[serde(rename = "CMD")]
    Command,
    #[serde(rename = "RES")]
    Response,
    #[serde(rename = "ERR")]
    Error,
    #[serde(rename = "EVT")]
    Event,
    /// Any `type` this side does not understand
    #[serde(other)]
    Unknown,
}

/// A single wire message. Which optional fields matter depends on `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl Frame {
    fn empty(kind: FrameKind) -> Self {
        Self {
            kind,
            id: None,
            body: None,
            topic: None,
            msg: None,
        }
    }

    pub fn command(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            body: Some(body.into()),
            ..Self::empty(FrameKind::Command)
        }
    }

    pub fn response(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            body: Some(body.into()),
            ..Self::empty(FrameKind::Response)
        }
    }

    pub fn error(id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            msg: Some(msg.into()),
            ..Self::empty(FrameKind::Error)
        }
    }

    pub fn event(topic: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            body: Some(body.into()),
            ..Self::empty(FrameKind::Event)
        }
    }

    /// Correlation id, if the frame carries one
    pub fn correlation_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Body text, empty when absent
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

/// Serialize a frame to its wire text
pub fn encode(frame: &Frame) -> Result<String> {
    serde_json::to_string(frame).map_err(|e| BridgeError::MalformedFrame(e.to_string()))
}

/// Parse wire bytes into a frame
pub fn decode(data: &[u8]) -> Result<Frame> {
    serde_json::from_slice(data).map_err(|e| BridgeError::MalformedFrame(e.to_string()))
}
