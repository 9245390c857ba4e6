use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // Command errors
    NotConnected,
    TransportWrite(String),
    RemoteError(String),
    Timeout,
    BridgeClosed,
    Cancelled,

    // Frame errors
    MalformedFrame(String),

    // Connection errors
    ConnectionError(String),

    // State errors
    StateLock(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "Game server not connected"),
            Self::TransportWrite(msg) => write!(f, "Write failed: {}", msg),
            Self::RemoteError(msg) => write!(f, "Game server error: {}", msg),
            Self::Timeout => write!(f, "Timed out waiting for game server response"),
            Self::BridgeClosed => write!(f, "Bridge closed"),
            Self::Cancelled => write!(f, "Command cancelled by caller"),
            Self::MalformedFrame(msg) => write!(f, "Malformed frame: {}", msg),
            Self::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            Self::StateLock(msg) => write!(f, "State lock error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for BridgeError {}

// Converting from PoisonError to facilitate poisoned mutex handling
impl<T> From<PoisonError<T>> for BridgeError {
    fn from(err: PoisonError<T>) -> Self {
        BridgeError::StateLock(format!("Mutex poisoned: {}", err))
    }
}

// Generic result type for the bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
