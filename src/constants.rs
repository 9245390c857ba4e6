use std::time::Duration;

// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const OBSERVER_WS_PATH: &str = "ws";
pub const PEER_WS_PATH: &str = "mc";

// Upper bound on how long a command waits for its reply
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
