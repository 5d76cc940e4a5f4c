/// Protocol version reported by the server
pub const PROTOCOL_VERSION: &str = "/hearth/1.0.0";

/// Application name
pub const APP_NAME: &str = "Hearth";

/// Maximum direct message content size in bytes (64 KiB)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Idle time after which clients should send `typing-set` with `isTyping: false`.
/// The relay itself never times typing state out.
pub const TYPING_IDLE_TIMEOUT_SECS: u64 = 3;

/// Outbound events buffered per connection before pushes are dropped
pub const DEFAULT_CONNECTION_BUFFER: usize = 256;

/// Default HTTP / WebSocket port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// WebSocket close code sent to a connection replaced by a newer one
pub const CLOSE_EVICTED: u16 = 4000;

/// WebSocket close code sent when the liveness probe fails
pub const CLOSE_PONG_TIMEOUT: u16 = 4008;
