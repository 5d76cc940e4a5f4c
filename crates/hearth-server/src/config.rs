//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use hearth_shared::constants::{APP_NAME, DEFAULT_CONNECTION_BUFFER, DEFAULT_HTTP_PORT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP + WebSocket server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./hearth.db`
    pub database_path: PathBuf,

    /// Ed25519 public key of the account service that signs access tokens
    /// (hex-encoded, 64 chars).
    /// Env: `AUTH_ISSUER_PUBKEY`
    /// Default: all-zeros, which rejects every token.
    pub auth_issuer_pubkey: [u8; 32],

    /// Human-readable name for this instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Hearth"`
    pub instance_name: String,

    /// Outbound events buffered per connection before pushes are dropped.
    /// Env: `CONNECTION_BUFFER`
    /// Default: `256`
    pub connection_buffer: usize,

    /// Interval between liveness pings. Zero disables the probe.
    /// Env: `PING_INTERVAL_SECS`
    /// Default: `30`
    pub ping_interval: Duration,

    /// Grace period for a pong after the ping interval elapses.
    /// Env: `PONG_TIMEOUT_SECS`
    /// Default: `10`
    pub pong_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./hearth.db"),
            auth_issuer_pubkey: [0u8; 32],
            instance_name: APP_NAME.to_string(),
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(hex_key) = lookup("AUTH_ISSUER_PUBKEY") {
            match parse_hex_pubkey(&hex_key) {
                Ok(key) => config.auth_issuer_pubkey = key,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Invalid AUTH_ISSUER_PUBKEY, every token will be rejected"
                    );
                }
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(val) = lookup("CONNECTION_BUFFER") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.connection_buffer = n,
                _ => tracing::warn!(value = %val, "Invalid CONNECTION_BUFFER, using default"),
            }
        }

        if let Some(val) = lookup("PING_INTERVAL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => config.ping_interval = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %val, "Invalid PING_INTERVAL_SECS, using default"),
            }
        }

        if let Some(val) = lookup("PONG_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => config.pong_timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %val, "Invalid PONG_TIMEOUT_SECS, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    /// Whether the ping/pong liveness probe runs.
    pub fn liveness_enabled(&self) -> bool {
        !self.ping_interval.is_zero()
    }
}

/// Parse a 64-character hex string into a 32-byte array.
fn parse_hex_pubkey(hex_str: &str) -> Result<[u8; 32], String> {
    let hex_str = hex_str.trim();
    if hex_str.len() != 64 {
        return Err(format!("expected 64 hex chars, got {}", hex_str.len()));
    }

    let bytes = hex::decode(hex_str).map_err(|e| format!("invalid hex: {e}"))?;
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.auth_issuer_pubkey, [0u8; 32]);
        assert_eq!(config.connection_buffer, 256);
        assert!(config.liveness_enabled());
    }

    #[test]
    fn test_parse_hex_pubkey() {
        let hex = "ab".repeat(32);
        let key = parse_hex_pubkey(&hex).unwrap();
        assert_eq!(key, [0xab; 32]);
    }

    #[test]
    fn test_parse_hex_pubkey_wrong_length() {
        assert!(parse_hex_pubkey("abcd").is_err());
    }

    #[test]
    fn test_overrides() {
        let key = "01".repeat(32);
        let config = from_pairs(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/tmp/h.db"),
            ("AUTH_ISSUER_PUBKEY", key.as_str()),
            ("CONNECTION_BUFFER", "8"),
            ("PING_INTERVAL_SECS", "0"),
        ]);
        assert_eq!(config.http_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.database_path, PathBuf::from("/tmp/h.db"));
        assert_eq!(config.auth_issuer_pubkey, [0x01; 32]);
        assert_eq!(config.connection_buffer, 8);
        assert!(!config.liveness_enabled());
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "nope"),
            ("CONNECTION_BUFFER", "0"),
            ("PONG_TIMEOUT_SECS", "soon"),
        ]);
        assert_eq!(config.http_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.connection_buffer, 256);
        assert_eq!(config.pong_timeout, Duration::from_secs(10));
    }
}
