use std::time::Duration;

use serde::Deserialize;
use tungstenite::protocol::WebSocketConfig;

/// Top-level configuration settings for the application.
///
/// Includes settings for the listener, the per-connection pumps and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub connection: ConnectionSettings,
    pub log: LogSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Tunables for a single connection's inbound and outbound pumps.
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionSettings {
    /// Time allowed to write one frame to the peer.
    pub write_wait_ms: u64,
    /// Time allowed between pongs before the peer is considered dead.
    pub pong_wait_ms: u64,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
    /// Capacity of the outbound queue, in messages.
    pub send_buffer: usize,
}

impl ConnectionSettings {
    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }

    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    /// Keepalive period. Always shorter than the pong wait so a live peer
    /// refreshes its read deadline before it expires.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait() * 9 / 10
    }

    /// Protocol limits for the WebSocket codec. Caps both a single frame and
    /// a reassembled message at `max_message_size`, so an oversized message
    /// fails while it is being read instead of after it is buffered.
    pub fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(Some(self.max_message_size))
            .max_frame_size(Some(self.max_message_size))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub connection: Option<PartialConnectionSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialConnectionSettings {
    pub write_wait_ms: Option<u64>,
    pub pong_wait_ms: Option<u64>,
    pub max_message_size: Option<usize>,
    pub send_buffer: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            write_wait_ms: 10_000,
            pong_wait_ms: 30_000,
            max_message_size: 512,
            send_buffer: 256,
        }
    }
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            connection: ConnectionSettings::default(),
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
