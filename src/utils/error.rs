//! The `error` module defines the error types used within `topichub`.
//!
//! None of these reach a publisher. Every failure is handled where it is
//! detected and turned into a connection lifecycle transition or a log line.

use thiserror::Error;
use tungstenite::Error as WsError;

/// Fatal transport conditions. Any of these ends the pump that hit it and
/// tears the connection down.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("websocket error: {0}")]
    Transport(#[from] WsError),

    #[error("no pong received within {0:?}")]
    ReadTimeout(std::time::Duration),

    #[error("write did not complete within {0:?}")]
    WriteTimeout(std::time::Duration),

    #[error("inbound message of {size} bytes exceeds the {limit} byte limit")]
    MessageTooLarge { size: usize, limit: usize },
}

/// A frame that could not be turned into an intent. Logged and discarded.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid action envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("invalid subscribe message: {0}")]
    Subscribe(#[source] serde_json::Error),

    #[error("invalid publish message: {0}")]
    Publish(#[source] serde_json::Error),

    #[error("binary frame is not valid UTF-8")]
    NotUtf8(#[from] std::str::Utf8Error),
}

/// Why the hub could not enqueue a message on a client's outbound queue.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound queue is full")]
    Full,

    #[error("outbound queue is closed")]
    Closed,
}
