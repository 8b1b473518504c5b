//! The `transport` module is responsible for network communication with
//! clients over WebSockets.
//!
//! It defines the inbound message protocol, the per-connection actor that
//! translates frames into hub intents and hub deliveries into frames, and
//! the listener that accepts connections.

pub mod connection;
pub mod message;
pub mod websocket;

pub use connection::serve_connection;
pub use message::{Action, ClientMessage};
pub use websocket::start_websocket_server;
