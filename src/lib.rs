//! # topichub
//!
//! `topichub` is an in-memory publish/subscribe hub served over WebSockets.
//! Clients subscribe to named topics and receive a copy of every message
//! another client publishes to them. Delivery is best effort: a client that
//! cannot keep up is disconnected instead of slowing everyone else down.
//!
//! ## Core Modules
//!
//! - `hub`: the single task that owns the topic → subscribers table and
//!   fans published messages out.
//! - `client`: the hub's handle on a connection and its one-shot close guard.
//! - `transport`: the wire protocol, the per-connection actor (inbound and
//!   outbound pumps with keepalive) and the WebSocket listener.
//! - `config`: loading settings from files and environment variables.
//! - `utils`: error types and logging setup.

pub mod client;
pub mod config;
pub mod hub;
pub mod transport;
pub mod utils;
