//! The `client` module defines the hub-side representation of a connection.
//!
//! It provides the `Client` handle, which carries the connection's id, its
//! bounded outbound queue and its topic set, and the `CloseGuard` that makes
//! tearing a connection down a one-shot operation.

pub mod close_guard;
pub mod handle;

pub use close_guard::{CloseGuard, ConnectionState};
pub use handle::{Client, ClientId};
