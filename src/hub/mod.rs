//! The routing hub: sole owner of the topic → subscribers table.
//!
//! Connections never touch the table directly. They send intents through a
//! `HubHandle` and the hub applies them one at a time.

pub mod engine;
pub mod event;
pub mod topic;

pub use engine::{Hub, HubHandle};
pub use event::{Event, HubSnapshot, Subscription};

#[cfg(test)]
mod tests;
