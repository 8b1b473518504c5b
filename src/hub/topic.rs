//! Topic management
//!
//! A `Topic` holds the set of client ids subscribed to one topic name.
//! Topics exist only while they have subscribers; the hub drops the entry
//! as soon as the set becomes empty.

use std::collections::HashSet;

use crate::client::ClientId;

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashSet<ClientId>,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashSet::new(),
        }
    }

    /// Add a subscriber to the topic. Returns `false` if it was already there.
    pub fn subscribe(&mut self, id: ClientId) -> bool {
        self.subscribers.insert(id)
    }

    /// Remove a subscriber from the topic.
    pub fn unsubscribe(&mut self, id: &ClientId) -> bool {
        self.subscribers.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
