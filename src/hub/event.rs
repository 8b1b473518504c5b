//! Intents delivered to the hub's event loop.

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::oneshot;

use crate::client::{Client, ClientId};

/// A (topic, client) pair carried by subscribe and unsubscribe intents.
/// Not stored once the hub has applied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic: String,
    pub client: ClientId,
}

#[derive(Debug)]
pub enum Event {
    Register(Client),
    Unregister(ClientId),
    Subscribe(Subscription),
    Unsubscribe(Subscription),
    /// Drop every subscription the client holds.
    UnsubscribeAll(ClientId),
    Publish { topic: String, payload: String },
    Snapshot(oneshot::Sender<HubSnapshot>),
}

/// Point-in-time copy of the routing table, taken inside the event loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubSnapshot {
    pub topics: BTreeMap<String, BTreeSet<ClientId>>,
    pub clients: BTreeMap<ClientId, BTreeSet<String>>,
}

impl HubSnapshot {
    pub fn subscribers(&self, topic: &str) -> Option<&BTreeSet<ClientId>> {
        self.topics.get(topic)
    }

    pub fn topics_of(&self, client: &str) -> Option<&BTreeSet<String>> {
        self.clients.get(client)
    }

    /// True when every topic membership is mirrored in the client's topic
    /// set and vice versa, no topic is empty, and every subscriber is a
    /// registered client.
    pub fn is_consistent(&self) -> bool {
        let forward = self.topics.iter().all(|(topic, subscribers)| {
            !subscribers.is_empty()
                && subscribers.iter().all(|id| {
                    self.clients
                        .get(id)
                        .is_some_and(|topics| topics.contains(topic))
                })
        });
        let backward = self.clients.iter().all(|(id, topics)| {
            topics.iter().all(|topic| {
                self.topics
                    .get(topic)
                    .is_some_and(|subscribers| subscribers.contains(id))
            })
        });
        forward && backward
    }
}
