//! Hub engine
//!
//! The hub is the only owner of the routing table. It runs as a single
//! task that drains an event channel and applies one intent fully before
//! looking at the next, so the table never needs a lock and the
//! topic/client bookkeeping is consistent between any two events.
//!
//! - `Hub` holds the state and exposes synchronous operations.
//! - `Hub::run` is the event loop; `Hub::spawn` starts it on tokio.
//! - `HubHandle` is the cloneable front door used by connections.
//!
//! Fan-out never waits for a slow client: a full outbound queue gets that
//! client evicted while everyone else still receives the message.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use super::event::{Event, HubSnapshot, Subscription};
use super::topic::Topic;
use crate::client::{Client, ClientId};

#[derive(Debug, Default)]
pub struct Hub {
    pub topics: HashMap<String, Topic>,
    pub clients: HashMap<ClientId, Client>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the event loop on the current runtime.
    pub fn spawn() -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Hub::new().run(rx));
        (HubHandle { events: tx }, task)
    }

    /// Processes events until every `HubHandle` has been dropped.
    pub async fn run(mut self, mut events: UnboundedReceiver<Event>) {
        info!("hub event loop started");
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        info!(
            clients = self.clients.len(),
            topics = self.topics.len(),
            "hub event loop stopped"
        );
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Register(client) => self.register(client),
            Event::Unregister(id) => self.unregister(&id),
            Event::Subscribe(Subscription { topic, client }) => self.subscribe(&topic, &client),
            Event::Unsubscribe(Subscription { topic, client }) => {
                self.unsubscribe(&topic, &client)
            }
            Event::UnsubscribeAll(id) => self.unsubscribe_all(&id),
            Event::Publish { topic, payload } => self.publish(&topic, payload),
            Event::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    pub fn register(&mut self, client: Client) {
        debug!(client = %client.id, "registered");
        self.clients.insert(client.id.clone(), client);
    }

    /// Removes the client from every topic and closes it. Unknown ids are
    /// ignored, so repeated unregisters are harmless.
    pub fn unregister(&mut self, id: &ClientId) {
        let Some(client) = self.clients.remove(id) else {
            debug!(client = %id, "unregister for unknown client");
            return;
        };

        for topic in &client.topics {
            self.detach(topic, id);
        }
        client.close();
        info!(client = %id, "unregistered");
        // dropping `client` drops the queue sender
    }

    /// Subscribes a client to a topic, creating the topic if needed.
    pub fn subscribe(&mut self, topic: &str, id: &ClientId) {
        let Some(client) = self.clients.get_mut(id) else {
            debug!(client = %id, topic, "subscribe for unknown client");
            return;
        };

        client.topics.insert(topic.to_string());
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(id.clone());
        debug!(client = %id, topic, "subscribed");
    }

    pub fn unsubscribe(&mut self, topic: &str, id: &ClientId) {
        if let Some(client) = self.clients.get_mut(id) {
            client.topics.remove(topic);
        }
        self.detach(topic, id);
        debug!(client = %id, topic, "unsubscribed");
    }

    pub fn unsubscribe_all(&mut self, id: &ClientId) {
        let Some(client) = self.clients.get_mut(id) else {
            return;
        };

        let topics = std::mem::take(&mut client.topics);
        for topic in &topics {
            self.detach(topic, id);
        }
        debug!(client = %id, count = topics.len(), "cleared subscriptions");
    }

    /// Fans `payload` out to every subscriber of `topic`. Clients whose queue
    /// is full or gone are evicted after the loop.
    pub fn publish(&mut self, topic: &str, payload: String) {
        let Some(entry) = self.topics.get(topic) else {
            debug!(topic, "publish to topic without subscribers");
            return;
        };

        let message = WsMessage::text(payload);
        let mut evicted = Vec::new();
        for id in &entry.subscribers {
            match self.clients.get(id) {
                Some(client) => {
                    if let Err(e) = client.try_deliver(message.clone()) {
                        warn!(client = %id, topic, error = %e, "evicting client");
                        evicted.push(id.clone());
                    }
                }
                None => warn!(client = %id, topic, "subscriber is not registered"),
            }
        }
        debug!(topic, delivered = entry.subscribers.len() - evicted.len(), "published");

        for id in evicted {
            self.unregister(&id);
        }
    }

    pub fn snapshot(&self) -> HubSnapshot {
        HubSnapshot {
            topics: self
                .topics
                .iter()
                .map(|(name, topic)| (name.clone(), topic.subscribers.iter().cloned().collect()))
                .collect(),
            clients: self
                .clients
                .iter()
                .map(|(id, client)| (id.clone(), client.topics.iter().cloned().collect()))
                .collect(),
        }
    }

    /// Removes `id` from `topic`'s subscriber set, dropping the topic when
    /// it becomes empty.
    fn detach(&mut self, topic: &str, id: &ClientId) {
        if let Some(entry) = self.topics.get_mut(topic) {
            entry.unsubscribe(id);
            if entry.is_empty() {
                self.topics.remove(topic);
                debug!(topic, "topic dropped");
            }
        }
    }
}

/// Cloneable sender side of the hub's event channel.
///
/// Every method enqueues an intent and returns immediately; the hub applies
/// intents in the order they arrive. Intents sent after the hub stopped are
/// dropped with a warning.
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: UnboundedSender<Event>,
}

impl HubHandle {
    pub fn new(events: UnboundedSender<Event>) -> Self {
        Self { events }
    }

    pub fn register(&self, client: Client) {
        self.send(Event::Register(client));
    }

    pub fn unregister(&self, id: ClientId) {
        self.send(Event::Unregister(id));
    }

    pub fn subscribe(&self, topic: String, client: ClientId) {
        self.send(Event::Subscribe(Subscription { topic, client }));
    }

    pub fn unsubscribe(&self, topic: String, client: ClientId) {
        self.send(Event::Unsubscribe(Subscription { topic, client }));
    }

    pub fn unsubscribe_all(&self, id: ClientId) {
        self.send(Event::UnsubscribeAll(id));
    }

    pub fn publish(&self, topic: String, payload: String) {
        self.send(Event::Publish { topic, payload });
    }

    /// Returns the routing table as it stands after every intent sent so far
    /// has been applied, or `None` if the hub is gone.
    pub async fn snapshot(&self) -> Option<HubSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.events.send(Event::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    fn send(&self, event: Event) {
        if self.events.send(event).is_err() {
            warn!("hub is not running, dropping event");
        }
    }
}
