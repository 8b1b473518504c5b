//! The hub-side handle on a connection
//!
//! A `Client` is created by the connection actor, registered with the hub
//! and from then on owned by the hub. The hub uses it to enqueue outbound
//! messages and to request teardown.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use super::close_guard::CloseGuard;
use crate::utils::error::DeliveryError;

pub type ClientId = String;

/// The hub's handle on one connected WebSocket client.
///
/// Holds the sending side of the bounded outbound queue, the set of topics
/// the client is subscribed to, and the close guard shared with the
/// connection's pumps. Dropping the handle drops the queue sender, which the
/// outbound pump observes as a closed queue.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for the client, `client-<uuid>`.
    pub id: ClientId,

    /// Topics this client is subscribed to. Mutated only by the hub.
    pub topics: HashSet<String>,

    sender: Sender<WsMessage>,
    guard: Arc<CloseGuard>,
}

impl Client {
    pub fn new(sender: Sender<WsMessage>, guard: Arc<CloseGuard>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            topics: HashSet::new(),
            sender,
            guard,
        }
    }

    /// Enqueues `message` without waiting for room.
    pub fn try_deliver(&self, message: WsMessage) -> Result<(), DeliveryError> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Requests teardown of the connection. Idempotent.
    pub fn close(&self) -> bool {
        self.guard.close()
    }

    pub fn is_closed(&self) -> bool {
        self.guard.is_closed()
    }
}
