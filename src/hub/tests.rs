use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

use super::topic::Topic;
use super::{Hub, HubHandle};
use crate::client::{Client, ClientId, CloseGuard, ConnectionState};

fn client(capacity: usize) -> (Client, mpsc::Receiver<WsMessage>, Arc<CloseGuard>) {
    let (tx, rx) = mpsc::channel::<WsMessage>(capacity);
    let guard = Arc::new(CloseGuard::new());
    (Client::new(tx, guard.clone()), rx, guard)
}

fn registered(hub: &mut Hub, capacity: usize) -> (ClientId, mpsc::Receiver<WsMessage>, Arc<CloseGuard>) {
    let (client, rx, guard) = client(capacity);
    let id = client.id.clone();
    hub.register(client);
    (id, rx, guard)
}

#[test]
fn test_topic_new() {
    let topic = Topic::new("test_topic");
    assert_eq!(topic.name, "test_topic");
    assert!(topic.is_empty());
}

#[test]
fn test_topic_subscribe_is_idempotent() {
    let mut topic = Topic::new("test_topic");
    assert!(topic.subscribe("client1".to_string()));
    assert!(!topic.subscribe("client1".to_string()));
    assert_eq!(topic.subscribers.len(), 1);

    assert!(topic.unsubscribe(&"client1".to_string()));
    assert!(topic.is_empty());
}

#[test]
fn test_hub_register_and_unregister() {
    let mut hub = Hub::new();
    let (id, _rx, guard) = registered(&mut hub, 4);
    assert!(hub.clients.contains_key(&id));

    hub.unregister(&id);
    assert!(!hub.clients.contains_key(&id));
    assert_eq!(guard.state(), ConnectionState::Closing);
}

#[test]
fn unregister_is_idempotent() {
    let mut hub = Hub::new();
    let (id, _rx, guard) = registered(&mut hub, 4);
    hub.subscribe("news", &id);

    hub.unregister(&id);
    hub.unregister(&id);
    hub.unregister(&"client-unknown".to_string());

    assert!(hub.clients.is_empty());
    assert!(hub.topics.is_empty());
    assert!(guard.is_closed());
}

#[test]
fn unregister_closes_the_outbound_queue() {
    let mut hub = Hub::new();
    let (id, mut rx, _guard) = registered(&mut hub, 4);

    hub.unregister(&id);
    assert!(matches!(
        rx.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
}

#[test]
fn subscribe_records_both_directions() {
    let mut hub = Hub::new();
    let (id, _rx, _guard) = registered(&mut hub, 4);

    hub.subscribe("weather", &id);
    assert!(hub.topics["weather"].subscribers.contains(&id));
    assert!(hub.clients[&id].topics.contains("weather"));

    // subscribing twice changes nothing
    hub.subscribe("weather", &id);
    assert_eq!(hub.topics["weather"].subscribers.len(), 1);
    assert_eq!(hub.clients[&id].topics.len(), 1);
    assert!(hub.snapshot().is_consistent());
}

#[test]
fn unsubscribe_clears_both_directions_and_drops_empty_topic() {
    let mut hub = Hub::new();
    let (a, _rx_a, _) = registered(&mut hub, 4);
    let (b, _rx_b, _) = registered(&mut hub, 4);
    hub.subscribe("weather", &a);
    hub.subscribe("weather", &b);

    hub.unsubscribe("weather", &a);
    assert!(!hub.topics["weather"].subscribers.contains(&a));
    assert!(!hub.clients[&a].topics.contains("weather"));

    hub.unsubscribe("weather", &b);
    assert!(!hub.topics.contains_key("weather"));
    assert!(hub.snapshot().is_consistent());
}

#[test]
fn subscribe_for_unknown_client_is_ignored() {
    let mut hub = Hub::new();
    hub.subscribe("weather", &"client-ghost".to_string());
    assert!(hub.topics.is_empty());
}

#[test]
fn unsubscribe_all_clears_every_topic() {
    let mut hub = Hub::new();
    let (id, _rx, _) = registered(&mut hub, 4);
    let (other, _rx_other, _) = registered(&mut hub, 4);
    hub.subscribe("a", &id);
    hub.subscribe("b", &id);
    hub.subscribe("b", &other);

    hub.unsubscribe_all(&id);
    assert!(hub.clients[&id].topics.is_empty());
    assert!(!hub.topics.contains_key("a"));
    assert_eq!(hub.topics["b"].subscribers.len(), 1);
    assert!(hub.clients.contains_key(&id));
    assert!(hub.snapshot().is_consistent());
}

#[test]
fn test_hub_publish_reaches_only_subscribers() {
    let mut hub = Hub::new();
    let (a, mut rx_a, _) = registered(&mut hub, 4);
    let (_b, mut rx_b, _) = registered(&mut hub, 4);
    let (_c, mut rx_c, _) = registered(&mut hub, 4);
    hub.subscribe("weather", &a);

    let payload = r#"{"topic":"weather","data":"rain"}"#;
    hub.publish("weather", payload.to_string());

    assert_eq!(rx_a.try_recv().unwrap(), WsMessage::text(payload));
    assert!(rx_a.try_recv().is_err());
    assert!(rx_b.try_recv().is_err());
    assert!(rx_c.try_recv().is_err());
}

#[test]
fn publish_delivers_once_per_subscriber() {
    let mut hub = Hub::new();
    let mut receivers = Vec::new();
    for _ in 0..5 {
        let (id, rx, _) = registered(&mut hub, 4);
        hub.subscribe("chat", &id);
        // a second subscribe must not cause a second delivery
        hub.subscribe("chat", &id);
        receivers.push(rx);
    }

    hub.publish("chat", "hello".to_string());

    for rx in receivers.iter_mut() {
        assert_eq!(rx.try_recv().unwrap(), WsMessage::text("hello"));
        assert!(rx.try_recv().is_err());
    }
}

#[test]
fn test_publish_to_nonexistent_topic() {
    let mut hub = Hub::new();
    let (_id, mut rx, _) = registered(&mut hub, 4);
    hub.publish("nonexistent_topic", "hello".to_string());
    assert!(rx.try_recv().is_err());
    assert!(hub.topics.is_empty());
}

#[test]
fn slow_consumer_is_evicted_without_affecting_others() {
    let mut hub = Hub::new();
    let (slow, mut slow_rx, slow_guard) = registered(&mut hub, 1);
    let (fast, mut fast_rx, fast_guard) = registered(&mut hub, 4);
    hub.subscribe("ticks", &slow);
    hub.subscribe("ticks", &fast);
    hub.subscribe("other", &slow);

    hub.publish("ticks", "1".to_string());
    assert_eq!(fast_rx.try_recv().unwrap(), WsMessage::text("1"));
    // slow never drains, so its queue is now full
    hub.publish("ticks", "2".to_string());

    assert_eq!(fast_rx.try_recv().unwrap(), WsMessage::text("2"));
    assert!(!hub.clients.contains_key(&slow));
    assert!(!hub.topics["ticks"].subscribers.contains(&slow));
    assert!(!hub.topics.contains_key("other"));
    assert!(slow_guard.is_closed());
    assert!(!fast_guard.is_closed());
    assert!(hub.snapshot().is_consistent());

    // the queued message is still there, nothing more arrives
    assert_eq!(slow_rx.try_recv().unwrap(), WsMessage::text("1"));
    assert!(matches!(
        slow_rx.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
}

#[test]
fn test_publish_to_client_with_closed_channel() {
    let mut hub = Hub::new();
    let (id, rx, _guard) = registered(&mut hub, 4);
    hub.subscribe("test_topic", &id);

    // the outbound pump is gone
    drop(rx);

    hub.publish("test_topic", "hello".to_string());
    assert!(!hub.clients.contains_key(&id));
    assert!(hub.topics.is_empty());
}

#[tokio::test]
async fn handle_applies_intents_in_order() {
    let (handle, _task) = Hub::spawn();
    let (client, mut rx, _) = client(8);
    let id = client.id.clone();

    handle.register(client);
    handle.subscribe("a".to_string(), id.clone());
    handle.subscribe("b".to_string(), id.clone());
    handle.unsubscribe("a".to_string(), id.clone());
    handle.publish("a".to_string(), "to-a".to_string());
    handle.publish("b".to_string(), "to-b".to_string());

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.subscribers("a").is_none());
    assert!(snapshot.subscribers("b").unwrap().contains(&id));
    assert_eq!(snapshot.topics_of(&id).unwrap().len(), 1);

    assert_eq!(rx.try_recv().unwrap(), WsMessage::text("to-b"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn hub_stops_when_handles_are_dropped() {
    let (handle, task) = Hub::spawn();
    drop(handle);
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("hub should stop")
        .unwrap();
}

#[tokio::test]
async fn snapshot_after_hub_stopped_is_none() {
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let handle = HubHandle::new(tx);
    assert!(handle.snapshot().await.is_none());
    // sending to a stopped hub only logs
    handle.publish("t".to_string(), "p".to_string());
}

#[tokio::test]
async fn concurrent_intents_keep_the_table_consistent() {
    let (handle, _task) = Hub::spawn();
    let topics = ["a", "b", "c", "d"];

    let mut workers = Vec::new();
    let mut receivers = Vec::new();
    for n in 0..16usize {
        let (client, rx, _) = client(256);
        receivers.push(rx);
        let id = client.id.clone();
        handle.register(client);

        let handle = handle.clone();
        workers.push(tokio::spawn(async move {
            for round in 0..50usize {
                let topic = topics[(n + round) % topics.len()].to_string();
                match (n + round) % 5 {
                    0 | 1 => handle.subscribe(topic, id.clone()),
                    2 => handle.unsubscribe(topic, id.clone()),
                    3 => handle.publish(topic, format!("{n}:{round}")),
                    _ => handle.unsubscribe_all(id.clone()),
                }
                if round % 7 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            if n % 4 == 0 {
                handle.unregister(id);
            }
        }));
    }

    for worker in workers {
        worker.await.unwrap();
    }

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.is_consistent());
    assert_eq!(snapshot.clients.len(), 12);
}
