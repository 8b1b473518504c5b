//! Connection actor
//!
//! One actor per WebSocket. It registers a `Client` with the hub, then runs
//! two pumps:
//!
//! - the inbound pump reads frames, decodes them and sends intents to the
//!   hub. It owns the read deadline, refreshed by pongs.
//! - the outbound pump drains the client's outbound queue to the wire and
//!   pings the peer every `ping_period`.
//!
//! The pumps share only the queue and the close guard. Whichever side fails
//! first closes the guard, which stops the other side; the hub is told to
//! unregister the client once the inbound pump is done.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc::{self, Receiver};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tungstenite::Error as WsError;
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Client, ClientId, CloseGuard};
use crate::config::ConnectionSettings;
use crate::hub::HubHandle;
use crate::transport::message::{Action, ClientMessage};
use crate::utils::error::{ConnectionError, DecodeError};

/// Runs a connection until it is torn down. Returns once both pumps have
/// stopped.
pub async fn serve_connection<T>(ws: T, hub: HubHandle, settings: ConnectionSettings)
where
    T: Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError> + Send + 'static,
{
    let (sink, stream) = ws.split();
    let (tx, rx) = mpsc::channel::<WsMessage>(settings.send_buffer);
    let guard = Arc::new(CloseGuard::new());
    let client = Client::new(tx, guard.clone());
    let id = client.id.clone();

    hub.register(client);
    info!(client = %id, "connection opened");

    let writer = tokio::spawn(write_pump(
        sink,
        rx,
        guard.clone(),
        settings.clone(),
        id.clone(),
    ));

    if let Err(e) = read_pump(stream, &hub, &guard, &settings, &id).await {
        debug!(client = %id, error = %e, "read pump stopped");
    }

    hub.unregister(id.clone());
    guard.close();

    match writer.await {
        Ok(Err(e)) => debug!(client = %id, error = %e, "write pump stopped"),
        Err(e) => warn!(client = %id, error = %e, "write pump panicked"),
        Ok(Ok(())) => {}
    }
    info!(client = %id, "connection closed");
}

async fn read_pump<R>(
    mut stream: R,
    hub: &HubHandle,
    guard: &CloseGuard,
    settings: &ConnectionSettings,
    id: &ClientId,
) -> Result<(), ConnectionError>
where
    R: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    let pong_wait = settings.pong_wait();
    let limit = settings.max_message_size;
    let mut deadline = Instant::now() + pong_wait;

    loop {
        let frame = tokio::select! {
            _ = guard.closed() => return Ok(()),
            frame = time::timeout_at(deadline, stream.next()) => {
                frame.map_err(|_| ConnectionError::ReadTimeout(pong_wait))?
            }
        };

        let Some(message) = frame else {
            return Ok(());
        };
        let message = message?;

        // the codec enforces the same limit when built from `websocket_config`
        let size = message.len();
        if size > limit {
            return Err(ConnectionError::MessageTooLarge { size, limit });
        }

        match message {
            WsMessage::Text(text) => dispatch(hub, id, text.as_str()),
            WsMessage::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => dispatch(hub, id, text),
                Err(e) => {
                    warn!(client = %id, error = %DecodeError::from(e), "discarding frame")
                }
            },
            WsMessage::Pong(_) => deadline = Instant::now() + pong_wait,
            WsMessage::Close(_) => return Ok(()),
            WsMessage::Ping(_) | WsMessage::Frame(_) => {}
        }
    }
}

/// Turns one decoded frame into hub intents. Decode failures are logged and
/// the frame is dropped.
pub(crate) fn dispatch(hub: &HubHandle, id: &ClientId, text: &str) {
    let action = match Action::decode(text) {
        Ok(action) => action,
        Err(e) => {
            warn!(client = %id, error = %e, "discarding frame");
            return;
        }
    };

    if action == Action::Subscribe {
        // a subscribe replaces the whole set, even if its body is bad
        hub.unsubscribe_all(id.clone());
    }

    match ClientMessage::decode(action, text) {
        Ok(ClientMessage::Subscribe { topics }) => {
            debug!(client = %id, ?topics, "replacing subscriptions");
            for topic in topics {
                hub.subscribe(topic, id.clone());
            }
        }
        Ok(ClientMessage::Publish { topic, payload }) => {
            debug!(client = %id, topic = %topic, "publishing");
            hub.publish(topic, payload);
        }
        Err(e) => warn!(client = %id, error = %e, "discarding frame"),
    }
}

async fn write_pump<W>(
    mut sink: W,
    mut queue: Receiver<WsMessage>,
    guard: Arc<CloseGuard>,
    settings: ConnectionSettings,
    id: ClientId,
) -> Result<(), ConnectionError>
where
    W: Sink<WsMessage, Error = WsError> + Unpin,
{
    let write_wait = settings.write_wait();
    let ping_period = settings.ping_period();
    let mut ticker = time::interval_at(Instant::now() + ping_period, ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let result = loop {
        tokio::select! {
            biased;

            _ = guard.closed() => {
                break write(&mut sink, WsMessage::Close(None), write_wait).await;
            }
            message = queue.recv() => match message {
                Some(message) => {
                    if let Err(e) = write(&mut sink, message, write_wait).await {
                        break Err(e);
                    }
                }
                None => {
                    debug!(client = %id, "outbound queue closed");
                    break write(&mut sink, WsMessage::Close(None), write_wait).await;
                }
            },
            _ = ticker.tick() => {
                if let Err(e) = write(&mut sink, WsMessage::Ping(Default::default()), write_wait).await {
                    break Err(e);
                }
            }
        }
    };

    drop(ticker);
    guard.close();
    let _ = time::timeout(write_wait, sink.close()).await;
    guard.mark_closed();
    result
}

async fn write<W>(sink: &mut W, message: WsMessage, write_wait: Duration) -> Result<(), ConnectionError>
where
    W: Sink<WsMessage, Error = WsError> + Unpin,
{
    match time::timeout(write_wait, sink.send(message)).await {
        Ok(sent) => sent.map_err(ConnectionError::from),
        Err(_) => Err(ConnectionError::WriteTimeout(write_wait)),
    }
}
