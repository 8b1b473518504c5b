//! WebSocket listener
//!
//! Accepts TCP connections, performs the WebSocket upgrade and hands each
//! stream to its own connection actor. Holds no state of its own.

use std::io;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_async_with_config;
use tracing::{info, warn};

use crate::config::ConnectionSettings;
use crate::hub::HubHandle;
use crate::transport::connection::serve_connection;

pub async fn start_websocket_server(
    addr: &str,
    hub: HubHandle,
    settings: ConnectionSettings,
) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    serve(listener, hub, settings).await
}

/// Accept loop over an already bound listener.
pub async fn serve(
    listener: TcpListener,
    hub: HubHandle,
    settings: ConnectionSettings,
) -> io::Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let hub = hub.clone();
        let settings = settings.clone();
        tokio::spawn(async move {
            let ws = match accept_async_with_config(stream, Some(settings.websocket_config())).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!(%peer, error = %e, "WebSocket handshake error");
                    return;
                }
            };
            serve_connection(ws, hub, settings).await;
        });
    }
}
