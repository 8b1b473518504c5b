//! CLI for topichub
//!
//! Subcommands:
//! - `server`: run the WebSocket hub
//! - `client`: subscribe to topics and print what arrives (smoke tests)

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tracing::{error, info};
use tungstenite::protocol::Message as WsMessage;

use topichub::config::load_config;
use topichub::hub::Hub;
use topichub::transport::start_websocket_server;
use topichub::utils::logging;

#[derive(Parser)]
#[command(name = "topichub")]
enum Command {
    /// Start the WebSocket hub
    Server,
    /// Connect, subscribe to the given topics and print every message
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Topic to subscribe to; repeat for several
        #[arg(long = "topic", required = true)]
        topics: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cmd = Command::parse();

    let result = match cmd {
        Command::Server => run_server().await,
        Command::Client { url, topics } => {
            logging::init("info");
            run_client(&url, topics).await
        }
    };

    if let Err(e) = result {
        // logging may not be initialised yet when the config fails to load
        eprintln!("topichub failed: {e}");
        std::process::exit(1);
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init(&config.log.level);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let (hub, hub_task) = Hub::spawn();

    tokio::select! {
        res = start_websocket_server(&addr, hub, config.connection.clone()) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    hub_task.abort();
    Ok(())
}

async fn run_client(url: &str, topics: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let (mut ws_stream, _response) = connect_async(url).await?;
    info!(url, ?topics, "connected");

    let subscribe = json!({ "action": "subscribe", "topics": topics });
    ws_stream
        .send(WsMessage::text(subscribe.to_string()))
        .await?;

    while let Some(frame) = ws_stream.next().await {
        match frame? {
            WsMessage::Text(text) => println!("{}", text.as_str()),
            WsMessage::Close(reason) => {
                info!(?reason, "server closed the connection");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
