//! WebSocket Server Implementation
//!
//! Async WebSocket server that broadcasts tracker snapshots to all
//! connected clients in real time.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::tracker::TrackerSnapshot;

/// WebSocket server for broadcasting tracker snapshots.
pub struct WebSocketServer {
    port: u16,
    snapshot_tx: Arc<broadcast::Sender<TrackerSnapshot>>,
}

impl WebSocketServer {
    pub fn new(port: u16, snapshot_tx: Arc<broadcast::Sender<TrackerSnapshot>>) -> Self {
        Self { port, snapshot_tx }
    }

    /// Start the WebSocket server and accept connections.
    pub async fn run(self) -> Result<()> {
        let addr = format!("127.0.0.1:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .context(format!("failed to bind to {}", addr))?;

        info!("WebSocket server listening on {}", addr);

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    info!("new connection from {}", peer_addr);
                    let snapshot_tx = self.snapshot_tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer_addr, snapshot_tx).await {
                            warn!("connection error for {}: {}", peer_addr, e);
                        }
                        info!("client {} disconnected", peer_addr);
                    });
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    snapshot_tx: Arc<broadcast::Sender<TrackerSnapshot>>,
) -> Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .context("failed to accept WebSocket handshake")?;

    debug!("WebSocket handshake completed for {}", peer_addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut snapshot_rx = snapshot_tx.subscribe();

    let welcome_msg = serde_json::json!({
        "type": "connection",
        "status": "connected",
        "message": "lighthouse pose tracker demo",
    });
    ws_sender
        .send(Message::Text(welcome_msg.to_string()))
        .await
        .context("failed to send welcome message")?;

    let mut receive_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Close(frame)) => {
                    info!("close frame from {}: {:?}", peer_addr, frame);
                    break;
                }
                Ok(_) => {
                    // This demo has no client-to-server commands.
                }
                Err(e) => {
                    warn!("error receiving from {}: {}", peer_addr, e);
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            result = snapshot_rx.recv() => {
                match result {
                    Ok(snapshot) => {
                        match serde_json::to_string(&snapshot) {
                            Ok(json) => {
                                if let Err(e) = ws_sender.send(Message::Text(json)).await {
                                    debug!("failed to send to {}: {}", peer_addr, e);
                                    break;
                                }
                            }
                            Err(e) => error!("serialization error: {}", e),
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("client {} lagged, skipped {} messages", peer_addr, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("broadcast channel closed");
                        break;
                    }
                }
            }
            _ = &mut receive_task => {
                debug!("receive task completed for {}", peer_addr);
                break;
            }
        }
    }

    let _ = ws_sender.send(Message::Close(None)).await;
    Ok(())
}
