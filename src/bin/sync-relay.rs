//! Local stand-in for the tournament push channel.
//!
//! Every client gets a `connection_info` frame on connect, `"ping"` is answered
//! with a `pong`, and any other text frame is rebroadcast to all clients.

use courtside_api::SyncMessage;
use courtside_api::realtime::HEARTBEAT_FRAME;
use futures_util::{SinkExt, StreamExt};
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let addr = env::var("COURTSIDE_RELAY_BIND").unwrap_or_else(|_| "0.0.0.0:8788".to_string());
    let listener = TcpListener::bind(&addr).await?;
    let (tx, _rx) = broadcast::channel::<String>(512);
    let clients = Arc::new(AtomicU32::new(0));

    eprintln!("sync relay listening on {addr}");

    loop {
        let (stream, peer) = listener.accept().await?;
        let tx = tx.clone();
        let rx = tx.subscribe();
        let clients = clients.clone();
        tokio::spawn(async move {
            let connected = clients.fetch_add(1, Ordering::SeqCst) + 1;
            eprintln!("client {peer} connected ({connected} total)");
            if let Err(e) = handle_client(stream, tx, rx, connected).await {
                eprintln!("client {peer} disconnected: {e}");
            }
            clients.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

async fn handle_client(
    stream: TcpStream,
    tx: broadcast::Sender<String>,
    mut rx: broadcast::Receiver<String>,
    connected: u32,
) -> anyhow::Result<()> {
    let ws = accept_async(stream).await?;
    let (mut write, mut read) = ws.split();

    let info = SyncMessage::ConnectionInfo {
        message: "connected to sync relay".to_string(),
        connected_clients: connected,
    };
    write.send(Message::Text(serde_json::to_string(&info)?.into())).await?;

    loop {
        tokio::select! {
            inbound = read.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) if text.as_str() == HEARTBEAT_FRAME => {
                        let pong = serde_json::to_string(&SyncMessage::Pong)?;
                        write.send(Message::Text(pong.into())).await?;
                    }
                    Some(Ok(Message::Text(text))) => {
                        let _ = tx.send(text.to_string());
                    }
                    Some(Ok(Message::Binary(_))) => {}
                    Some(Ok(Message::Ping(_))) => {}
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => return Err(e.into()),
                }
            }
            outbound = rx.recv() => {
                match outbound {
                    Ok(text) => {
                        write.send(Message::Text(text.into())).await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}
