//! WebSocket upgrade handler

use std::net::SocketAddr;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{Joined, WorldHandle};
use crate::ws::codec::{self, CodecError};
use crate::ws::protocol::{ClientMsg, Identity, ServerMsg};

/// Accept a WebSocket upgrade as a sync connection
pub fn upgrade(ws: WebSocketUpgrade, peer: Option<SocketAddr>, state: AppState) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, state.world))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, peer: Option<SocketAddr>, world: WorldHandle) {
    let (mut ws_sink, ws_stream) = socket.split();

    let Joined { id, snapshots } = match world.join(peer).await {
        Ok(joined) => joined,
        Err(e) => {
            error!(peer = ?peer, error = %e, "Failed to join world");
            return;
        }
    };

    // Identity goes out before any snapshot
    if let Err(e) = send_msg(&mut ws_sink, &ServerMsg::InitClient { id }).await {
        error!(identity = id, error = %e, "Failed to send identity");
        let _ = world.leave(id).await;
        return;
    }

    info!(
        identity = id,
        peer = ?peer,
        subscribers = world.subscriber_count(),
        "Sync connection established"
    );

    run_session(id, &world, ws_sink, ws_stream, snapshots).await;

    // Registry bookkeeping only; the entity stays in the world
    if let Err(e) = world.leave(id).await {
        debug!(identity = id, error = %e, "World gone before leave");
    }

    info!(identity = id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    id: Identity,
    world: &WorldHandle,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut snapshot_rx: broadcast::Receiver<ServerMsg>,
) {
    // Spawn writer task: broadcast snapshots -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match snapshot_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(identity = id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(identity = id, lagged_count = n, "Client lagged, skipping {} snapshots", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(identity = id, "Snapshot channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> world task
    while let Some(result) = ws_stream.next().await {
        let decoded = match result {
            Ok(Message::Text(text)) => codec::decode::<ClientMsg>(&text),
            Ok(Message::Binary(bytes)) => codec::decode_bytes::<ClientMsg>(&bytes),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                info!(identity = id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(identity = id, error = %e, "WebSocket error");
                break;
            }
        };

        match decoded {
            Ok(msg) => {
                if world.submit(id, msg).await.is_err() {
                    debug!(identity = id, "World channel closed");
                    break;
                }
            }
            Err(e) => {
                warn!(identity = id, error = %e, "Failed to decode client message");
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), SendError> {
    let json = codec::encode(msg)?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Socket(#[from] axum::Error),
}
