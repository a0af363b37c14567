//! Headless Worldsync client
//!
//! Usage: `client <ws-url>`, e.g. `client ws://localhost:3000/`
//!
//! Reads key edges from stdin, one per line:
//! `press <key>`, `release <key>` (keys: w/a/s/d or up/down/left/right),
//! and `show` to log the mirrored world.

use anyhow::Context;
use futures::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use worldsync::client::{ClientSession, Key, KeyEdge, Placeable};
use worldsync::ws::codec::{self, CodecError};
use worldsync::ws::protocol::{ClientMsg, Position, ServerMsg};

/// Stand-in for a rendered model: just remembers where it was placed
#[derive(Debug, Clone, Default)]
struct Marker {
    at: Position,
}

impl Placeable for Marker {
    fn set_position(&mut self, position: Position) {
        self.at = position;
    }

    fn position(&self) -> Position {
        self.at
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let url = std::env::args()
        .nth(1)
        .context("missing argument: <ws-url>")?;

    let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", url))?;
    info!(url = %url, "Connected");

    let (mut sink, mut stream) = socket.split();
    let mut session = ClientSession::new(Marker::default());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            frame = stream.next() => {
                let decoded: Result<ServerMsg, CodecError> = match frame {
                    Some(Ok(Message::Text(text))) => codec::decode(&text),
                    Some(Ok(Message::Binary(bytes))) => codec::decode_bytes(&bytes),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        break;
                    }
                };

                match decoded {
                    Ok(msg) => {
                        let handled = session.on_server_msg(msg);
                        for out in &handled.outgoing {
                            send(&mut sink, out).await?;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to decode server message"),
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(Command::Key(edge)) => {
                        if let Some(msg) = session.on_key(edge) {
                            send(&mut sink, &msg).await?;
                        }
                    }
                    Some(Command::Show) => show(&session),
                    None => warn!(input = %line, "Unrecognized command"),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "Stdin closed");
                    stdin_open = false;
                }
            },
        }
    }

    session.on_disconnect();
    show(&session);
    Ok(())
}

enum Command {
    Key(KeyEdge),
    Show,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    match (words.next()?, words.next()) {
        ("press", Some(key)) => Key::from_name(key).map(|k| Command::Key(KeyEdge::Pressed(k))),
        ("release", Some(key)) => Key::from_name(key).map(|k| Command::Key(KeyEdge::Released(k))),
        ("show", None) => Some(Command::Show),
        _ => None,
    }
}

fn show(session: &ClientSession<Marker>) {
    info!(state = ?session.state(), entities = session.mirror().len(), "Mirror");
    for (id, marker) in session.mirror().iter() {
        info!(identity = id, x = marker.at.x, y = marker.at.y, z = marker.at.z, "Entity");
    }
}

async fn send<S>(sink: &mut S, msg: &ClientMsg) -> anyhow::Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    let text = codec::encode(msg)?;
    debug!(frame = %text, "Sending");
    sink.send(Message::Text(text)).await?;
    Ok(())
}

fn init_tracing() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
