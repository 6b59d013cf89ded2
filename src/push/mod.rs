pub mod packet;

use futures::{ SinkExt, StreamExt };
use log::{ debug, error, info, warn };
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{ connect_async, tungstenite::protocol::Message, WebSocketStream };
use url::Url;

use crate::error::{ ChatError, Result };
use crate::models::push::PushEvent;
use self::packet::{ EnginePacket, SocketPacket };

pub const PUSH_NAMESPACE: &str = "/sister-chat";
const SOCKET_IO_PATH: &str = "socket.io/";
const EVENT_BUFFER: usize = 32;

/// websocket endpoint of a socket.io server rooted at `base`.
pub fn socket_url(base: &str) -> Result<Url> {
    let mut raw = base.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let mut url = Url::parse(&raw)?.join(SOCKET_IO_PATH)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ChatError::Protocol(format!("unsupported push scheme '{}'", other)));
        }
    };
    url.set_scheme(scheme).map_err(|_| ChatError::Protocol("cannot set push scheme".into()))?;
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

/// Stream of push events, plus the connection task feeding it (if any).
pub struct PushChannel {
    events: mpsc::Receiver<PushEvent>,
    connection: Option<JoinHandle<()>>,
}

impl PushChannel {
    /// Channel fed by something other than a socket connection.
    pub fn from_receiver(events: mpsc::Receiver<PushEvent>) -> Self {
        Self { events, connection: None }
    }

    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    pub fn into_parts(self) -> (mpsc::Receiver<PushEvent>, Option<JoinHandle<()>>) {
        (self.events, self.connection)
    }
}

/// Tasks backing an attached push channel. Aborted on drop.
pub struct PushSubscription {
    forwarder: JoinHandle<()>,
    connection: Option<JoinHandle<()>>,
}

impl PushSubscription {
    pub fn new(forwarder: JoinHandle<()>, connection: Option<JoinHandle<()>>) -> Self {
        Self { forwarder, connection }
    }

    pub fn is_finished(&self) -> bool {
        self.forwarder.is_finished()
    }

    pub fn abort(&self) {
        self.forwarder.abort();
        if let Some(connection) = &self.connection {
            connection.abort();
        }
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Opens the socket and joins `namespace`.
pub async fn connect(base: &str, namespace: &str) -> Result<PushChannel> {
    let url = socket_url(base)?;
    info!("Connecting push channel: {} (namespace {})", url, namespace);
    let (websocket, _) = connect_async(url.as_str()).await?;
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let connection = tokio::spawn(run_connection(websocket, namespace.to_string(), tx));
    Ok(PushChannel {
        events: rx,
        connection: Some(connection),
    })
}

async fn run_connection<S>(
    websocket: WebSocketStream<S>,
    namespace: String,
    events: mpsc::Sender<PushEvent>
)
    where S: AsyncRead + AsyncWrite + Unpin
{
    let (mut tx, mut rx) = websocket.split();
    let mut connected = false;

    while let Some(msg) = rx.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => {
                info!("Push channel received close frame");
                break;
            }
            Ok(Message::Ping(data)) => {
                if tx.send(Message::Pong(data)).await.is_err() {
                    error!("Failed to send pong on push channel");
                    break;
                }
                continue;
            }
            Ok(Message::Binary(_)) => {
                warn!("Ignoring binary frame on push channel");
                continue;
            }
            Ok(_) => {
                continue;
            }
            Err(e) => {
                error!("Push channel error: {}", e);
                break;
            }
        };

        let reply = match EnginePacket::decode(&text) {
            Ok(EnginePacket::Open(handshake)) => {
                debug!("Engine handshake: {}", handshake);
                Some(EnginePacket::Message(SocketPacket::connect(&namespace).encode()))
            }
            Ok(EnginePacket::Ping(data)) => Some(EnginePacket::Pong(data)),
            Ok(EnginePacket::Message(payload)) => {
                match SocketPacket::decode(&payload) {
                    Ok(packet) => {
                        if let Some(event) = packet.into_push_event(&namespace) {
                            match event {
                                PushEvent::Connected => {
                                    connected = true;
                                }
                                PushEvent::Disconnected => {
                                    connected = false;
                                }
                                PushEvent::SisterResponse { .. } => {}
                            }
                            if events.send(event).await.is_err() {
                                debug!("Push receiver dropped, closing connection");
                                break;
                            }
                        }
                    }
                    Err(e) => warn!("Skipping malformed push packet: {}", e),
                }
                None
            }
            Ok(EnginePacket::Close) => {
                info!("Push server closed the engine session");
                break;
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping malformed engine packet: {}", e);
                None
            }
        };

        if let Some(packet) = reply {
            if let Err(e) = tx.send(Message::Text(packet.encode())).await {
                error!("Failed to write to push channel: {}", e);
                break;
            }
        }
    }

    if connected {
        let _ = events.send(PushEvent::Disconnected).await;
    }
    let _ = tx.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_switches_scheme_and_adds_query() {
        assert_eq!(
            socket_url("http://localhost:8000").unwrap().as_str(),
            "ws://localhost:8000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_url("https://example.com/app/").unwrap().as_str(),
            "wss://example.com/app/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn socket_url_rejects_other_schemes() {
        assert!(matches!(socket_url("ftp://example.com"), Err(ChatError::Protocol(_))));
    }

    #[tokio::test]
    async fn channel_from_receiver_yields_events() {
        let (tx, rx) = mpsc::channel(4);
        let mut channel = PushChannel::from_receiver(rx);
        tx.send(PushEvent::Connected).await.unwrap();
        drop(tx);
        assert_eq!(channel.recv().await, Some(PushEvent::Connected));
        assert_eq!(channel.recv().await, None);
    }
}
