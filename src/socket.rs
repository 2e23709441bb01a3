//! WebSocket client for live track updates

use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        handshake::client::Request,
        http::header::{HeaderValue, AUTHORIZATION},
        protocol::Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    auth::SharedToken,
    config::{BackendConfig, TrackerConfig},
    errors::BoatTrackerError,
    models::{CoordsData, VesselsData},
};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Decoded server event
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Ping,
    Coords(CoordsData),
    Vessels(VesselsData),
    /// The server is replaying history for the track
    Loading,
    /// The track has no data yet
    NoData,
}

/// What subscribers receive, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum SocketMessage {
    Connected,
    Event(SocketEvent),
    Disconnected,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    body: Value,
}

/// Decode one text frame. Unknown events decode to `None`.
pub fn parse_event(text: &str) -> Result<Option<SocketEvent>, BoatTrackerError> {
    let raw: RawEvent = serde_json::from_str(text)?;
    let event = match raw.event.as_str() {
        "ping" => SocketEvent::Ping,
        "coords" => SocketEvent::Coords(serde_json::from_value(raw.body)?),
        "vessels" => SocketEvent::Vessels(serde_json::from_value(raw.body)?),
        "loading" => SocketEvent::Loading,
        "noData" => SocketEvent::NoData,
        other => {
            debug!("Ignoring unknown event: {}", other);
            return Ok(None);
        }
    };
    Ok(Some(event))
}

/// `<ws_url>/ws/updates?track=<name>`
pub fn updates_url(ws_url: &str, track: &str) -> Result<Url, BoatTrackerError> {
    let mut url = Url::parse(&format!("{}/ws/updates", ws_url.trim_end_matches('/')))?;
    url.query_pairs_mut().append_pair("track", track);
    Ok(url)
}

/// Builder for a socket connection to one track
pub struct SocketClientBuilder {
    ws_url: String,
    reconnect_delay: Duration,
    tx: broadcast::Sender<SocketMessage>,
}

/// Live connection. Dropping it tears the connection down.
pub struct SocketClient {
    track: String,
    tx: broadcast::Sender<SocketMessage>,
    handle: JoinHandle<()>,
}

impl SocketClientBuilder {
    pub fn new(backend: &BackendConfig, tracker: &TrackerConfig) -> Self {
        let (tx, _) = broadcast::channel(tracker.channel_capacity.max(1));
        Self {
            ws_url: backend.ws_url.clone(),
            reconnect_delay: tracker.reconnect_delay,
            tx,
        }
    }

    /// Subscribe before connecting to not miss the first messages
    pub fn subscribe(&self) -> broadcast::Receiver<SocketMessage> {
        self.tx.subscribe()
    }

    /// Start the connection loop for `track`
    ///
    /// The loop reconnects after `reconnect_delay` whenever the server closes
    /// the connection or a read fails. Subscribers get `Disconnected` and
    /// then `Connected` around each reconnect. Every attempt authenticates
    /// with the value `token` holds at that moment.
    pub fn connect(self, track: &str, token: SharedToken) -> Result<SocketClient, BoatTrackerError> {
        let url = updates_url(&self.ws_url, track)?;
        info!("Opening live updates for track {}", track);

        let handle = tokio::spawn(Self::process_events(
            url,
            token,
            self.reconnect_delay,
            self.tx.clone(),
        ));

        Ok(SocketClient {
            track: track.to_string(),
            tx: self.tx,
            handle,
        })
    }

    async fn open(url: &Url, token: &SharedToken) -> Result<WsStream, BoatTrackerError> {
        let request = handshake_request(url, token).await?;
        let (ws_stream, _) = connect_async(request).await?;
        Ok(ws_stream)
    }

    async fn process_events(
        url: Url,
        token: SharedToken,
        reconnect_delay: Duration,
        tx: broadcast::Sender<SocketMessage>,
    ) {
        loop {
            match Self::open(&url, &token).await {
                Ok(mut ws_stream) => {
                    info!("Connected to {}", url);
                    publish(&tx, SocketMessage::Connected);

                    while let Some(message) = ws_stream.next().await {
                        match message {
                            Ok(Message::Text(text)) => handle_text(&tx, text.as_str()),
                            Ok(Message::Close(frame)) => {
                                info!("Server closed connection: {:?}", frame);
                                break;
                            }
                            Ok(_) => continue,
                            Err(e) => {
                                warn!("Socket read failed, reconnecting: {}", e);
                                break;
                            }
                        }
                    }
                    publish(&tx, SocketMessage::Disconnected);
                }
                Err(e) => {
                    error!("Failed to connect to {}: {}", url, e);
                }
            }
            tokio::time::sleep(reconnect_delay).await;
        }
    }
}

/// Upgrade request for `url`, carrying the current token as a bearer header
async fn handshake_request(url: &Url, token: &SharedToken) -> Result<Request, BoatTrackerError> {
    let mut request = url.as_str().into_client_request()?;
    if let Some(token) = token.read().await.as_deref() {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| BoatTrackerError::TokenError(e.to_string()))?;
        request.headers_mut().append(AUTHORIZATION, value);
    }
    Ok(request)
}

/// Forward one text frame. Malformed messages are logged and dropped so one
/// bad frame never ends the connection.
fn handle_text(tx: &broadcast::Sender<SocketMessage>, text: &str) {
    match parse_event(text) {
        Ok(Some(event)) => publish(tx, SocketMessage::Event(event)),
        Ok(None) => {}
        Err(e) => warn!("Dropping malformed socket message: {}", e),
    }
}

fn publish(tx: &broadcast::Sender<SocketMessage>, message: SocketMessage) {
    if tx.send(message).is_err() {
        debug!("No subscribers for socket message");
    }
}

impl SocketClient {
    pub fn track(&self) -> &str {
        &self.track
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SocketMessage> {
        self.tx.subscribe()
    }

    /// Tear down the connection and tell subscribers
    pub fn close(self) {
        info!("Closing live updates for track {}", self.track);
        self.handle.abort();
        publish(&self.tx, SocketMessage::Disconnected);
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
