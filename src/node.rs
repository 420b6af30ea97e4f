use async_trait::async_trait;
use reqwest::{Client as HttpClient, header::HeaderMap, Url};
use http::HeaderValue;
use serenity::model::id::UserId as DiscordUserId;
use crate::{
    builder::NodeBuilder,
    error::{ShunkoError, ShunkoResult},
    filters::Filters,
    model::{
        Codes,
        events::{ConfigureResuming, Event, Pause, Play, Seek, VoiceUpdate, Volume},
        gateway::{Frame, NodeEvent, Stats},
        track::Tracks,
    },
    types::{WebSocketConnection, WebSocketReader},
    voice::ConnectionInfo,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration
};
use tokio::sync::{Mutex, mpsc::{self, UnboundedReceiver, UnboundedSender}};
use dashmap::DashMap;
use parking_lot::RwLock;
use futures::StreamExt;
use tracing::{info, error, warn, debug, info_span};
use tracing_futures::Instrument;
use tokio_tungstenite::tungstenite::{
    Message as TungsteniteMessage,
    client::IntoClientRequest,
    handshake::client::Request,
};

/// An audio node able to resolve tracks and host per-guild sessions.
#[async_trait]
pub trait Node: Send + Sync + 'static {
    fn id(&self) -> u8;

    fn name(&self) -> &str;

    fn is_connected(&self) -> bool;

    /// Sessions currently hosted by this node.
    fn player_count(&self) -> usize;

    /// Load score used by the default node resolver, lower is better.
    fn penalties(&self) -> i64 {
        self.player_count() as i64
    }

    /// Resolves an identifier, either an url or a `prefix:query` search.
    async fn load_tracks(&self, identifier: &str) -> ShunkoResult<Tracks>;

    /// Opens a session for the guild of `info` using its voice credentials.
    async fn create_session(&self, info: &ConnectionInfo) -> ShunkoResult<NodeSession>;
}

/// Playback controls of one guild session on a node.
#[async_trait]
pub trait NodePlayer: Send + Sync + 'static {
    async fn play_track(&self, track: &str) -> ShunkoResult<()>;

    async fn stop_track(&self) -> ShunkoResult<()>;

    async fn set_paused(&self, paused: bool) -> ShunkoResult<()>;

    async fn seek_to(&self, position: Duration) -> ShunkoResult<()>;

    async fn set_volume(&self, volume: u16) -> ShunkoResult<()>;

    async fn set_filters(&self, filters: &Filters) -> ShunkoResult<()>;

    /// Tears the session down, the event stream ends afterwards.
    async fn destroy(&self) -> ShunkoResult<()>;
}

/// A freshly opened session and the stream of events the node sends for it.
pub struct NodeSession {
    pub player: Arc<dyn NodePlayer>,
    pub events: UnboundedReceiver<NodeEvent>,
}

/// Lavalink/Andesite compatible node spoken to over websocket and http.
pub struct UniversalNode {
    inner: Arc<NodeInner>,
    http: HttpClient,
    rest_url: String
}

impl std::ops::Deref for UniversalNode {
    type Target = NodeInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct NodeInner {
    pub node_id: u8,
    pub name: String,
    pub socket: String,
    pub pass: String,
    pub shards: u64,
    pub id: DiscordUserId,
    pub resume_key: Option<String>,
    pub resume_timeout: u64,
    pub reconnect_attempts: u8,
    pub reconnect_interval: Duration,
    socket_write: Mutex<Option<WebSocketConnection>>,
    players: DashMap<u64, UnboundedSender<NodeEvent>>,
    stats: RwLock<Option<Stats>>,
    connected: AtomicBool,
}

impl NodeInner {
    fn get_ws_request(&self) -> ShunkoResult<Request> {
        let mut request = self.socket.as_str().into_client_request()?;
        let headers = request.headers_mut();

        headers.insert("Authorization", header(&self.pass)?);
        headers.insert("Num-Shards", header(&self.shards.to_string())?);
        headers.insert("User-Id", header(&self.id.to_string())?);
        headers.insert("Client-Name", header(concat!("shunko/", env!("CARGO_PKG_VERSION")))?);

        if let Some(key) = &self.resume_key {
            headers.insert("Resume-Key", header(key)?);
        }

        Ok(request)
    }

    pub(crate) async fn send(&self, guild_id: u64, code: &Codes) -> ShunkoResult<()> {
        let mut socket_write = self.socket_write.lock().await;

        let socket = if let Some(socket) = socket_write.as_mut() { socket } else {
            return Err(ShunkoError::NoWebsocket);
        };

        code.send(guild_id, socket).await
    }

    pub fn stats(&self) -> Option<Stats> {
        self.stats.read().clone()
    }

    /// Routes a decoded frame to the session it belongs to.
    pub(crate) fn handle_text(&self, text: &str) {
        match Frame::parse(text) {
            Ok(Frame::Stats(stats)) => {
                *self.stats.write() = Some(stats);
            },
            Ok(Frame::Guild(guild_id, event)) => self.dispatch(guild_id, event),
            Ok(Frame::Unknown(kind)) => debug!("Node id {} ignored unknown payload {}", self.node_id, kind),
            Err(why) => warn!("Node id {} received an invalid payload: {}", self.node_id, why),
        }
    }

    fn dispatch(&self, guild_id: u64, event: NodeEvent) {
        let delivered = match self.players.get(&guild_id) {
            Some(sender) => sender.send(event).is_ok(),
            None => return,
        };

        if !delivered {
            debug!("Session for guild {} is gone, dropping it from node id {}", guild_id, self.node_id);
            self.players.remove(&guild_id);
        }
    }

    fn broadcast(&self, event: NodeEvent) {
        self.players.retain(|_, sender| sender.send(event.clone()).is_ok());
    }

    fn register(&self, guild_id: u64) -> UnboundedReceiver<NodeEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();

        self.players.insert(guild_id, sender);

        receiver
    }
}

fn header(value: &str) -> ShunkoResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|why| ShunkoError::Misconfigured(format!("invalid header value: {}", why)))
}

impl UniversalNode {
    pub(crate) fn new(builder: NodeBuilder, node_id: u8, reconnect_attempts: u8, reconnect_interval: Duration) -> ShunkoResult<Arc<Self>> {
        let id = builder.id.ok_or_else(|| ShunkoError::Misconfigured(format!("node {} has no user id", builder.host)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in [("Authorization", builder.pass.clone()), ("Num-Shards", builder.shards.to_string()), ("User-Id", id.to_string())] {
            let value = reqwest::header::HeaderValue::from_str(&value).map_err(|why| ShunkoError::Misconfigured(format!("invalid {} header: {}", name, why)))?;
            headers.insert(name, value);
        }

        let http = HttpClient::builder().default_headers(headers).build()?;

        let rest = if builder.ssl { format!("https://{}:{}", builder.host, builder.port) } else { format!("http://{}:{}", builder.host, builder.port) };
        let socket = if builder.ssl { format!("wss://{}:{}", builder.host, builder.port) } else { format!("ws://{}:{}", builder.host, builder.port) };

        let inner = NodeInner {
            node_id,
            name: builder.name.unwrap_or_else(|| format!("{}:{}", builder.host, builder.port)),
            socket,
            pass: builder.pass,
            shards: builder.shards,
            id,
            resume_key: builder.resume_key,
            resume_timeout: builder.resume_timeout,
            reconnect_attempts,
            reconnect_interval,
            socket_write: Mutex::new(None),
            players: DashMap::new(),
            stats: RwLock::new(None),
            connected: AtomicBool::new(false),
        };

        Ok(Arc::new(Self {
            inner: Arc::new(inner),
            http,
            rest_url: rest
        }))
    }

    pub fn run(node: Arc<Self>) {
        let span = info_span!("node", id = node.node_id, name = %node.name);

        tokio::spawn(async move {
            let node_id = node.node_id;
            let mut actual_reconnection_attempt = 1u16;
            let max_reconnect_attempts = u16::from(node.reconnect_attempts);

            while actual_reconnection_attempt <= max_reconnect_attempts {
                info!("Node id {} trying to connect to server, attempt {}", node_id, actual_reconnection_attempt);

                let request = match node.get_ws_request() {
                    Ok(request) => request,
                    Err(why) => {
                        error!("Node id {} cannot build its websocket request: {}", node_id, why);
                        break;
                    }
                };

                let (stream, response) = match tokio_tungstenite::connect_async(request).await {
                    Ok(connection) => connection,
                    Err(why) => {
                        actual_reconnection_attempt += 1;

                        warn!("Node id {} failed to connect to server (attempt {}/{}): {}, waiting {:?} before reconnecting", node_id, actual_reconnection_attempt - 1, max_reconnect_attempts, why, node.reconnect_interval);
                        tokio::time::sleep(node.reconnect_interval).await;
                        continue;
                    }
                };

                let resumed = response.headers()
                    .get("Session-Resumed")
                    .and_then(|value| value.to_str().ok())
                    .map_or(false, |value| value == "true");

                let (write, mut read): (WebSocketConnection, WebSocketReader) = stream.split();

                info!("Node id {} connected successfully to server", node_id);

                actual_reconnection_attempt = 1;

                *node.socket_write.lock().await = Some(write);
                node.connected.store(true, Ordering::SeqCst);

                if let Some(key) = node.resume_key.clone() {
                    let code = Codes::ConfigureResuming(ConfigureResuming { key, timeout: node.resume_timeout });

                    if let Err(why) = node.send(0, &code).await {
                        warn!("Node id {} failed to configure resuming: {}", node_id, why);
                    }
                }

                if resumed {
                    info!("Node id {} resumed its session, notifying {} players", node_id, node.players.len());
                    node.broadcast(NodeEvent::Resumed);
                }

                while let Some(Ok(msg)) = read.next().await {
                    match msg {
                        TungsteniteMessage::Text(t) => node.handle_text(&t),
                        TungsteniteMessage::Close(_) => break,
                        _ => ()
                    }
                }

                // Don't pick this node for new players until it reconnects
                node.connected.store(false, Ordering::SeqCst);
                *node.socket_write.lock().await = None;

                warn!("Node id {} disconnected from server", node_id);
            }

            info!("Node id {} reached max connection attempts, giving up", node_id);
        }.instrument(span));
    }

    pub async fn get_tracks<Q: ToString>(&self, query: Q) -> ShunkoResult<Tracks> {
        let url = Url::parse_with_params(&format!("{}/loadtracks", self.rest_url), &[("identifier", &query.to_string())])
            .map_err(|why| ShunkoError::InvalidArgument(format!("cannot build track query: {}", why)))?;

        let response = self.http.get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Tracks>()
            .await?;

        Ok(response)
    }
}

#[async_trait]
impl Node for UniversalNode {
    fn id(&self) -> u8 {
        self.node_id
    }

    fn name(&self) -> &str {
        &self.inner.name
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn player_count(&self) -> usize {
        self.players.len()
    }

    fn penalties(&self) -> i64 {
        match self.stats() {
            Some(stats) => stats.penalties(),
            None => self.player_count() as i64,
        }
    }

    async fn load_tracks(&self, identifier: &str) -> ShunkoResult<Tracks> {
        self.get_tracks(identifier).await
    }

    /// Method to create a session and be able to connect the server to discord
    async fn create_session(&self, info: &ConnectionInfo) -> ShunkoResult<NodeSession> {
        if info.token.is_empty() { return Err(ShunkoError::Voice("No `token` was found on the connection info".to_string())); }
        if info.endpoint.is_empty() { return Err(ShunkoError::Voice("No `endpoint` was found on the connection info".to_string())); }
        if info.session_id.is_empty() { return Err(ShunkoError::Voice("No `session_id` was found on the connection info".to_string())); }

        let guild_id = info.guild_id.get();

        let payload = VoiceUpdate {
            session_id: info.session_id.clone(),
            event: Event {
                token: info.token.clone(),
                endpoint: info.endpoint.clone(),
                guild_id: guild_id.to_string(),
            }
        };

        let events = self.register(guild_id);

        if let Err(why) = self.send(guild_id, &Codes::VoiceUpdate(payload)).await {
            self.players.remove(&guild_id);
            return Err(why);
        }

        Ok(NodeSession {
            player: Arc::new(UniversalPlayer { guild_id, node: Arc::clone(&self.inner) }),
            events,
        })
    }
}

/// Session of one guild on a [`UniversalNode`].
pub struct UniversalPlayer {
    guild_id: u64,
    node: Arc<NodeInner>,
}

#[async_trait]
impl NodePlayer for UniversalPlayer {
    async fn play_track(&self, track: &str) -> ShunkoResult<()> {
        let payload = Play {
            track: track.to_string(),
            no_replace: false,
            start_time: 0,
            end_time: None,
        };

        self.node.send(self.guild_id, &Codes::Play(payload)).await
    }

    async fn stop_track(&self) -> ShunkoResult<()> {
        self.node.send(self.guild_id, &Codes::Stop).await
    }

    async fn set_paused(&self, pause: bool) -> ShunkoResult<()> {
        self.node.send(self.guild_id, &Codes::Pause(Pause { pause })).await
    }

    async fn seek_to(&self, position: Duration) -> ShunkoResult<()> {
        let payload = Seek {
            position: position.as_millis() as u64,
        };

        self.node.send(self.guild_id, &Codes::Seek(payload)).await
    }

    async fn set_volume(&self, volume: u16) -> ShunkoResult<()> {
        let payload = Volume {
            volume: volume.min(1000),
        };

        self.node.send(self.guild_id, &Codes::Volume(payload)).await
    }

    async fn set_filters(&self, filters: &Filters) -> ShunkoResult<()> {
        self.node.send(self.guild_id, &Codes::Filters(filters.clone())).await
    }

    async fn destroy(&self) -> ShunkoResult<()> {
        let _ = self.node.players.remove(&self.guild_id);

        self.node.send(self.guild_id, &Codes::Destroy).await
    }
}
