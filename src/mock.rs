//! In-memory node, voice connector, catalog and event handler used by the tests.

use std::{collections::HashMap, sync::Arc, time::Duration};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use tokio::sync::{Notify, mpsc::{self, UnboundedSender}};
use crate::{
    catalog::CatalogClient,
    error::{ShunkoError, ShunkoResult},
    events::{EventHandler, PlayerEvent},
    filters::Filters,
    model::{gateway::NodeEvent, track::{LoadType, Track, Tracks}},
    node::{Node, NodePlayer, NodeSession},
    player::Player,
    voice::{ConnectionInfo, JoinRequest, VoiceConnector},
};

pub struct MockNode {
    id: u8,
    name: String,
    connected: Mutex<bool>,
    players: Mutex<Option<usize>>,
    penalties: Mutex<Option<i64>>,
    refuse_sessions: Mutex<bool>,
    results: Mutex<HashMap<String, Vec<Track>>>,
    queries: Mutex<Vec<String>>,
    calls: Arc<Mutex<Vec<String>>>,
    sessions: Arc<DashMap<u64, UnboundedSender<NodeEvent>>>,
}

impl MockNode {
    pub fn new(id: u8, name: &str) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.to_string(),
            connected: Mutex::new(true),
            players: Mutex::new(None),
            penalties: Mutex::new(None),
            refuse_sessions: Mutex::new(false),
            results: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            sessions: Arc::new(DashMap::new()),
        })
    }

    pub fn resolved_track(title: &str, encoded: &str) -> Track {
        let mut track = Track::unresolved("artist", title, 1000, None);
        track.track = Some(encoded.to_string());
        track.info.identifier = encoded.to_string();
        track
    }

    /// Overrides the session count reported to the cluster.
    pub fn set_players(&self, players: usize) {
        *self.players.lock() = Some(players);
    }

    pub fn set_connected(&self, connected: bool) {
        *self.connected.lock() = connected;
    }

    pub fn set_penalties(&self, penalties: i64) {
        *self.penalties.lock() = Some(penalties);
    }

    /// Makes `create_session` fail as if the websocket was down.
    pub fn set_session_failure(&self, refuse: bool) {
        *self.refuse_sessions.lock() = refuse;
    }

    pub fn add_result(&self, identifier: &str, tracks: Vec<Track>) {
        self.results.lock().insert(identifier.to_string(), tracks);
    }

    /// Identifiers passed to `load_tracks`, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// Operations sent by sessions, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Delivers an event to the session of `guild_id` as if the node sent it.
    pub fn emit(&self, guild_id: u64, event: NodeEvent) {
        if let Some(sender) = self.sessions.get(&guild_id) {
            let _ = sender.send(event);
        }
    }
}

#[async_trait]
impl Node for MockNode {
    fn id(&self) -> u8 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    fn player_count(&self) -> usize {
        self.players.lock().unwrap_or_else(|| self.sessions.len())
    }

    fn penalties(&self) -> i64 {
        self.penalties.lock().unwrap_or_else(|| self.player_count() as i64)
    }

    async fn load_tracks(&self, identifier: &str) -> ShunkoResult<Tracks> {
        self.queries.lock().push(identifier.to_string());

        let tracks = self.results.lock().get(identifier).cloned();

        Ok(tracks.map(Tracks::search_result).unwrap_or_default())
    }

    async fn create_session(&self, info: &ConnectionInfo) -> ShunkoResult<NodeSession> {
        if *self.refuse_sessions.lock() {
            return Err(ShunkoError::NoWebsocket);
        }

        let guild_id = info.guild_id.get();
        let (sender, events) = mpsc::unbounded_channel();

        self.sessions.insert(guild_id, sender);

        Ok(NodeSession {
            player: Arc::new(MockNodePlayer {
                guild_id,
                calls: Arc::clone(&self.calls),
                sessions: Arc::clone(&self.sessions),
            }),
            events,
        })
    }
}

pub struct MockNodePlayer {
    guild_id: u64,
    calls: Arc<Mutex<Vec<String>>>,
    sessions: Arc<DashMap<u64, UnboundedSender<NodeEvent>>>,
}

impl MockNodePlayer {
    fn record(&self, call: String) -> ShunkoResult<()> {
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl NodePlayer for MockNodePlayer {
    async fn play_track(&self, track: &str) -> ShunkoResult<()> {
        self.record(format!("play:{}", track))
    }

    async fn stop_track(&self) -> ShunkoResult<()> {
        self.record("stop".to_string())
    }

    async fn set_paused(&self, paused: bool) -> ShunkoResult<()> {
        self.record(format!("pause:{}", paused))
    }

    async fn seek_to(&self, position: Duration) -> ShunkoResult<()> {
        self.record(format!("seek:{}", position.as_millis()))
    }

    async fn set_volume(&self, volume: u16) -> ShunkoResult<()> {
        self.record(format!("volume:{}", volume))
    }

    async fn set_filters(&self, _filters: &Filters) -> ShunkoResult<()> {
        self.record("filters".to_string())
    }

    async fn destroy(&self) -> ShunkoResult<()> {
        self.sessions.remove(&self.guild_id);
        self.record("destroy".to_string())
    }
}

#[derive(Default)]
pub struct MockConnector {
    joins: Mutex<Vec<JoinRequest>>,
    leaves: Mutex<Vec<GuildId>>,
    stalled: Mutex<Option<GuildId>>,
}

impl MockConnector {
    /// Joins for `guild_id` never complete.
    pub fn stall(&self, guild_id: u64) {
        *self.stalled.lock() = Some(GuildId::new(guild_id));
    }


    pub fn joins(&self) -> Vec<JoinRequest> {
        self.joins.lock().clone()
    }

    pub fn leaves(&self) -> Vec<GuildId> {
        self.leaves.lock().clone()
    }
}

#[async_trait]
impl VoiceConnector for MockConnector {
    async fn join(&self, request: &JoinRequest) -> ShunkoResult<ConnectionInfo> {
        self.joins.lock().push(request.clone());

        let stalled = *self.stalled.lock() == Some(request.guild_id);
        if stalled {
            std::future::pending::<()>().await;
        }

        Ok(ConnectionInfo {
            guild_id: request.guild_id,
            session_id: "session".to_string(),
            token: "token".to_string(),
            endpoint: "endpoint".to_string(),
        })
    }

    async fn leave(&self, guild_id: GuildId) -> ShunkoResult<()> {
        self.leaves.lock().push(guild_id);
        Ok(())
    }
}

pub struct MockCatalog {
    prefix: String,
    resolved: Mutex<Vec<String>>,
}

impl MockCatalog {
    pub fn new(prefix: &str) -> Arc<Self> {
        Arc::new(Self {
            prefix: prefix.to_string(),
            resolved: Mutex::new(Vec::new()),
        })
    }

    /// Urls passed to `resolve`, in order.
    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().clone()
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    fn check(&self, url: &str) -> bool {
        url.starts_with(&self.prefix)
    }

    async fn resolve(&self, url: &str) -> ShunkoResult<Tracks> {
        self.resolved.lock().push(url.to_string());

        Ok(Tracks {
            load_type: LoadType::TrackLoaded,
            tracks: vec![Track::unresolved("catalog artist", "catalog track", 1000, Some(url.to_string()))],
            ..Default::default()
        })
    }

    async fn search(&self, query: &str) -> ShunkoResult<Tracks> {
        Ok(Tracks::search_result(vec![Track::unresolved("catalog artist", query, 1000, None)]))
    }
}

#[derive(Default)]
struct HandlerLog {
    names: Mutex<Vec<String>>,
    notify: Notify,
}

/// Records the name of every event it receives.
#[derive(Clone, Default)]
pub struct MockHandler {
    log: Arc<HandlerLog>,
}

impl MockHandler {
    pub fn names(&self) -> Vec<String> {
        self.log.names.lock().clone()
    }

    /// Waits until an event called `name` was received.
    pub async fn wait_for(&self, name: &str) {
        let wait = async {
            loop {
                if self.log.names.lock().iter().any(|n| n == name) {
                    return;
                }

                self.log.notify.notified().await;
            }
        };

        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap_or_else(|_| panic!("`{}` was never emitted, got {:?}", name, self.names()));
    }
}

#[async_trait]
impl EventHandler for MockHandler {
    async fn raw_event(&self, _player: Arc<Player>, event: &PlayerEvent) {
        self.log.names.lock().push(event.name().to_string());
        self.log.notify.notify_one();
    }
}
