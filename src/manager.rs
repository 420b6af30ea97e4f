use std::sync::Arc;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::Mutex;
use tracing::{info, warn};
use crate::{
    builder::ManagerBuilder,
    cluster::Cluster,
    error::{ShunkoError, ShunkoResult},
    events::{self, EventHandler, PlayerEvent},
    model::track::{Track, Tracks},
    node::Node,
    player::{Player, PlayerContext, PlayerState},
    registry::PlayerRegistry,
    search::{self, SearchOptions, Searcher},
    structure::Structures,
    voice::JoinRequest,
};

/// Options of [`Manager::create_player`].
#[derive(Debug, Clone)]
pub struct CreatePlayerOptions {
    pub guild_id: GuildId,
    pub voice_channel_id: ChannelId,
    pub text_channel_id: ChannelId,
    pub shard_id: u32,
    /// Defaults to 80.
    pub volume: Option<u16>,
    /// Defaults to true.
    pub deaf: Option<bool>,
    /// Use the least used node instead of the cluster resolver.
    pub load_balancer: bool,
}

impl CreatePlayerOptions {
    pub fn new(guild_id: impl Into<GuildId>, voice_channel_id: impl Into<ChannelId>, text_channel_id: impl Into<ChannelId>) -> Self {
        Self {
            guild_id: guild_id.into(),
            voice_channel_id: voice_channel_id.into(),
            text_channel_id: text_channel_id.into(),
            shard_id: 0,
            volume: None,
            deaf: None,
            load_balancer: false,
        }
    }

    pub fn shard_id(mut self, shard_id: u32) -> Self {
        self.shard_id = shard_id;
        self
    }

    pub fn volume(mut self, volume: u16) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn deaf(mut self, deaf: bool) -> Self {
        self.deaf = Some(deaf);
        self
    }

    pub fn load_balancer(mut self, load_balancer: bool) -> Self {
        self.load_balancer = load_balancer;
        self
    }
}

/// Owns every player of the application and the nodes they run on.
pub struct Manager {
    pub name: String,
    pub cluster: Arc<Cluster>,
    pub structures: Structures,
    players: Arc<PlayerRegistry>,
    searcher: Searcher,
    handler: Arc<dyn EventHandler>,
    /// Held while a guild's player is being created.
    creating: DashMap<GuildId, Arc<Mutex<()>>>,
}

impl Manager {
    pub fn builder<H: EventHandler + 'static>(handler: H) -> ManagerBuilder {
        ManagerBuilder::new(handler)
    }

    pub(crate) fn new(name: String, cluster: Arc<Cluster>, searcher: Searcher, handler: Arc<dyn EventHandler>) -> Arc<Self> {
        Arc::new(Self {
            name,
            cluster,
            structures: Structures::default(),
            players: Arc::new(PlayerRegistry::new()),
            searcher,
            handler,
            creating: DashMap::new(),
        })
    }

    fn context(&self) -> PlayerContext {
        PlayerContext {
            cluster: Arc::clone(&self.cluster),
            registry: Arc::clone(&self.players),
            handler: Arc::clone(&self.handler),
            searcher: self.searcher.clone(),
        }
    }

    /// Returns the player of the guild, creating and connecting it if there's none.
    pub async fn create_player(&self, options: CreatePlayerOptions) -> ShunkoResult<Arc<Player>> {
        let guild_id = options.guild_id;

        if let Some(player) = self.players.get(guild_id) {
            return Ok(player);
        }

        let lock = Arc::clone(&*self.creating.entry(guild_id).or_default());

        let result = {
            let _creating = lock.lock().await;

            match self.players.get(guild_id) {
                Some(player) => Ok(player),
                None => self.connect_player(options).await,
            }
        };

        // Only the map and this call still hold the lock when nobody else waits on it.
        self.creating.remove_if(&guild_id, |_, lock| Arc::strong_count(lock) == 2);

        result
    }

    async fn connect_player(&self, options: CreatePlayerOptions) -> ShunkoResult<Arc<Player>> {
        let node = if options.load_balancer {
            self.cluster.get_least_used()
        } else {
            self.cluster.get_node()
        };

        let node = match node {
            Some(node) => node,
            None => {
                warn!(manager = %self.name, "No nodes are available to create a player for guild {}", options.guild_id);
                return Err(ShunkoError::NoNodes);
            }
        };

        let request = JoinRequest {
            guild_id: options.guild_id,
            channel_id: options.voice_channel_id,
            shard_id: options.shard_id,
            deaf: options.deaf.unwrap_or(true),
        };

        let session = self.cluster.join(&node, &request).await?;

        let mut state = PlayerState::new(
            Some(options.voice_channel_id),
            options.text_channel_id,
            options.volume.unwrap_or(80),
            self.structures.queue(),
        );
        self.structures.init_player(&mut state);

        let player = Player::new(self.context(), options.guild_id, Arc::clone(&node), session.player, state);
        Player::listen(&player, session.events);

        let player = self.players.insert(player);

        info!(manager = %self.name, "Created player for guild {} on node {}", options.guild_id, node.name());

        events::process(&*self.handler, Arc::clone(&player), PlayerEvent::PlayerCreate).await;

        Ok(player)
    }

    pub fn get(&self, guild_id: impl Into<GuildId>) -> Option<Arc<Player>> {
        self.players.get(guild_id.into())
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    /// Connected node with the fewest players.
    pub fn get_least_used_node(&self) -> Option<Arc<dyn Node>> {
        self.cluster.get_least_used()
    }

    /// Finds a playable encoding for an unresolved track on `node`.
    pub async fn resolve(&self, track: Track, node: &dyn Node) -> ShunkoResult<Option<Track>> {
        search::resolve_track(node, track).await
    }

    /// Searches on the node picked by the cluster resolver.
    pub async fn search(&self, query: &str, options: SearchOptions) -> ShunkoResult<Tracks> {
        let node = self.cluster.get_node().ok_or(ShunkoError::NoNodes)?;

        self.searcher.search(&*node, query, options).await
    }

    /// Destroys every player and empties the registry.
    pub async fn shutdown(&self) {
        let players = self.players.players();

        info!(manager = %self.name, "Shutting down {} players", players.len());

        for player in players {
            if let Err(why) = player.destroy().await {
                warn!(manager = %self.name, "Failed to destroy player of guild {}: {}", player.guild_id, why);
            }
        }

        self.players.clear();
    }
}

impl typemap_rev::TypeMapKey for Manager {
    type Value = Arc<Manager>;
}
