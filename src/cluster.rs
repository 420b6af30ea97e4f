use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use dashmap::DashMap;
use serenity::model::id::GuildId;
use tracing::{info, warn};
use crate::{
    error::{ShunkoError, ShunkoResult},
    node::{Node, NodeSession},
    voice::{JoinRequest, VoiceConnector},
};

/// Picks the node new players are created on when load balancing isn't requested.
pub type NodeResolver = Arc<dyn Fn(&[Arc<dyn Node>]) -> Option<Arc<dyn Node>> + Send + Sync>;

/// Default resolver: the connected node with the lowest penalties.
pub fn least_penalties(nodes: &[Arc<dyn Node>]) -> Option<Arc<dyn Node>> {
    nodes.iter()
        .filter(|node| node.is_connected())
        .min_by_key(|node| node.penalties())
        .cloned()
}

/// Pool of audio nodes plus the voice connector used to reach them.
#[non_exhaustive]
pub struct Cluster {
    pub nodes: DashMap<u8, Arc<dyn Node>>,
    pub connector: Arc<dyn VoiceConnector>,
    resolver: NodeResolver,
    node_counter: AtomicU8,
}

impl Cluster {
    pub fn new(connector: Arc<dyn VoiceConnector>, resolver: Option<NodeResolver>) -> Self {
        let resolver: NodeResolver = match resolver {
            Some(resolver) => resolver,
            None => Arc::new(least_penalties),
        };

        Self {
            nodes: DashMap::new(),
            connector,
            resolver,
            node_counter: AtomicU8::new(0),
        }
    }

    pub fn add_node(&self, node: Arc<dyn Node>) {
        let id = node.id();

        info!("Node id {} ({}) added to cluster", id, node.name());

        self.node_counter.fetch_max(id, Ordering::Relaxed);
        self.nodes.insert(id, node);
    }

    pub fn remove_node(&self, id: u8) -> Option<Arc<dyn Node>> {
        self.nodes.remove(&id).map(|(_, node)| node)
    }

    /// Every node ordered by id.
    pub fn nodes(&self) -> Vec<Arc<dyn Node>> {
        let mut nodes = self.nodes.iter().map(|item| Arc::clone(item.value())).collect::<Vec<_>>();
        nodes.sort_by_key(|node| node.id());
        nodes
    }

    pub fn connected_nodes(&self) -> Vec<Arc<dyn Node>> {
        self.nodes().into_iter().filter(|node| node.is_connected()).collect()
    }

    pub fn node(&self, id: u8) -> ShunkoResult<Arc<dyn Node>> {
        self.nodes.get(&id).map(|item| Arc::clone(item.value())).ok_or(ShunkoError::NodeNotFound)
    }

    /// Connected node with the fewest players. On ties the later node in id order wins.
    pub fn get_least_used(&self) -> Option<Arc<dyn Node>> {
        self.connected_nodes()
            .into_iter()
            .reduce(|a, b| if a.player_count() < b.player_count() { a } else { b })
    }

    /// Node chosen by the configured resolver.
    pub fn get_node(&self) -> Option<Arc<dyn Node>> {
        (self.resolver)(&self.nodes())
    }

    /// Joins the voice channel and opens a session for it on `node`.
    pub async fn join(&self, node: &Arc<dyn Node>, request: &JoinRequest) -> ShunkoResult<NodeSession> {
        let conn_info = self.connector.join(request).await?;

        match node.create_session(&conn_info).await {
            Ok(session) => Ok(session),
            Err(why) => {
                if let Err(leave) = self.connector.leave(request.guild_id).await {
                    warn!("Failed to leave voice in guild {} after node {} refused the session: {}", request.guild_id, node.name(), leave);
                }

                Err(why)
            }
        }
    }

    pub async fn leave(&self, guild_id: GuildId) -> ShunkoResult<()> {
        self.connector.leave(guild_id).await
    }

    pub(crate) fn next_id(&self) -> ShunkoResult<u8> {
        self.node_counter
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
            .map(|id| id + 1)
            .map_err(|_| ShunkoError::Misconfigured("no node ids left, ids go up to 255".to_string()))
    }
}
