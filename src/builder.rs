use std::{sync::Arc, time::Duration};
use serde::Deserialize;
use serenity::model::id::UserId;
use tracing::{error, info};
use crate::{
    catalog::CatalogClient,
    cluster::{Cluster, NodeResolver},
    error::{ShunkoError, ShunkoResult},
    events::EventHandler,
    manager::Manager,
    node::{Node, UniversalNode},
    search::{SearchEngine, Searcher},
    spotify::{SpotifyClient, SpotifyOptions},
    voice::VoiceConnector,
};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeBuilder {
    /// Display name, defaults to `host:port`.
    pub name: Option<String>,
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    #[serde(rename = "password")]
    pub pass: String,
    pub shards: u64,
    #[serde(rename = "user_id")]
    pub id: Option<UserId>,
    pub resume_key: Option<String>,
    /// Seconds the node keeps a resumable session alive.
    pub resume_timeout: u64,
}

impl Default for NodeBuilder {
    fn default() -> Self {
        Self {
            name: None,
            host: "localhost".to_string(),
            port: 2333,
            ssl: false,
            pass: "youshallnotpass".to_string(),
            shards: 1,
            id: None,
            resume_key: None,
            resume_timeout: 60,
        }
    }
}

impl NodeBuilder {
    pub fn set_name(&mut self, name: impl ToString) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn set_host(&mut self, host: impl ToString) -> &mut Self {
        self.host = host.to_string();
        self
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.port = port;
        self
    }

    pub fn set_password(&mut self, password: impl ToString) -> &mut Self {
        self.pass = password.to_string();
        self
    }

    pub fn set_shards(&mut self, shards: u64) -> &mut Self {
        self.shards = shards;
        self
    }

    pub fn set_user_id(&mut self, id: impl Into<UserId>) -> &mut Self {
        self.id = Some(id.into());
        self
    }

    pub fn set_ssl(&mut self, ssl: bool) -> &mut Self {
        self.ssl = ssl;
        self
    }

    pub fn set_resume_key(&mut self, key: impl ToString) -> &mut Self {
        self.resume_key = Some(key.to_string());
        self
    }

    pub fn set_resume_timeout(&mut self, seconds: u64) -> &mut Self {
        self.resume_timeout = seconds;
        self
    }

    fn validate(&self) -> ShunkoResult<()> {
        if self.host.is_empty() {
            return Err(ShunkoError::Misconfigured("node host can't be empty".to_string()));
        }

        if self.id.is_none() {
            return Err(ShunkoError::Misconfigured(format!("node {}:{} has no user id", self.host, self.port)));
        }

        if self.shards == 0 {
            return Err(ShunkoError::Misconfigured(format!("node {}:{} must have at least one shard", self.host, self.port)));
        }

        Ok(())
    }
}

/// Manager settings that can be loaded from a config file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManagerOptions {
    pub name: String,
    pub default_search_engine: SearchEngine,
    pub reconnect_attempts: u8,
    /// Milliseconds between node reconnection attempts.
    pub reconnect_interval: u64,
    pub nodes: Vec<NodeBuilder>,
    pub spotify: Option<SpotifyOptions>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            name: "Shunko".to_string(),
            default_search_engine: SearchEngine::Youtube,
            reconnect_attempts: 5,
            reconnect_interval: 5000,
            nodes: Vec::new(),
            spotify: None,
        }
    }
}

pub struct ManagerBuilder {
    pub event_handler: Arc<dyn EventHandler>,
    pub options: ManagerOptions,
    pub custom_nodes: Vec<Arc<dyn Node>>,
    pub connector: Option<Arc<dyn VoiceConnector>>,
    pub resolver: Option<NodeResolver>,
    pub catalog: Option<Arc<dyn CatalogClient>>,
}

impl ManagerBuilder {
    pub fn new<H: EventHandler + 'static>(handler: H) -> Self {
        Self {
            event_handler: Arc::new(handler),
            options: ManagerOptions::default(),
            custom_nodes: Vec::new(),
            connector: None,
            resolver: None,
            catalog: None,
        }
    }

    /// Replaces every option, including nodes added so far.
    pub fn options(&mut self, options: ManagerOptions) -> &mut Self {
        self.options = options;

        self
    }

    pub fn add_node<F>(&mut self, func: F) -> &mut Self
    where
        F: FnOnce(&mut NodeBuilder) -> &mut NodeBuilder {
            let mut builder = NodeBuilder::default();

            func(&mut builder);

            self.options.nodes.push(builder);

            self
        }

    /// Adds an already built node, its id must not collide with other nodes.
    pub fn add_custom_node(&mut self, node: Arc<dyn Node>) -> &mut Self {
        self.custom_nodes.push(node);

        self
    }

    pub fn connector(&mut self, connector: Arc<dyn VoiceConnector>) -> &mut Self {
        self.connector = Some(connector);

        self
    }

    /// Overrides the default lowest penalties node resolver.
    pub fn resolver<F>(&mut self, resolver: F) -> &mut Self
    where
        F: Fn(&[Arc<dyn Node>]) -> Option<Arc<dyn Node>> + Send + Sync + 'static {
            let resolver: NodeResolver = Arc::new(resolver);
            self.resolver = Some(resolver);

            self
        }

    pub fn catalog(&mut self, catalog: Arc<dyn CatalogClient>) -> &mut Self {
        self.catalog = Some(catalog);

        self
    }

    pub fn spotify(&mut self, options: SpotifyOptions) -> &mut Self {
        self.options.spotify = Some(options);

        self
    }

    pub fn default_search_engine(&mut self, engine: SearchEngine) -> &mut Self {
        self.options.default_search_engine = engine;

        self
    }

    pub fn name(&mut self, name: impl ToString) -> &mut Self {
        self.options.name = name.to_string();

        self
    }

    pub fn reconnect_attempts(&mut self, attempts: u8) -> &mut Self {
        self.options.reconnect_attempts = attempts;

        self
    }

    pub fn reconnect_interval(&mut self, interval: Duration) -> &mut Self {
        self.options.reconnect_interval = interval.as_millis() as u64;

        self
    }

    /// Validates the configuration, starts every configured node and returns the manager.
    ///
    /// Needs a running tokio runtime when nodes were added with [`add_node`](Self::add_node).
    pub fn build(self) -> ShunkoResult<Arc<Manager>> {
        self.validate().map_err(|why| {
            error!("Invalid manager configuration: {}", why);
            why
        })?;

        let connector = self.connector.ok_or_else(|| {
            let why = ShunkoError::Misconfigured("a voice connector is required".to_string());
            error!("Invalid manager configuration: {}", why);
            why
        })?;

        let catalog = match (self.catalog, self.options.spotify) {
            (Some(catalog), _) => Some(catalog),
            (None, Some(options)) => {
                let spotify = SpotifyClient::new(options).map_err(|why| {
                    error!("Invalid spotify configuration: {}", why);
                    why
                })?;

                Some(Arc::new(spotify) as Arc<dyn CatalogClient>)
            },
            (None, None) => None,
        };

        let cluster = Arc::new(Cluster::new(connector, self.resolver));

        for node in self.custom_nodes {
            cluster.add_node(node);
        }

        let interval = Duration::from_millis(self.options.reconnect_interval);
        let mut started = Vec::new();

        for builder in self.options.nodes {
            let node = cluster.next_id()
                .and_then(|id| UniversalNode::new(builder, id, self.options.reconnect_attempts, interval))
                .map_err(|why| {
                    error!("Invalid node configuration: {}", why);
                    why
                })?;

            cluster.add_node(node.clone());
            started.push(node);
        }

        for node in started {
            UniversalNode::run(node);
        }

        info!(manager = %self.options.name, "Manager ready with {} nodes", cluster.nodes.len());

        let searcher = Searcher::new(self.options.default_search_engine, catalog);

        Ok(Manager::new(self.options.name, cluster, searcher, self.event_handler))
    }

    fn validate(&self) -> ShunkoResult<()> {
        if self.options.nodes.is_empty() && self.custom_nodes.is_empty() {
            return Err(ShunkoError::Misconfigured("at least one node is required".to_string()));
        }

        for node in self.options.nodes.iter() {
            node.validate()?;
        }

        if self.options.reconnect_attempts == 0 {
            return Err(ShunkoError::Misconfigured("reconnect attempts must be at least 1".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConnector, MockHandler, MockNode};

    fn builder() -> ManagerBuilder {
        let mut builder = ManagerBuilder::new(MockHandler::default());
        builder.connector(Arc::new(MockConnector::default()));
        builder
    }

    #[test]
    fn requires_at_least_one_node() {
        assert!(matches!(builder().build(), Err(ShunkoError::Misconfigured(_))));
    }

    #[test]
    fn requires_a_connector() {
        let mut builder = ManagerBuilder::new(MockHandler::default());
        builder.add_custom_node(MockNode::new(1, "node"));

        assert!(matches!(builder.build(), Err(ShunkoError::Misconfigured(_))));
    }

    #[test]
    fn nodes_need_a_user_id() {
        let mut builder = builder();
        builder.add_node(|node| node.set_host("lavalink.local"));

        assert!(matches!(builder.build(), Err(ShunkoError::Misconfigured(_))));
    }

    #[test]
    fn spotify_credentials_are_validated() {
        let mut builder = builder();
        builder.add_custom_node(MockNode::new(1, "node")).spotify(SpotifyOptions::default());

        assert!(matches!(builder.build(), Err(ShunkoError::Misconfigured(_))));
    }

    #[test]
    fn configured_nodes_need_a_free_id() {
        let mut builder = builder();
        builder
            .add_custom_node(MockNode::new(255, "last"))
            .add_node(|node| node.set_host("a.local").set_user_id(1u64));

        assert!(matches!(builder.build(), Err(ShunkoError::Misconfigured(_))));
    }

    #[tokio::test]
    async fn configured_nodes_get_ids_after_custom_ones() {
        let mut builder = builder();
        builder
            .add_custom_node(MockNode::new(3, "custom"))
            .add_node(|node| node.set_host("a.local").set_user_id(1u64))
            .add_node(|node| node.set_host("b.local").set_user_id(1u64).set_name("b"));

        let manager = builder.build().unwrap();
        let ids = manager.cluster.nodes().iter().map(|node| (node.id(), node.name().to_string())).collect::<Vec<_>>();

        assert_eq!(ids, [(3, "custom".to_string()), (4, "a.local:2333".to_string()), (5, "b".to_string())]);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let raw = r#"{
            "name": "music",
            "default_search_engine": "soundcloud",
            "nodes": [{"host": "lavalink.local", "password": "secret", "user_id": "80351110224678912"}],
            "spotify": {"clients": [{"client_id": "id", "client_secret": "secret"}]}
        }"#;

        let options = serde_json::from_str::<ManagerOptions>(raw).unwrap();

        assert_eq!(options.name, "music");
        assert_eq!(options.default_search_engine, SearchEngine::SoundCloud);
        assert_eq!(options.reconnect_attempts, 5);
        assert_eq!(options.nodes[0].pass, "secret");
        assert_eq!(options.nodes[0].port, 2333);
        assert_eq!(options.nodes[0].id, Some(UserId::new(80351110224678912)));
        assert_eq!(options.spotify.unwrap().playlist_limit, 100);
    }
}
