use std::{fmt, str::FromStr, sync::Arc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::{
    catalog::CatalogClient,
    error::{ShunkoError, ShunkoResult},
    model::track::{Track, TrackRequester, Tracks},
    node::Node,
};

lazy_static!(
    static ref URL_REGEX: Regex = Regex::new(r"^https?://").unwrap();
);

pub fn is_url(query: &str) -> bool {
    URL_REGEX.is_match(query)
}

/// Content provider a text query is sent to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[default]
    Youtube,
    YoutubeMusic,
    SoundCloud,
    Spotify,
    Deezer,
    Yandex,
    /// Routes through the configured catalog client instead of a node prefix.
    Catalog,
}

impl SearchEngine {
    pub const ALL: [SearchEngine; 7] = [
        SearchEngine::Youtube,
        SearchEngine::YoutubeMusic,
        SearchEngine::SoundCloud,
        SearchEngine::Spotify,
        SearchEngine::Deezer,
        SearchEngine::Yandex,
        SearchEngine::Catalog,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SearchEngine::Youtube => "youtube",
            SearchEngine::YoutubeMusic => "youtubemusic",
            SearchEngine::SoundCloud => "soundcloud",
            SearchEngine::Spotify => "spotify",
            SearchEngine::Deezer => "deezer",
            SearchEngine::Yandex => "yandex",
            SearchEngine::Catalog => "catalog",
        }
    }

    /// Node search prefix, `None` for the catalog.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            SearchEngine::Youtube => Some("ytsearch"),
            SearchEngine::YoutubeMusic => Some("ytmsearch"),
            SearchEngine::SoundCloud => Some("scsearch"),
            SearchEngine::Spotify => Some("spsearch"),
            SearchEngine::Deezer => Some("dzsearch"),
            SearchEngine::Yandex => Some("ymsearch"),
            SearchEngine::Catalog => None,
        }
    }

    /// `prefix:query` identifier for the node.
    pub fn query(&self, query: &str) -> Option<String> {
        self.prefix().map(|prefix| format!("{}:{}", prefix, query))
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchEngine {
    type Err = ShunkoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchEngine::ALL.iter()
            .find(|engine| engine.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ShunkoError::UnknownEngine(s.to_string()))
    }
}

#[derive(Clone, Debug, Default)]
pub struct SearchOptions {
    /// Falls back to the manager's default engine when unset.
    pub engine: Option<SearchEngine>,
    pub requester: Option<TrackRequester>,
}

impl SearchOptions {
    pub fn engine(mut self, engine: SearchEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn requester(mut self, requester: impl Into<TrackRequester>) -> Self {
        self.requester = Some(requester.into());
        self
    }
}

/// Search routing shared by the manager and its players.
#[derive(Clone)]
pub struct Searcher {
    pub default_engine: SearchEngine,
    pub catalog: Option<Arc<dyn CatalogClient>>,
}

impl Searcher {
    pub fn new(default_engine: SearchEngine, catalog: Option<Arc<dyn CatalogClient>>) -> Self {
        Self { default_engine, catalog }
    }

    fn catalog(&self) -> ShunkoResult<&Arc<dyn CatalogClient>> {
        self.catalog.as_ref().ok_or(ShunkoError::CatalogUnavailable)
    }

    pub async fn search(&self, node: &dyn Node, query: &str, options: SearchOptions) -> ShunkoResult<Tracks> {
        let engine = options.engine.unwrap_or(self.default_engine);

        let mut tracks = if is_url(query) {
            match &self.catalog {
                Some(catalog) if engine == SearchEngine::Catalog && catalog.check(query) => catalog.resolve(query).await?,
                _ => node.load_tracks(query).await?,
            }
        } else {
            match engine.query(query) {
                Some(identifier) => {
                    debug!("Searching {} on node {}", identifier, node.name());
                    node.load_tracks(&identifier).await?
                },
                None => self.catalog()?.search(query).await?,
            }
        };

        if let Some(requester) = options.requester {
            for track in tracks.tracks.iter_mut() {
                track.requester = Some(requester.clone());
            }
        }

        Ok(tracks)
    }
}

/// Looks an unresolved track up on `node`, first on youtube music then on youtube.
///
/// The encoding of the first hit is written into the track. Returns `None`
/// when neither search finds anything.
pub async fn resolve_track(node: &dyn Node, mut track: Track) -> ShunkoResult<Option<Track>> {
    let query = track.resolve_query();

    let mut result = node.load_tracks(&format!("ytmsearch:{}", query)).await?;

    if result.is_empty() {
        result = node.load_tracks(&format!("ytsearch:{}", query)).await?;

        if result.is_empty() {
            return Ok(None);
        }
    }

    let found = result.tracks.swap_remove(0);
    track.track = found.track;

    if track.info.identifier.is_empty() {
        track.info.identifier = found.info.identifier;
    }

    Ok(Some(track))
}
