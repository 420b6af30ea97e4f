use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::{
    catalog::CatalogClient,
    error::{ShunkoError, ShunkoResult},
    model::track::{Track, Tracks},
};

lazy_static!(
    static ref SPOTIFY_REGEX: Regex = Regex::new(
        r"^(?:https?://open\.spotify\.com/(?:intl-[a-z]{2}/)?|spotify:)(track|album|playlist|artist)[/:]([A-Za-z0-9]+)"
    ).unwrap();
);

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_URL: &str = "https://api.spotify.com/v1";
const SEARCH_LIMIT: usize = 10;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SpotifyOptions {
    pub clients: Vec<SpotifyCredentials>,
    /// Max tracks loaded from a playlist.
    pub playlist_limit: usize,
    /// Max tracks loaded from an album.
    pub album_limit: usize,
    /// Max top tracks loaded from an artist.
    pub artist_limit: usize,
    pub search_market: String,
}

impl Default for SpotifyOptions {
    fn default() -> Self {
        Self {
            clients: Vec::new(),
            playlist_limit: 100,
            album_limit: 50,
            artist_limit: 10,
            search_market: "US".to_string(),
        }
    }
}

impl SpotifyOptions {
    pub fn add_client(&mut self, client_id: impl ToString, client_secret: impl ToString) -> &mut Self {
        self.clients.push(SpotifyCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotifyKind {
    Track,
    Album,
    Playlist,
    Artist,
}

/// Splits a spotify link into what it points to and its id.
pub fn parse_url(url: &str) -> Option<(SpotifyKind, &str)> {
    let captures = SPOTIFY_REGEX.captures(url)?;

    let kind = match captures.get(1)?.as_str() {
        "track" => SpotifyKind::Track,
        "album" => SpotifyKind::Album,
        "playlist" => SpotifyKind::Playlist,
        _ => SpotifyKind::Artist,
    };

    Some((kind, captures.get(2)?.as_str()))
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Spotify web api client using the client credentials flow.
pub struct SpotifyClient {
    http: HttpClient,
    options: SpotifyOptions,
    token: Mutex<Option<AccessToken>>,
    next_client: AtomicUsize,
}

impl SpotifyClient {
    pub fn new(options: SpotifyOptions) -> ShunkoResult<Self> {
        if options.clients.is_empty() {
            return Err(ShunkoError::Misconfigured("spotify must contain at least one client".to_string()));
        }

        for client in options.clients.iter() {
            if client.client_id.is_empty() {
                return Err(ShunkoError::Misconfigured("spotify must have client_id".to_string()));
            }
            if client.client_secret.is_empty() {
                return Err(ShunkoError::Misconfigured("spotify must have client_secret".to_string()));
            }
        }

        if options.clients.len() > 1 {
            warn!("Spotify is using the multi client mode, requests can still get rate limited");
        }

        Ok(Self {
            http: HttpClient::new(),
            options,
            token: Mutex::new(None),
            next_client: AtomicUsize::new(0),
        })
    }

    async fn token(&self) -> ShunkoResult<String> {
        let cached = self.token.lock()
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
            .map(|token| token.value.clone());

        if let Some(token) = cached {
            return Ok(token);
        }

        // Rotate credentials every refresh to spread the rate limit
        let index = self.next_client.fetch_add(1, Ordering::Relaxed) % self.options.clients.len();
        let client = &self.options.clients[index];

        debug!("Requesting spotify token with client {}", index);

        let response = self.http.post(TOKEN_URL)
            .basic_auth(&client.client_id, Some(&client.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?
            .json::<TokenResponse>()
            .await?;

        // Refresh a little before spotify expires it
        let lifetime = Duration::from_secs(response.expires_in.saturating_sub(30));

        *self.token.lock() = Some(AccessToken {
            value: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(response.access_token)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> ShunkoResult<T> {
        let token = self.token().await?;

        let response = self.http.get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ShunkoError::Catalog(format!("spotify answered {} for {}", response.status(), url)));
        }

        Ok(response.json::<T>().await?)
    }

    fn market(&self) -> (&'static str, String) {
        ("market", self.options.search_market.clone())
    }

    async fn track(&self, id: &str) -> ShunkoResult<Tracks> {
        let track = self.get::<SpotifyTrack>(&format!("{}/tracks/{}", API_URL, id), &[self.market()]).await?;

        Ok(Tracks {
            load_type: crate::model::track::LoadType::TrackLoaded,
            tracks: vec![track.into_track()],
            ..Default::default()
        })
    }

    async fn album(&self, id: &str) -> ShunkoResult<Tracks> {
        let album = self.get::<SpotifyAlbum>(&format!("{}/albums/{}", API_URL, id), &[self.market()]).await?;

        let mut tracks = album.tracks.items.into_iter().map(SpotifyTrack::into_track).collect::<Vec<_>>();
        let mut next = album.tracks.next;

        while let Some(url) = next.take() {
            if tracks.len() >= self.options.album_limit { break; }

            let page = self.get::<Page<SpotifyTrack>>(&url, &[]).await?;
            tracks.extend(page.items.into_iter().map(SpotifyTrack::into_track));
            next = page.next;
        }

        tracks.truncate(self.options.album_limit);

        Ok(Tracks::playlist(album.name, tracks))
    }

    async fn playlist(&self, id: &str) -> ShunkoResult<Tracks> {
        let playlist = self.get::<SpotifyPlaylist>(&format!("{}/playlists/{}", API_URL, id), &[self.market()]).await?;

        let mut tracks = playlist.tracks.items.into_iter().filter_map(PlaylistItem::into_track).collect::<Vec<_>>();
        let mut next = playlist.tracks.next;

        while let Some(url) = next.take() {
            if tracks.len() >= self.options.playlist_limit { break; }

            let page = self.get::<Page<PlaylistItem>>(&url, &[]).await?;
            tracks.extend(page.items.into_iter().filter_map(PlaylistItem::into_track));
            next = page.next;
        }

        tracks.truncate(self.options.playlist_limit);

        Ok(Tracks::playlist(playlist.name, tracks))
    }

    async fn artist(&self, id: &str) -> ShunkoResult<Tracks> {
        let top = self.get::<TopTracks>(&format!("{}/artists/{}/top-tracks", API_URL, id), &[self.market()]).await?;

        let tracks = top.tracks.into_iter()
            .take(self.options.artist_limit)
            .map(SpotifyTrack::into_track)
            .collect::<Vec<_>>();

        let name = tracks.first().map(|t| t.info.author.clone()).unwrap_or_default();

        Ok(Tracks::playlist(name, tracks))
    }
}

#[async_trait]
impl CatalogClient for SpotifyClient {
    fn check(&self, url: &str) -> bool {
        SPOTIFY_REGEX.is_match(url)
    }

    async fn resolve(&self, url: &str) -> ShunkoResult<Tracks> {
        let (kind, id) = parse_url(url).ok_or_else(|| ShunkoError::InvalidArgument(format!("`{}` is not a spotify link", url)))?;

        match kind {
            SpotifyKind::Track => self.track(id).await,
            SpotifyKind::Album => self.album(id).await,
            SpotifyKind::Playlist => self.playlist(id).await,
            SpotifyKind::Artist => self.artist(id).await,
        }
    }

    async fn search(&self, query: &str) -> ShunkoResult<Tracks> {
        let result = self.get::<SearchResponse>(&format!("{}/search", API_URL), &[
            ("q", query.to_string()),
            ("type", "track".to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
            self.market(),
        ]).await?;

        Ok(Tracks::search_result(result.tracks.items.into_iter().map(SpotifyTrack::into_track).collect()))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct Page<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct Artist {
    name: String,
}

#[derive(Deserialize, Default)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    id: Option<String>,
    name: String,
    duration_ms: u64,
    artists: Vec<Artist>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl SpotifyTrack {
    fn into_track(self) -> Track {
        let author = self.artists.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ");

        let mut track = Track::unresolved(author, self.name, self.duration_ms, self.external_urls.spotify);
        track.info.identifier = self.id.unwrap_or_default();
        track.info.source_name = Some("spotify".to_string());
        track
    }
}

#[derive(Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
}

impl PlaylistItem {
    fn into_track(self) -> Option<Track> {
        self.track.map(SpotifyTrack::into_track)
    }
}

#[derive(Deserialize)]
struct SpotifyAlbum {
    name: String,
    tracks: Page<SpotifyTrack>,
}

#[derive(Deserialize)]
struct SpotifyPlaylist {
    name: String,
    tracks: Page<PlaylistItem>,
}

#[derive(Deserialize)]
struct TopTracks {
    tracks: Vec<SpotifyTrack>,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: Page<SpotifyTrack>,
}
