use serde::{
    Serialize,
    Deserialize
};
use serenity::model::id::UserId as DiscordUserId;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadType {
    TrackLoaded,
    PlaylistLoaded,
    SearchResult,
    #[default]
    NoMatches,
    LoadFailed,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Tracks {
    #[serde(default)]
    pub playlist_info: PlaylistInfo,
    #[serde(default)]
    pub load_type: LoadType,
    #[serde(default)]
    pub tracks: Vec<Track>,
    pub exception: Option<Exception>
}

impl Tracks {
    /// Builds a search result out of already known tracks.
    pub fn search_result(tracks: Vec<Track>) -> Self {
        Self {
            load_type: if tracks.is_empty() { LoadType::NoMatches } else { LoadType::SearchResult },
            tracks,
            ..Default::default()
        }
    }

    /// Builds a playlist result, used by catalog clients for albums and playlists.
    pub fn playlist(name: impl ToString, tracks: Vec<Track>) -> Self {
        Self {
            playlist_info: PlaylistInfo { name: Some(name.to_string()), selected_track: None },
            load_type: if tracks.is_empty() { LoadType::NoMatches } else { LoadType::PlaylistLoaded },
            tracks,
            exception: None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// A playable item. `track` holds the node encoding and is absent until the
/// track has been resolved against a node.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Track {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(default)]
    pub info: TrackInfo,
    #[serde(skip)]
    pub requester: Option<TrackRequester>
}

impl Track {
    /// Creates a metadata only track, it needs to be resolved before playing.
    pub fn unresolved(author: impl ToString, title: impl ToString, length: u64, uri: Option<String>) -> Self {
        Self {
            track: None,
            info: TrackInfo {
                author: author.to_string(),
                title: title.to_string(),
                length,
                uri,
                is_seekable: true,
                ..Default::default()
            },
            requester: None
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.track.as_deref().map_or(false, |t| !t.is_empty())
    }

    /// Text used to look this track up on a node, `author - title`.
    pub fn resolve_query(&self) -> String {
        [self.info.author.as_str(), self.info.title.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" - ")
    }

    pub fn with_requester(mut self, requester: impl Into<TrackRequester>) -> Self {
        self.requester = Some(requester.into());
        self
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackInfo {
    pub identifier: String,
    pub is_seekable: bool,
    pub author: String,
    pub length: u64,
    pub is_stream: bool,
    pub position: u64,
    pub title: String,
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Exception {
    pub message: Option<String>,
    pub severity: String,
    #[serde(default)]
    pub cause: Option<String>
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct PlaylistInfo {
    pub name: Option<String>,
    #[serde(rename = "selectedTrack")]
    pub selected_track: Option<i64>
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackRequester {
    pub id: Option<DiscordUserId>,
    pub name: Option<String>
}

impl From<DiscordUserId> for TrackRequester {
    fn from(id: DiscordUserId) -> TrackRequester {
        TrackRequester{id: Some(id), name: None}
    }
}

impl From<String> for TrackRequester {
    fn from(name: String) -> TrackRequester {
        TrackRequester{id: None, name: Some(name)}
    }
}

impl From<(DiscordUserId, String)> for TrackRequester {
    fn from(data: (DiscordUserId, String)) -> TrackRequester {
        TrackRequester {id: Some(data.0), name: Some(data.1)}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_load_tracks_response() {
        let raw = r#"{
            "loadType": "SEARCH_RESULT",
            "playlistInfo": {},
            "tracks": [{
                "track": "QAAAjQIAJVJpY2sgQXN0bGV5",
                "info": {
                    "identifier": "dQw4w9WgXcQ",
                    "isSeekable": true,
                    "author": "RickAstleyVEVO",
                    "length": 212000,
                    "isStream": false,
                    "position": 0,
                    "title": "Never Gonna Give You Up",
                    "uri": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                    "sourceName": "youtube"
                }
            }]
        }"#;

        let tracks: Tracks = serde_json::from_str(raw).unwrap();

        assert_eq!(tracks.load_type, LoadType::SearchResult);
        assert_eq!(tracks.tracks.len(), 1);
        assert!(tracks.tracks[0].is_resolved());
        assert_eq!(tracks.tracks[0].info.length, 212000);
        assert_eq!(tracks.tracks[0].info.source_name.as_deref(), Some("youtube"));
    }

    #[test]
    fn parses_failed_load() {
        let raw = r#"{
            "loadType": "LOAD_FAILED",
            "playlistInfo": {},
            "tracks": [],
            "exception": { "message": "The uploader has not made this video available in your country.", "severity": "COMMON" }
        }"#;

        let tracks: Tracks = serde_json::from_str(raw).unwrap();

        assert_eq!(tracks.load_type, LoadType::LoadFailed);
        assert!(tracks.is_empty());
        assert_eq!(tracks.exception.unwrap().severity, "COMMON");
    }

    #[test]
    fn resolve_query_skips_missing_parts() {
        let track = Track::unresolved("", "Levitating", 0, None);
        assert_eq!(track.resolve_query(), "Levitating");

        let track = Track::unresolved("Dua Lipa", "Levitating", 0, None);
        assert_eq!(track.resolve_query(), "Dua Lipa - Levitating");
        assert!(!track.is_resolved());
    }
}
