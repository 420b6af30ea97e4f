use serde::{Serialize, Deserialize};
use serde_aux::prelude::*;
use crate::error::ShunkoResult;
use super::track::Exception;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GatewayEvent {
    pub op: String,
    #[serde(rename = "type")]
    pub event_type: Option<String>
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Cpu {
    pub cores: i64,
    #[serde(rename = "systemLoad")]
    pub system_load: f64,
    #[serde(rename = "lavalinkLoad")]
    pub lavalink_load: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FrameStats {
    pub sent: i64,
    pub deficit: i64,
    pub nulled: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Memory {
    pub reservable: i64,
    pub used: i64,
    pub free: i64,
    pub allocated: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct State {
    #[serde(default)]
    pub position: u64,
    pub time: i64,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub ping: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Stats {
    #[serde(rename = "playingPlayers")]
    pub playing_players: i64,
    pub memory: Memory,
    #[serde(rename = "frameStats")]
    pub frame_stats: Option<FrameStats>,
    pub players: i64,
    pub cpu: Cpu,
    pub uptime: i64,
}

impl Stats {
    /// Load score of the node, lower is better.
    pub fn penalties(&self) -> i64 {
        let mut penalties = self.players;

        penalties += (1.05f64.powf(100. * self.cpu.system_load) * 10. - 10.).round() as i64;

        if let Some(frames) = &self.frame_stats {
            penalties += frames.deficit;
            penalties += frames.nulled * 2;
        }

        penalties
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerUpdate {
    pub state: State,
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrackStart {
    #[serde(default)]
    pub track: String,
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrackFinish {
    pub reason: String,
    #[serde(default)]
    pub track: String,
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrackException {
    #[serde(default)]
    pub track: String,
    #[serde(default)]
    pub exception: Option<Exception>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrackStuck {
    #[serde(default)]
    pub track: String,
    #[serde(rename = "thresholdMs")]
    pub threshold_ms: u64,
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct WebSocketClosed {
    #[serde(rename = "guildId")]
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub guild_id: u64,
    pub code: u16,
    pub reason: String,
    #[serde(rename = "byRemote")]
    pub by_remote: bool
}

/// Event delivered by a node to a single guild session.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    Start(TrackStart),
    End(TrackFinish),
    Exception(TrackException),
    Stuck(TrackStuck),
    Closed(WebSocketClosed),
    Update(PlayerUpdate),
    Resumed,
}

impl NodeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NodeEvent::Start(_) => "start",
            NodeEvent::End(_) => "end",
            NodeEvent::Exception(_) => "exception",
            NodeEvent::Stuck(_) => "stuck",
            NodeEvent::Closed(_) => "closed",
            NodeEvent::Update(_) => "update",
            NodeEvent::Resumed => "resumed",
        }
    }
}

/// A decoded websocket text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Stats(Stats),
    Guild(u64, NodeEvent),
    Unknown(String),
}

impl Frame {
    pub fn parse(text: &str) -> ShunkoResult<Frame> {
        let payload = serde_json::from_str::<GatewayEvent>(text)?;

        let frame = match payload.op.as_str() {
            "stats" => Frame::Stats(serde_json::from_str(text)?),
            "playerUpdate" => {
                let update = serde_json::from_str::<PlayerUpdate>(text)?;
                Frame::Guild(update.guild_id, NodeEvent::Update(update))
            },
            "event" => match payload.event_type.as_deref().unwrap_or_default() {
                "TrackStartEvent" => {
                    let event = serde_json::from_str::<TrackStart>(text)?;
                    Frame::Guild(event.guild_id, NodeEvent::Start(event))
                },
                "TrackEndEvent" => {
                    let event = serde_json::from_str::<TrackFinish>(text)?;
                    Frame::Guild(event.guild_id, NodeEvent::End(event))
                },
                "TrackExceptionEvent" => {
                    let event = serde_json::from_str::<TrackException>(text)?;
                    Frame::Guild(event.guild_id, NodeEvent::Exception(event))
                },
                "TrackStuckEvent" => {
                    let event = serde_json::from_str::<TrackStuck>(text)?;
                    Frame::Guild(event.guild_id, NodeEvent::Stuck(event))
                },
                "WebSocketClosedEvent" => {
                    let event = serde_json::from_str::<WebSocketClosed>(text)?;
                    Frame::Guild(event.guild_id, NodeEvent::Closed(event))
                },
                other => Frame::Unknown(other.to_string()),
            },
            other => Frame::Unknown(other.to_string()),
        };

        Ok(frame)
    }
}
