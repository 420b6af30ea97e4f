pub mod events;
pub mod track;
pub mod gateway;

use serde::{Serialize, Deserialize};

use events::*;
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use crate::types::WebSocketConnection;
use crate::filters::Filters;
use serde_json::{
    json,
    Value
};
use crate::error::{ShunkoError, ShunkoResult};
use futures::SinkExt;

pub fn merge(a: &mut Value, b: Value) {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            for (k, v) in b {
                merge(a.entry(k).or_insert(Value::Null), v);
            }
        }

        (a, b) => *a = b,
    }
}


#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[non_exhaustive]
#[serde(rename_all = "camelCase")]
pub enum Codes {
    //Destroy the player
    Destroy,
    //Apply audio filters
    Filters(Filters),
    //Pause the player
    Pause(Pause),
    //Play a track
    Play(Play),
    //Seek to a given position
    Seek(Seek),
    //Stop a player
    Stop,
    //Player connects to a given channel
    VoiceUpdate(VoiceUpdate),
    //Change the player's volume
    Volume(Volume),
    //Keep players alive across reconnects, not bound to a guild
    ConfigureResuming(ConfigureResuming)
}

impl Codes {
    pub fn op(&self) -> &'static str {
        match self {
            Self::Destroy => "destroy",
            Self::Filters(_) => "filters",
            Self::Pause(_) => "pause",
            Self::Play(_) => "play",
            Self::Seek(_) => "seek",
            Self::Stop => "stop",
            Self::VoiceUpdate(_) => "voiceUpdate",
            Self::Volume(_) => "volume",
            Self::ConfigureResuming(_) => "configureResuming",
        }
    }

    /// Json sent over the websocket for this op.
    pub fn payload(&self, guild_id: u64) -> ShunkoResult<Value> {
        let mut value = match self {
            Self::ConfigureResuming(_) => json!({ "op" : self.op() }),
            _ => json!({
                "op" : self.op(),
                "guildId" : guild_id.to_string(),
            }),
        };

        let data = match self {
            Self::Destroy | Self::Stop => None,
            Self::Filters(data) => Some(serde_json::to_value(data)?),
            Self::Pause(data) => Some(serde_json::to_value(data)?),
            Self::Play(data) => Some(serde_json::to_value(data)?),
            Self::Seek(data) => Some(serde_json::to_value(data)?),
            Self::VoiceUpdate(data) => Some(serde_json::to_value(data)?),
            Self::Volume(data) => Some(serde_json::to_value(data)?),
            Self::ConfigureResuming(data) => Some(serde_json::to_value(data)?),
        };

        if let Some(data) = data {
            merge(&mut value, data);
        }

        Ok(value)
    }

    pub async fn send(&self, guild_id: u64, socket: &mut WebSocketConnection) -> ShunkoResult<()> {
        let payload = serde_json::to_string(&self.payload(guild_id)?)?;

        if let Err(why) = socket.send(TungsteniteMessage::text(payload)).await {
            return Err(ShunkoError::ErrorSendingPayload(why));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Timescale;

    #[test]
    fn play_payload_is_flat() {
        let code = Codes::Play(Play {
            track: "QAAA".to_string(),
            no_replace: false,
            start_time: 0,
            end_time: None,
        });

        assert_eq!(code.payload(42).unwrap(), json!({
            "op": "play",
            "guildId": "42",
            "track": "QAAA",
            "noReplace": false,
            "startTime": 0
        }));
    }

    #[test]
    fn unit_ops_only_carry_guild() {
        assert_eq!(Codes::Stop.payload(7).unwrap(), json!({ "op": "stop", "guildId": "7" }));
        assert_eq!(Codes::Destroy.payload(7).unwrap(), json!({ "op": "destroy", "guildId": "7" }));
    }

    #[test]
    fn voice_update_nests_event() {
        let code = Codes::VoiceUpdate(VoiceUpdate {
            session_id: "abc".to_string(),
            event: Event {
                token: "tok".to_string(),
                endpoint: "us-east1.discord.media".to_string(),
                guild_id: "7".to_string(),
            }
        });

        let payload = code.payload(7).unwrap();

        assert_eq!(payload["op"], "voiceUpdate");
        assert_eq!(payload["sessionId"], "abc");
        assert_eq!(payload["event"]["guild_id"], "7");
    }

    #[test]
    fn filters_payload_omits_unset_filters() {
        let mut filters = Filters::default();
        filters.timescale = Some(Timescale { speed: 1.2, pitch: 1.0, rate: 1.0 });

        let payload = Codes::Filters(filters).payload(3).unwrap();

        assert_eq!(payload["op"], "filters");
        assert_eq!(payload["timescale"]["speed"], 1.2);
        assert!(payload.get("karaoke").is_none());
    }

    #[test]
    fn configure_resuming_has_no_guild() {
        let payload = Codes::ConfigureResuming(ConfigureResuming { key: "shunko".to_string(), timeout: 60 })
            .payload(0)
            .unwrap();

        assert!(payload.get("guildId").is_none());
        assert_eq!(payload["key"], "shunko");
    }
}
