//! Chat-platform side of a player: joining and leaving voice channels.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use crate::error::ShunkoResult;

/// What the connector needs to join a voice channel.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinRequest {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub shard_id: u32,
    pub deaf: bool,
}

/// Voice server credentials handed to a node so it can stream into the channel.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionInfo {
    pub guild_id: GuildId,
    pub session_id: String,
    pub token: String,
    pub endpoint: String,
}

#[async_trait]
pub trait VoiceConnector: Send + Sync + 'static {
    /// Joins the voice channel and waits for both voice gateway halves.
    async fn join(&self, request: &JoinRequest) -> ShunkoResult<ConnectionInfo>;
    /// Sends the leave directive for the guild's voice connection.
    async fn leave(&self, guild_id: GuildId) -> ShunkoResult<()>;
}

#[cfg(feature = "songbird")]
pub use self::songbird_connector::SongbirdConnector;

#[cfg(feature = "songbird")]
mod songbird_connector {
    use std::sync::Arc;
    use async_trait::async_trait;
    use serenity::model::id::GuildId;
    use songbird::Songbird;
    use tracing::info;
    use crate::error::{ShunkoError, ShunkoResult};
    use super::{ConnectionInfo, JoinRequest, VoiceConnector};

    /// Uses songbird in gateway-only mode, the audio itself is streamed by the node.
    ///
    /// Songbird routes the voice state update through the shard owning the guild,
    /// so `JoinRequest::shard_id` is not needed here.
    pub struct SongbirdConnector {
        manager: Arc<Songbird>,
    }

    impl SongbirdConnector {
        pub fn new(manager: Arc<Songbird>) -> Self {
            Self { manager }
        }
    }

    #[async_trait]
    impl VoiceConnector for SongbirdConnector {
        async fn join(&self, request: &JoinRequest) -> ShunkoResult<ConnectionInfo> {
            let (conn_info, call) = self.manager.join_gateway(request.guild_id, request.channel_id).await
                .map_err(|why| ShunkoError::Voice(why.to_string()))?;

            if request.deaf {
                let mut call = call.lock().await;

                call.deafen(true).await.map_err(|why| ShunkoError::Voice(why.to_string()))?;
            }

            info!("Joined voice channel {} on guild {}", request.channel_id, request.guild_id);

            Ok(ConnectionInfo {
                guild_id: request.guild_id,
                session_id: conn_info.session_id,
                token: conn_info.token,
                endpoint: conn_info.endpoint,
            })
        }

        async fn leave(&self, guild_id: GuildId) -> ShunkoResult<()> {
            if self.manager.get(guild_id).is_none() {
                return Ok(())
            }

            self.manager.leave(guild_id).await.map_err(|why| ShunkoError::Voice(why.to_string()))
        }
    }
}
