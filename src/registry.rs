use std::sync::Arc;
use dashmap::DashMap;
use serenity::model::id::GuildId;
use crate::player::Player;

/// Live players by guild, at most one each.
#[derive(Default)]
pub struct PlayerRegistry {
    players: DashMap<GuildId, Arc<Player>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Player>> {
        self.players.get(&guild_id).map(|item| Arc::clone(item.value()))
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.players.contains_key(&guild_id)
    }

    /// Registers `player` unless its guild already has one, returning the one kept.
    pub(crate) fn insert(&self, player: Arc<Player>) -> Arc<Player> {
        Arc::clone(self.players.entry(player.guild_id).or_insert(player).value())
    }

    /// Removes `player` if it's still the one registered for its guild.
    pub(crate) fn remove(&self, player: &Arc<Player>) -> bool {
        self.players.remove_if(&player.guild_id, |_, registered| Arc::ptr_eq(registered, player)).is_some()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.players.iter().map(|item| *item.key()).collect()
    }

    pub fn players(&self) -> Vec<Arc<Player>> {
        self.players.iter().map(|item| Arc::clone(item.value())).collect()
    }

    pub(crate) fn clear(&self) {
        self.players.clear();
    }
}
