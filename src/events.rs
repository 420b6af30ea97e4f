use async_trait::async_trait;

use crate::{
    error::ShunkoError,
    model::{gateway::*, track::Track},
    player::{Player, PlayerState},
};
use std::sync::Arc;

/// Events emitted by the manager for its players.
#[derive(Debug)]
pub enum PlayerEvent {
    TrackStart(Option<Track>),
    /// Carries the track that just finished.
    TrackEnd(Option<Track>),
    QueueEnd,
    PlayerClosed(WebSocketClosed),
    TrackException(TrackException),
    PlayerUpdate(PlayerUpdate),
    TrackStuck(TrackStuck),
    PlayerResumed,
    PlayerDestroy,
    PlayerCreate,
    TrackError(Option<Track>, ShunkoError),
}

impl PlayerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::TrackStart(_) => "trackStart",
            PlayerEvent::TrackEnd(_) => "trackEnd",
            PlayerEvent::QueueEnd => "queueEnd",
            PlayerEvent::PlayerClosed(_) => "PlayerClosed",
            PlayerEvent::TrackException(_) => "trackException",
            PlayerEvent::PlayerUpdate(_) => "PlayerUpdate",
            PlayerEvent::TrackStuck(_) => "trackStuck",
            PlayerEvent::PlayerResumed => "PlayerResumed",
            PlayerEvent::PlayerDestroy => "playerDestroy",
            PlayerEvent::PlayerCreate => "PlayerCreate",
            PlayerEvent::TrackError(..) => "trackError",
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Called with every event before its typed handler.
    async fn raw_event(&self, _player: Arc<Player>, _event: &PlayerEvent) {}
    /// Event that triggers when the node starts playing a track.
    async fn track_start(&self, _player: Arc<Player>, _track: Option<Track>) {}
    /// Event that triggers when a track finishes and there's more in the queue.
    async fn track_end(&self, _player: Arc<Player>, _track: Option<Track>) {}
    /// Event that triggers when a track finishes and the queue is empty.
    async fn queue_end(&self, _player: Arc<Player>) {}
    ///Event triggered when an audio web socket is disconnected from discord
    async fn player_closed(&self, _player: Arc<Player>, _event: WebSocketClosed) {}
    async fn track_exception(&self, _player: Arc<Player>, _event: TrackException) {}
    /// Event that triggers when a player updates.
    async fn player_update(&self, _player: Arc<Player>, _event: PlayerUpdate) {}
    async fn track_stuck(&self, _player: Arc<Player>, _event: TrackStuck) {}
    /// Event that triggers when the node resumed the session this player lives on.
    async fn player_resumed(&self, _player: Arc<Player>) {}
    async fn player_destroy(&self, _player: Arc<Player>) {}
    async fn player_create(&self, _player: Arc<Player>) {}
    /// A queued track couldn't be resolved or started.
    async fn track_error(&self, _player: Arc<Player>, _track: Option<Track>, _error: ShunkoError) {}
}

pub(crate) async fn process(handler: &dyn EventHandler, player: Arc<Player>, event: PlayerEvent) {
    handler.raw_event(Arc::clone(&player), &event).await;

    match event {
        PlayerEvent::TrackStart(track) => handler.track_start(player, track).await,
        PlayerEvent::TrackEnd(track) => handler.track_end(player, track).await,
        PlayerEvent::QueueEnd => handler.queue_end(player).await,
        PlayerEvent::PlayerClosed(e) => handler.player_closed(player, e).await,
        PlayerEvent::TrackException(e) => handler.track_exception(player, e).await,
        PlayerEvent::PlayerUpdate(e) => handler.player_update(player, e).await,
        PlayerEvent::TrackStuck(e) => handler.track_stuck(player, e).await,
        PlayerEvent::PlayerResumed => handler.player_resumed(player).await,
        PlayerEvent::PlayerDestroy => handler.player_destroy(player).await,
        PlayerEvent::PlayerCreate => handler.player_create(player).await,
        PlayerEvent::TrackError(track, error) => handler.track_error(player, track, error).await,
    }
}

/// How a node event turns into a manager event.
///
/// `end` isn't listed here, it drives the queue and is handled by the player.
pub(crate) struct Translation {
    pub node_event: &'static str,
    pub manager_event: &'static str,
    pub transform: fn(&mut PlayerState, NodeEvent) -> Option<PlayerEvent>,
}

pub(crate) static TRANSLATIONS: [Translation; 6] = [
    Translation { node_event: "start", manager_event: "trackStart", transform: on_start },
    Translation { node_event: "closed", manager_event: "PlayerClosed", transform: on_closed },
    Translation { node_event: "exception", manager_event: "trackException", transform: on_exception },
    Translation { node_event: "update", manager_event: "PlayerUpdate", transform: on_update },
    Translation { node_event: "stuck", manager_event: "trackStuck", transform: on_stuck },
    Translation { node_event: "resumed", manager_event: "PlayerResumed", transform: on_resumed },
];

pub(crate) fn translation_for(node_event: &str) -> Option<&'static Translation> {
    TRANSLATIONS.iter().find(|t| t.node_event == node_event)
}

fn on_start(state: &mut PlayerState, _event: NodeEvent) -> Option<PlayerEvent> {
    state.playing = true;
    Some(PlayerEvent::TrackStart(state.queue.current.clone()))
}

fn on_closed(state: &mut PlayerState, event: NodeEvent) -> Option<PlayerEvent> {
    match event {
        NodeEvent::Closed(e) => {
            state.playing = false;
            Some(PlayerEvent::PlayerClosed(e))
        },
        _ => None,
    }
}

fn on_exception(state: &mut PlayerState, event: NodeEvent) -> Option<PlayerEvent> {
    match event {
        NodeEvent::Exception(e) => {
            state.playing = false;
            Some(PlayerEvent::TrackException(e))
        },
        _ => None,
    }
}

fn on_update(state: &mut PlayerState, event: NodeEvent) -> Option<PlayerEvent> {
    match event {
        NodeEvent::Update(e) => {
            state.position = e.state.position;
            state.ping = e.state.ping;
            Some(PlayerEvent::PlayerUpdate(e))
        },
        _ => None,
    }
}

fn on_stuck(_state: &mut PlayerState, event: NodeEvent) -> Option<PlayerEvent> {
    match event {
        NodeEvent::Stuck(e) => Some(PlayerEvent::TrackStuck(e)),
        _ => None,
    }
}

fn on_resumed(_state: &mut PlayerState, _event: NodeEvent) -> Option<PlayerEvent> {
    Some(PlayerEvent::PlayerResumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::model::id::ChannelId;
    use crate::queue::Queue;

    fn state() -> PlayerState {
        PlayerState::new(Some(ChannelId::new(1)), ChannelId::new(2), 80, Queue::new())
    }

    fn translate(state: &mut PlayerState, event: NodeEvent) -> Option<PlayerEvent> {
        let translation = translation_for(event.name()).unwrap();
        (translation.transform)(state, event)
    }

    #[test]
    fn every_node_event_but_end_is_translated() {
        let names = TRANSLATIONS.iter().map(|t| (t.node_event, t.manager_event)).collect::<Vec<_>>();

        assert_eq!(names, [
            ("start", "trackStart"),
            ("closed", "PlayerClosed"),
            ("exception", "trackException"),
            ("update", "PlayerUpdate"),
            ("stuck", "trackStuck"),
            ("resumed", "PlayerResumed"),
        ]);
        assert!(translation_for("end").is_none());
    }

    #[test]
    fn translated_names_match_emitted_events() {
        let mut state = state();
        let closed = WebSocketClosed { guild_id: 1, code: 4014, reason: "Disconnected".to_string(), by_remote: true };

        for event in [NodeEvent::Closed(closed), NodeEvent::Resumed] {
            let expected = translation_for(event.name()).unwrap().manager_event;
            assert_eq!(translate(&mut state, event).unwrap().name(), expected);
        }
    }

    #[test]
    fn start_marks_playing_and_carries_current() {
        let mut state = state();
        state.queue.current = Some(Track::unresolved("a", "b", 1, None));

        let event = translate(&mut state, NodeEvent::Start(TrackStart { track: "QAAA".to_string(), guild_id: 1 }));

        assert!(state.playing);
        assert!(matches!(event, Some(PlayerEvent::TrackStart(Some(track))) if track.info.title == "b"));
    }

    #[test]
    fn update_stores_position_and_ping() {
        let mut state = state();
        let update = PlayerUpdate {
            state: State { position: 1234, time: 0, connected: true, ping: Some(20) },
            guild_id: 1,
        };

        translate(&mut state, NodeEvent::Update(update));

        assert_eq!(state.position, 1234);
        assert_eq!(state.ping, Some(20));
    }

    #[test]
    fn exception_stops_playing() {
        let mut state = state();
        state.playing = true;

        let exception = TrackException { track: "QAAA".to_string(), exception: None, error: Some("boom".to_string()), guild_id: 1 };
        translate(&mut state, NodeEvent::Exception(exception));

        assert!(!state.playing);
    }
}
