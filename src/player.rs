use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use serde_json::Value;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, info_span, warn};
use tracing_futures::Instrument;
use crate::{
    cluster::Cluster,
    error::{ShunkoError, ShunkoResult},
    events::{self, EventHandler, PlayerEvent},
    filters::Filters,
    model::{gateway::NodeEvent, track::{Track, Tracks}},
    node::{Node, NodePlayer},
    queue::Queue,
    registry::PlayerRegistry,
    search::{self, SearchOptions, Searcher},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    None,
    Track,
    Queue,
}

/// Mutable state of a player.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub voice_channel_id: Option<ChannelId>,
    pub text_channel_id: ChannelId,
    /// Integer percent, 100 is unchanged.
    pub volume: u16,
    pub paused: bool,
    pub playing: bool,
    pub loop_mode: LoopMode,
    pub queue: Queue,
    pub filters: Filters,
    /// Last position reported by the node, in milliseconds.
    pub position: u64,
    pub ping: Option<i64>,
    pub data: HashMap<String, Value>,
}

impl PlayerState {
    pub fn new(voice_channel_id: Option<ChannelId>, text_channel_id: ChannelId, volume: u16, queue: Queue) -> Self {
        Self {
            voice_channel_id,
            text_channel_id,
            volume,
            paused: false,
            playing: false,
            loop_mode: LoopMode::None,
            queue,
            filters: Filters::default(),
            position: 0,
            ping: None,
            data: HashMap::new(),
        }
    }
}

/// Shared pieces of the manager every player needs.
#[derive(Clone)]
pub(crate) struct PlayerContext {
    pub cluster: Arc<Cluster>,
    pub registry: Arc<PlayerRegistry>,
    pub handler: Arc<dyn EventHandler>,
    pub searcher: Searcher,
}

/// Music player of a single guild, bound to one node session.
pub struct Player {
    pub guild_id: GuildId,
    context: PlayerContext,
    node: Arc<dyn Node>,
    session: Arc<dyn NodePlayer>,
    state: Mutex<PlayerState>,
    destroyed: AtomicBool,
}

impl Player {
    pub(crate) fn new(context: PlayerContext, guild_id: GuildId, node: Arc<dyn Node>, session: Arc<dyn NodePlayer>, state: PlayerState) -> Arc<Self> {
        Arc::new(Self {
            guild_id,
            context,
            node,
            session,
            state: Mutex::new(state),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Drains the node events of this player in order until the session closes.
    pub(crate) fn listen(player: &Arc<Self>, mut events: UnboundedReceiver<NodeEvent>) {
        let weak = Arc::downgrade(player);
        let span = info_span!("player", guild = player.guild_id.get(), node = player.node.id());

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let player = match weak.upgrade() {
                    Some(player) => player,
                    None => break,
                };

                if player.is_destroyed() { break; }

                player.handle_event(event).await;
            }

            debug!("Player stopped listening to node events");
        }.instrument(span));
    }

    pub(crate) async fn handle_event(self: &Arc<Self>, event: NodeEvent) {
        if let NodeEvent::End(end) = &event {
            debug!("Track ended on guild {}: {}", self.guild_id, end.reason);
            return self.on_track_end().await;
        }

        let translation = match events::translation_for(event.name()) {
            Some(translation) => translation,
            None => return,
        };

        let emitted = {
            let mut state = self.state.lock();
            (translation.transform)(&mut state, event)
        };

        if let Some(emitted) = emitted {
            self.emit(emitted).await;
        }
    }

    async fn on_track_end(self: &Arc<Self>) {
        let event = {
            let mut state = self.state.lock();
            let current = state.queue.current.take();

            if let Some(track) = &current {
                match state.loop_mode {
                    LoopMode::Track => state.queue.unshift(track.clone()),
                    LoopMode::Queue => state.queue.push(track.clone()),
                    LoopMode::None => (),
                }
            }

            state.queue.previous = current.clone();

            if state.queue.is_empty() {
                state.playing = false;
                PlayerEvent::QueueEnd
            } else {
                PlayerEvent::TrackEnd(current)
            }
        };

        let advance = matches!(event, PlayerEvent::TrackEnd(_));

        self.emit(event).await;

        if advance {
            self.play().await;
        }
    }

    async fn emit(self: &Arc<Self>, event: PlayerEvent) {
        debug!("Emitting {} for guild {}", event.name(), self.guild_id);

        events::process(&*self.context.handler, Arc::clone(self), event).await;
    }

    /// Starts the next queued track, resolving it first when needed.
    ///
    /// Does nothing on an empty queue. Failures are emitted as
    /// [`PlayerEvent::TrackError`] instead of being returned.
    pub async fn play(self: &Arc<Self>) {
        let track = {
            let mut state = self.state.lock();

            match state.queue.shift() {
                Some(track) => {
                    state.queue.current = Some(track.clone());
                    track
                },
                None => return,
            }
        };

        if let Err(why) = self.start(track).await {
            warn!("Failed to play track on guild {}: {}", self.guild_id, why);

            let current = self.state.lock().queue.current.clone();
            self.emit(PlayerEvent::TrackError(current, why)).await;
        }
    }

    async fn start(&self, track: Track) -> ShunkoResult<()> {
        let track = if track.is_resolved() {
            track
        } else {
            let query = track.resolve_query();
            let resolved = search::resolve_track(&*self.node, track).await?
                .ok_or(ShunkoError::NoMatches(query))?;

            self.state.lock().queue.current = Some(resolved.clone());
            resolved
        };

        let encoded = track.track.as_deref()
            .ok_or_else(|| ShunkoError::NoMatches(track.info.title.clone()))?;

        let volume = self.state.lock().volume;

        self.session.set_volume(volume).await?;
        self.session.play_track(encoded).await
    }

    /// Pauses or resumes playback. Nothing happens when the state wouldn't
    /// change or there's nothing queued nor playing.
    pub async fn pause(&self, pause: bool) -> ShunkoResult<()> {
        {
            let mut state = self.state.lock();

            if state.paused == pause || state.queue.total_size() == 0 {
                return Ok(());
            }

            state.paused = pause;
            state.playing = !pause;
        }

        self.session.set_paused(pause).await
    }

    /// Stops the current track, the queue advances when the node reports its end.
    pub async fn skip(&self) -> ShunkoResult<()> {
        self.session.stop_track().await
    }

    pub async fn seek_to(&self, position: Duration) -> ShunkoResult<()> {
        self.session.seek_to(position).await
    }

    /// Sets the volume in percent, between 0 and 1000.
    pub async fn set_volume(&self, volume: f64) -> ShunkoResult<()> {
        if !volume.is_finite() || !(0.0..=1000.0).contains(&volume) {
            return Err(ShunkoError::InvalidArgument(format!("volume must be between 0 and 1000, got {}", volume)));
        }

        let volume = volume.round() as u16;

        self.session.set_volume(volume).await?;
        self.state.lock().volume = volume;

        Ok(())
    }

    pub fn set_text_channel(&self, channel_id: impl Into<ChannelId>) {
        self.state.lock().text_channel_id = channel_id.into();
    }

    pub fn set_voice_channel(&self, channel_id: impl Into<ChannelId>) {
        self.state.lock().voice_channel_id = Some(channel_id.into());
    }

    pub fn track_repeat(&self) {
        self.state.lock().loop_mode = LoopMode::Track;
    }

    pub fn queue_repeat(&self) {
        self.state.lock().loop_mode = LoopMode::Queue;
    }

    pub fn disable_repeat(&self) {
        self.state.lock().loop_mode = LoopMode::None;
    }

    /// Pauses and leaves the voice channel, the node session stays open.
    pub async fn disconnect(&self) -> ShunkoResult<()> {
        self.pause(true).await?;
        self.context.cluster.leave(self.guild_id).await?;
        self.state.lock().voice_channel_id = None;

        Ok(())
    }

    /// Disconnects, closes the node session and unregisters the player.
    pub async fn destroy(self: &Arc<Self>) -> ShunkoResult<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Err(why) = self.disconnect().await {
            warn!("Failed to disconnect player of guild {}: {}", self.guild_id, why);
        }

        let result = self.session.destroy().await;

        self.context.registry.remove(self);

        info!("Destroyed player of guild {} on node {}", self.guild_id, self.node.name());

        self.emit(PlayerEvent::PlayerDestroy).await;

        result
    }

    /// Clears the queue, disables repeat and skips the current track.
    pub async fn stop(&self) -> ShunkoResult<()> {
        {
            let mut state = self.state.lock();
            state.queue.clear();
            state.loop_mode = LoopMode::None;
        }

        self.skip().await
    }

    /// Searches on the node this player lives on.
    pub async fn search(&self, query: &str, options: SearchOptions) -> ShunkoResult<Tracks> {
        self.context.searcher.search(&*self.node, query, options).await
    }

    pub async fn set_filters(&self, filters: Filters) -> ShunkoResult<()> {
        self.session.set_filters(&filters).await?;
        self.state.lock().filters = filters;

        Ok(())
    }

    pub fn filters(&self) -> Filters {
        self.state.lock().filters.clone()
    }

    pub fn set_data(&self, key: impl ToString, value: impl Into<Value>) -> Option<Value> {
        self.state.lock().data.insert(key.to_string(), value.into())
    }

    pub fn data(&self, key: &str) -> Option<Value> {
        self.state.lock().data.get(key).cloned()
    }

    /// Locks the queue. Don't hold it across an await.
    pub fn queue(&self) -> MappedMutexGuard<'_, Queue> {
        MutexGuard::map(self.state.lock(), |state| &mut state.queue)
    }

    /// Locks the whole state. Don't hold it across an await.
    pub fn state(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock()
    }

    pub fn node(&self) -> &Arc<dyn Node> {
        &self.node
    }

    pub fn volume(&self) -> u16 {
        self.state.lock().volume
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.state.lock().loop_mode
    }

    pub fn position(&self) -> u64 {
        self.state.lock().position
    }

    pub fn ping(&self) -> Option<i64> {
        self.state.lock().ping
    }

    pub fn voice_channel_id(&self) -> Option<ChannelId> {
        self.state.lock().voice_channel_id
    }

    pub fn text_channel_id(&self) -> ChannelId {
        self.state.lock().text_channel_id
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}
