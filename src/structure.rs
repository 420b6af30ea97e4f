use std::{collections::HashMap, fmt, sync::Arc};
use parking_lot::RwLock;
use crate::{
    error::{ShunkoError, ShunkoResult},
    player::PlayerState,
    queue::Queue,
};

/// Builds the queue every new player starts with.
pub type QueueFactory = Arc<dyn Fn() -> Queue + Send + Sync>;

/// Runs on the state of every new player before it's registered.
pub type PlayerInit = Arc<dyn Fn(&mut PlayerState) + Send + Sync>;

#[derive(Clone)]
pub enum Structure {
    Queue(QueueFactory),
    Player(PlayerInit),
}

impl Structure {
    fn kind(&self) -> &'static str {
        match self {
            Structure::Queue(_) => "Queue",
            Structure::Player(_) => "Player",
        }
    }
}

impl fmt::Debug for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Structure::{}", self.kind())
    }
}

/// Named, replaceable factories used by the manager to create players.
///
/// Starts with `"Player"` and `"Queue"`; names can't be added, only extended.
pub struct Structures {
    inner: RwLock<HashMap<String, Structure>>,
}

impl Default for Structures {
    fn default() -> Self {
        let mut inner = HashMap::new();

        let queue: QueueFactory = Arc::new(Queue::new);
        let player: PlayerInit = Arc::new(|_: &mut PlayerState| {});

        inner.insert("Queue".to_string(), Structure::Queue(queue));
        inner.insert("Player".to_string(), Structure::Player(player));

        Self { inner: RwLock::new(inner) }
    }
}

impl Structures {
    pub fn get(&self, name: &str) -> ShunkoResult<Structure> {
        self.inner.read()
            .get(name)
            .cloned()
            .ok_or_else(|| ShunkoError::InvalidArgument(format!("`{}` is not a valid structure", name)))
    }

    /// Replaces the structure stored under `name` with `extender(current)` and returns it.
    pub fn extend<F>(&self, name: &str, extender: F) -> ShunkoResult<Structure>
    where
        F: FnOnce(Structure) -> Structure
    {
        // The extender may read other structures, so it runs unlocked.
        let current = self.get(name)?;

        let kind = current.kind();
        let extended = extender(current);

        if extended.kind() != kind {
            return Err(ShunkoError::InvalidArgument(format!("structure `{}` must stay a {}", name, kind)));
        }

        self.inner.write().insert(name.to_string(), extended.clone());

        Ok(extended)
    }

    pub(crate) fn queue(&self) -> Queue {
        match self.inner.read().get("Queue") {
            Some(Structure::Queue(factory)) => factory(),
            _ => Queue::new(),
        }
    }

    pub(crate) fn init_player(&self, state: &mut PlayerState) {
        let init = match self.inner.read().get("Player") {
            Some(Structure::Player(init)) => Arc::clone(init),
            _ => return,
        };

        init(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::model::id::ChannelId;
    use crate::{model::track::Track, player::LoopMode};

    #[test]
    fn unknown_structures_are_rejected() {
        let structures = Structures::default();

        assert!(structures.get("Queue").is_ok());
        assert!(matches!(structures.get("Node"), Err(ShunkoError::InvalidArgument(_))));
        assert!(matches!(structures.extend("Node", |s| s), Err(ShunkoError::InvalidArgument(_))));
    }

    #[test]
    fn extender_can_read_other_structures() {
        let structures = Structures::default();

        let extended = structures.extend("Queue", |current| {
            assert!(matches!(structures.get("Player"), Ok(Structure::Player(_))));
            current
        });

        assert!(matches!(extended, Ok(Structure::Queue(_))));
    }

    #[test]
    fn extended_queue_is_used_for_new_players() {
        let structures = Structures::default();

        structures.extend("Queue", |_| Structure::Queue(Arc::new(|| {
            let mut queue = Queue::new();
            queue.push(Track::unresolved("intro", "jingle", 1000, None));
            queue
        }))).unwrap();

        assert_eq!(structures.queue().len(), 1);
    }

    #[test]
    fn extender_receives_the_previous_structure() {
        let structures = Structures::default();

        structures.extend("Player", |previous| {
            let previous = match previous {
                Structure::Player(init) => init,
                other => return other,
            };

            Structure::Player(Arc::new(move |state: &mut PlayerState| {
                previous(state);
                state.loop_mode = LoopMode::Queue;
            }))
        }).unwrap();

        let mut state = PlayerState::new(Some(ChannelId::new(1)), ChannelId::new(2), 80, Queue::new());
        structures.init_player(&mut state);

        assert_eq!(state.loop_mode, LoopMode::Queue);
    }

    #[test]
    fn extension_cannot_change_kind() {
        let structures = Structures::default();

        let result = structures.extend("Queue", |_| Structure::Player(Arc::new(|_: &mut PlayerState| {})));

        assert!(matches!(result, Err(ShunkoError::InvalidArgument(_))));
        assert!(matches!(structures.get("Queue"), Ok(Structure::Queue(_))));
    }
}
