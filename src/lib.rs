pub mod types;
pub mod error;
pub mod model;
pub mod filters;
pub mod queue;
pub mod voice;
pub mod node;
pub mod cluster;
pub mod catalog;
pub mod spotify;
pub mod search;
pub mod structure;
pub mod events;
pub mod player;
pub mod registry;
pub mod manager;
pub mod builder;

#[cfg(test)]
mod mock;

pub use self::{
    builder::{ManagerBuilder, ManagerOptions, NodeBuilder},
    error::{ShunkoError, ShunkoResult},
    events::{EventHandler, PlayerEvent},
    manager::{CreatePlayerOptions, Manager},
    player::{LoopMode, Player},
    search::{SearchEngine, SearchOptions},
};
