use async_trait::async_trait;
use crate::{error::ShunkoResult, model::track::Tracks};

/// Third party metadata catalog. Tracks it returns are unresolved and get
/// their node encoding when they're about to be played.
#[async_trait]
pub trait CatalogClient: Send + Sync + 'static {
    /// Whether `url` points into this catalog.
    fn check(&self, url: &str) -> bool;

    async fn resolve(&self, url: &str) -> ShunkoResult<Tracks>;

    async fn search(&self, query: &str) -> ShunkoResult<Tracks>;
}
