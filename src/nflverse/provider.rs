use anyhow::Result;
use async_trait::async_trait;

use crate::plays::PlayTable;

/// Trait that every play-by-play source must implement.
#[async_trait]
pub trait PlayDataSource: Send + Sync {
    /// Load the full play table for the configured season.
    async fn load_plays(&self) -> Result<PlayTable>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
