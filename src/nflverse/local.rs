use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use super::provider::PlayDataSource;
use crate::plays::PlayTable;

/// Play-by-play CSV already on disk.
pub struct LocalCsv {
    path: PathBuf,
    name: String,
}

impl LocalCsv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("local file {}", path.display());
        LocalCsv { path, name }
    }
}

#[async_trait]
impl PlayDataSource for LocalCsv {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_plays(&self) -> Result<PlayTable> {
        let table = parse_off_runtime(self.path.clone()).await?;
        info!("Loaded {} plays from {}", table.len(), self.path.display());
        Ok(table)
    }
}

/// Season files run to hundreds of megabytes; keep the parse off the async workers.
pub(crate) async fn parse_off_runtime(path: PathBuf) -> Result<PlayTable> {
    tokio::task::spawn_blocking(move || PlayTable::from_path(Path::new(&path)))
        .await
        .context("Play-by-play parse task failed")?
}
