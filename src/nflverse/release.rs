use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::{header, Client};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::local::parse_off_runtime;
use super::provider::PlayDataSource;
use crate::plays::PlayTable;

/// GitHub release metadata, reduced to what asset lookup needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// Play-by-play source backed by the nflverse-data GitHub releases.
///
/// Finds the season's CSV asset, streams it into the data directory and
/// parses the saved copy.
pub struct NflverseRelease {
    http: Client,
    api_url: String,
    repo: String,
    release_tag: Option<String>,
    season: u16,
    data_dir: PathBuf,
    request_timeout: Duration,
}

impl NflverseRelease {
    pub fn new(
        api_url: &str,
        repo: &str,
        season: u16,
        data_dir: &Path,
        request_timeout: Duration,
    ) -> Result<Self> {
        // Downloads can take minutes, so there is no total deadline
        // client-wide. A stalled body still fails after `request_timeout`
        // without data; API calls also get it as a per-request deadline.
        let http = Client::builder()
            .connect_timeout(request_timeout)
            .read_timeout(request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(NflverseRelease {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
            release_tag: None,
            season,
            data_dir: data_dir.to_path_buf(),
            request_timeout,
        })
    }

    /// Read a tagged release instead of the latest one.
    pub fn with_release_tag(mut self, tag: Option<String>) -> Self {
        self.release_tag = tag;
        self
    }

    fn release_url(&self) -> String {
        match &self.release_tag {
            Some(tag) => format!("{}/repos/{}/releases/tags/{}", self.api_url, self.repo, tag),
            None => format!("{}/repos/{}/releases/latest", self.api_url, self.repo),
        }
    }

    fn asset_pattern(&self) -> String {
        format!("play_by_play_{}", self.season)
    }

    pub async fn fetch_release(&self) -> Result<Release> {
        let url = self.release_url();
        debug!("Fetching release metadata from {}", url);

        let resp = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .timeout(self.request_timeout)
            .send()
            .await
            .context("GitHub releases request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("GitHub releases error {}: {}", status, body);
        }

        resp.json()
            .await
            .context("Failed to parse GitHub release response")
    }

    /// Stream `asset` into the data directory and return the saved path.
    ///
    /// The body is written to `<name>.part` and renamed once complete, so an
    /// interrupted download never leaves a truncated CSV behind.
    pub async fn download(&self, asset: &ReleaseAsset) -> Result<PathBuf> {
        if asset.name.contains(|c: char| c == '/' || c == '\\') || asset.name.starts_with('.') {
            anyhow::bail!("Refusing to save release asset with unsafe name '{}'", asset.name);
        }

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", self.data_dir.display()))?;
        let target = self.data_dir.join(&asset.name);
        let partial = self.data_dir.join(format!("{}.part", asset.name));

        info!(
            "Downloading {} ({} bytes) from {}",
            asset.name, asset.size, asset.browser_download_url
        );
        let resp = self
            .http
            .get(&asset.browser_download_url)
            .send()
            .await
            .with_context(|| format!("Download of {} failed", asset.name))?;

        if !resp.status().is_success() {
            anyhow::bail!("Download of {} failed: {}", asset.name, resp.status());
        }

        let written = match write_body(resp, &partial, &asset.name).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&partial).await {
                    debug!("Could not remove {}: {}", partial.display(), rm);
                }
                return Err(e);
            }
        };

        tokio::fs::rename(&partial, &target)
            .await
            .with_context(|| format!("Failed to move download into {}", target.display()))?;
        info!("Saved {} bytes to {}", written, target.display());
        Ok(target)
    }
}

async fn write_body(resp: reqwest::Response, partial: &Path, name: &str) -> Result<u64> {
    let mut file = tokio::fs::File::create(partial)
        .await
        .with_context(|| format!("Failed to create {}", partial.display()))?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Download of {} interrupted", name))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

#[async_trait]
impl PlayDataSource for NflverseRelease {
    fn name(&self) -> &str {
        "nflverse GitHub release"
    }

    async fn load_plays(&self) -> Result<PlayTable> {
        let release = self.fetch_release().await?;
        let pattern = self.asset_pattern();
        let Some(asset) = select_asset(&release.assets, &pattern) else {
            let available: Vec<&str> = release.assets.iter().map(|a| a.name.as_str()).collect();
            warn!(
                "Release {} has {} assets, none a CSV matching {}",
                release.tag_name,
                available.len(),
                pattern
            );
            anyhow::bail!(
                "Release '{}' has no CSV asset matching '{}' (available: {})",
                release.tag_name,
                pattern,
                if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                }
            );
        };
        info!(
            "Using asset {} from release {} (published {})",
            asset.name,
            release.tag_name,
            release
                .published_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string())
        );

        let path = self.download(asset).await?;
        parse_off_runtime(path).await
    }
}

/// First CSV asset whose name contains `pattern`.
pub fn select_asset<'a>(assets: &'a [ReleaseAsset], pattern: &str) -> Option<&'a ReleaseAsset> {
    assets
        .iter()
        .find(|a| a.name.contains(pattern) && a.name.ends_with(".csv"))
}
