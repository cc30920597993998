use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::timeline::ProbabilityScheme;

/// First season nflverse publishes play-by-play for.
const FIRST_SEASON: u16 = 1999;

/// NFL win-probability timelines from nflverse play-by-play data
#[derive(Parser, Debug, Clone)]
#[command(name = "nfl-wp-dashboard", version, about)]
pub struct Config {
    /// Season whose play-by-play release is loaded
    #[arg(long, env = "SEASON", default_value = "2024")]
    pub season: u16,

    /// Directory downloaded release assets are saved into
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Load this play-by-play CSV instead of downloading a release
    #[arg(long, env = "DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// Repository publishing the play-by-play releases (owner/name)
    #[arg(long, env = "NFLVERSE_REPO", default_value = "nflverse/nflverse-data")]
    pub nflverse_repo: String,

    /// Release tag to read instead of the latest release (e.g. "pbp")
    #[arg(long, env = "RELEASE_TAG")]
    pub release_tag: Option<String>,

    /// Default probability columns: "possession" or "home-away"
    #[arg(long, env = "PROBABILITY_SCHEME", default_value = "possession")]
    pub scheme: ProbabilityScheme,

    /// Timeline API listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Connect and read-stall timeout for downloads, total timeout for API calls, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "30")]
    pub http_timeout_secs: u64,

    /// Print this game's timeline as JSON and exit instead of serving
    #[arg(long, env = "GAME")]
    pub game: Option<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.season < FIRST_SEASON {
            anyhow::bail!("season must be {} or later", FIRST_SEASON);
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be positive");
        }
        match &self.data_file {
            Some(path) => {
                if !path.is_file() {
                    anyhow::bail!("data_file {} does not exist", path.display());
                }
            }
            None => {
                let api = url::Url::parse(&self.github_api_url)
                    .map_err(|e| anyhow::anyhow!("github_api_url is not a valid URL: {}", e))?;
                if !matches!(api.scheme(), "http" | "https") {
                    anyhow::bail!("github_api_url must be an http(s) URL");
                }
                let parts: Vec<&str> = self.nflverse_repo.split('/').collect();
                if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
                    anyhow::bail!("nflverse_repo must look like owner/name");
                }
            }
        }
        if self.game.is_none() {
            self.dashboard_addr
                .parse::<SocketAddr>()
                .map_err(|e| anyhow::anyhow!("dashboard_addr is not a socket address: {}", e))?;
        }
        Ok(())
    }
}
