use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod config;
mod dashboard;
mod nflverse;
mod plays;
mod timeline;

use config::Config;
use dashboard::AppState;
use nflverse::{LocalCsv, NflverseRelease, PlayDataSource};
use timeline::extract_timeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let source: Box<dyn PlayDataSource> = match &config.data_file {
        Some(path) => Box::new(LocalCsv::new(path.clone())),
        None => Box::new(
            NflverseRelease::new(
                &config.github_api_url,
                &config.nflverse_repo,
                config.season,
                &config.data_dir,
                Duration::from_secs(config.http_timeout_secs),
            )?
            .with_release_tag(config.release_tag.clone()),
        ),
    };

    info!("Loading {} play-by-play from {}", config.season, source.name());
    let plays = source
        .load_plays()
        .await
        .with_context(|| format!("Failed to load play-by-play from {}", source.name()))?;
    if plays.is_empty() {
        anyhow::bail!("{} contains no plays", source.name());
    }
    info!(
        "Loaded {} plays across {} games",
        plays.len(),
        plays.game_ids().len()
    );

    // One-shot mode: print a single game's timeline and exit
    if let Some(game_id) = &config.game {
        let report = extract_timeline(&plays, game_id, config.scheme)?;
        let timeline = &report.timeline;
        info!(
            "Game {}: {} plays ({} with win probability, {} to {}), {} columns",
            timeline.game_id(),
            timeline.len(),
            timeline.points().iter().filter(|p| p.first_wp.is_some()).count(),
            timeline.first().map_or(0.0, |p| p.play_id),
            timeline.last().map_or(0.0, |p| p.play_id),
            timeline.scheme()
        );
        info!(
            "Favored team: {} ({:.2}% after play {})",
            report.favored.team,
            report.favored.probability * 100.0,
            report.favored.play_id
        );
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let state = AppState {
        plays: Arc::new(plays),
        scheme: config.scheme,
        source: source.name().to_string(),
        loaded_at: Utc::now(),
    };
    let app = dashboard::router(state);
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Timeline API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
