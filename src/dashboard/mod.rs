use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use crate::plays::PlayTable;
use crate::timeline::{extract_timeline, ProbabilityScheme, TimelineError};

#[derive(Clone)]
pub struct AppState {
    pub plays: Arc<PlayTable>,
    /// Scheme used when a request does not name one.
    pub scheme: ProbabilityScheme,
    /// Name of the data source the table came from.
    pub source: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct GamesResponse<'a> {
    source: &'a str,
    loaded_at: DateTime<Utc>,
    plays: usize,
    games: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TimelineQuery {
    scheme: Option<ProbabilityScheme>,
}

/// Build the Axum router for the timeline API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/games", get(games_handler))
        .route("/api/games/:game_id/timeline", get(timeline_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /api/games
async fn games_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(GamesResponse {
        source: &state.source,
        loaded_at: state.loaded_at,
        plays: state.plays.len(),
        games: state.plays.game_ids(),
    })
    .into_response()
}

/// GET /api/games/:game_id/timeline?scheme=possession|home-away
async fn timeline_handler(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let scheme = query.scheme.unwrap_or(state.scheme);
    extract_timeline(&state.plays, &game_id, scheme)
        .map(Json)
        .map_err(|e| {
            let status = status_for(&e);
            if status == StatusCode::NOT_FOUND {
                debug!("Timeline request for unknown game {}", game_id);
            } else {
                warn!("Timeline for {} ({}) failed: {}", game_id, scheme, e);
            }
            (status, e.to_string())
        })
}

/// Unknown games are the caller's to correct; anything else means the loaded
/// data cannot be read for this game.
fn status_for(err: &TimelineError) -> StatusCode {
    match err {
        TimelineError::NotFound { .. } => StatusCode::NOT_FOUND,
        TimelineError::Schema { .. }
        | TimelineError::InvalidValue { .. }
        | TimelineError::MissingProbability { .. }
        | TimelineError::NonComplementary { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    const SAMPLE: &str = "\
game_id,play_id,home_team,away_team,posteam,defteam,wp,def_wp,home_wp,away_wp,wpa
2024_01_KC_BAL,1,KC,BAL,BAL,KC,0.45,0.55,0.55,0.45,0.0
2024_01_KC_BAL,3,KC,BAL,BAL,KC,0.38,0.62,0.62,0.38,-0.04
2024_01_KC_BAL,2,KC,BAL,KC,BAL,0.58,0.42,0.58,0.42,0.03
2024_01_GB_PHI,7,PHI,GB,GB,PHI,0.71,0.29,0.29,0.71,0.1
";

    fn app_with(csv: &str) -> Router {
        router(AppState {
            plays: Arc::new(PlayTable::from_reader(csv.as_bytes()).unwrap()),
            scheme: ProbabilityScheme::HomeAway,
            source: "test".into(),
            loaded_at: Utc::now(),
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    #[tokio::test]
    async fn lists_games() {
        let (status, body) = get_json(app_with(SAMPLE), "/api/games").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plays"], 4);
        assert_eq!(body["source"], "test");
        assert_eq!(body["games"], serde_json::json!(["2024_01_KC_BAL", "2024_01_GB_PHI"]));
    }

    #[tokio::test]
    async fn timeline_uses_default_scheme() {
        let (status, body) = get_json(app_with(SAMPLE), "/api/games/2024_01_KC_BAL/timeline").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scheme"], "home-away");
        let ids: Vec<f64> = body["points"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["play_id"].as_f64().unwrap())
            .collect();
        assert_eq!(ids, vec![1.0, 2.0, 3.0]);
        assert_eq!(body["favored"]["team"], "KC");
        assert_eq!(body["favored"]["probability"], 0.62);
    }

    #[tokio::test]
    async fn timeline_scheme_override() {
        let (status, body) = get_json(
            app_with(SAMPLE),
            "/api/games/2024_01_GB_PHI/timeline?scheme=possession",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scheme"], "possession");
        assert_eq!(body["favored"]["team"], "GB");
    }

    #[tokio::test]
    async fn scheme_query_accepts_aliases() {
        for query in ["home_away", "Home-Away", "possession-defense", "POSSESSION"] {
            let uri = format!("/api/games/2024_01_GB_PHI/timeline?scheme={}", query);
            let (status, body) = get_json(app_with(SAMPLE), &uri).await;
            assert_eq!(status, StatusCode::OK, "scheme={}", query);
            let expected = query.parse::<ProbabilityScheme>().unwrap();
            assert_eq!(body["scheme"], expected.as_str());
        }
    }

    #[tokio::test]
    async fn non_complementary_probabilities_are_422() {
        let csv = "\
game_id,play_id,home_team,away_team,posteam,defteam,wp,def_wp,home_wp,away_wp,wpa
2024_01_KC_BAL,1,KC,BAL,KC,BAL,0.3,0.2,0.3,0.2,0.0
";
        let (status, body) = get_json(app_with(csv), "/api/games/2024_01_KC_BAL/timeline").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.as_str().unwrap().contains("do not sum to 1"));
    }

    #[tokio::test]
    async fn unknown_game_is_404() {
        let (status, body) = get_json(app_with(SAMPLE), "/api/games/NOPE/timeline").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.as_str().unwrap().contains("NOPE"));
    }

    #[tokio::test]
    async fn unknown_scheme_is_400() {
        let (status, _) = get_json(
            app_with(SAMPLE),
            "/api/games/2024_01_KC_BAL/timeline?scheme=score",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_columns_are_422() {
        let csv = "game_id,play_id,posteam,defteam,wp,def_wp,wpa\n2024_01_KC_BAL,1,KC,BAL,0.6,0.4,0.0\n";
        let (status, body) = get_json(app_with(csv), "/api/games/2024_01_KC_BAL/timeline").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.as_str().unwrap().contains("home_wp"));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_for(&TimelineError::NotFound { game_id: "x".into() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&TimelineError::MissingProbability { game_id: "x".into() }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&TimelineError::NonComplementary {
                game_id: "x".into(),
                play_id: 1.0,
                first: 0.3,
                second: 0.2
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
