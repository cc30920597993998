//! Game timeline extraction.
//!
//! Given the season's play table and one `game_id`, produce the plays of that
//! game in chronological (`play_id`) order together with the team currently
//! favored to win. Win probabilities are taken as supplied by nflverse; nothing
//! here models them.

use serde::Serialize;
use thiserror::Error;

use super::scheme::ProbabilityScheme;
use crate::plays::{Column, PlayRow, PlayTable};

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("game '{game_id}' not found in play-by-play data")]
    NotFound { game_id: String },

    #[error("play-by-play data is missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<&'static str> },

    #[error("game '{game_id}': invalid {column} value '{value}'")]
    InvalidValue {
        game_id: String,
        column: &'static str,
        value: String,
    },

    #[error("game '{game_id}' has no play with both teams and both win probabilities")]
    MissingProbability { game_id: String },

    #[error("game '{game_id}': win probabilities {first} and {second} on play {play_id} do not sum to 1")]
    NonComplementary {
        game_id: String,
        play_id: f64,
        first: f64,
        second: f64,
    },
}

/// Allowed drift of `first_wp + second_wp` from 1 (CSV rounding).
const COMPLEMENT_TOLERANCE: f64 = 1e-6;

/// One play on the timeline, read through a [`ProbabilityScheme`].
///
/// "First" and "second" follow the scheme's column order: possessing/defending
/// or home/away.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub play_id: f64,
    pub first_team: Option<String>,
    pub second_team: Option<String>,
    pub first_wp: Option<f64>,
    pub second_wp: Option<f64>,
    pub wpa: Option<f64>,
}

/// The favored team at the latest play that carries a full probability pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoredTeam {
    pub team: String,
    /// Larger of the two probabilities; at least 0.5 for complementary pairs.
    pub probability: f64,
    /// Play the decision was read from.
    pub play_id: f64,
}

/// A game's plays sorted ascending by `play_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameTimeline {
    game_id: String,
    scheme: ProbabilityScheme,
    points: Vec<TimelinePoint>,
}

impl GameTimeline {
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn scheme(&self) -> ProbabilityScheme {
        self.scheme
    }

    pub fn points(&self) -> &[TimelinePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first(&self) -> Option<&TimelinePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&TimelinePoint> {
        self.points.last()
    }
}

/// Everything a renderer needs for one game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineReport {
    #[serde(flatten)]
    pub timeline: GameTimeline,
    pub favored: FavoredTeam,
}

/// Extract the timeline of `game_id` and decide the favored team.
///
/// Schema problems are reported before the game lookup, so a malformed table
/// is never mistaken for an unknown game. Plays with equal `play_id` keep
/// their table order. On an exact tie the first-listed team is favored.
pub fn extract_timeline(
    table: &PlayTable,
    game_id: &str,
    scheme: ProbabilityScheme,
) -> Result<TimelineReport, TimelineError> {
    let missing: Vec<&'static str> = scheme
        .required_columns()
        .into_iter()
        .filter(|c| !table.has_column(*c))
        .map(Column::name)
        .collect();
    if !missing.is_empty() {
        return Err(TimelineError::Schema { missing });
    }

    let mut points = table
        .rows()
        .filter(|row| row.get(Column::GameId) == Some(game_id))
        .map(|row| read_point(row, game_id, scheme))
        .collect::<Result<Vec<_>, _>>()?;

    if points.is_empty() {
        return Err(TimelineError::NotFound {
            game_id: game_id.to_string(),
        });
    }

    // sort_by is stable
    points.sort_by(|a, b| a.play_id.total_cmp(&b.play_id));

    let decisive = points
        .iter()
        .rev()
        .find(|p| p.has_full_pair())
        .ok_or_else(|| TimelineError::MissingProbability {
            game_id: game_id.to_string(),
        })?;
    let favored = favored_at(decisive, game_id)?;

    Ok(TimelineReport {
        timeline: GameTimeline {
            game_id: game_id.to_string(),
            scheme,
            points,
        },
        favored,
    })
}

fn read_point(
    row: &PlayRow,
    game_id: &str,
    scheme: ProbabilityScheme,
) -> Result<TimelinePoint, TimelineError> {
    let (first_team, second_team) = scheme.team_columns();
    let (first_wp, second_wp) = scheme.probability_columns();

    let play_id = read_number(row, Column::PlayId, game_id)?.ok_or_else(|| {
        TimelineError::InvalidValue {
            game_id: game_id.to_string(),
            column: Column::PlayId.name(),
            value: String::new(),
        }
    })?;

    Ok(TimelinePoint {
        play_id,
        first_team: row.get(first_team).map(str::to_string),
        second_team: row.get(second_team).map(str::to_string),
        first_wp: read_probability(row, first_wp, game_id)?,
        second_wp: read_probability(row, second_wp, game_id)?,
        wpa: read_number(row, Column::Wpa, game_id)?,
    })
}

fn read_number(row: &PlayRow, column: Column, game_id: &str) -> Result<Option<f64>, TimelineError> {
    let Some(raw) = row.get(column) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(TimelineError::InvalidValue {
            game_id: game_id.to_string(),
            column: column.name(),
            value: raw.to_string(),
        }),
    }
}

fn read_probability(
    row: &PlayRow,
    column: Column,
    game_id: &str,
) -> Result<Option<f64>, TimelineError> {
    match read_number(row, column, game_id)? {
        Some(p) if !(0.0..=1.0).contains(&p) => Err(TimelineError::InvalidValue {
            game_id: game_id.to_string(),
            column: column.name(),
            value: p.to_string(),
        }),
        p => Ok(p),
    }
}

impl TimelinePoint {
    fn has_full_pair(&self) -> bool {
        self.first_team.is_some()
            && self.second_team.is_some()
            && self.first_wp.is_some()
            && self.second_wp.is_some()
    }
}

/// The pair must be complementary, otherwise "favored" has no meaning.
fn favored_at(point: &TimelinePoint, game_id: &str) -> Result<FavoredTeam, TimelineError> {
    let (Some(first_team), Some(second_team), Some(first_wp), Some(second_wp)) = (
        point.first_team.as_ref(),
        point.second_team.as_ref(),
        point.first_wp,
        point.second_wp,
    ) else {
        return Err(TimelineError::MissingProbability {
            game_id: game_id.to_string(),
        });
    };

    if (first_wp + second_wp - 1.0).abs() > COMPLEMENT_TOLERANCE {
        return Err(TimelineError::NonComplementary {
            game_id: game_id.to_string(),
            play_id: point.play_id,
            first: first_wp,
            second: second_wp,
        });
    }

    let (team, probability) = if second_wp > first_wp {
        (second_team, second_wp)
    } else {
        (first_team, first_wp)
    };
    Ok(FavoredTeam {
        team: team.clone(),
        probability,
        play_id: point.play_id,
    })
}
