use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::plays::Column;

/// Which pair of probability columns a timeline is read from.
///
/// nflverse publishes the same win probability twice: relative to the
/// possessing/defending teams and relative to the home/away teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ProbabilityScheme {
    /// `posteam`/`defteam` with `wp`/`def_wp`
    #[default]
    #[serde(rename = "possession")]
    PossessionDefense,
    /// `home_team`/`away_team` with `home_wp`/`away_wp`
    #[serde(rename = "home-away")]
    HomeAway,
}

/// Accepts every spelling [`FromStr`] does, so query strings, config and
/// JSON agree on one set of names.
impl<'de> Deserialize<'de> for ProbabilityScheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown probability scheme '{0}' (expected 'possession' or 'home-away')")]
pub struct UnknownScheme(pub String);

impl ProbabilityScheme {
    /// Team columns, first-listed team first.
    pub fn team_columns(self) -> (Column, Column) {
        match self {
            ProbabilityScheme::PossessionDefense => (Column::PosTeam, Column::DefTeam),
            ProbabilityScheme::HomeAway => (Column::HomeTeam, Column::AwayTeam),
        }
    }

    /// Probability columns, aligned with [`Self::team_columns`].
    pub fn probability_columns(self) -> (Column, Column) {
        match self {
            ProbabilityScheme::PossessionDefense => (Column::Wp, Column::DefWp),
            ProbabilityScheme::HomeAway => (Column::HomeWp, Column::AwayWp),
        }
    }

    /// Every column a table must carry to be read under this scheme.
    pub fn required_columns(self) -> [Column; 7] {
        let (first_team, second_team) = self.team_columns();
        let (first_wp, second_wp) = self.probability_columns();
        [
            Column::GameId,
            Column::PlayId,
            first_team,
            second_team,
            first_wp,
            second_wp,
            Column::Wpa,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProbabilityScheme::PossessionDefense => "possession",
            ProbabilityScheme::HomeAway => "home-away",
        }
    }
}

impl fmt::Display for ProbabilityScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbabilityScheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "possession" | "possession-defense" => Ok(ProbabilityScheme::PossessionDefense),
            "home-away" | "home_away" => Ok(ProbabilityScheme::HomeAway),
            _ => Err(UnknownScheme(s.to_string())),
        }
    }
}
