/// Play-by-play columns the timeline extractor knows how to read.
///
/// nflverse files carry a few hundred columns; only these are kept in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    GameId,
    PlayId,
    Wpa,
    /// Possessing team
    PosTeam,
    /// Defending team
    DefTeam,
    /// Win probability of the possessing team
    Wp,
    /// Win probability of the defending team
    DefWp,
    HomeTeam,
    AwayTeam,
    HomeWp,
    AwayWp,
}

/// Number of tracked columns.
pub const COLUMN_COUNT: usize = 11;

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::GameId,
        Column::PlayId,
        Column::Wpa,
        Column::PosTeam,
        Column::DefTeam,
        Column::Wp,
        Column::DefWp,
        Column::HomeTeam,
        Column::AwayTeam,
        Column::HomeWp,
        Column::AwayWp,
    ];

    /// Header name as written by nflverse.
    pub fn name(self) -> &'static str {
        match self {
            Column::GameId => "game_id",
            Column::PlayId => "play_id",
            Column::Wpa => "wpa",
            Column::PosTeam => "posteam",
            Column::DefTeam => "defteam",
            Column::Wp => "wp",
            Column::DefWp => "def_wp",
            Column::HomeTeam => "home_team",
            Column::AwayTeam => "away_team",
            Column::HomeWp => "home_wp",
            Column::AwayWp => "away_wp",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.name() == name)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// One play, projected onto the tracked columns.
///
/// Empty and `NA` cells are stored as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayRow {
    cells: [Option<String>; COLUMN_COUNT],
}

impl PlayRow {
    pub fn get(&self, column: Column) -> Option<&str> {
        self.cells[column.index()].as_deref()
    }

    pub(crate) fn set(&mut self, column: Column, raw: &str) {
        self.cells[column.index()] = normalize_cell(raw).map(str::to_string);
    }
}

fn normalize_cell(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "NA" {
        None
    } else {
        Some(trimmed)
    }
}
