use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub mod models;
pub use models::{Column, PlayRow, COLUMN_COUNT};

/// Read-only, in-memory play-by-play table for one season.
///
/// Only the tracked [`Column`]s are retained. Which of them the source file
/// actually carried is recorded so the extractor can report schema errors.
#[derive(Debug, Clone, Default)]
pub struct PlayTable {
    present: [bool; COLUMN_COUNT],
    rows: Vec<PlayRow>,
}

impl PlayTable {
    /// Parse a headered CSV stream.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        // header position -> tracked column
        let mapping: Vec<(usize, Column)> = rdr
            .headers()
            .context("Failed to read play-by-play header row")?
            .iter()
            .enumerate()
            .filter_map(|(pos, name)| Column::from_name(name.trim()).map(|c| (pos, c)))
            .collect();

        let mut present = [false; COLUMN_COUNT];
        for (_, column) in &mapping {
            present[column.index()] = true;
        }

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            // +2: one for the header, one for 1-based line numbers
            let record = record.with_context(|| format!("Malformed CSV record on line {}", line + 2))?;
            let mut row = PlayRow::default();
            for (pos, column) in &mapping {
                if let Some(raw) = record.get(*pos) {
                    row.set(*column, raw);
                }
            }
            rows.push(row);
        }

        debug!(
            "Parsed {} plays ({} of {} tracked columns present)",
            rows.len(),
            present.iter().filter(|p| **p).count(),
            COLUMN_COUNT
        );
        Ok(PlayTable { present, rows })
    }

    /// Parse a CSV file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open play-by-play file: {}", path.display()))?;
        Self::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("Failed to parse play-by-play file: {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.present[column.index()]
    }

    pub fn rows(&self) -> impl Iterator<Item = &PlayRow> {
        self.rows.iter()
    }

    /// Distinct game identifiers in order of first appearance.
    pub fn game_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter_map(|row| row.get(Column::GameId))
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
play_id,game_id,home_team,away_team,posteam,defteam,wp,def_wp,home_wp,away_wp,wpa,epa
1,2024_01_BAL_KC,KC,BAL,,,NA,NA,0.55,0.45,NA,0.1
40,2024_01_BAL_KC,KC,BAL,BAL,KC,0.46,0.54,0.54,0.46,-0.01,0.3
55,2024_01_GB_PHI,PHI,GB,GB,PHI,0.5,0.5,0.5,0.5,0.0,0.0
61,2024_01_BAL_KC,KC,BAL,KC,BAL,0.57,0.43,0.57,0.43,0.03,1.2
";

    #[test]
    fn parses_tracked_columns_only() {
        let table = PlayTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 4);
        for column in Column::ALL {
            assert!(table.has_column(column), "{} should be present", column.name());
        }
        let first = table.rows().next().unwrap();
        assert_eq!(first.get(Column::PlayId), Some("1"));
        assert_eq!(first.get(Column::PosTeam), None);
        assert_eq!(first.get(Column::Wp), None);
        assert_eq!(first.get(Column::HomeWp), Some("0.55"));
    }

    #[test]
    fn records_absent_columns() {
        let csv = "game_id,play_id,posteam,defteam,wp,def_wp,wpa\n2024_01_X_Y,1,X,Y,0.5,0.5,0.0\n";
        let table = PlayTable::from_reader(csv.as_bytes()).unwrap();
        assert!(table.has_column(Column::Wp));
        assert!(!table.has_column(Column::HomeWp));
        assert!(!table.has_column(Column::HomeTeam));
    }

    #[test]
    fn game_ids_are_distinct_in_first_seen_order() {
        let table = PlayTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.game_ids(), vec!["2024_01_BAL_KC", "2024_01_GB_PHI"]);
    }

    #[test]
    fn header_only_file_is_empty() {
        let table = PlayTable::from_reader("game_id,play_id\n".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert!(table.game_ids().is_empty());
    }

    #[test]
    fn ragged_record_is_an_error() {
        let csv = "game_id,play_id\n2024_01_X_Y,1\n2024_01_X_Y\n";
        let err = PlayTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"), "got: {:#}", err);
    }

    #[test]
    fn from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let table = PlayTable::from_path(file.path()).unwrap();
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn from_path_missing_file_names_path() {
        let err = PlayTable::from_path(Path::new("/nonexistent/pbp.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pbp.csv"));
    }
}
