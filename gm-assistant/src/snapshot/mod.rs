// Weekly snapshot: the normalized roster + matchup record every analyzer
// reads from.

pub mod build;
pub mod store;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roster::PositionCounts;
use crate::stats::StatMap;

pub const SNAPSHOT_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid snapshot data: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_key: String,
    pub name: String,
    #[serde(default)]
    pub eligible_positions: Vec<String>,
    #[serde(default)]
    pub selected_position: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub team_abbr: Option<String>,
}

impl PlayerSnapshot {
    pub fn is_eligible_at(&self, position: &str) -> bool {
        self.eligible_positions.iter().any(|p| p == position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub week: u32,
    pub team_key: String,
    #[serde(default)]
    pub players: Vec<PlayerSnapshot>,
}

impl RosterSnapshot {
    pub fn position_counts(&self) -> PositionCounts {
        PositionCounts::from_players(
            self.players
                .iter()
                .map(|p| (p.name.as_str(), p.eligible_positions.as_slice())),
        )
    }
}

/// One side of a matchup: category code -> weekly total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTotals {
    pub team_key: String,
    pub team_name: String,
    #[serde(default)]
    pub totals: BTreeMap<String, f64>,
}

impl TeamTotals {
    /// Total for `category`, zero when the category is absent.
    pub fn total(&self, category: &str) -> f64 {
        self.totals.get(category).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupSnapshot {
    pub week: u32,
    pub my_team: TeamTotals,
    pub opp_team: TeamTotals,
}

/// Aggregate root: roster + matchup + stat map + provenance for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub snapshot_version: String,
    pub league_key: String,
    pub week: u32,
    #[serde(default = "Utc::now")]
    pub pulled_at: DateTime<Utc>,
    pub matchup: MatchupSnapshot,
    pub roster: RosterSnapshot,
    #[serde(default)]
    pub stat_map: StatMap,
    #[serde(default)]
    pub raw_refs: BTreeMap<String, String>,
}

fn default_version() -> String {
    SNAPSHOT_VERSION.to_string()
}

impl Snapshot {
    /// The user's team key (taken from the roster side of the snapshot).
    pub fn team_key(&self) -> &str {
        &self.roster.team_key
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read and deserialize a JSON file, mapping a missing file to
/// [`SnapshotError::NotFound`].
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SnapshotError> {
    if !path.exists() {
        return Err(SnapshotError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn missing_team_total_reads_as_zero() {
        let t = team("t1", "One", &[("HR", 4.0)]);
        assert_eq!(t.total("HR"), 4.0);
        assert_eq!(t.total("SB"), 0.0);
    }

    #[test]
    fn snapshot_json_defaults_optional_fields() {
        let json = r#"{
            "league_key": "469.l.1",
            "week": 2,
            "matchup": {
                "week": 2,
                "my_team": {"team_key": "a", "team_name": "A"},
                "opp_team": {"team_key": "b", "team_name": "B", "totals": {"HR": 3.0}}
            },
            "roster": {"week": 2, "team_key": "a"}
        }"#;
        let snap: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.snapshot_version, "1.0");
        assert!(snap.roster.players.is_empty());
        assert!(snap.stat_map.is_empty());
        assert_eq!(snap.matchup.opp_team.total("HR"), 3.0);
        assert_eq!(snap.team_key(), "a");
    }

    #[test]
    fn position_counts_come_from_roster_eligibility() {
        let snap = roster_snapshot(vec![
            player("p1", "One", "1B,OF", None),
            player("p2", "Two", "OF", Some("DTD")),
        ]);
        let counts = snap.roster.position_counts();
        assert_eq!(counts.get("OF"), 2);
        assert_eq!(counts.get("1B"), 1);
        assert!(snap.roster.players[0].is_eligible_at("1B"));
    }

    #[test]
    fn read_json_reports_missing_path() {
        let path = std::env::temp_dir().join("gm_snapshot_missing_file.json");
        let _ = std::fs::remove_file(&path);
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        match err {
            SnapshotError::NotFound { path: p } => assert_eq!(p, path),
            other => panic!("expected NotFound, got: {other}"),
        }
    }
}
