// Snapshot builder: merges a pulled roster file and a pulled scoreboard file
// into one normalized `Snapshot`.
//
// Roster file:     {team_key, players: [{player_key, full_name, team, pos, status}]}
// Scoreboard file: {league_key, matchup: {teams: {<key>: {team_key, name, totals}}}}

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{
    read_json, MatchupSnapshot, PlayerSnapshot, RosterSnapshot, Snapshot, SnapshotError,
    TeamTotals, SNAPSHOT_VERSION,
};
use crate::roster::split_positions;
use crate::stats::{parse_num, StatMap};

/// Inputs for [`build_snapshot_from_files`].
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub league_key: &'a str,
    pub week: u32,
    pub my_team_key: &'a str,
    pub roster_path: &'a Path,
    pub scoreboard_path: &'a Path,
    /// Optional stat-id map to embed in the snapshot.
    pub stat_map_path: Option<&'a Path>,
}

/// Build a snapshot from the files named in `req`. Nothing is written; use
/// the artifact store to persist the result.
pub fn build_snapshot_from_files(req: &BuildRequest<'_>) -> Result<Snapshot, SnapshotError> {
    let roster_raw: Value = read_json(req.roster_path)?;
    let scoreboard_raw: Value = read_json(req.scoreboard_path)?;

    let roster = parse_roster(req.week, &roster_raw);
    let matchup = parse_matchup(req.week, req.my_team_key, &scoreboard_raw)?;

    let league_key = match scoreboard_raw.get("league_key").map(text) {
        Some(key) if !key.is_empty() => key,
        _ => req.league_key.to_string(),
    };

    let mut raw_refs = BTreeMap::new();
    raw_refs.insert("roster_json".to_string(), req.roster_path.display().to_string());
    raw_refs.insert(
        "scoreboard_json".to_string(),
        req.scoreboard_path.display().to_string(),
    );

    let stat_map = match req.stat_map_path {
        Some(path) => {
            raw_refs.insert("stat_map_json".to_string(), path.display().to_string());
            read_json::<StatMap>(path)?
        }
        None => StatMap::new(),
    };

    info!(
        "Built week {} snapshot: {} roster players, {} vs {}",
        req.week,
        roster.players.len(),
        matchup.my_team.team_name,
        matchup.opp_team.team_name
    );

    Ok(Snapshot {
        snapshot_version: SNAPSHOT_VERSION.to_string(),
        league_key,
        week: req.week,
        pulled_at: Utc::now(),
        matchup,
        roster,
        stat_map,
        raw_refs,
    })
}

/// Normalize a roster payload. Missing fields become empty; the first
/// eligible position is taken as the selected one.
pub fn parse_roster(week: u32, roster_raw: &Value) -> RosterSnapshot {
    let team_key = roster_raw.get("team_key").map(text).unwrap_or_default();

    let players = roster_raw
        .get("players")
        .and_then(Value::as_array)
        .map(|players| players.iter().map(parse_player).collect())
        .unwrap_or_default();

    RosterSnapshot {
        week,
        team_key,
        players,
    }
}

fn parse_player(raw: &Value) -> PlayerSnapshot {
    let field = |name: &str| raw.get(name).map(text).unwrap_or_default();

    let eligible_positions = split_positions(&field("pos"));
    PlayerSnapshot {
        player_key: field("player_key"),
        name: field("full_name"),
        selected_position: eligible_positions.first().cloned(),
        eligible_positions,
        status: non_empty(field("status")),
        team_abbr: non_empty(field("team")),
    }
}

/// Resolve the two sides of the matchup.
///
/// `my_team_key` may be either a key of `matchup.teams` or the inner
/// `team_key` of one of its entries. Fewer than two teams, or a key that
/// resolves neither way, is a validation error.
pub fn parse_matchup(
    week: u32,
    my_team_key: &str,
    scoreboard_raw: &Value,
) -> Result<MatchupSnapshot, SnapshotError> {
    let teams = scoreboard_raw
        .get("matchup")
        .and_then(|m| m.get("teams"))
        .and_then(Value::as_object)
        .filter(|teams| teams.len() >= 2)
        .ok_or_else(|| {
            SnapshotError::Validation(
                "scoreboard file missing matchup.teams dict with 2 teams".into(),
            )
        })?;

    let my_key = resolve_team_key(teams, my_team_key).ok_or_else(|| {
        SnapshotError::Validation(format!("my_team_key {my_team_key} not found in matchup.teams"))
    })?;

    let (opp_key, opp_raw) = teams
        .iter()
        .find(|(k, _)| k.as_str() != my_key)
        .ok_or_else(|| SnapshotError::Validation("matchup has no opponent team".into()))?;
    debug!("Resolved matchup: mine={my_key}, opponent={opp_key}");

    Ok(MatchupSnapshot {
        week,
        my_team: parse_team(&teams[my_key]),
        opp_team: parse_team(opp_raw),
    })
}

fn resolve_team_key<'a>(teams: &'a Map<String, Value>, wanted: &str) -> Option<&'a str> {
    if let Some(key) = teams.keys().find(|k| k.as_str() == wanted) {
        return Some(key.as_str());
    }
    teams
        .iter()
        .find(|(_, team)| team.get("team_key").map(text).as_deref() == Some(wanted))
        .map(|(key, _)| key.as_str())
}

fn parse_team(raw: &Value) -> TeamTotals {
    let totals = raw
        .get("totals")
        .and_then(Value::as_object)
        .map(|totals| {
            totals
                .iter()
                .map(|(cat, val)| (cat.clone(), parse_num(val)))
                .collect()
        })
        .unwrap_or_default();

    TeamTotals {
        team_key: raw.get("team_key").map(text).unwrap_or_default(),
        team_name: raw.get("name").map(text).unwrap_or_default(),
        totals,
    }
}

/// Render a scalar JSON value as text; null becomes empty.
fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
