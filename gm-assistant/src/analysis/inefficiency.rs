// Roster inefficiency: availability risk, positional redundancy, and
// pitching balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::roster::{self, is_bad_status, normalize_status, PositionCounts};
use crate::snapshot::Snapshot;

/// Redundancy is flagged at this many eligible players.
pub const REDUNDANCY_THRESHOLD: usize = 3;
/// SP-eligible count that starts crowding the roster.
pub const SP_DENSITY_THRESHOLD: usize = 7;
/// RP-eligible count at or below which saves are exposed.
pub const RP_EXPOSURE_MAX: usize = 1;
/// Names listed in a redundancy note before truncating.
const NOTE_NAME_LIMIT: usize = 6;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InefficiencyKind {
    AvailabilityRisk,
    PositionalRedundancy,
    PitchingDensity,
    SaveExposure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Med,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inefficiency {
    pub kind: InefficiencyKind,
    pub severity: Severity,
    #[serde(default)]
    pub player_key: Option<String>,
    #[serde(default)]
    pub player_name: Option<String>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InefficiencyReport {
    pub week: u32,
    pub team_key: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<Inefficiency>,
}

impl InefficiencyReport {
    pub fn of_kind(&self, kind: InefficiencyKind) -> impl Iterator<Item = &Inefficiency> {
        self.items.iter().filter(move |i| i.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Scan the roster. Items come out as availability flags (roster order),
/// then redundancies (count descending, position ascending), then pitching
/// density and save exposure.
pub fn roster_inefficiency_report(snapshot: &Snapshot) -> InefficiencyReport {
    let roster = &snapshot.roster;
    let mut items = Vec::new();

    for p in &roster.players {
        let Some(status) = p.status.as_deref() else {
            continue;
        };
        if !is_bad_status(status) {
            continue;
        }
        let status = normalize_status(status);
        let severity = if status.starts_with("IL") {
            Severity::High
        } else {
            Severity::Med
        };
        items.push(Inefficiency {
            kind: InefficiencyKind::AvailabilityRisk,
            severity,
            player_key: Some(p.player_key.clone()),
            player_name: Some(p.name.clone()),
            note: format!(
                "Status={status}. Consider bench/IL slot usage and contingency planning."
            ),
        });
    }

    let counts = roster.position_counts();
    items.extend(redundancy_items(&counts));
    items.extend(pitching_items(&counts));

    InefficiencyReport {
        week: snapshot.week,
        team_key: roster.team_key.clone(),
        generated_at: Utc::now(),
        items,
    }
}

fn redundancy_items(counts: &PositionCounts) -> Vec<Inefficiency> {
    counts
        .ranked()
        .into_iter()
        .filter(|(pos, n)| !roster::is_pitching_code(pos) && *n >= REDUNDANCY_THRESHOLD)
        .map(|(pos, n)| {
            let names = counts.players_at(pos);
            let listed = names
                .iter()
                .take(NOTE_NAME_LIMIT)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            let more = if names.len() > NOTE_NAME_LIMIT { "..." } else { "" };
            Inefficiency {
                kind: InefficiencyKind::PositionalRedundancy,
                severity: if n == REDUNDANCY_THRESHOLD {
                    Severity::Med
                } else {
                    Severity::High
                },
                player_key: None,
                player_name: None,
                note: format!("You have {n} players eligible at {pos}: {listed}{more}"),
            }
        })
        .collect()
}

fn pitching_items(counts: &PositionCounts) -> Vec<Inefficiency> {
    let mut items = Vec::new();
    let sp = counts.get(roster::STARTING_PITCHER);
    let rp = counts.get(roster::RELIEF_PITCHER);

    if sp >= SP_DENSITY_THRESHOLD {
        items.push(Inefficiency {
            kind: InefficiencyKind::PitchingDensity,
            severity: if sp == SP_DENSITY_THRESHOLD {
                Severity::Med
            } else {
                Severity::High
            },
            player_key: None,
            player_name: None,
            note: format!(
                "High SP density ({sp} SP-eligible). This can crowd bats on a weekly basis; \
                 good for streaming Ks/W, risky for ERA/WHIP if unmanaged."
            ),
        });
    }
    if rp <= RP_EXPOSURE_MAX {
        items.push(Inefficiency {
            kind: InefficiencyKind::SaveExposure,
            severity: Severity::Med,
            player_key: None,
            player_name: None,
            note: format!(
                "Low RP depth ({rp} RP-eligible). You may struggle to compete in SV \
                 without active management."
            ),
        });
    }
    items
}
