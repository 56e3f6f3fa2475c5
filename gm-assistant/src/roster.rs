// Roster vocabulary: position codes, eligibility counting, and health
// status flags shared by every analyzer.

use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Position codes
// ---------------------------------------------------------------------------

pub const STARTING_PITCHER: &str = "SP";
pub const RELIEF_PITCHER: &str = "RP";
/// Generic pitcher eligibility (neither SP nor RP specifically).
pub const PITCHER: &str = "P";
pub const FIRST_BASE: &str = "1B";
pub const OUTFIELD: &str = "OF";

/// Split a comma-joined position string ("1B,OF") into trimmed codes,
/// dropping empty segments.
pub fn split_positions(pos: &str) -> Vec<String> {
    pos.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether the code is one of the pitching codes (SP, RP, P).
pub fn is_pitching_code(code: &str) -> bool {
    matches!(code, STARTING_PITCHER | RELIEF_PITCHER | PITCHER)
}

/// Eligible anywhere on the mound.
pub fn is_pitcher<S: AsRef<str>>(positions: &[S]) -> bool {
    positions.iter().any(|p| is_pitching_code(p.as_ref()))
}

/// RP-eligible, or generically P-eligible without SP eligibility.
pub fn is_reliever<S: AsRef<str>>(positions: &[S]) -> bool {
    let has = |code: &str| positions.iter().any(|p| p.as_ref() == code);
    has(RELIEF_PITCHER) || (has(PITCHER) && !has(STARTING_PITCHER))
}

// ---------------------------------------------------------------------------
// Position counts
// ---------------------------------------------------------------------------

/// Number of roster players eligible at each position. A player eligible at
/// several positions counts toward each of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionCounts {
    counts: BTreeMap<String, usize>,
    names: BTreeMap<String, Vec<String>>,
}

impl PositionCounts {
    /// Count eligibility over `(player name, eligible positions)` pairs.
    pub fn from_players<'a, I>(players: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let mut out = Self::default();
        for (name, positions) in players {
            for pos in positions {
                *out.counts.entry(pos.clone()).or_insert(0) += 1;
                out.names
                    .entry(pos.clone())
                    .or_default()
                    .push(name.to_string());
            }
        }
        out
    }

    pub fn get(&self, position: &str) -> usize {
        self.counts.get(position).copied().unwrap_or(0)
    }

    /// Names of eligible players at `position`, in roster order.
    pub fn players_at(&self, position: &str) -> &[String] {
        self.names.get(position).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Counts ordered by count descending, then position code ascending.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .counts
            .iter()
            .map(|(pos, &n)| (pos.as_str(), n))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

// ---------------------------------------------------------------------------
// Health status
// ---------------------------------------------------------------------------

/// Status flags that make a player unavailable or doubtful.
pub const BAD_STATUSES: &[&str] = &["DTD", "IL", "IL10", "IL15", "IL60", "NA", "SUSP"];

pub const DAY_TO_DAY: &str = "DTD";

/// Trim and uppercase a raw status flag.
pub fn normalize_status(status: &str) -> String {
    status.trim().to_uppercase()
}

pub fn is_bad_status(status: &str) -> bool {
    BAD_STATUSES.contains(&normalize_status(status).as_str())
}

pub fn is_day_to_day(status: Option<&str>) -> bool {
    status.is_some_and(|s| normalize_status(s) == DAY_TO_DAY)
}
