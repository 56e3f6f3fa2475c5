// Scoring categories and the stat-name dictionary that recognizes them.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A scored (or informational) league statistic.
///
/// Serialized as its short code ("R", "ERA", ...), which is also how it
/// appears as a key in impact maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    R,
    HR,
    RBI,
    SB,
    AVG,
    W,
    SV,
    K,
    ERA,
    WHIP,
    IP,
}

impl Category {
    /// Every category, hitting first, in report order.
    pub const ALL: [Category; 11] = [
        Category::R,
        Category::HR,
        Category::RBI,
        Category::SB,
        Category::AVG,
        Category::W,
        Category::SV,
        Category::K,
        Category::ERA,
        Category::WHIP,
        Category::IP,
    ];

    /// Parse a category code. Case-insensitive; "SO" is accepted for K.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "R" => Some(Category::R),
            "HR" => Some(Category::HR),
            "RBI" => Some(Category::RBI),
            "SB" => Some(Category::SB),
            "AVG" => Some(Category::AVG),
            "W" => Some(Category::W),
            "SV" => Some(Category::SV),
            "K" | "SO" => Some(Category::K),
            "ERA" => Some(Category::ERA),
            "WHIP" => Some(Category::WHIP),
            "IP" => Some(Category::IP),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Category::R => "R",
            Category::HR => "HR",
            Category::RBI => "RBI",
            Category::SB => "SB",
            Category::AVG => "AVG",
            Category::W => "W",
            Category::SV => "SV",
            Category::K => "K",
            Category::ERA => "ERA",
            Category::WHIP => "WHIP",
            Category::IP => "IP",
        }
    }

    /// Ratio categories where a smaller total wins.
    pub fn is_lower_better(&self) -> bool {
        matches!(self, Category::ERA | Category::WHIP)
    }

    /// Tracked for context only; never classified as push/protect.
    pub fn is_informational(&self) -> bool {
        matches!(self, Category::IP)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Canonical stat names
// ---------------------------------------------------------------------------

/// What a league stat name translates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalStat {
    Category(Category),
    /// "H/AB" style pair, only used to derive batting average.
    HitsAtBats,
}

/// Translate a league stat name (as found in the stat-id map) into a
/// canonical stat. Unknown names return `None` and are ignored by callers.
pub fn canonical_stat(name: &str) -> Option<CanonicalStat> {
    let stat = match name.trim() {
        "Runs" => CanonicalStat::Category(Category::R),
        "Home Runs" => CanonicalStat::Category(Category::HR),
        "Runs Batted In" => CanonicalStat::Category(Category::RBI),
        "Stolen Bases" => CanonicalStat::Category(Category::SB),
        "Batting Average" => CanonicalStat::Category(Category::AVG),
        "Hits / At Bats" => CanonicalStat::HitsAtBats,
        "Innings Pitched" => CanonicalStat::Category(Category::IP),
        "Wins" => CanonicalStat::Category(Category::W),
        "Saves" => CanonicalStat::Category(Category::SV),
        "Strikeouts" => CanonicalStat::Category(Category::K),
        "Earned Run Average" => CanonicalStat::Category(Category::ERA),
        "(Walks + Hits)/ Innings Pitched" => CanonicalStat::Category(Category::WHIP),
        _ => return None,
    };
    Some(stat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_from_code() {
        for cat in Category::ALL {
            assert_eq!(Category::from_code(cat.code()), Some(cat));
        }
        assert_eq!(Category::from_code("so"), Some(Category::K));
        assert_eq!(Category::from_code("HD"), None);
    }

    #[test]
    fn only_ratios_are_lower_better() {
        let lower: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| c.is_lower_better())
            .collect();
        assert_eq!(lower, vec![Category::ERA, Category::WHIP]);
        assert!(Category::IP.is_informational());
        assert!(!Category::K.is_informational());
    }

    #[test]
    fn canonical_names_cover_league_stats() {
        assert_eq!(
            canonical_stat("Earned Run Average"),
            Some(CanonicalStat::Category(Category::ERA))
        );
        assert_eq!(
            canonical_stat("(Walks + Hits)/ Innings Pitched"),
            Some(CanonicalStat::Category(Category::WHIP))
        );
        assert_eq!(canonical_stat("Hits / At Bats"), Some(CanonicalStat::HitsAtBats));
        assert_eq!(canonical_stat("Holds"), None);
    }

    #[test]
    fn category_serializes_as_code() {
        let json = serde_json::to_string(&Category::WHIP).unwrap();
        assert_eq!(json, "\"WHIP\"");
    }
}
