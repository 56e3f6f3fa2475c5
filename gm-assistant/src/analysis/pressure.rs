// Category pressure: where the user's team stands against this week's
// opponent in each category, and whether to push, protect, or hold.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;
use crate::stats::Category;

/// Differences inside this band are a coin flip.
pub const EVEN_BAND: f64 = 0.15;
/// Differences at or beyond this margin are actionable.
pub const DECISIVE_MARGIN: f64 = 0.75;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Competitive posture in one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Posture {
    /// Safely behind: worth chasing.
    Push,
    /// Safely ahead: defend the lead.
    Protect,
    /// Too close, or not decisive enough, to act on.
    Even,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPressure {
    pub category: String,
    pub my_value: f64,
    pub opp_value: f64,
    pub diff: f64,
    /// `None` for informational categories (IP).
    pub posture: Option<Posture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureReport {
    pub week: u32,
    pub team_key: String,
    pub generated_at: DateTime<Utc>,
    pub pressures: Vec<CategoryPressure>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a raw `my - opp` difference. For lower-is-better categories the
/// sign is flipped first, so a lower ERA reads as a lead.
pub fn posture_for(diff: f64, lower_is_better: bool) -> Posture {
    let adj = if lower_is_better { -diff } else { diff };

    if adj.abs() < EVEN_BAND {
        Posture::Even
    } else if adj >= DECISIVE_MARGIN {
        Posture::Protect
    } else if adj <= -DECISIVE_MARGIN {
        Posture::Push
    } else {
        Posture::Even
    }
}

/// Classify a category by code. Informational categories get no posture;
/// unknown codes are treated as higher-is-better.
pub fn classify(category: &str, diff: f64) -> Option<Posture> {
    match Category::from_code(category) {
        Some(cat) if cat.is_informational() => None,
        Some(cat) => Some(posture_for(diff, cat.is_lower_better())),
        None => Some(posture_for(diff, false)),
    }
}

fn note_for(category: &str) -> Option<String> {
    let cat = Category::from_code(category)?;
    if cat.is_informational() {
        Some("informational".into())
    } else if cat.is_lower_better() {
        Some("lower is better".into())
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One row per category present on either side, sorted by code. A side
/// without the category counts as 0.0.
pub fn pressure_report(snapshot: &Snapshot) -> PressureReport {
    let my = &snapshot.matchup.my_team;
    let opp = &snapshot.matchup.opp_team;

    let categories: BTreeSet<&String> = my.totals.keys().chain(opp.totals.keys()).collect();

    let pressures = categories
        .into_iter()
        .map(|cat| {
            let my_value = my.total(cat);
            let opp_value = opp.total(cat);
            let diff = my_value - opp_value;
            CategoryPressure {
                category: cat.clone(),
                my_value,
                opp_value,
                diff,
                posture: classify(cat, diff),
                note: note_for(cat),
            }
        })
        .collect();

    PressureReport {
        week: snapshot.week,
        team_key: snapshot.team_key().to_string(),
        generated_at: Utc::now(),
        pressures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fixtures::*;

    fn row<'a>(report: &'a PressureReport, category: &str) -> &'a CategoryPressure {
        report
            .pressures
            .iter()
            .find(|p| p.category == category)
            .unwrap()
    }

    fn report_for(mine: &[(&str, f64)], theirs: &[(&str, f64)]) -> PressureReport {
        let snap = snapshot_with(vec![], team("me", "Me", mine), team("opp", "Opp", theirs));
        pressure_report(&snap)
    }

    #[test]
    fn thresholds() {
        assert_eq!(posture_for(0.0, false), Posture::Even);
        assert_eq!(posture_for(0.149, false), Posture::Even);
        // Mid band folds into even.
        assert_eq!(posture_for(0.5, false), Posture::Even);
        assert_eq!(posture_for(-0.5, false), Posture::Even);
        assert_eq!(posture_for(0.75, false), Posture::Protect);
        assert_eq!(posture_for(-0.75, false), Posture::Push);
        assert_eq!(posture_for(6.0, false), Posture::Protect);
    }

    #[test]
    fn ratio_categories_invert_sign() {
        // My ERA is a full run lower: that's a lead.
        assert_eq!(classify("ERA", -1.0), Some(Posture::Protect));
        assert_eq!(classify("WHIP", 0.9), Some(Posture::Push));
        assert_eq!(classify("HR", -1.0), Some(Posture::Push));
    }

    #[test]
    fn innings_are_informational() {
        assert_eq!(classify("IP", 20.0), None);
        let report = report_for(&[("IP", 40.0)], &[("IP", 20.0)]);
        let ip = row(&report, "IP");
        assert_eq!(ip.posture, None);
        assert_eq!(ip.diff, 20.0);
        assert_eq!(ip.note.as_deref(), Some("informational"));
    }

    #[test]
    fn one_row_per_category_in_union() {
        let report = report_for(
            &[("HR", 14.0), ("ERA", 3.1), ("SB", 2.0)],
            &[("HR", 9.0), ("ERA", 4.2), ("SV", 3.0)],
        );
        let cats: Vec<&str> = report.pressures.iter().map(|p| p.category.as_str()).collect();
        assert_eq!(cats, vec!["ERA", "HR", "SB", "SV"]);

        // Missing sides default to zero.
        let sv = row(&report, "SV");
        assert_eq!(sv.my_value, 0.0);
        assert_eq!(sv.opp_value, 3.0);
        assert_eq!(sv.posture, Some(Posture::Push));

        let sb = row(&report, "SB");
        assert_eq!(sb.opp_value, 0.0);
        assert_eq!(sb.posture, Some(Posture::Protect));

        let era = row(&report, "ERA");
        assert_eq!(era.posture, Some(Posture::Protect));
        assert_eq!(era.note.as_deref(), Some("lower is better"));

        assert_eq!(report.week, 3);
        assert_eq!(report.team_key, "469.l.40206.t.6");
    }

    #[test]
    fn swapping_teams_mirrors_ratio_postures() {
        let cases = [(3.10, 4.20), (1.05, 1.95), (4.0, 3.9), (2.5, 2.5)];
        for (a, b) in cases {
            let forward = report_for(&[("ERA", a)], &[("ERA", b)]);
            let backward = report_for(&[("ERA", b)], &[("ERA", a)]);
            let f = row(&forward, "ERA");
            let r = row(&backward, "ERA");
            assert_eq!(f.diff, -r.diff);
            let mirrored = match f.posture.unwrap() {
                Posture::Protect => Posture::Push,
                Posture::Push => Posture::Protect,
                Posture::Even => Posture::Even,
            };
            assert_eq!(r.posture, Some(mirrored), "ERA {a} vs {b}");
        }
    }

    #[test]
    fn posture_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Posture::Protect).unwrap(), "\"protect\"");
        assert_eq!(serde_json::to_string(&Posture::Even).unwrap(), "\"even\"");
    }
}
