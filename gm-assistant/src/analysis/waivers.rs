// Waiver engine: derive needs, gauge the saves market, filter and score the
// pool, then pair adds with bench or drop candidates.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::inefficiency::roster_inefficiency_report;
use super::needs::{self, derive_needs, Need, RatioMode};
use super::pool::PoolCandidate;
use super::scoring::{score_candidates, ScoredCandidate};
use crate::roster::{self, is_day_to_day};
use crate::snapshot::{PlayerSnapshot, Snapshot};
use crate::stats::{parse_optional_num, CanonicalStat, Category, StatMap};

/// Baseline saves at which a reliever counts as a real saves add.
pub const SV_MEANINGFUL_THRESHOLD: f64 = 5.0;
/// Pool-filter ratio limits (stricter than the scorer's hard cutoffs).
pub const FILTER_MAX_ERA: f64 = 4.40;
pub const FILTER_MAX_WHIP: f64 = 1.35;

const TOP_ADDS: usize = 10;
const BENCH_PLAYERS: usize = 2;
const ADDS_PER_BENCH: usize = 3;
const DROP_PAIRINGS: usize = 5;
const SV_MARKET_LISTED: usize = 5;

/// Categories carried on a suggestion's impacts.
const IMPACT_CATEGORIES: [Category; 11] = [
    Category::R,
    Category::HR,
    Category::RBI,
    Category::SB,
    Category::AVG,
    Category::W,
    Category::SV,
    Category::K,
    Category::IP,
    Category::ERA,
    Category::WHIP,
];
const SV_MARKET_CATEGORIES: [Category; 6] = [
    Category::SV,
    Category::K,
    Category::W,
    Category::IP,
    Category::ERA,
    Category::WHIP,
];

const PLACEHOLDER_POOL: &str = "(pool-needed)";
const PLACEHOLDER_META: &str = "(meta)";

const SCARCE_BENCH_PREFIX: &str = "SV market is scarce (no meaningful saves adds available). \
    Don't burn moves chasing saves; prioritize K/W streaming + ratio safety. ";
const SCARCE_DROP_PREFIX: &str = "SV market is scarce (no meaningful saves adds available). \
    Recommendation assumes you won't gain much SV from waivers. ";

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SvMarketStatus {
    /// Saves are not a roster need; the market was not consulted.
    NotNeeded,
    /// Saves are needed but no relief pool was supplied.
    Unknown,
    Scarce,
    Available,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SvCandidate {
    pub player_key: String,
    pub name: String,
    pub pos: String,
    pub team: Option<String>,
    pub impacts: BTreeMap<Category, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SvMarket {
    pub status: SvMarketStatus,
    pub threshold: f64,
    /// Relievers at or above the threshold.
    pub kept: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub candidates: Vec<SvCandidate>,
}

impl SvMarket {
    fn without_pool(status: SvMarketStatus, reason: &str) -> Self {
        SvMarket {
            status,
            threshold: SV_MEANINGFUL_THRESHOLD,
            kept: 0,
            reason: Some(reason.to_string()),
            candidates: Vec::new(),
        }
    }

    pub fn is_scarce(&self) -> bool {
        self.status == SvMarketStatus::Scarce
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionAction {
    /// Bench an unavailable player and add cover; nobody is dropped.
    Bench,
    DropOrTrade,
    /// Advisory only.
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Med,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaiverSuggestion {
    pub add_player_key: String,
    pub add_name: String,
    pub drop_player_key: String,
    pub drop_name: String,
    pub action: SuggestionAction,
    pub reason: String,
    pub confidence: Confidence,
    pub category_impacts: BTreeMap<Category, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaiverReport {
    pub week: u32,
    pub team_key: String,
    pub generated_at: DateTime<Utc>,
    pub ratio_mode: RatioMode,
    /// Needs after saves-market adjustment.
    pub needs: Vec<Need>,
    pub sv_market: SvMarket,
    pub suggestions: Vec<WaiverSuggestion>,
}

// ---------------------------------------------------------------------------
// Saves market
// ---------------------------------------------------------------------------

/// Gauge whether real saves are available in the relief pool.
pub fn sv_market(sv_pool: Option<&[PoolCandidate]>, stat_map: &StatMap) -> SvMarket {
    let Some(pool) = sv_pool.filter(|p| !p.is_empty()) else {
        return SvMarket::without_pool(SvMarketStatus::Unknown, "No RP pool provided.");
    };

    let ranked = score_candidates(pool, stat_map, &[Need::Saves]);
    let meaningful: Vec<&ScoredCandidate> = ranked
        .iter()
        .filter(|c| c.impact(Category::SV) >= SV_MEANINGFUL_THRESHOLD)
        .collect();
    let scarce = meaningful.is_empty();
    let listed: Vec<&ScoredCandidate> = if scarce {
        ranked.iter().take(SV_MARKET_LISTED).collect()
    } else {
        meaningful.iter().take(SV_MARKET_LISTED).copied().collect()
    };

    SvMarket {
        status: if scarce {
            SvMarketStatus::Scarce
        } else {
            SvMarketStatus::Available
        },
        threshold: SV_MEANINGFUL_THRESHOLD,
        kept: meaningful.len(),
        reason: None,
        candidates: listed
            .into_iter()
            .map(|c| SvCandidate {
                player_key: c.player_key.clone(),
                name: c.name.clone(),
                pos: c.pos.clone(),
                team: c.team.clone(),
                impacts: SV_MARKET_CATEGORIES
                    .iter()
                    .map(|&cat| (cat, c.impact(cat)))
                    .collect(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Pool filters
// ---------------------------------------------------------------------------

/// Drop candidates eligible at any avoided position.
fn filter_avoided<'a>(pool: &'a [PoolCandidate], needs: &[Need]) -> Vec<&'a PoolCandidate> {
    let avoided = needs::avoided_positions(needs);
    pool.iter()
        .filter(|c| !avoided.iter().any(|pos| c.is_eligible_at(pos)))
        .collect()
}

/// First parseable baseline value among the ids that resolve to `category`.
fn baseline_value(candidate: &PoolCandidate, stat_map: &StatMap, category: Category) -> Option<f64> {
    candidate
        .baseline_stats_by_id
        .iter()
        .filter(|(id, _)| stat_map.canonical(id) == Some(CanonicalStat::Category(category)))
        .find_map(|(_, raw)| parse_optional_num(raw))
}

/// Under ratio protection, drop pitchers whose baseline ERA or WHIP is
/// clearly bad. Pitchers with no usable ratio data are kept.
fn filter_ratio_risk<'a>(
    pool: Vec<&'a PoolCandidate>,
    needs: &[Need],
    stat_map: &StatMap,
) -> Vec<&'a PoolCandidate> {
    if !needs::protects_ratios(needs) {
        return pool;
    }
    pool.into_iter()
        .filter(|c| {
            if !c.is_pitcher() {
                return true;
            }
            let era = baseline_value(c, stat_map, Category::ERA);
            let whip = baseline_value(c, stat_map, Category::WHIP);
            let risky = era.is_some_and(|v| v > FILTER_MAX_ERA)
                || whip.is_some_and(|v| v > FILTER_MAX_WHIP);
            if risky {
                debug!("ratio filter dropped {} ({})", c.name, c.player_key);
            }
            !risky
        })
        .collect()
}

fn top_adds(pool: &[PoolCandidate], stat_map: &StatMap, needs: &[Need]) -> Vec<ScoredCandidate> {
    let filtered: Vec<PoolCandidate> =
        filter_ratio_risk(filter_avoided(pool, needs), needs, stat_map)
            .into_iter()
            .cloned()
            .collect();
    let mut ranked = score_candidates(&filtered, stat_map, needs);
    ranked.truncate(TOP_ADDS);
    ranked
}

// ---------------------------------------------------------------------------
// Roster moves
// ---------------------------------------------------------------------------

/// Roster ordered from most to least movable. Day-to-day players sink,
/// flagged and positionally redundant players rise, relievers are kept.
pub fn drop_candidates(snapshot: &Snapshot) -> Vec<&PlayerSnapshot> {
    let flagged: HashSet<String> = roster_inefficiency_report(snapshot)
        .items
        .into_iter()
        .filter_map(|i| i.player_key)
        .collect();
    let counts = snapshot.roster.position_counts();

    let movability = |p: &PlayerSnapshot| -> f64 {
        let mut s = 0.0;
        if is_day_to_day(p.status.as_deref()) {
            s -= 5.0;
        }
        if flagged.contains(&p.player_key) {
            s += 5.0;
        }
        let depth: usize = p.eligible_positions.iter().map(|pos| counts.get(pos)).sum();
        s += depth as f64 / 10.0;
        if p.is_eligible_at(roster::RELIEF_PITCHER) {
            s -= 2.0;
        }
        s
    };

    let mut ranked: Vec<(f64, &PlayerSnapshot)> = snapshot
        .roster
        .players
        .iter()
        .map(|p| (movability(p), p))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().map(|(_, p)| p).collect()
}

fn bench_candidates(snapshot: &Snapshot) -> Vec<&PlayerSnapshot> {
    snapshot
        .roster
        .players
        .iter()
        .filter(|p| is_day_to_day(p.status.as_deref()))
        .collect()
}

fn suggestion_impacts(add: &ScoredCandidate) -> BTreeMap<Category, f64> {
    IMPACT_CATEGORIES
        .iter()
        .filter_map(|cat| add.impacts.get(cat).map(|v| (*cat, *v)))
        .collect()
}

fn scarcity_note() -> WaiverSuggestion {
    WaiverSuggestion {
        add_player_key: PLACEHOLDER_META.into(),
        add_name: "(SV scarce)".into(),
        drop_player_key: PLACEHOLDER_META.into(),
        drop_name: "(no-op)".into(),
        action: SuggestionAction::Note,
        reason: format!(
            "SV market is scarce (baseline SV >= {SV_MEANINGFUL_THRESHOLD:.1} not available in \
             waiver RP pool). Don't chase saves via waivers unless matchup pressure says SV is \
             within reach; focus on K/W streaming with ratio safety or pursue a trade for a closer."
        ),
        confidence: Confidence::High,
        category_impacts: BTreeMap::new(),
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Build the weekly waiver report. Always returns a report, even with no
/// pools; missing pools just mean fewer (or placeholder) suggestions.
pub fn waiver_recommendations(
    snapshot: &Snapshot,
    pool: Option<&[PoolCandidate]>,
    sv_pool: Option<&[PoolCandidate]>,
    stat_map: &StatMap,
    ratio_mode: RatioMode,
) -> WaiverReport {
    let mut needs = derive_needs(&snapshot.roster.position_counts(), ratio_mode);

    let market = if needs::needs_saves(&needs) {
        sv_market(sv_pool, stat_map)
    } else {
        SvMarket::without_pool(SvMarketStatus::NotNeeded, "SV is not a roster need.")
    };
    let scarce = market.is_scarce();
    if scarce {
        needs.retain(|n| *n != Need::Saves);
    }

    let adds = match pool {
        Some(pool) => top_adds(pool, stat_map, &needs),
        None => Vec::new(),
    };

    let mut suggestions = Vec::new();

    for injured in bench_candidates(snapshot).into_iter().take(BENCH_PLAYERS) {
        if adds.is_empty() {
            suggestions.push(WaiverSuggestion {
                add_player_key: PLACEHOLDER_POOL.into(),
                add_name: PLACEHOLDER_POOL.into(),
                drop_player_key: injured.player_key.clone(),
                drop_name: injured.name.clone(),
                action: SuggestionAction::Bench,
                reason: format!(
                    "ACTION: BENCH (not drop). {} is DTD. Add best healthy player aligned to \
                     needs: {}.",
                    injured.name,
                    needs::describe(&needs, "best available")
                ),
                confidence: Confidence::Low,
                category_impacts: BTreeMap::new(),
            });
            continue;
        }
        for add in adds.iter().take(ADDS_PER_BENCH) {
            let prefix = if scarce { SCARCE_BENCH_PREFIX } else { "" };
            suggestions.push(WaiverSuggestion {
                add_player_key: add.player_key.clone(),
                add_name: add.name.clone(),
                drop_player_key: injured.player_key.clone(),
                drop_name: injured.name.clone(),
                action: SuggestionAction::Bench,
                reason: format!(
                    "{prefix}ACTION: BENCH (not drop). {} is DTD. Add {} as a healthy \
                     contingency. Needs: {}.",
                    injured.name,
                    add.name,
                    needs::describe(&needs, "none")
                ),
                confidence: Confidence::Med,
                category_impacts: suggestion_impacts(add),
            });
        }
    }

    let drop = drop_candidates(snapshot)
        .into_iter()
        .find(|p| !is_day_to_day(p.status.as_deref()));
    if let Some(drop) = drop {
        for add in adds.iter().take(DROP_PAIRINGS) {
            let prefix = if scarce { SCARCE_DROP_PREFIX } else { "" };
            suggestions.push(WaiverSuggestion {
                add_player_key: add.player_key.clone(),
                add_name: add.name.clone(),
                drop_player_key: drop.player_key.clone(),
                drop_name: drop.name.clone(),
                action: SuggestionAction::DropOrTrade,
                reason: format!(
                    "{prefix}ACTION: DROP/TRADE candidate. Add {} to address needs ({}). \
                     Drop candidate chosen by redundancy/structure heuristics.",
                    add.name,
                    needs::describe(&needs, "best available")
                ),
                confidence: Confidence::Low,
                category_impacts: suggestion_impacts(add),
            });
        }
    }

    if scarce {
        suggestions.insert(0, scarcity_note());
    }

    info!(
        "Week {} waivers: {} adds considered, {} suggestions (sv market {:?})",
        snapshot.week,
        adds.len(),
        suggestions.len(),
        market.status
    );

    WaiverReport {
        week: snapshot.week,
        team_key: snapshot.roster.team_key.clone(),
        generated_at: Utc::now(),
        ratio_mode,
        needs,
        sv_market: market,
        suggestions,
    }
}
