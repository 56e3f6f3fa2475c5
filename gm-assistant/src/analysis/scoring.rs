// Pool scoring: turn raw candidate stat lines into comparable scores shaped
// by the current roster needs.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::needs::{self, Need};
use super::pool::PoolCandidate;
use crate::roster::is_bad_status;
use crate::stats::{parse_hits_at_bats, parse_num, CanonicalStat, Category, StatMap};

/// Hard ratio limits under protection: at or past either, a pitcher is out.
pub const ERA_CUTOFF: f64 = 5.00;
pub const WHIP_CUTOFF: f64 = 1.45;
/// Soft ratio limits under protection: past these a pitcher is penalized.
pub const ERA_PENALTY_START: f64 = 4.20;
pub const WHIP_PENALTY_START: f64 = 1.30;
const ERA_PENALTY_RATE: f64 = 45.0;
const WHIP_PENALTY_RATE: f64 = 180.0;

const INNINGS_WEIGHT: f64 = 0.05;
const AVG_WEIGHT: f64 = 0.2;
const RELIEVER_BONUS: f64 = 30.0;
const SAVES_BONUS: f64 = 40.0;
const NO_SAVES_PENALTY: f64 = 25.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub player_key: String,
    pub name: String,
    pub team: Option<String>,
    pub pos: String,
    pub status: Option<String>,
    pub score: f64,
    pub impacts: BTreeMap<Category, f64>,
}

impl ScoredCandidate {
    pub fn impact(&self, category: Category) -> f64 {
        self.impacts.get(&category).copied().unwrap_or(0.0)
    }
}

/// Category weights after need boosts.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Weights {
    r: f64,
    hr: f64,
    rbi: f64,
    sb: f64,
    w: f64,
    sv: f64,
    k: f64,
}

impl Weights {
    fn for_needs(needs: &[Need]) -> Self {
        let mut w = Weights {
            r: 1.0,
            hr: 1.0,
            rbi: 1.0,
            sb: 1.0,
            w: 1.0,
            sv: 1.0,
            k: 1.0,
        };
        if needs::needs_saves(needs) {
            w.sv += 6.0;
        }
        if needs::streams(needs) {
            w.k += 1.5;
            w.w += 1.0;
        }
        w
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Recognized category values for one candidate. Hits/at-bats pairs are
/// summed and become AVG when there were any at-bats.
pub fn candidate_impacts(candidate: &PoolCandidate, stat_map: &StatMap) -> BTreeMap<Category, f64> {
    let mut impacts = BTreeMap::new();
    let (mut hits, mut at_bats) = (0u64, 0u64);

    for (stat_id, raw) in candidate.stat_values() {
        match stat_map.canonical(stat_id) {
            Some(CanonicalStat::Category(cat)) => {
                impacts.insert(cat, parse_num(raw));
            }
            Some(CanonicalStat::HitsAtBats) => {
                let (h, ab) = parse_hits_at_bats(raw);
                hits = hits.saturating_add(u64::from(h));
                at_bats = at_bats.saturating_add(u64::from(ab));
            }
            None => {}
        }
    }
    if at_bats > 0 {
        impacts.insert(Category::AVG, hits as f64 / at_bats as f64);
    }
    impacts
}

/// Ratio penalty for a pitcher under protection, or `None` if the pitcher
/// crosses a hard cutoff.
pub fn ratio_penalty(era: f64, whip: f64) -> Option<f64> {
    if era >= ERA_CUTOFF || whip >= WHIP_CUTOFF {
        return None;
    }
    let mut penalty = 0.0;
    if era >= ERA_PENALTY_START {
        penalty += (era - ERA_PENALTY_START) * ERA_PENALTY_RATE;
    }
    if whip >= WHIP_PENALTY_START {
        penalty += (whip - WHIP_PENALTY_START) * WHIP_PENALTY_RATE;
    }
    Some(penalty)
}

/// Score `candidates` against `needs`, best first. Bad-status players, and
/// pitchers past the hard ratio cutoffs when ratios are protected, are left
/// out. Ties keep input order.
pub fn score_candidates(
    candidates: &[PoolCandidate],
    stat_map: &StatMap,
    needs: &[Need],
) -> Vec<ScoredCandidate> {
    let weights = Weights::for_needs(needs);
    let need_saves = needs::needs_saves(needs);
    let protect = needs::protects_ratios(needs);

    let mut out = Vec::with_capacity(candidates.len());
    for c in candidates {
        if c.status.as_deref().is_some_and(is_bad_status) {
            continue;
        }
        let impacts = candidate_impacts(c, stat_map);
        let get = |cat: Category| impacts.get(&cat).copied().unwrap_or(0.0);

        let mut score;
        if c.is_pitcher() {
            score = weights.w * get(Category::W)
                + weights.sv * get(Category::SV)
                + weights.k * get(Category::K)
                + INNINGS_WEIGHT * get(Category::IP);

            if need_saves {
                if c.is_reliever() {
                    score += RELIEVER_BONUS;
                }
                if get(Category::SV) > 0.0 {
                    score += SAVES_BONUS;
                } else {
                    score -= NO_SAVES_PENALTY;
                }
            }

            if protect {
                match ratio_penalty(get(Category::ERA), get(Category::WHIP)) {
                    Some(penalty) => score -= penalty,
                    None => {
                        debug!("excluding {} ({}): ratio cutoff", c.name, c.player_key);
                        continue;
                    }
                }
            }
        } else {
            score = weights.r * get(Category::R)
                + weights.hr * get(Category::HR)
                + weights.rbi * get(Category::RBI)
                + weights.sb * get(Category::SB)
                + AVG_WEIGHT * get(Category::AVG);
        }

        out.push(ScoredCandidate {
            player_key: c.player_key.clone(),
            name: c.name.clone(),
            team: c.team.clone(),
            pos: c.pos.clone(),
            status: c.status.clone(),
            score,
            impacts,
        });
    }

    out.sort_by(|a, b| b.score.total_cmp(&a.score));
    out
}
