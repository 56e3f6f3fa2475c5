// Roster needs derived from positional structure, and the ratio mode that
// governs how hard ERA/WHIP are protected while streaming.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::roster::{self, PositionCounts};

/// RP-eligible count at or below which saves become a need.
pub const SAVES_NEED_MAX_RP: usize = 2;
/// SP-eligible count at which streaming K/W becomes the pitching plan.
pub const STREAM_MIN_SP: usize = 7;
pub const AVOID_FIRST_BASE_AT: usize = 3;
pub const AVOID_OUTFIELD_AT: usize = 6;

// ---------------------------------------------------------------------------
// Ratio mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatioMode {
    /// Filter and penalize ratio-risk pitchers when streaming.
    #[default]
    Protect,
    /// Stream for counting stats; ratios are not protected.
    Push,
}

impl RatioMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatioMode::Protect => "protect",
            RatioMode::Push => "push",
        }
    }
}

impl fmt::Display for RatioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ratio mode '{0}' (expected 'protect' or 'push')")]
pub struct UnknownRatioMode(pub String);

impl FromStr for RatioMode {
    type Err = UnknownRatioMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "protect" => Ok(RatioMode::Protect),
            "push" => Ok(RatioMode::Push),
            _ => Err(UnknownRatioMode(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Needs
// ---------------------------------------------------------------------------

/// A roster need that steers waiver scoring and filtering.
///
/// Reports render needs as short phrases ("SV", "Avoid adding 1B", ...);
/// see the `Display` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Need {
    Saves,
    StreamStrikeoutsWins { protect_ratios: bool },
    AvoidPosition {
        position: String,
        unless_strong_fit: bool,
    },
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Need::Saves => f.write_str("SV"),
            Need::StreamStrikeoutsWins { protect_ratios: true } => {
                f.write_str("K/W (stream) but protect ERA/WHIP")
            }
            Need::StreamStrikeoutsWins {
                protect_ratios: false,
            } => f.write_str("K/W (stream)"),
            Need::AvoidPosition {
                position,
                unless_strong_fit,
            } => {
                write!(f, "Avoid adding {position}")?;
                if *unless_strong_fit {
                    f.write_str(" unless strong fit")?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for Need {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Derive needs from the roster's eligibility counts.
pub fn derive_needs(counts: &PositionCounts, mode: RatioMode) -> Vec<Need> {
    let mut needs = Vec::new();
    if counts.get(roster::RELIEF_PITCHER) <= SAVES_NEED_MAX_RP {
        needs.push(Need::Saves);
    }
    if counts.get(roster::STARTING_PITCHER) >= STREAM_MIN_SP {
        needs.push(Need::StreamStrikeoutsWins {
            protect_ratios: mode == RatioMode::Protect,
        });
    }
    if counts.get(roster::FIRST_BASE) >= AVOID_FIRST_BASE_AT {
        needs.push(Need::AvoidPosition {
            position: roster::FIRST_BASE.into(),
            unless_strong_fit: false,
        });
    }
    if counts.get(roster::OUTFIELD) >= AVOID_OUTFIELD_AT {
        needs.push(Need::AvoidPosition {
            position: roster::OUTFIELD.into(),
            unless_strong_fit: true,
        });
    }
    needs
}

pub fn needs_saves(needs: &[Need]) -> bool {
    needs.contains(&Need::Saves)
}

pub fn streams(needs: &[Need]) -> bool {
    needs
        .iter()
        .any(|n| matches!(n, Need::StreamStrikeoutsWins { .. }))
}

/// Whether any need asks for ERA/WHIP protection.
pub fn protects_ratios(needs: &[Need]) -> bool {
    needs.iter().any(|n| {
        matches!(
            n,
            Need::StreamStrikeoutsWins {
                protect_ratios: true
            }
        )
    })
}

pub fn avoided_positions(needs: &[Need]) -> Vec<&str> {
    needs
        .iter()
        .filter_map(|n| match n {
            Need::AvoidPosition { position, .. } => Some(position.as_str()),
            _ => None,
        })
        .collect()
}

/// Comma-joined needs, or `fallback` when there are none.
pub fn describe(needs: &[Need], fallback: &str) -> String {
    if needs.is_empty() {
        fallback.to_string()
    } else {
        needs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
