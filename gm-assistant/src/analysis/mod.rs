// Weekly analyzers. Everything here is a pure function of a snapshot (plus
// pools and a stat map for the waiver side); file and network I/O live in
// the pipeline.

pub mod inefficiency;
pub mod needs;
pub mod pool;
pub mod pressure;
pub mod scoring;
pub mod waivers;

pub use inefficiency::{roster_inefficiency_report, Inefficiency, InefficiencyReport};
pub use needs::{derive_needs, Need, RatioMode};
pub use pool::{load_pool, load_stat_map, PoolCandidate, PoolError};
pub use pressure::{pressure_report, CategoryPressure, Posture, PressureReport};
pub use scoring::{score_candidates, ScoredCandidate};
pub use waivers::{waiver_recommendations, WaiverReport, WaiverSuggestion};
