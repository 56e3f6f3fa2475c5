// Pipeline: the one place that wires config, the artifact store, pool files,
// and the analyzers together. The CLI and the HTTP service both go through
// it.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::needs::{derive_needs, Need, RatioMode};
use crate::analysis::pool::{load_pool, load_stat_map, PoolCandidate, PoolError};
use crate::analysis::{
    pressure_report, roster_inefficiency_report, score_candidates, waiver_recommendations,
    InefficiencyReport, PressureReport, ScoredCandidate, WaiverReport,
};
use crate::config::Config;
use crate::snapshot::build::{build_snapshot_from_files, BuildRequest};
use crate::snapshot::store::{ArtifactStore, ReportKind};
use crate::snapshot::{Snapshot, SnapshotError};
use crate::stats::StatMap;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("no snapshots saved under {dir}")]
    NoSnapshots { dir: PathBuf },

    #[error("no waiver pool given and none configured")]
    NoPool,
}

impl PipelineError {
    /// True when the requested week has no snapshot on disk.
    pub fn is_missing_snapshot(&self) -> bool {
        matches!(
            self,
            PipelineError::Snapshot(SnapshotError::NotFound { .. })
                | PipelineError::NoSnapshots { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Requests and outputs
// ---------------------------------------------------------------------------

/// Per-call waiver inputs. Anything left `None` falls back to config.
#[derive(Debug, Clone, Default)]
pub struct WaiverRequest {
    pub pool: Option<PathBuf>,
    pub sv_pool: Option<PathBuf>,
    pub ratio_mode: Option<RatioMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPool {
    pub week: u32,
    pub needs: Vec<Need>,
    pub top: Vec<ScoredCandidate>,
}

/// All three weekly reports for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyReport {
    pub week: u32,
    pub pressure: PressureReport,
    pub inefficiency: InefficiencyReport,
    pub waivers: WaiverReport,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Pipeline {
    store: ArtifactStore,
    league_key: String,
    team_key: String,
    stat_map_path: PathBuf,
    ratio_mode: RatioMode,
    default_pool: Option<PathBuf>,
    default_sv_pool: Option<PathBuf>,
    rank_top: usize,
}

impl Pipeline {
    pub fn from_config(config: &Config) -> Self {
        Pipeline {
            store: ArtifactStore::new(&config.data.dir),
            league_key: config.league.league_key.clone(),
            team_key: config.league.team_key.clone(),
            stat_map_path: config.data.stat_map.clone(),
            ratio_mode: config.waivers.ratio_mode,
            default_pool: config.waivers.default_pool.clone(),
            default_sv_pool: config.waivers.default_sv_pool.clone(),
            rank_top: config.waivers.rank_top,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The requested week, or the latest week with a saved snapshot.
    pub fn resolve_week(&self, week: Option<u32>) -> Result<u32, PipelineError> {
        match week {
            Some(w) => Ok(w),
            None => self
                .store
                .latest_snapshot_week()
                .ok_or_else(|| PipelineError::NoSnapshots {
                    dir: self.store.root().join("snapshots"),
                }),
        }
    }

    // --- snapshots ---

    /// Normalize raw roster + scoreboard files into a snapshot and save it.
    pub fn build_snapshot(
        &self,
        week: u32,
        roster_path: &Path,
        scoreboard_path: &Path,
        stat_map_path: Option<&Path>,
    ) -> Result<Snapshot, PipelineError> {
        let snapshot = build_snapshot_from_files(&BuildRequest {
            league_key: &self.league_key,
            week,
            my_team_key: &self.team_key,
            roster_path,
            scoreboard_path,
            stat_map_path,
        })?;
        self.store.save_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    pub fn snapshot(&self, week: u32) -> Result<Snapshot, PipelineError> {
        Ok(self.store.load_snapshot(week)?)
    }

    // --- reports ---

    pub fn pressure(&self, week: u32) -> Result<PressureReport, PipelineError> {
        Ok(pressure_report(&self.snapshot(week)?))
    }

    pub fn inefficiency(&self, week: u32) -> Result<InefficiencyReport, PipelineError> {
        Ok(roster_inefficiency_report(&self.snapshot(week)?))
    }

    pub fn waivers(&self, week: u32, req: &WaiverRequest) -> Result<WaiverReport, PipelineError> {
        let snapshot = self.snapshot(week)?;
        self.waivers_for(&snapshot, req)
    }

    fn waivers_for(
        &self,
        snapshot: &Snapshot,
        req: &WaiverRequest,
    ) -> Result<WaiverReport, PipelineError> {
        let pool = self.pool_from(req.pool.as_deref(), self.default_pool.as_deref())?;
        let sv_pool = self.pool_from(req.sv_pool.as_deref(), self.default_sv_pool.as_deref())?;

        let stat_map = if pool.is_some() || sv_pool.is_some() {
            self.stat_map_for(snapshot)?
        } else {
            StatMap::new()
        };

        Ok(waiver_recommendations(
            snapshot,
            pool.as_deref(),
            sv_pool.as_deref(),
            &stat_map,
            req.ratio_mode.unwrap_or(self.ratio_mode),
        ))
    }

    /// Score a pool against the roster's needs and keep the best `top`
    /// (config `rank_top` when `None`).
    pub fn rank_pool(
        &self,
        week: u32,
        pool_path: Option<&Path>,
        top: Option<usize>,
    ) -> Result<RankedPool, PipelineError> {
        let snapshot = self.snapshot(week)?;
        let path = pool_path
            .or(self.default_pool.as_deref())
            .ok_or(PipelineError::NoPool)?;
        let pool = load_pool(path)?;
        let stat_map = self.stat_map_for(&snapshot)?;

        let needs = derive_needs(&snapshot.roster.position_counts(), self.ratio_mode);
        let mut ranked = score_candidates(&pool, &stat_map, &needs);
        ranked.truncate(top.unwrap_or(self.rank_top));
        for c in &mut ranked {
            c.score = round_to(c.score, 3);
            for v in c.impacts.values_mut() {
                *v = round_to(*v, 4);
            }
        }
        info!("Ranked {} of {} pool candidates for week {}", ranked.len(), pool.len(), week);

        Ok(RankedPool {
            week,
            needs,
            top: ranked,
        })
    }

    /// Pressure, inefficiency and waivers for one week (the latest snapshot
    /// when `week` is `None`), all from a single snapshot load.
    pub fn weekly_report(
        &self,
        week: Option<u32>,
        req: &WaiverRequest,
    ) -> Result<WeeklyReport, PipelineError> {
        let week = self.resolve_week(week)?;
        let snapshot = self.snapshot(week)?;
        Ok(WeeklyReport {
            week,
            pressure: pressure_report(&snapshot),
            inefficiency: roster_inefficiency_report(&snapshot),
            waivers: self.waivers_for(&snapshot, req)?,
        })
    }

    // --- persistence ---

    pub fn save_report<T: Serialize>(
        &self,
        kind: ReportKind,
        week: u32,
        report: &T,
    ) -> Result<PathBuf, PipelineError> {
        Ok(self.store.write_report(kind, week, report)?)
    }

    pub fn save_weekly(&self, report: &WeeklyReport) -> Result<Vec<PathBuf>, PipelineError> {
        Ok(vec![
            self.save_report(ReportKind::Pressure, report.week, &report.pressure)?,
            self.save_report(ReportKind::Inefficiency, report.week, &report.inefficiency)?,
            self.save_report(ReportKind::Waivers, report.week, &report.waivers)?,
        ])
    }

    // --- inputs ---

    /// Load the explicit pool, else the configured default. A missing
    /// explicit file is an error; a missing default is skipped.
    fn pool_from(
        &self,
        explicit: Option<&Path>,
        fallback: Option<&Path>,
    ) -> Result<Option<Vec<PoolCandidate>>, PipelineError> {
        if let Some(path) = explicit {
            return Ok(Some(load_pool(path)?));
        }
        match fallback {
            Some(path) if path.exists() => Ok(Some(load_pool(path)?)),
            Some(path) => {
                warn!("default pool {} not found; continuing without it", path.display());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn stat_map_for(&self, snapshot: &Snapshot) -> Result<StatMap, PipelineError> {
        if !snapshot.stat_map.is_empty() {
            return Ok(snapshot.stat_map.clone());
        }
        Ok(load_stat_map(&self.stat_map_path)?)
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
impl Pipeline {
    /// Pipeline over an arbitrary data dir with no default pools.
    pub(crate) fn for_tests(data_dir: &Path, stat_map_path: &Path) -> Self {
        Pipeline {
            store: ArtifactStore::new(data_dir),
            league_key: "469.l.40206".into(),
            team_key: "469.l.40206.t.6".into(),
            stat_map_path: stat_map_path.to_path_buf(),
            ratio_mode: RatioMode::Protect,
            default_pool: None,
            default_sv_pool: None,
            rank_top: 25,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fixtures::*;
    use serde_json::json;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn seeded(name: &str) -> (PathBuf, Pipeline) {
        let dir = temp_dir(name);
        let pipeline = Pipeline::for_tests(&dir, &dir.join("stat_map.json"));
        let snap = snapshot_with(
            vec![
                player("r1", "Reliever", "RP", None),
                player("d1", "Hurt", "SS", Some("DTD")),
                player("o1", "Outfielder", "OF", None),
            ],
            team("469.l.40206.t.6", "Mine", &[("HR", 12.0), ("ERA", 3.1)]),
            team("469.l.40206.t.2", "Them", &[("HR", 8.0), ("ERA", 4.2)]),
        );
        pipeline.store().save_snapshot(&snap).unwrap();
        (dir, pipeline)
    }

    fn write_pool(dir: &Path) -> PathBuf {
        let path = dir.join("pool.json");
        let pool = json!({"players": [
            {"player_key": "a", "name": "A", "pos": "OF", "baseline_stats_by_id": {"7": "10.12346"}},
            {"player_key": "b", "name": "B", "pos": "2B", "baseline_stats_by_id": {"7": "20"}},
            {"player_key": "c", "name": "C", "pos": "C", "baseline_stats_by_id": {"7": "1"}}
        ]});
        fs::write(&path, pool.to_string()).unwrap();
        path
    }

    fn write_stat_map(dir: &Path) {
        fs::write(dir.join("stat_map.json"), r#"{"7": "Runs"}"#).unwrap();
    }

    #[test]
    fn reports_come_from_the_saved_snapshot() {
        let (dir, pipeline) = seeded("gm_pipeline_reports");
        let pressure = pipeline.pressure(3).unwrap();
        assert_eq!(pressure.pressures.len(), 2);
        let inefficiency = pipeline.inefficiency(3).unwrap();
        assert_eq!(inefficiency.items[0].player_key.as_deref(), Some("d1"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_snapshot_is_flagged() {
        let (dir, pipeline) = seeded("gm_pipeline_missing");
        let err = pipeline.pressure(12).unwrap_err();
        assert!(err.is_missing_snapshot());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn waivers_without_pools_skip_the_stat_map() {
        let (dir, pipeline) = seeded("gm_pipeline_no_pools");
        let report = pipeline.waivers(3, &WaiverRequest::default()).unwrap();
        assert_eq!(report.suggestions.len(), 1);
        assert_eq!(report.suggestions[0].add_player_key, "(pool-needed)");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn waivers_with_pool_need_a_stat_map() {
        let (dir, pipeline) = seeded("gm_pipeline_needs_stat_map");
        let req = WaiverRequest {
            pool: Some(write_pool(&dir)),
            ..Default::default()
        };
        match pipeline.waivers(3, &req).unwrap_err() {
            PipelineError::Pool(PoolError::NotFound { path }) => {
                assert!(path.ends_with("stat_map.json"))
            }
            other => panic!("expected stat map NotFound, got: {other}"),
        }

        write_stat_map(&dir);
        let report = pipeline.waivers(3, &req).unwrap();
        assert_eq!(report.suggestions[0].add_player_key, "b");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn explicit_missing_pool_is_an_error() {
        let (dir, pipeline) = seeded("gm_pipeline_missing_pool");
        let req = WaiverRequest {
            pool: Some(dir.join("nope.json")),
            ..Default::default()
        };
        assert!(matches!(
            pipeline.waivers(3, &req).unwrap_err(),
            PipelineError::Pool(PoolError::NotFound { .. })
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rank_pool_truncates_and_rounds() {
        let (dir, pipeline) = seeded("gm_pipeline_rank");
        write_stat_map(&dir);
        let pool = write_pool(&dir);

        let ranked = pipeline.rank_pool(3, Some(&pool), Some(2)).unwrap();
        assert_eq!(ranked.week, 3);
        assert_eq!(ranked.needs, vec![Need::Saves]);
        let keys: Vec<&str> = ranked.top.iter().map(|c| c.player_key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(ranked.top[1].impacts[&crate::stats::Category::R], 10.1235);
        assert_eq!(ranked.top[1].score, 10.123);

        assert!(matches!(
            pipeline.rank_pool(3, None, None).unwrap_err(),
            PipelineError::NoPool
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn weekly_report_defaults_to_latest_week() {
        let (dir, pipeline) = seeded("gm_pipeline_weekly");
        let mut later = pipeline.snapshot(3).unwrap();
        later.week = 5;
        pipeline.store().save_snapshot(&later).unwrap();

        let report = pipeline.weekly_report(None, &WaiverRequest::default()).unwrap();
        assert_eq!(report.week, 5);
        assert_eq!(report.pressure.week, 5);

        let paths = pipeline.save_weekly(&report).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths.iter().all(|p| p.exists()));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn weekly_report_without_snapshots() {
        let dir = temp_dir("gm_pipeline_empty");
        let pipeline = Pipeline::for_tests(&dir, &dir.join("stat_map.json"));
        let err = pipeline
            .weekly_report(None, &WaiverRequest::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoSnapshots { .. }));
        assert!(err.is_missing_snapshot());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(round_to(-13.49999, 3), -13.5);
    }
}
