// File-backed artifact store: per-week snapshots and generated reports
// under one data directory.
//
// Layout:
//   <root>/snapshots/week_<N>.snapshot.json
//   <root>/reports/<kind>_week_<N>.json

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use super::{read_json, Snapshot, SnapshotError};

/// Which report an artifact file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Pressure,
    Inefficiency,
    Waivers,
    RankedPool,
}

impl ReportKind {
    pub fn file_stem(&self) -> &'static str {
        match self {
            ReportKind::Pressure => "pressure",
            ReportKind::Inefficiency => "inefficiency",
            ReportKind::Waivers => "waivers",
            ReportKind::RankedPool => "ranked_pool",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self, week: u32) -> PathBuf {
        self.root
            .join("snapshots")
            .join(format!("week_{week}.snapshot.json"))
    }

    pub fn report_path(&self, kind: ReportKind, week: u32) -> PathBuf {
        self.root
            .join("reports")
            .join(format!("{}_week_{week}.json", kind.file_stem()))
    }

    /// Persist a snapshot under its week, replacing any previous one.
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> Result<PathBuf, SnapshotError> {
        let path = self.snapshot_path(snapshot.week);
        write_json(&path, snapshot)?;
        info!("Saved week {} snapshot to {}", snapshot.week, path.display());
        Ok(path)
    }

    /// Load the snapshot for `week`. A missing file is
    /// [`SnapshotError::NotFound`] naming the expected path.
    pub fn load_snapshot(&self, week: u32) -> Result<Snapshot, SnapshotError> {
        read_json(&self.snapshot_path(week))
    }

    pub fn write_report<T: Serialize>(
        &self,
        kind: ReportKind,
        week: u32,
        report: &T,
    ) -> Result<PathBuf, SnapshotError> {
        let path = self.report_path(kind, week);
        write_json(&path, report)?;
        info!("Wrote {} report to {}", kind.file_stem(), path.display());
        Ok(path)
    }

    /// Highest week with a saved snapshot, if any.
    pub fn latest_snapshot_week(&self) -> Option<u32> {
        let entries = std::fs::read_dir(self.root.join("snapshots")).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_str()?;
                name.strip_prefix("week_")?
                    .strip_suffix(".snapshot.json")?
                    .parse::<u32>()
                    .ok()
            })
            .max()
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SnapshotError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|source| SnapshotError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })
}
