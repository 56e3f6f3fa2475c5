// Waiver pool loading.
//
// Pools arrive as JSON (a bare list, or an object wrapping the list under one
// of several keys) or as CSV exports where every non-meta column is a stat
// id. Both normalize into `PoolCandidate` records.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::roster::{self, split_positions};
use crate::stats::StatMap;

/// Object keys searched, in order, for the candidate list of a wrapped pool.
const LIST_KEYS: &[&str] = &[
    "players",
    "pool",
    "items",
    "data",
    "waiver_pool",
    "results",
    "value",
];

/// CSV columns that describe the player rather than a stat.
const CSV_META_COLUMNS: &[&str] = &["player_key", "name", "team", "pos", "status"];

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("pool file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("unsupported pool shape in {path}: {message}")]
    Shape { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// Candidate record
// ---------------------------------------------------------------------------

/// One available player. Stat values stay raw (`"3.86"`, `"-"`, `"7/21"`)
/// until the scorer interprets them through the stat map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolCandidate {
    #[serde(default, deserialize_with = "text_or_default")]
    pub player_key: String,
    #[serde(default, deserialize_with = "text_or_default")]
    pub name: String,
    #[serde(default, alias = "team_abbr", deserialize_with = "optional_text")]
    pub team: Option<String>,
    /// Comma-joined eligibility ("SP,RP"). A JSON list is joined on read.
    #[serde(
        default,
        alias = "eligible_positions",
        deserialize_with = "text_or_default"
    )]
    pub pos: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "stat_values")]
    pub baseline_stats_by_id: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "stat_values")]
    pub stats_by_id: BTreeMap<String, Value>,
    /// Marker left by enrichment when a stat lookup failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats_error: Option<Value>,
}

impl PoolCandidate {
    pub fn positions(&self) -> Vec<String> {
        split_positions(&self.pos)
    }

    pub fn is_pitcher(&self) -> bool {
        roster::is_pitcher(&self.positions())
    }

    pub fn is_reliever(&self) -> bool {
        roster::is_reliever(&self.positions())
    }

    pub fn is_eligible_at(&self, position: &str) -> bool {
        self.positions().iter().any(|p| p == position)
    }

    /// Baseline stats when present, else current-season stats.
    pub fn stat_values(&self) -> &BTreeMap<String, Value> {
        if self.baseline_stats_by_id.is_empty() {
            &self.stats_by_id
        } else {
            &self.baseline_stats_by_id
        }
    }
}

fn value_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

fn text_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(value_text(Value::deserialize(deserializer)?))
}

fn stat_values<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, Value>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Ok(BTreeMap::new()),
    }
}

// ---------------------------------------------------------------------------
// JSON pools
// ---------------------------------------------------------------------------

/// Locate the candidate list inside a parsed pool document and decode each
/// entry. Entries that are not objects are skipped with a warning.
pub fn pool_from_value(value: Value, path: &Path) -> Result<Vec<PoolCandidate>, PoolError> {
    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            let key = LIST_KEYS
                .iter()
                .map(|k| k.to_string())
                .find(|k| matches!(obj.get(k), Some(Value::Array(_))))
                .or_else(|| {
                    // Maps keep document order, so this is the first list as written.
                    obj.iter()
                        .find(|(_, v)| v.is_array())
                        .map(|(k, _)| k.clone())
                });
            match key.and_then(|k| obj.remove(&k)) {
                Some(Value::Array(items)) => items,
                _ => {
                    let keys: Vec<&String> = obj.keys().take(20).collect();
                    return Err(PoolError::Shape {
                        path: path.to_path_buf(),
                        message: format!("object contains no list field (keys: {keys:?})"),
                    });
                }
            }
        }
        other => {
            return Err(PoolError::Shape {
                path: path.to_path_buf(),
                message: format!("expected a list or object, got {}", json_type(&other)),
            })
        }
    };

    let mut candidates = Vec::with_capacity(list.len());
    for (idx, entry) in list.into_iter().enumerate() {
        if !entry.is_object() {
            warn!("skipping pool entry {} in {}: not an object", idx, path.display());
            continue;
        }
        match serde_json::from_value::<PoolCandidate>(entry) {
            Ok(c) => candidates.push(c),
            Err(e) => warn!("skipping pool entry {} in {}: {}", idx, path.display(), e),
        }
    }
    Ok(candidates)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// CSV pools
// ---------------------------------------------------------------------------

fn load_csv_from_reader<R: Read>(rdr: R) -> Result<Vec<PoolCandidate>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let headers = reader.headers()?.clone();
    let mut candidates = Vec::new();

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed pool row: {}", e);
                continue;
            }
        };
        let mut c = PoolCandidate::default();
        for (column, cell) in headers.iter().zip(record.iter()) {
            let non_empty = (!cell.is_empty()).then(|| cell.to_string());
            match column {
                "player_key" => c.player_key = cell.to_string(),
                "name" => c.name = cell.to_string(),
                "team" => c.team = non_empty,
                "pos" => c.pos = cell.to_string(),
                "status" => c.status = non_empty,
                stat_id => {
                    c.baseline_stats_by_id
                        .insert(stat_id.to_string(), Value::String(cell.to_string()));
                }
            }
        }
        if c.player_key.is_empty() && c.name.is_empty() {
            warn!("skipping pool row without player_key or name");
            continue;
        }
        candidates.push(c);
    }
    Ok(candidates)
}

// ---------------------------------------------------------------------------
// File loaders
// ---------------------------------------------------------------------------

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

fn check_exists(path: &Path) -> Result<(), PoolError> {
    if path.exists() {
        Ok(())
    } else {
        Err(PoolError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

fn read_text(path: &Path) -> Result<String, PoolError> {
    check_exists(path)?;
    std::fs::read_to_string(path).map_err(|source| PoolError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a waiver pool from a `.csv` or JSON file.
pub fn load_pool(path: &Path) -> Result<Vec<PoolCandidate>, PoolError> {
    let candidates = if is_csv(path) {
        check_exists(path)?;
        let file = std::fs::File::open(path).map_err(|source| PoolError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        load_csv_from_reader(file).map_err(|source| PoolError::Csv {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        let text = read_text(path)?;
        let value: Value = serde_json::from_str(&text).map_err(|source| PoolError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        pool_from_value(value, path)?
    };
    info!("Loaded {} pool candidates from {}", candidates.len(), path.display());
    Ok(candidates)
}

/// Load a stat-id map file in any of its supported shapes.
pub fn load_stat_map(path: &Path) -> Result<StatMap, PoolError> {
    let text = read_text(path)?;
    let value: Value = serde_json::from_str(&text).map_err(|source| PoolError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let map = StatMap::from_value(&value);
    if map.is_empty() {
        warn!("stat map {} has no usable entries", path.display());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn fake_path() -> PathBuf {
        PathBuf::from("pool.json")
    }

    #[test]
    fn bare_list_pool() {
        let value = json!([
            {"player_key": "p1", "name": "One", "team": "NYY", "pos": "SP", "status": null,
             "baseline_stats_by_id": {"26": "3.10"}, "extra_field": 7},
            {"player_key": "p2", "name": "Two", "pos": "RP"}
        ]);
        let pool = pool_from_value(value, &fake_path()).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].team.as_deref(), Some("NYY"));
        assert_eq!(pool[0].stat_values()["26"], json!("3.10"));
        assert_eq!(pool[1].status, None);
        assert!(pool[1].stat_values().is_empty());
    }

    #[test]
    fn wrapped_pools_use_known_keys_first() {
        let value = json!({
            "meta": [1, 2],
            "players": [{"player_key": "p1", "name": "One", "pos": "OF"}]
        });
        let pool = pool_from_value(value, &fake_path()).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].player_key, "p1");

        let value = json!({"count": 1, "waiver_pool": [{"player_key": "p9", "name": "Nine"}]});
        assert_eq!(pool_from_value(value, &fake_path()).unwrap()[0].player_key, "p9");
    }

    #[test]
    fn falls_back_to_first_list_field() {
        let value = json!({"count": 2, "rows": [{"player_key": "a"}, "junk", {"player_key": "b"}]});
        let pool = pool_from_value(value, &fake_path()).unwrap();
        let keys: Vec<&str> = pool.iter().map(|c| c.player_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn first_list_field_follows_document_order() {
        let value: Value = serde_json::from_str(
            r#"{"zeta": [{"player_key": "z"}], "alpha": [{"player_key": "a"}]}"#,
        )
        .unwrap();
        let pool = pool_from_value(value, &fake_path()).unwrap();
        assert_eq!(pool[0].player_key, "z");
    }

    #[test]
    fn rejects_shapes_without_a_list() {
        let err = pool_from_value(json!({"count": 0}), &fake_path()).unwrap_err();
        assert!(matches!(err, PoolError::Shape { .. }));
        let err = pool_from_value(json!("nope"), &fake_path()).unwrap_err();
        assert!(err.to_string().contains("got string"));
    }

    #[test]
    fn lenient_field_types() {
        let value = json!([{
            "player_key": 12345,
            "name": "Numeric Key",
            "team_abbr": "SEA",
            "eligible_positions": ["SP", "RP"],
            "baseline_stats_by_id": null,
            "stats_by_id": {"28": 4},
            "stats_error": "timeout"
        }]);
        let pool = pool_from_value(value, &fake_path()).unwrap();
        let c = &pool[0];
        assert_eq!(c.player_key, "12345");
        assert_eq!(c.team.as_deref(), Some("SEA"));
        assert_eq!(c.pos, "SP,RP");
        assert!(c.is_pitcher());
        assert!(c.is_reliever());
        assert_eq!(c.stat_values()["28"], json!(4));
        assert_eq!(c.stats_error, Some(json!("timeout")));
    }

    #[test]
    fn csv_columns_become_baseline_stats() {
        let csv = "\
player_key,name,team,pos,status,26,27,32
469.p.1,Closer One,BOS,RP,,3.20,1.10,18
469.p.2,Starter Two,LAD,SP,DTD,4.75,1.40,
";
        let pool = load_csv_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].status, None);
        assert_eq!(pool[0].baseline_stats_by_id["32"], json!("18"));
        assert_eq!(pool[1].status.as_deref(), Some("DTD"));
        assert_eq!(pool[1].baseline_stats_by_id["32"], json!(""));
        assert!(pool[1].is_eligible_at("SP"));
    }

    #[test]
    fn missing_files_name_the_path() {
        let path = std::env::temp_dir().join("gm_pool_missing.json");
        let _ = fs::remove_file(&path);
        match load_pool(&path).unwrap_err() {
            PoolError::NotFound { path: p } => assert_eq!(p, path),
            other => panic!("expected NotFound, got: {other}"),
        }
        assert!(matches!(
            load_stat_map(&path).unwrap_err(),
            PoolError::NotFound { .. }
        ));
    }

    #[test]
    fn load_pool_dispatches_on_extension() {
        let dir = std::env::temp_dir().join("gm_pool_dispatch");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let csv_path = dir.join("pool.CSV");
        fs::write(&csv_path, "player_key,name,pos\np1,One,OF\n").unwrap();
        assert_eq!(load_pool(&csv_path).unwrap()[0].pos, "OF");

        let json_path = dir.join("pool.json");
        fs::write(&json_path, r#"{"items": [{"player_key": "p2", "name": "Two"}]}"#).unwrap();
        assert_eq!(load_pool(&json_path).unwrap()[0].name, "Two");

        let bad_path = dir.join("bad.json");
        fs::write(&bad_path, "{not json").unwrap();
        assert!(matches!(
            load_pool(&bad_path).unwrap_err(),
            PoolError::Json { .. }
        ));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn stat_map_file_shapes() {
        let dir = std::env::temp_dir().join("gm_pool_stat_map");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let path = dir.join("stat_map.json");
        fs::write(&path, r#"{"stat_map": {"7": "Runs", "26": "Earned Run Average"}}"#).unwrap();
        let map = load_stat_map(&path).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.name("26"), Some("Earned Run Average"));

        let _ = fs::remove_dir_all(&dir);
    }
}
