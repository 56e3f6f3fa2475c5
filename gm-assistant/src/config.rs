// Settings for the weekly assistant.
//
// Three TOML files live under `<base>/config/`: league.toml (who we are),
// strategy.toml (data locations, waiver knobs, service address) and an
// optional credentials.toml. The raw files are read into private structs
// and then checked and resolved into `Config`, whose paths are absolute
// with respect to `<base>`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::analysis::RatioMode;

const CONFIG_DIR: &str = "config";
const LEAGUE_FILE: &str = "league.toml";
const STRATEGY_FILE: &str = "strategy.toml";
const CREDENTIALS_FILE: &str = "credentials.toml";

const DEFAULT_RANK_TOP: usize = 25;

/// Files written into an empty `config/` on first run.
const SHIPPED: [(&str, &str); 2] = [
    (LEAGUE_FILE, include_str!("../defaults/league.toml")),
    (STRATEGY_FILE, include_str!("../defaults/strategy.toml")),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing config file {path}")]
    Missing { path: PathBuf },

    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config field `{field}` {problem}")]
    Invalid { field: &'static str, problem: String },
}

fn invalid(field: &'static str, problem: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        problem: problem.into(),
    }
}

// ---------------------------------------------------------------------------
// Resolved config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub data: DataConfig,
    pub waivers: WaiverConfig,
    pub service: ServiceConfig,
    api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Fantasy API league key, e.g. "469.l.40206".
    pub league_key: String,
    /// The user's team key, e.g. "469.l.40206.t.6".
    pub team_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    /// Root of the snapshot/report tree.
    pub dir: PathBuf,
    /// Stat-id map used when a snapshot carries none.
    pub stat_map: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaiverConfig {
    pub ratio_mode: RatioMode,
    pub default_pool: Option<PathBuf>,
    pub default_sv_pool: Option<PathBuf>,
    pub rank_top: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Service API key, if one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

// ---------------------------------------------------------------------------
// On-disk shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Deserialize)]
struct StrategyFile {
    data: DataSection,
    #[serde(default)]
    waivers: WaiverSection,
    service: ServiceConfig,
}

#[derive(Deserialize)]
struct DataSection {
    dir: String,
    stat_map: String,
}

#[derive(Deserialize, Default)]
struct WaiverSection {
    ratio_mode: Option<String>,
    default_pool: Option<String>,
    default_sv_pool: Option<String>,
    rank_top: Option<usize>,
}

#[derive(Deserialize, Default)]
struct CredentialsFile {
    service_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load config relative to the working directory, writing the shipped
/// league.toml and strategy.toml first if they are absent.
pub fn load_config() -> Result<Config, ConfigError> {
    let base = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    for path in seed_missing(&base)? {
        info!("Wrote default config {}", path.display());
    }
    load_config_from(&base)
}

/// Write each shipped config file into `<base>/config/` unless a file of
/// that name already exists. Returns the paths written.
pub fn seed_missing(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let dir = base_dir.join(CONFIG_DIR);
    fs::create_dir_all(&dir).map_err(|source| ConfigError::Io {
        path: dir.clone(),
        source,
    })?;

    let mut written = Vec::new();
    for (name, text) in SHIPPED {
        let path = dir.join(name);
        if path.exists() {
            continue;
        }
        fs::write(&path, text).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    Ok(written)
}

/// Load and check the config under `<base_dir>/config/` without writing
/// anything.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let dir = base_dir.join(CONFIG_DIR);
    let league: LeagueFile = read_toml(&dir.join(LEAGUE_FILE))?;
    let strategy: StrategyFile = read_toml(&dir.join(STRATEGY_FILE))?;
    let credentials = match read_toml::<CredentialsFile>(&dir.join(CREDENTIALS_FILE)) {
        Err(ConfigError::Missing { .. }) => CredentialsFile::default(),
        other => other?,
    };
    resolve(base_dir, league.league, strategy, credentials)
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConfigError::Missing {
            path: path.to_path_buf(),
        },
        _ => ConfigError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Checking + path resolution
// ---------------------------------------------------------------------------

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ConfigError> {
    match value.trim() {
        "" => Err(invalid(field, "must not be empty")),
        v => Ok(v),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve(
    base_dir: &Path,
    league: LeagueConfig,
    strategy: StrategyFile,
    credentials: CredentialsFile,
) -> Result<Config, ConfigError> {
    required("league.league_key", &league.league_key)?;
    required("league.team_key", &league.team_key)?;
    let data_dir = required("data.dir", &strategy.data.dir)?;
    let stat_map = required("data.stat_map", &strategy.data.stat_map)?;

    let waivers = strategy.waivers;
    let ratio_mode = match optional(waivers.ratio_mode) {
        Some(raw) => raw
            .parse::<RatioMode>()
            .map_err(|e| invalid("waivers.ratio_mode", e.to_string()))?,
        None => RatioMode::default(),
    };
    let rank_top = waivers.rank_top.unwrap_or(DEFAULT_RANK_TOP);
    if rank_top == 0 {
        return Err(invalid("waivers.rank_top", "must be at least 1"));
    }

    required("service.host", &strategy.service.host)?;
    if strategy.service.port == 0 {
        return Err(invalid("service.port", "must not be 0"));
    }

    // Absolute paths survive `join` unchanged.
    let path = |p: &str| base_dir.join(p);

    Ok(Config {
        data: DataConfig {
            dir: path(data_dir),
            stat_map: path(stat_map),
        },
        waivers: WaiverConfig {
            ratio_mode,
            default_pool: optional(waivers.default_pool).map(|p| path(&p)),
            default_sv_pool: optional(waivers.default_sv_pool).map(|p| path(&p)),
            rank_top,
        },
        service: strategy.service,
        api_key: optional(credentials.service_api_key),
        league,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fresh base dir holding the shipped league.toml and strategy.toml.
    fn seeded(name: &str) -> PathBuf {
        let base = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&base);
        seed_missing(&base).unwrap();
        base
    }

    fn edit(base: &Path, file: &str, from: &str, to: &str) {
        let path = base.join(CONFIG_DIR).join(file);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(from), "{file} has no {from:?}");
        fs::write(&path, text.replace(from, to)).unwrap();
    }

    fn invalid_field(base: &Path) -> &'static str {
        match load_config_from(base).unwrap_err() {
            ConfigError::Invalid { field, .. } => field,
            other => panic!("expected Invalid, got: {other}"),
        }
    }

    #[test]
    fn shipped_defaults_load_with_paths_under_base() {
        let base = seeded("gm_config_shipped");
        let config = load_config_from(&base).unwrap();

        assert_eq!(config.league.league_key, "469.l.40206");
        assert_eq!(config.league.team_key, "469.l.40206.t.6");
        assert_eq!(config.data.dir, base.join("data"));
        assert_eq!(config.data.stat_map, base.join("data/stat_map.json"));
        assert_eq!(config.waivers.ratio_mode, RatioMode::Protect);
        assert_eq!(
            config.waivers.default_pool,
            Some(base.join("data/waiver_pool_baseline.json"))
        );
        assert_eq!(config.waivers.default_sv_pool, None);
        assert_eq!(config.waivers.rank_top, 25);
        assert_eq!(config.service.port, 8787);
        assert_eq!(config.api_key(), None);

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn seeding_never_overwrites() {
        let base = seeded("gm_config_seed_twice");
        edit(&base, LEAGUE_FILE, "Wyncast Weekly", "Custom Name");

        assert!(seed_missing(&base).unwrap().is_empty());
        fs::remove_file(base.join("config").join(STRATEGY_FILE)).unwrap();
        assert_eq!(
            seed_missing(&base).unwrap(),
            vec![base.join("config").join(STRATEGY_FILE)]
        );
        assert_eq!(load_config_from(&base).unwrap().league.name, "Custom Name");
        assert!(!base.join("config").join(CREDENTIALS_FILE).exists());

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn absolute_paths_and_sv_pool() {
        let base = seeded("gm_config_absolute");
        let elsewhere = std::env::temp_dir().join("gm_config_elsewhere");
        edit(
            &base,
            STRATEGY_FILE,
            "dir = \"data\"",
            &format!("dir = {:?}", elsewhere.display().to_string()),
        );
        edit(
            &base,
            STRATEGY_FILE,
            "# default_sv_pool = \"data/rp_pool_baseline.json\"",
            "default_sv_pool = \"pools/rp.json\"",
        );

        let config = load_config_from(&base).unwrap();
        assert_eq!(config.data.dir, elsewhere);
        assert_eq!(
            config.waivers.default_sv_pool,
            Some(base.join("pools/rp.json"))
        );
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn waiver_section_is_optional() {
        let base = seeded("gm_config_no_waivers");
        let path = base.join("config").join(STRATEGY_FILE);
        fs::write(
            &path,
            "[data]\ndir = \"d\"\nstat_map = \"d/m.json\"\n\n[service]\nhost = \"0.0.0.0\"\nport = 9000\n",
        )
        .unwrap();

        let config = load_config_from(&base).unwrap();
        assert_eq!(config.waivers.ratio_mode, RatioMode::Protect);
        assert_eq!(config.waivers.default_pool, None);
        assert_eq!(config.waivers.rank_top, DEFAULT_RANK_TOP);
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn ratio_mode_is_case_insensitive() {
        let base = seeded("gm_config_push");
        edit(&base, STRATEGY_FILE, "ratio_mode = \"protect\"", "ratio_mode = \"Push\"");
        assert_eq!(
            load_config_from(&base).unwrap().waivers.ratio_mode,
            RatioMode::Push
        );
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn api_key_is_trimmed_and_blank_means_none() {
        let base = seeded("gm_config_api_key");
        let creds = base.join("config").join(CREDENTIALS_FILE);

        fs::write(&creds, "service_api_key = \" secret-key \"\n").unwrap();
        assert_eq!(load_config_from(&base).unwrap().api_key(), Some("secret-key"));

        fs::write(&creds, "service_api_key = \"  \"\n").unwrap();
        assert_eq!(load_config_from(&base).unwrap().api_key(), None);

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn invalid_fields_are_named() {
        let base = seeded("gm_config_invalid");

        edit(&base, LEAGUE_FILE, "team_key = \"469.l.40206.t.6\"", "team_key = \" \"");
        assert_eq!(invalid_field(&base), "league.team_key");
        edit(&base, LEAGUE_FILE, "team_key = \" \"", "team_key = \"469.l.40206.t.6\"");

        edit(&base, STRATEGY_FILE, "ratio_mode = \"protect\"", "ratio_mode = \"yolo\"");
        assert_eq!(invalid_field(&base), "waivers.ratio_mode");
        edit(&base, STRATEGY_FILE, "ratio_mode = \"yolo\"", "ratio_mode = \"protect\"");

        edit(&base, STRATEGY_FILE, "rank_top = 25", "rank_top = 0");
        assert_eq!(invalid_field(&base), "waivers.rank_top");
        edit(&base, STRATEGY_FILE, "rank_top = 0", "rank_top = 25");

        edit(&base, STRATEGY_FILE, "port = 8787", "port = 0");
        assert_eq!(invalid_field(&base), "service.port");

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn missing_and_malformed_files() {
        let base = seeded("gm_config_files");

        fs::remove_file(base.join("config").join(STRATEGY_FILE)).unwrap();
        match load_config_from(&base).unwrap_err() {
            ConfigError::Missing { path } => assert!(path.ends_with(STRATEGY_FILE)),
            other => panic!("expected Missing, got: {other}"),
        }

        seed_missing(&base).unwrap();
        fs::write(base.join("config").join(LEAGUE_FILE), "[league\nname = ").unwrap();
        match load_config_from(&base).unwrap_err() {
            ConfigError::Parse { path, .. } => assert!(path.ends_with(LEAGUE_FILE)),
            other => panic!("expected Parse, got: {other}"),
        }

        let _ = fs::remove_dir_all(&base);
    }
}
