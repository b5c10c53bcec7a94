// Configuration loading and parsing (config/propcast.toml).

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the single config file inside `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "propcast.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error(
        "data directory {path} does not exist; the project was not installed correctly \
         (re-run the installation steps in the README)"
    )]
    MissingDataDir { path: PathBuf },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Contest site
// ---------------------------------------------------------------------------

/// Daily-fantasy site whose scoring rules and salary file format apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestSite {
    DraftKings,
    FanDuel,
}

impl ContestSite {
    /// Lowercase key used in file names and config (`draftkings`, `fanduel`).
    pub fn key(self) -> &'static str {
        match self {
            ContestSite::DraftKings => "draftkings",
            ContestSite::FanDuel => "fanduel",
        }
    }
}

impl fmt::Display for ContestSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContestSite::DraftKings => write!(f, "DraftKings"),
            ContestSite::FanDuel => write!(f, "FanDuel"),
        }
    }
}

/// Contest format. Single-game (showdown) slates read and write `-sg` files
/// and carry captain columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlateMode {
    #[default]
    MainSlate,
    SingleGame,
}

impl SlateMode {
    /// File-name suffix for this mode (`""` or `"-sg"`).
    pub fn suffix(self) -> &'static str {
        match self {
            SlateMode::MainSlate => "",
            SlateMode::SingleGame => "-sg",
        }
    }
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub site: SiteConfig,
    pub scrape: ScrapeConfig,
    pub polling: PollingConfig,
    pub tracker: TrackerConfig,
    pub paths: ResolvedPaths,
}

/// Raw deserialization target for the entire propcast.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    site: SiteConfig,
    scrape: ScrapeConfig,
    polling: PollingConfig,
    #[serde(default)]
    tracker: TrackerConfig,
    paths: PathsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: ContestSite,
    /// Line value at or above which a stat counts toward the
    /// double-double / triple-double bonus.
    #[serde(default = "default_bonus_threshold")]
    pub bonus_threshold: f64,
    /// Skip players listed at the site's minimum salary.
    #[serde(default)]
    pub drop_minimums: bool,
    #[serde(default)]
    pub mode: SlateMode,
}

fn default_bonus_threshold() -> f64 {
    9.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    pub directory_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// How many days back a dated section may be and still be used as a
    /// stale fallback line.
    #[serde(default = "default_stale_window_days")]
    pub stale_window_days: i64,
}

fn default_stale_window_days() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    #[serde(default)]
    pub max_iterations: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackerConfig {
    /// Minutes added to the wall clock when stamping scrape times.
    #[serde(default)]
    pub clock_offset_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct PathsSection {
    #[serde(default)]
    data_dir: Option<String>,
    /// Defaults to `current-<site>[-sg].csv`.
    #[serde(default)]
    slate: Option<String>,
    #[serde(default)]
    injuries: Option<String>,
    #[serde(default)]
    name_overrides: Option<String>,
    tracker_db: String,
}

/// File locations with relative entries already joined onto the data dir.
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub data_dir: PathBuf,
    pub slate: PathBuf,
    pub injuries: Option<PathBuf>,
    /// Local `name,canonical` player-name aliases.
    pub name_overrides: Option<PathBuf>,
    pub tracker_db: PathBuf,
}

impl ResolvedPaths {
    pub fn projections_dir(&self) -> PathBuf {
        self.data_dir.join("projections")
    }

    pub fn directory_cache(&self) -> PathBuf {
        self.data_dir.join("url-directory.csv")
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/propcast.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let data_dir = match file.paths.data_dir.as_deref() {
        Some(dir) => resolve(base_dir, dir),
        None => default_data_dir().ok_or_else(|| ConfigError::ValidationError {
            field: "paths.data_dir".into(),
            message: "not set and no platform data directory is available".into(),
        })?,
    };

    let slate = file.paths.slate.clone().unwrap_or_else(|| {
        format!("current-{}{}.csv", file.site.name.key(), file.site.mode.suffix())
    });
    let paths = ResolvedPaths {
        slate: resolve(&data_dir, &slate),
        injuries: file.paths.injuries.as_deref().map(|p| resolve(&data_dir, p)),
        name_overrides: file.paths.name_overrides.as_deref().map(|p| resolve(&data_dir, p)),
        tracker_db: resolve(&data_dir, &file.paths.tracker_db),
        data_dir,
    };

    let config = Config {
        site: file.site,
        scrape: file.scrape,
        polling: file.polling,
        tracker: file.tracker,
        paths,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure `config/propcast.toml` exists by copying it from `defaults/`.
/// Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let source = defaults_dir.join(CONFIG_FILE);
    let target = config_dir.join(CONFIG_FILE);
    if !source.is_file() || target.exists() {
        return Ok(vec![]);
    }

    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", source.display()),
    })?;

    Ok(vec![target])
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures the default config file is copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn resolve(base: &Path, entry: &str) -> PathBuf {
    let p = Path::new(entry);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn default_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "propcast").map(|dirs| dirs.data_dir().to_path_buf())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if !config.paths.data_dir.is_dir() {
        return Err(ConfigError::MissingDataDir {
            path: config.paths.data_dir.clone(),
        });
    }

    let threshold = config.site.bonus_threshold;
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(ConfigError::ValidationError {
            field: "site.bonus_threshold".into(),
            message: format!("must be a positive number, got {threshold}"),
        });
    }

    if config.scrape.directory_url.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "scrape.directory_url".into(),
            message: "must not be empty".into(),
        });
    }

    if config.scrape.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "scrape.request_timeout_secs".into(),
            message: "must be > 0".into(),
        });
    }

    if config.scrape.stale_window_days < 0 {
        return Err(ConfigError::ValidationError {
            field: "scrape.stale_window_days".into(),
            message: format!("must be >= 0, got {}", config.scrape.stale_window_days),
        });
    }

    let polling = &config.polling;
    if polling.min_delay_secs > polling.max_delay_secs {
        return Err(ConfigError::ValidationError {
            field: "polling.min_delay_secs".into(),
            message: format!(
                "must not exceed polling.max_delay_secs ({} > {})",
                polling.min_delay_secs, polling.max_delay_secs
            ),
        });
    }

    if polling.max_iterations == Some(0) {
        return Err(ConfigError::ValidationError {
            field: "polling.max_iterations".into(),
            message: "must be > 0 when set".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
