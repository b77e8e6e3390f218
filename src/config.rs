use crate::chat::GeminiConfig;
use crate::chat::gemini::{DEFAULT_MODEL, GEMINI_BASE_URL};
#[cfg(feature = "sqlite")]
use crate::persistence::sqlite::SqliteStore;
#[cfg(not(feature = "sqlite"))]
use crate::persistence::PersistenceError;
use crate::persistence::{JsonFileStore, KeyValueStore, PersistenceResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub const DATA_DIR_VAR: &str = "STUDY_HUB_DATA_DIR";
pub const SQLITE_VAR: &str = "STUDY_HUB_SQLITE";
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "STUDY_HUB_MODEL";
pub const API_BASE_VAR: &str = "STUDY_HUB_API_BASE";
pub const TICK_SECS_VAR: &str = "STUDY_HUB_TICK_SECS";
pub const HTTP_ADDR_VAR: &str = "STUDY_HUB_HTTP_ADDR";
pub const STUDENT_NAME_VAR: &str = "STUDY_HUB_STUDENT";

pub type SharedStore = Box<dyn KeyValueStore + Send + Sync>;

const DEFAULT_DATA_DIR: &str = "study-hub-data";
const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_TICK_SECS: u64 = 10;
const MIN_TICK_SECS: u64 = 1;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory for the JSON file store
    pub data_dir: PathBuf,
    /// When set (and built with `sqlite`), state lives in this database instead
    pub sqlite_path: Option<PathBuf>,
    pub gemini: GeminiConfig,
    /// Period of the dashboard status refresh
    pub tick_interval: Duration,
    pub http_addr: String,
    pub student_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            sqlite_path: None,
            gemini: GeminiConfig::default(),
            tick_interval: Duration::from_secs(DEFAULT_TICK_SECS),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            student_name: "there".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source. Blank values count as unset;
    /// an unparsable tick period falls back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let tick_secs = get(TICK_SECS_VAR)
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TICK_SECS)
            .max(MIN_TICK_SECS);

        Self {
            data_dir: get(DATA_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            sqlite_path: get(SQLITE_VAR).map(PathBuf::from),
            gemini: GeminiConfig {
                base_url: get(API_BASE_VAR).unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
                model: get(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                api_key: get(API_KEY_VAR),
            },
            tick_interval: Duration::from_secs(tick_secs),
            http_addr: get(HTTP_ADDR_VAR).unwrap_or(defaults.http_addr),
            student_name: get(STUDENT_NAME_VAR).unwrap_or(defaults.student_name),
        }
    }
}

/// Open the configured backend: SQLite when a database path is set,
/// otherwise one JSON file per key under the data directory.
pub fn open_store(config: &AppConfig) -> PersistenceResult<SharedStore> {
    if let Some(path) = &config.sqlite_path {
        return open_sqlite(path);
    }
    info!(dir = %config.data_dir.display(), "using json file store");
    Ok(Box::new(JsonFileStore::new(&config.data_dir)?))
}

#[cfg(feature = "sqlite")]
fn open_sqlite(path: &Path) -> PersistenceResult<SharedStore> {
    info!(path = %path.display(), "using sqlite store");
    Ok(Box::new(SqliteStore::new(path)?))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_path: &Path) -> PersistenceResult<SharedStore> {
    Err(PersistenceError::InvalidData(format!(
        "{SQLITE_VAR} is set but sqlite support is not compiled in"
    )))
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
