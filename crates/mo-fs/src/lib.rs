//! Filesystem-backed persistence for MasteryOS.
//!
//! The whole application state lives in one YAML blob addressed by a fixed
//! key. Every save replaces it wholesale; loading tolerates missing fields and
//! falls back to defaults when the blob is absent or unreadable.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use mo_core::{
    AppState, CoreError, CoreResult, DayRecord, ExportPayload, IdentityProfile, LogEntry,
    StateRepository, Tab,
};

/// Default directory name for application data.
pub const DATA_DIR_NAME: &str = "masteryos";

/// Fixed key the state blob is stored under.
pub const STORAGE_KEY: &str = "mastery_os_v3";

/// Environment variable overriding the data directory.
pub const PATH_ENV_VAR: &str = "MASTERY_PATH";

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Filesystem-backed state repository.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at the provided directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the root path of the store.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve the default data path (~/.masteryos).
    pub fn default_path() -> CoreResult<PathBuf> {
        if let Some(dir) = dirs::home_dir() {
            return Ok(dir.join(format!(".{DATA_DIR_NAME}")));
        }
        Err(CoreError::Storage(
            "unable to determine a default data path".into(),
        ))
    }

    /// Check if the data directory exists.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Create the data directory layout.
    pub fn init(&self) -> CoreResult<()> {
        fs::create_dir_all(self.exports_dir()).map_err(storage)?;
        fs::create_dir_all(self.logs_dir()).map_err(storage)?;
        Ok(())
    }

    /// Path of the state blob.
    pub fn state_path(&self) -> PathBuf {
        self.root.join(format!("{STORAGE_KEY}.yaml"))
    }

    /// Fresh path for moving an unreadable blob aside. Never an existing file.
    pub fn quarantine_path(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S%3f");
        let mut target = self.root.join(format!("{STORAGE_KEY}.corrupt.{stamp}.yaml"));
        let mut attempt = 1u32;
        while target.exists() {
            target = self
                .root
                .join(format!("{STORAGE_KEY}.corrupt.{stamp}-{attempt}.yaml"));
            attempt += 1;
        }
        target
    }

    /// Directory for rolling log files.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Default directory for CSV exports.
    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }

    /// Read and parse the state blob, reporting every failure.
    pub fn read_state(&self) -> CoreResult<Option<AppState>> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(storage)?;
        parse_state(&contents).map(Some)
    }

    /// Serialize and replace the state blob.
    pub fn write_state(&self, state: &AppState) -> CoreResult<()> {
        fs::create_dir_all(&self.root).map_err(storage)?;
        let contents = render_state(state)?;
        let path = self.state_path();
        let staging = path.with_extension("yaml.tmp");
        fs::write(&staging, contents).map_err(storage)?;
        fs::rename(&staging, &path).map_err(storage)?;
        debug!(
            "event=state_save status=ok days={} log_entries={}",
            state.history.len(),
            state.event_log.len()
        );
        Ok(())
    }

    /// Write an export into `dir`, or the default exports directory.
    pub fn write_export(&self, dir: Option<&Path>, payload: &ExportPayload) -> CoreResult<PathBuf> {
        let dir = dir.map_or_else(|| self.exports_dir(), Path::to_path_buf);
        fs::create_dir_all(&dir).map_err(storage)?;
        let target = dir.join(&payload.file_name);
        fs::write(&target, &payload.contents).map_err(storage)?;
        Ok(target)
    }

    fn quarantine(&self) {
        let source = self.state_path();
        let target = self.quarantine_path();
        match fs::rename(&source, &target) {
            Ok(()) => warn!(
                "event=state_quarantine status=ok path={}",
                target.display()
            ),
            Err(err) => warn!("event=state_quarantine status=error error={err}"),
        }
    }
}

impl StateRepository for FsStore {
    fn load(&self) -> Option<AppState> {
        match self.read_state() {
            Ok(state) => state,
            Err(err) => {
                warn!("event=state_load status=error error={err}");
                self.quarantine();
                None
            }
        }
    }

    fn save(&self, state: &AppState) -> CoreResult<()> {
        self.write_state(state)
    }
}

/// On-disk shape of the state. Every field is optional so older blobs load.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    history: Option<BTreeMap<NaiveDate, DayRecord>>,
    event_log: Option<Vec<LogEntry>>,
    identity: Option<StoredIdentity>,
    active_tab: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredIdentity {
    vision: Option<String>,
    core_values: Option<Vec<String>>,
    non_negotiables: Option<Vec<String>>,
    anti_identity: Option<Vec<String>>,
    /// Written for readers of the file; recomputed from `xp` on load.
    level: Option<u64>,
    xp: Option<u64>,
}

impl StoredState {
    fn from_state(state: &AppState) -> Self {
        let identity = &state.identity;
        Self {
            history: Some(state.history.clone()),
            event_log: Some(state.event_log.clone()),
            identity: Some(StoredIdentity {
                vision: Some(identity.vision.clone()),
                core_values: Some(identity.core_values.clone()),
                non_negotiables: Some(identity.non_negotiables.clone()),
                anti_identity: Some(identity.anti_identity.clone()),
                level: Some(identity.level()),
                xp: Some(identity.xp()),
            }),
            active_tab: Some(state.active_tab.as_str().to_string()),
        }
    }

    fn into_state(self) -> AppState {
        let defaults = IdentityProfile::default();
        let stored = self.identity.unwrap_or_default();
        let identity = IdentityProfile::new(
            stored.vision.unwrap_or(defaults.vision),
            stored.core_values.unwrap_or(defaults.core_values),
            stored.non_negotiables.unwrap_or(defaults.non_negotiables),
            stored.anti_identity.unwrap_or(defaults.anti_identity),
        )
        .with_xp(stored.xp.unwrap_or(0));

        let active_tab = match self.active_tab {
            Some(value) => value.parse::<Tab>().unwrap_or_else(|_| {
                warn!("event=state_load field=activeTab status=defaulted value={value}");
                Tab::default()
            }),
            None => Tab::default(),
        };

        AppState {
            history: self.history.unwrap_or_default(),
            event_log: self.event_log.unwrap_or_default(),
            identity,
            active_tab,
        }
    }
}

fn parse_state(contents: &str) -> CoreResult<AppState> {
    let stored: StoredState = serde_yaml::from_str(contents).map_err(storage)?;
    Ok(stored.into_state())
}

fn render_state(state: &AppState) -> CoreResult<String> {
    serde_yaml::to_string(&StoredState::from_state(state)).map_err(storage)
}

fn storage(err: impl std::fmt::Display) -> CoreError {
    CoreError::Storage(err.to_string())
}

/// User configuration stored outside the data directory.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Data directory override.
    pub path: Option<String>,
    /// Log level for file logging.
    pub log_level: Option<String>,
}

fn config_path() -> CoreResult<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(DATA_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    Err(CoreError::Storage(
        "unable to determine config directory".into(),
    ))
}

/// Load the configuration file, or defaults when it does not exist.
pub fn load_config() -> CoreResult<AppConfig> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(&path).map_err(storage)?;
    serde_yaml::from_str(&contents).map_err(storage)
}

/// Persist the configuration file.
pub fn save_config(config: &AppConfig) -> CoreResult<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(storage)?;
    }
    let contents = serde_yaml::to_string(config).map_err(storage)?;
    fs::write(path, contents).map_err(storage)?;
    Ok(())
}

/// Record `path` as the data directory, keeping other settings.
pub fn set_config_path(path: &Path) -> CoreResult<()> {
    let mut config = load_config().unwrap_or_default();
    config.path = Some(path.to_string_lossy().to_string());
    save_config(&config)
}

/// Resolve the data directory: environment, then config file, then default.
pub fn resolve_data_path() -> CoreResult<PathBuf> {
    if let Ok(value) = std::env::var(PATH_ENV_VAR) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }

    let config = load_config()?;
    if let Some(path) = config.path {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    FsStore::default_path()
}
