use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

static DEFAULT_DB_NAME: &str = "eisen.sqlite3";
static ENV_DATA_DIR: &str = "EISEN_DATA_DIR";
static ENV_API_URL: &str = "EISEN_API_URL";
static ENV_SESSION: &str = "EISEN_SESSION";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "eisen", "eisen"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    db_path: PathBuf,
    remote: Option<RemoteConfig>,
}

/// Where the task service lives and which session cookie to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub session: Option<String>,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults.
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let config = Self::from_data_dir(data_dir)?;
        Ok(config.with_remote(resolve_remote(None, None)))
    }

    /// Construct [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join(DEFAULT_DB_NAME);
        Ok(Self {
            data_dir,
            db_path,
            remote: None,
        })
    }

    pub fn with_remote(mut self, remote: Option<RemoteConfig>) -> Self {
        self.remote = remote;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// `None` keeps every session anonymous and local.
    pub fn remote(&self) -> Option<&RemoteConfig> {
        self.remote.as_ref()
    }
}

/// Explicit values win over `EISEN_API_URL` / `EISEN_SESSION`.
pub fn resolve_remote(
    api_url_override: Option<String>,
    session_override: Option<String>,
) -> Option<RemoteConfig> {
    let base_url = api_url_override
        .or_else(|| env::var(ENV_API_URL).ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())?;
    let session = session_override
        .or_else(|| env::var(ENV_SESSION).ok())
        .filter(|value| !value.trim().is_empty());
    Some(RemoteConfig { base_url, session })
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-eisen");
        return Ok(dev_dir);
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".eisen"));
    }

    Ok(env::current_dir()?.join(".eisen"))
}
