// src/infra/paths.rs — XDG-compliant path management
//
// All paths respect the EVEAPI_HOME environment variable for isolation.
// When EVEAPI_HOME is set, config and data live under that directory.
// When unset, config uses ~/.eveapi/ and data uses XDG_DATA_HOME/eveapi.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;
use std::sync::OnceLock;

static PROJECT_DIRS: OnceLock<Option<ProjectDirs>> = OnceLock::new();

fn project_dirs() -> Option<&'static ProjectDirs> {
    PROJECT_DIRS
        .get_or_init(|| ProjectDirs::from("", "", "eveapi"))
        .as_ref()
}

/// Returns the EVEAPI_HOME override, if set.
fn eveapi_home() -> Option<PathBuf> {
    std::env::var_os("EVEAPI_HOME").map(PathBuf::from)
}

/// Home directory, falling back to the working directory when it can't be
/// determined (containers without a passwd entry).
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $EVEAPI_HOME/ or ~/.eveapi/
pub fn config_dir() -> PathBuf {
    if let Some(home) = eveapi_home() {
        return home;
    }
    dirs_home().join(".eveapi")
}

/// Data directory: $EVEAPI_HOME/data/ or ~/.local/share/eveapi/
pub fn data_dir() -> PathBuf {
    if let Some(home) = eveapi_home() {
        return home.join("data");
    }
    match project_dirs() {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => config_dir().join("data"),
    }
}

/// Database path
pub fn db_path() -> PathBuf {
    data_dir().join("eveapi.db")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// HTTP response caches
pub fn cache_dir() -> PathBuf {
    data_dir().join("cache")
}

pub fn xml_cache_dir() -> PathBuf {
    cache_dir().join("xml")
}

pub fn esi_cache_dir() -> PathBuf {
    cache_dir().join("esi")
}

/// Daemon PID file
pub fn pid_path() -> PathBuf {
    data_dir().join("daemon.pid")
}

/// Ensure all required directories exist
pub async fn ensure_dirs() -> anyhow::Result<()> {
    let dirs = [
        config_dir(),
        data_dir(),
        cache_dir(),
        xml_cache_dir(),
        esi_cache_dir(),
    ];

    for dir in &dirs {
        tokio::fs::create_dir_all(dir).await?;
    }

    Ok(())
}
