// Config service module
// Locates, reads and writes the host's config.toml

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::AppConfig;

const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "appointments.db";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "AppointmentGrid", "AppointmentGrid")
}

/// Default location of `config.toml` in the per-user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Database path used when the config does not name one.
///
/// Debug builds keep the store next to the working directory.
pub fn default_database_path() -> PathBuf {
    #[cfg(debug_assertions)]
    {
        PathBuf::from(DATABASE_FILE_NAME)
    }

    #[cfg(not(debug_assertions))]
    {
        match project_dirs() {
            Some(dirs) => {
                let data_dir = dirs.data_dir();
                if let Err(e) = fs::create_dir_all(data_dir) {
                    log::warn!("Failed to create data directory {}: {}", data_dir.display(), e);
                }
                data_dir.join(DATABASE_FILE_NAME)
            }
            None => PathBuf::from(DATABASE_FILE_NAME),
        }
    }
}

/// Reads and validates a config file.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
    Ok(config)
}

/// Loads `path`, falling back to defaults when it is absent or unusable.
pub fn load_or_default(path: Option<&Path>) -> AppConfig {
    let Some(path) = path else {
        return AppConfig::default();
    };

    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return AppConfig::default();
    }

    match load_from(path) {
        Ok(config) => {
            log::info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            log::warn!("{:#}, using defaults", e);
            AppConfig::default()
        }
    }
}

pub fn save_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
