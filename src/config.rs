use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::APP_NAME;

/// User configuration, read from `<config dir>/tabedit/config.toml`.
/// Every setting has a default; a missing or unreadable file is not an
/// error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// File extension used when discovering the data source in the working
    /// directory.
    pub extension: String,
    /// Ask for confirmation before deleting a record.
    pub confirm_delete: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extension: "db".to_string(),
            confirm_delete: true,
        }
    }
}

impl AppConfig {
    /// Load the configuration, falling back to defaults when the file is
    /// missing or malformed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => config,
                    Err(e) => {
                        log::warn!("ignoring malformed config {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                Err(_) => Self::default(),
            },
            None => Self::default(),
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
    }
}
