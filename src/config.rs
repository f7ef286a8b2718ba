/// Application configuration
///
/// Read once at startup from `<config dir>/photo-grid/config.json`, then
/// overridden by environment variables:
/// - `PHOTO_GRID_API_URL` - base URL of the photo API
/// - `PHOTO_GRID_MEMBER_ID` - member whose grid is shown
///
/// The resulting value is handed to the store client and the UI explicitly;
/// nothing reads the environment after startup.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::state::data::MemberId;
use crate::state::layout::{GridLayout, GAP};

pub const API_URL_VAR: &str = "PHOTO_GRID_API_URL";
pub const MEMBER_ID_VAR: &str = "PHOTO_GRID_MEMBER_ID";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Root of the photo API, without trailing slash
    pub api_base_url: String,
    /// Member whose grid is loaded on startup
    pub member_id: MemberId,
    /// Initial width of the grid surface in logical pixels
    pub surface_width: f32,
    /// Space between cells
    pub gap: f32,
    /// Per-request timeout for store calls
    pub request_timeout_secs: u64,
    /// Reload from the store after a failed delete or position save
    pub reload_after_mutation_error: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            member_id: MemberId(1),
            surface_width: 390.0,
            gap: GAP,
            request_timeout_secs: 30,
            reload_after_mutation_error: false,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Where the config file lives
    /// - Linux: ~/.config/photo-grid/config.json
    /// - macOS: ~/Library/Application Support/photo-grid/config.json
    /// - Windows: %APPDATA%\photo-grid\config.json
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("photo-grid");
        path.push("config.json");
        Some(path)
    }

    /// Read a config file; a missing file means defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("📁 Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply overrides looked up through `lookup` (the environment in production)
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(API_URL_VAR) {
            self.api_base_url = url;
        }
        if let Some(value) = lookup(MEMBER_ID_VAR) {
            let id = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidMemberId {
                    var: MEMBER_ID_VAR,
                    value: value.clone(),
                })?;
            self.member_id = MemberId(id);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Grid geometry for the configured surface width
    pub fn layout(&self) -> GridLayout {
        GridLayout::for_surface_width(self.surface_width, self.gap)
    }
}
