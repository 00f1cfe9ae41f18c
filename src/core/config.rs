/// Sheet configuration, loaded from RON with environment overrides.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::selector::DEFAULT_SCENE_COUNT;

/// Environment variable a host sets to inject the default endpoint.
/// Browser pages set a global of the same name.
pub const ENDPOINT_ENV: &str = "RP_SHEET_ENDPOINT";

/// Name existing page configs use for the injected endpoint. Read when
/// [`ENDPOINT_ENV`] is absent or empty.
pub const LEGACY_ENDPOINT_ENV: &str = "BALLAS_SHEETS_ENDPOINT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Submission sink used when no override is stored.
    #[serde(default)]
    pub default_endpoint: String,
    /// Root directory of the file-backed store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_scene_count")]
    pub scene_count: usize,
    /// Date the DOB age check is measured against.
    #[serde(default = "default_age_reference")]
    pub age_reference: NaiveDate,
    /// Shows the endpoint field and lets the user edit it.
    #[serde(default)]
    pub setup_mode: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".rp_sheet")
}

fn default_scene_count() -> usize {
    DEFAULT_SCENE_COUNT
}

fn default_age_reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            default_endpoint: String::new(),
            data_dir: default_data_dir(),
            scene_count: default_scene_count(),
            age_reference: default_age_reference(),
            setup_mode: false,
        }
    }
}

impl SheetConfig {
    /// Load a config from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<SheetConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config from a RON string. Missing fields take defaults.
    pub fn parse_ron(input: &str) -> Result<SheetConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    /// Apply the host-injected endpoint, if the environment provides one.
    pub fn with_env_overrides(self) -> Self {
        let current = std::env::var(ENDPOINT_ENV).ok();
        let legacy = std::env::var(LEGACY_ENDPOINT_ENV).ok();
        self.with_injected_endpoints(&[current.as_deref(), legacy.as_deref()])
    }

    /// Replace the default endpoint with a non-empty injected value.
    pub fn with_injected_endpoint(self, injected: Option<&str>) -> Self {
        self.with_injected_endpoints(&[injected])
    }

    /// Like [`Self::with_injected_endpoint`], taking the first non-empty
    /// candidate.
    pub fn with_injected_endpoints(mut self, candidates: &[Option<&str>]) -> Self {
        let injected = candidates
            .iter()
            .flatten()
            .map(|u| u.trim())
            .find(|u| !u.is_empty());
        if let Some(url) = injected {
            self.default_endpoint = url.to_string();
        }
        self
    }
}
