use std::path::Path;

use serde::{Deserialize, Serialize};

use blackbox_audio::SessionConfig;
use blackbox_foundation::AppError;
use blackbox_wake::WakeConfig;

/// Full application configuration. Everything has a default; a TOML file
/// and CLI flags override from there.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture device name (substring match); `None` means system default.
    pub device: Option<String>,
    pub session: SessionConfig,
    pub wake: WakeConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                toml::from_str(&raw)
                    .map_err(|e| AppError::Config(format!("invalid {}: {e}", path.display())))
            }
            None => Ok(Self::default()),
        }
    }
}
