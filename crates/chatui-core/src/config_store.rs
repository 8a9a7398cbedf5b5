//! Persisted user settings layered over the defaults.

use std::rc::Rc;
use serde_json::Value;
use chatui_types::{
    ChatError, Result,
    config::{AppConfig, merge_config, validate_config},
};
use crate::ports::StoragePort;

pub const SETTINGS_KEY: &str = "chatui-user-settings";

pub struct ConfigStore {
    storage: Rc<dyn StoragePort>,
}

impl ConfigStore {
    pub fn new(storage: Rc<dyn StoragePort>) -> Self {
        Self { storage }
    }

    /// Defaults with the stored settings merged on top. Anything unreadable
    /// or invalid falls back to the defaults.
    pub async fn load(&self) -> AppConfig {
        let defaults = AppConfig::default();
        let stored = match self.storage.get(SETTINGS_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return defaults,
            Err(e) => {
                log::warn!("Failed to read settings, using defaults: {}", e);
                return defaults;
            }
        };

        let patch: Value = match serde_json::from_slice(&stored) {
            Ok(patch) => patch,
            Err(e) => {
                log::warn!("Stored settings are not valid JSON, using defaults: {}", e);
                return defaults;
            }
        };

        match merge_config(&defaults, &patch) {
            Ok(config) => {
                let errors = validate_config(&config);
                if errors.is_empty() {
                    config
                } else {
                    log::warn!("Stored settings rejected: {}", errors.join("; "));
                    defaults
                }
            }
            Err(e) => {
                log::warn!("Stored settings could not be applied: {}", e);
                defaults
            }
        }
    }

    /// Merge `patch` into `current`, validate, and persist.
    pub async fn update(&self, current: &AppConfig, patch: &Value) -> Result<AppConfig> {
        let merged = merge_config(current, patch)?;
        self.save(&merged).await?;
        Ok(merged)
    }

    pub async fn save(&self, config: &AppConfig) -> Result<()> {
        let errors = validate_config(config);
        if !errors.is_empty() {
            return Err(ChatError::Config(errors));
        }
        let bytes = serde_json::to_vec(config)?;
        self.storage.set(SETTINGS_KEY, &bytes).await?;
        log::debug!("Settings saved");
        Ok(())
    }

    /// Forget stored settings and return the defaults.
    pub async fn reset(&self) -> Result<AppConfig> {
        self.storage.delete(SETTINGS_KEY).await?;
        Ok(AppConfig::default())
    }
}
