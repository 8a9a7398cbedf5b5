use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ChatError, Result};

/// Top-level application configuration.
///
/// Passed by reference to every component that needs it; partial overrides
/// are applied with [`merge_config`] and checked with [`validate_config`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub app: AppInfo,
    pub features: FeatureFlags,
    pub ui: UiConfig,
    pub chat: ChatConfig,
    pub ollama: OllamaConfig,
    pub storage: StorageConfig,
    pub i18n: I18nConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppInfo::default(),
            features: FeatureFlags::default(),
            ui: UiConfig::default(),
            chat: ChatConfig::default(),
            ollama: OllamaConfig::default(),
            storage: StorageConfig::default(),
            i18n: I18nConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "ChatUI".to_string(),
            version: "2.0.0".to_string(),
            description: "Modern AI Chat Interface".to_string(),
        }
    }
}

/// Typed capability set. Components read the fields directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    pub chat_history: bool,
    pub model_selector: bool,
    pub dark_mode: bool,
    pub multi_language: bool,
    pub message_actions: bool,
    pub message_regeneration: bool,
    pub message_export: bool,
    pub image_upload: bool,
    pub timestamps: bool,
    pub suggested_prompts: bool,
    pub welcome_screen: bool,
    pub streaming: bool,
    pub auto_save: bool,
    pub debug_mode: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            chat_history: true,
            model_selector: true,
            dark_mode: true,
            multi_language: true,
            message_actions: true,
            message_regeneration: true,
            message_export: true,
            image_upload: true,
            timestamps: false,
            suggested_prompts: true,
            welcome_screen: true,
            streaming: true,
            auto_save: true,
            debug_mode: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiConfig {
    pub default_theme: Theme,
    pub sidebar_width: f32,
    pub max_messages_display: usize,
    pub show_timestamps: bool,
    pub max_input_length: usize,
    pub show_character_count: bool,
    pub submit_on_enter: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_theme: Theme::Auto,
            sidebar_width: 256.0,
            max_messages_display: 100,
            show_timestamps: false,
            max_input_length: 4000,
            show_character_count: false,
            submit_on_enter: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatConfig {
    /// Model used when nothing was selected before; empty picks the first listed
    pub default_model: String,
    /// Auto-save debounce in milliseconds, 0 disables
    pub auto_save_interval_ms: u32,
    pub max_chat_history: usize,
    pub streaming_chunk_size: usize,
    pub streaming_interval_ms: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: String::new(),
            auto_save_interval_ms: 2000,
            max_chat_history: 50,
            streaming_chunk_size: 2,
            streaming_interval_ms: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OllamaConfig {
    pub base_url: String,
    /// Time allowed for a chat request to start responding
    pub timeout_ms: u32,
    pub health_check_timeout_ms: u32,
    pub health_check_interval_ms: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_ms: 30_000,
            health_check_timeout_ms: 5_000,
            health_check_interval_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub backend: StorageBackendType,
    /// Upper bound for the serialized chat index
    pub quota_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Auto,
            quota_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackendType {
    /// Auto-detect best available backend
    Auto,
    Memory,
    LocalStorage,
    IndexedDb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct I18nConfig {
    pub default_language: String,
    pub supported_languages: Vec<String>,
    pub fallback_language: String,
    pub rtl_languages: Vec<String>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        let langs = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            default_language: "en".to_string(),
            supported_languages: langs(&["en", "es", "fr", "de", "zh", "ja", "ko", "ar", "he"]),
            fallback_language: "en".to_string(),
            rtl_languages: langs(&["ar", "he"]),
        }
    }
}

impl I18nConfig {
    pub fn is_rtl(&self, language: &str) -> bool {
        self.rtl_languages.iter().any(|l| l == language)
    }
}

/// Deep-merge a JSON patch onto `base`.
///
/// Objects merge key by key; arrays and scalars replace. `null` leaves the
/// base value untouched.
pub fn merge_config(base: &AppConfig, patch: &Value) -> Result<AppConfig> {
    let mut merged = serde_json::to_value(base)?;
    merge_values(&mut merged, patch);
    serde_json::from_value(merged).map_err(|e| ChatError::Config(vec![e.to_string()]))
}

fn merge_values(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (_, Value::Null) => {}
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_values(existing, value);
                    }
                    Some(_) if value.is_null() => {}
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Check a configuration; returns one human-readable message per violation.
pub fn validate_config(config: &AppConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if !config
        .i18n
        .supported_languages
        .contains(&config.i18n.default_language)
    {
        errors.push("Default language must be included in supported languages".to_string());
    }

    if config.ui.max_input_length < 1 {
        errors.push("Max input length must be greater than 0".to_string());
    }

    let auto_save = config.chat.auto_save_interval_ms;
    if auto_save != 0 && auto_save < 1000 {
        errors.push("Auto save interval must be at least 1000ms".to_string());
    }

    if config.chat.streaming_chunk_size < 1 {
        errors.push("Streaming chunk size must be at least 1".to_string());
    }

    if config.chat.streaming_interval_ms < 50 {
        errors.push("Streaming interval must be at least 50ms".to_string());
    }

    let url = &config.ollama.base_url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push("Server URL must start with http:// or https://".to_string());
    }

    if config.ollama.health_check_timeout_ms == 0 {
        errors.push("Health check timeout must be greater than 0".to_string());
    }

    errors
}
