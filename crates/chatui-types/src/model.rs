use serde::{Deserialize, Serialize};

/// A model installed on the inference server, as listed by `/api/tags`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub modified_at: String,
}

impl ModelInfo {
    /// "llama3-instruct:8b" -> "LLAMA3 INSTRUCT"
    pub fn display_name(&self) -> String {
        self.name
            .split(':')
            .next()
            .unwrap_or_default()
            .replace('-', " ")
            .to_uppercase()
    }

    /// Size in the largest fitting binary unit, rounded to two decimals
    pub fn human_size(&self) -> String {
        const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
        if self.size == 0 {
            return "0 Bytes".to_string();
        }
        let mut value = self.size as f64;
        let mut unit = 0;
        while value >= 1024.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        let rounded = (value * 100.0).round() / 100.0;
        format!("{} {}", rounded, UNITS[unit])
    }

    pub fn is_vision(&self) -> bool {
        is_vision_model(&self.name)
    }
}

const VISION_MARKERS: &[&str] = &[
    "llava", "bakllava", "moondream", "llava-llama3", "llava-phi3",
    "minicpm-v", "cogvlm", "yi-vl", "qwen-vl", "internvl",
    "vila", "ferret", "lynx", "vision", "visual", "image", "multimodal", "mm",
];

/// Name-based guess whether a model accepts image input
pub fn is_vision_model(model_name: &str) -> bool {
    let lower = model_name.to_lowercase();
    VISION_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Model to select after listing: the last used one if still installed,
/// then the configured default, then the first listed.
pub fn pick_model<'a>(models: &'a [ModelInfo], last_used: Option<&str>, default: &str) -> Option<&'a str> {
    let installed = |name: &str| models.iter().find(|m| m.name == name).map(|m| m.name.as_str());
    last_used
        .and_then(installed)
        .or_else(|| installed(default))
        .or_else(|| models.first().map(|m| m.name.as_str()))
}

/// Reachability of the inference server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Checking,
    Online,
    Offline,
}
