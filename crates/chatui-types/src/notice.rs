//! Fixed user-facing messages.

use crate::ChatError;

/// Marker that prefixes error text rendered inside assistant messages
pub const ERROR_MARKER: &str = "❌";

pub const SERVER_OFFLINE: &str =
    "❌ Ollama server is not running. Please start your Ollama server and try again.";
pub const NO_MODELS: &str =
    "❌ No models found. Please install at least one model using \"ollama pull model-name\".";
pub const REQUEST_FAILED: &str = "❌ Failed to get response from Ollama server.";
pub const NETWORK_ERROR: &str = "❌ Network error. Please check your connection and try again.";
pub const MODEL_NOT_FOUND: &str =
    "❌ The selected model is not available. Please choose a different model.";
pub const TIMEOUT_ERROR: &str = "❌ Request timed out. Please try again.";

pub const CHAT_EXPORTED: &str = "✅ Chat exported successfully!";
pub const MODEL_CHANGED: &str = "✅ Model changed successfully!";

pub const SAVE_FAILED: &str = "Failed to save chat";
pub const DELETE_FAILED: &str = "Failed to delete chat";
pub const EXPORT_FAILED: &str = "Failed to export chats";
pub const IMPORT_FAILED: &str = "Failed to import chats";
pub const CHAT_NOT_FOUND: &str = "Chat not found";

/// Assistant-message content for a failed generation
pub fn error_content(error: &ChatError) -> String {
    match error {
        ChatError::Server { status: 404, .. } => MODEL_NOT_FOUND.to_string(),
        ChatError::Timeout(_) => TIMEOUT_ERROR.to_string(),
        other => format!("{} Error: {}", ERROR_MARKER, other),
    }
}

pub fn is_error_content(content: &str) -> bool {
    content.starts_with(ERROR_MARKER)
}
