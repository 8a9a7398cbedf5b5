use gloo_utils::errors::JsError;
use wasm_bindgen::JsValue;
use chatui_types::ChatError;

/// Name of a thrown JS error (`AbortError`, `QuotaExceededError`, ...)
pub(crate) fn error_name(value: &JsValue) -> Option<String> {
    JsError::try_from(value.clone()).ok().map(|e| e.name)
}

pub(crate) fn describe(value: &JsValue) -> String {
    match JsError::try_from(value.clone()) {
        Ok(e) => format!("{}: {}", e.name, e.message),
        Err(_) => format!("{:?}", value),
    }
}

pub(crate) fn interop(value: JsValue) -> ChatError {
    ChatError::JsInterop(describe(&value))
}

pub(crate) fn storage(value: JsValue) -> ChatError {
    ChatError::Storage(describe(&value))
}
