//! Save text as a file through a temporary object URL.

use js_sys::Array;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use chatui_types::{ChatError, Result};
use crate::js;

/// Offer `contents` to the user as a download named `filename`.
pub fn download_text(filename: &str, contents: &str, mime_type: &str) -> Result<()> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| ChatError::JsInterop("No document".to_string()))?;

    let parts = Array::of1(&JsValue::from_str(contents));
    let options = BlobPropertyBag::new();
    options.set_type(mime_type);
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options).map_err(js::interop)?;
    let url = Url::create_object_url_with_blob(&blob).map_err(js::interop)?;

    let anchor: HtmlAnchorElement = document
        .create_element("a")
        .map_err(js::interop)?
        .dyn_into()
        .map_err(|_| ChatError::JsInterop("Created element is not an anchor".to_string()))?;
    anchor.set_href(&url);
    anchor.set_download(filename);
    anchor.click();

    if let Err(e) = Url::revoke_object_url(&url) {
        log::warn!("Failed to revoke object URL: {}", js::describe(&e));
    }
    log::info!("Downloaded {} ({} bytes)", filename, contents.len());
    Ok(())
}

/// `chat-export-2024-05-01.json`
pub fn export_filename(date: chrono::NaiveDate) -> String {
    format!("chat-export-{}.json", date.format("%Y-%m-%d"))
}
