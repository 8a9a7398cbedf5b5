//! ChatUI — WASM entry point.
//!
//! This crate is the composition root (DI wiring layer).
//! It loads the user settings, opens storage and hands the assembled
//! services to the egui app.

mod app;

use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use chatui_core::config_store::ConfigStore;
use chatui_core::ports::StoragePort;
use chatui_platform::storage::{open_storage, LocalStorage, MemoryStorage};

const CANVAS_ID: &str = "chatui_canvas";

/// WASM entry point, run when the module is instantiated
#[wasm_bindgen(start)]
pub async fn main() -> Result<(), JsValue> {
    // Everything is logged until the settings say otherwise
    wasm_logger::init(wasm_logger::Config::new(log::Level::Debug));

    // Settings always live in localStorage so the storage backend itself
    // can be configured
    let settings_storage: Rc<dyn StoragePort> = match LocalStorage::open() {
        Ok(local) => Rc::new(local),
        Err(e) => {
            log::warn!("Settings will not persist: {}", e);
            Rc::new(MemoryStorage::new())
        }
    };
    let config_store = ConfigStore::new(settings_storage);
    let config = config_store.load().await;

    let level = if config.features.debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    log::set_max_level(level);
    log::info!("{} {} starting...", config.app.name, config.app.version);

    let chat_storage = open_storage(config.storage.backend).await;

    let canvas = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(CANVAS_ID))
        .ok_or_else(|| JsValue::from_str(&format!("No canvas element with id '{}'", CANVAS_ID)))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str("Element is not a canvas"))?;

    let boot = app::Boot { config, config_store, chat_storage };
    let web_options = eframe::WebOptions::default();

    wasm_bindgen_futures::spawn_local(async move {
        let started = eframe::WebRunner::new()
            .start(
                canvas,
                web_options,
                Box::new(|cc| Ok(Box::new(app::ChatApp::new(cc, boot)))),
            )
            .await;
        if let Err(e) = started {
            log::error!("Failed to start eframe: {:?}", e);
        }
    });

    Ok(())
}
