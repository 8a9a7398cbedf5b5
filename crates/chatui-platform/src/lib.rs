//! Browser adapters for the chatui-core ports.
//!
//! - [`llm::OllamaClient`]: `OllamaPort` over `fetch` (gloo-net)
//! - [`storage`]: `StoragePort` over IndexedDB, localStorage or memory
//! - [`timer::BrowserTimer`]: `TimerPort` over `setTimeout` (gloo-timers)
//! - [`download`]: file download for chat exports

pub mod download;
pub mod llm;
pub mod storage;
pub mod timer;

mod js;
