//! Platform-independent chat core.
//!
//! Everything that talks to the outside world goes through the port traits
//! in [`ports`]; the browser adapters live in `chatui-platform`.

pub mod ports;
pub mod event_bus;
pub mod stream_parser;
pub mod streaming_buffer;
pub mod client;
pub mod runtime;
pub mod chat_store;
pub mod autosave;
pub mod history;
pub mod config_store;


pub use event_bus::EventBus;
pub use tokio_util::sync::CancellationToken;
pub use runtime::{ChatRuntime, ChatState, SendOutcome};
