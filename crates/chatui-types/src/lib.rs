pub mod message;
pub mod session;
pub mod model;
pub mod event;
pub mod config;
pub mod error;
pub mod notice;

#[cfg(test)]
mod tests;

pub use error::ChatError;
pub type Result<T> = std::result::Result<T, ChatError>;
