pub mod chat;
pub mod notices;
pub mod settings;
pub mod sidebar;
