//! egui front end for ChatUI.
//!
//! Panels render from [`state::UiState`] and hand user intent back to the
//! app as action enums; they never touch the runtime directly.

pub mod panels;
pub mod state;
pub mod theme;
