//! Rendering only. Widgets read [`crate::state::AppState`] and report user
//! input as [`crate::events::Event`]s.

pub mod chart;
pub mod map;
pub mod panels;
