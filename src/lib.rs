//! Note-taking backend with AI augmentation.
//!
//! - [`models`]: the `Note` entity and its external JSON representation.
//! - [`db`]: rusqlite-backed persistence with embedded migrations.
//! - [`ai`]: a thin client over an external chat-completion API providing
//!   key-information extraction, translation, and quiz generation.
//! - [`api`]: the axum router and HTTP handlers tying the layers together.

pub mod ai;
pub mod api;
pub mod db;
pub mod models;
