//! zo grid bot: supervisor, configuration and process surface.
//!
//! Orchestrates the per-tick pipeline: indicator engine -> risk gate
//! -> (if admitted) grid controller; denied ticks withdraw the ladder
//! and flatten instead.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;

pub use app::Application;
pub use config::BotConfig;
pub use error::{AppError, AppResult};
