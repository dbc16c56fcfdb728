//! Configuration module.
//!
//! Provides `AppConfig` (input shape, output profile and pool sizing),
//! `AppPaths` for the platform config directory, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, InputConfig, PipelineSettings, PoolConfig};
