//! Configuration management: defaults, validation, loading from the settings file + environment.

pub mod app_config;
pub mod defaults;
pub mod manager;
pub mod validation;

pub use app_config::AppConfig;
pub use manager::SettingsManager;

use serde::{Deserialize, Serialize};

/// A setting as listed by `catprint settings list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingInfo {
    pub key: String,
    pub value: String,
    pub description: String,
    pub has_value: bool,
    /// Value differs from the built-in default.
    pub customized: bool,
}

/// Readiness of optional features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureStatus {
    pub font_configured: bool,
    pub spool_configured: bool,
    pub warnings: Vec<String>,
}
