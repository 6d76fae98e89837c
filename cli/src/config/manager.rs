//! SettingsManager: file-backed settings with defaults, migration, and feature status.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;

use super::defaults::DEFAULT_SETTINGS;
use super::validation::validate_setting;
use super::{FeatureStatus, SettingInfo};

const SETTINGS_FILE: &str = "settings.json";

/// Settings stored as a flat JSON object in `<data_dir>/settings.json`.
#[derive(Clone)]
pub struct SettingsManager {
    path: PathBuf,
    values: Arc<Mutex<BTreeMap<String, String>>>,
}

impl SettingsManager {
    /// Open the settings file in `data_dir`, starting empty if it does not exist.
    pub fn open(data_dir: &Path) -> Result<Self, anyhow::Error> {
        let path = data_dir.join(SETTINGS_FILE);
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: Arc::new(Mutex::new(values)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stored(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("settings lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&*values)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Get a setting value. Falls back to default if not stored.
    pub fn get_setting(&self, key: &str) -> Result<String, anyhow::Error> {
        if let Some(val) = self.stored(key)? {
            return Ok(val);
        }
        if let Some(def) = DEFAULT_SETTINGS.get(key) {
            return Ok(def.default.to_string());
        }
        anyhow::bail!("setting not found: {key}");
    }

    /// Set a setting value with validation.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        if !DEFAULT_SETTINGS.contains_key(key) {
            anyhow::bail!("unknown setting key: {key}");
        }
        validate_setting(key, value)
            .map_err(|e| anyhow::anyhow!("validation error for {key}: {e}"))?;
        self.store(key, value)?;
        tracing::debug!(key, value, "Setting updated");
        Ok(())
    }

    /// Get all known settings, filling in defaults for missing keys.
    pub fn get_all_settings(&self) -> Result<HashMap<String, SettingInfo>, anyhow::Error> {
        let mut result = HashMap::new();
        for (key, def) in DEFAULT_SETTINGS.iter() {
            let value = self.get_setting(key)?;
            result.insert(
                key.to_string(),
                SettingInfo {
                    key: key.to_string(),
                    has_value: !value.is_empty(),
                    customized: value != def.default,
                    description: def.description.to_string(),
                    value,
                },
            );
        }
        Ok(result)
    }

    /// Write defaults for every key not yet stored.
    pub fn initialize_defaults(&self) -> Result<(), anyhow::Error> {
        for (key, def) in DEFAULT_SETTINGS.iter() {
            if self.stored(key)?.is_some() {
                continue;
            }
            self.store(key, def.default)?;
        }
        Ok(())
    }

    /// Copy settings from environment variables into the file (one-time).
    ///
    /// Only keys that are not stored yet are considered; invalid values are
    /// skipped with a warning.
    pub fn migrate_from_env(&self) -> Result<u32, anyhow::Error> {
        let mut migrated = 0u32;
        for key in DEFAULT_SETTINGS.keys() {
            if self.stored(key)?.is_some() {
                continue;
            }
            if let Ok(env_val) = std::env::var(key) {
                if env_val.is_empty() {
                    continue;
                }
                if let Err(e) = validate_setting(key, &env_val) {
                    tracing::warn!("Ignoring {key} from env: {e}");
                    continue;
                }
                self.store(key, &env_val)?;
                tracing::info!("Migrated setting from env: {key}");
                migrated += 1;
            }
        }
        if migrated > 0 {
            tracing::info!("Migration completed: {migrated} settings migrated");
        }
        Ok(migrated)
    }

    /// Check which optional features are configured.
    pub fn check_feature_status(&self) -> Result<FeatureStatus, anyhow::Error> {
        let mut status = FeatureStatus {
            font_configured: !self.get_setting("FONT_PATH")?.is_empty(),
            spool_configured: !self.get_setting("SPOOL_DIR")?.is_empty(),
            warnings: Vec::new(),
        };
        if self.get_setting("DRY_RUN")? == "true" {
            status
                .warnings
                .push("DRY_RUN is enabled - jobs are logged, not spooled".into());
        }
        if self.get_setting("MONO_ALGORITHM")? == "halftone" {
            status
                .warnings
                .push("halftone is not implemented - output stays undithered".into());
        }
        Ok(status)
    }
}
