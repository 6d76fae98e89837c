use std::path::PathBuf;

use crate::config::{AppConfig, SettingsManager};

/// Everything a command needs: settings, the runtime snapshot and the data directory.
pub struct Foundation {
    pub settings: SettingsManager,
    pub config: AppConfig,
    pub data_dir: PathBuf,
}

/// Load `.env`, open the settings file and build the runtime config.
pub fn init_foundation(data_dir_override: Option<PathBuf>) -> Result<Foundation, anyhow::Error> {
    load_dotenv();
    let dir = data_dir_override.unwrap_or_else(data_dir);
    std::fs::create_dir_all(&dir)?;

    let sm = SettingsManager::open(&dir)?;
    tracing::info!("Using settings at {}", sm.path().display());
    if let Err(e) = sm.migrate_from_env() {
        tracing::error!("Failed to migrate from env: {e}");
    }
    sm.initialize_defaults()?;

    let config = AppConfig::load(&sm)?;

    if let Ok(status) = sm.check_feature_status() {
        for warning in &status.warnings {
            tracing::warn!("{warning}");
        }
    }

    tracing::info!(
        model = config.printer_model.name,
        algorithm = %config.algorithm,
        "Settings loaded"
    );
    Ok(Foundation {
        settings: sm,
        config,
        data_dir: dir,
    })
}

fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CATPRINT_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".catprint")
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}
