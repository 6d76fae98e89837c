//! Runtime application configuration loaded from the settings file + environment overrides.

use std::path::{Path, PathBuf};

use catprinter::{Model, PrinterOptions};
use catprinter::models::MODELS;
use image_processor::{Algorithm, Align, Parameters, TextStyle};

use super::manager::SettingsManager;

/// Runtime configuration populated from the settings file.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub printer_model: Model,
    pub algorithm: Algorithm,
    pub threshold: i64,
    pub energy: i64,
    pub transparent_as_white: bool,
    pub rotate: bool,
    pub wrap_by_space: bool,
    pub text_size: u32,
    pub text_align: Align,
    pub font_path: String,
    pub quality: u8,
    pub flip: bool,
    pub dry_run: bool,
    pub spool_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            printer_model: MODELS[0],
            algorithm: Algorithm::Steinberg,
            threshold: 85,
            energy: 64,
            transparent_as_white: true,
            rotate: false,
            wrap_by_space: true,
            text_size: 20,
            text_align: Align::Left,
            font_path: String::new(),
            quality: 36,
            flip: false,
            dry_run: false,
            spool_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the settings manager (file first, env overrides).
    pub fn load(sm: &SettingsManager) -> Result<Self, anyhow::Error> {
        let g = |key: &str| -> String {
            match std::env::var(key) {
                Ok(v) if !v.is_empty() => v,
                _ => sm.get_setting(key).unwrap_or_default(),
            }
        };
        let defaults = Self::default();

        let printer_model = match Model::lookup(&g("PRINTER_MODEL")) {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!("{e}, falling back to {}", defaults.printer_model);
                defaults.printer_model
            }
        };
        let algorithm = match g("MONO_ALGORITHM").parse::<Algorithm>() {
            Ok(algo) => algo,
            Err(e) => {
                tracing::warn!("{e}, falling back to {}", defaults.algorithm);
                defaults.algorithm
            }
        };
        let spool_dir = {
            let dir = g("SPOOL_DIR");
            if dir.is_empty() { None } else { Some(PathBuf::from(dir)) }
        };

        Ok(Self {
            printer_model,
            algorithm,
            threshold: parse_or(&g("THRESHOLD"), defaults.threshold),
            energy: parse_or(&g("ENERGY"), defaults.energy),
            transparent_as_white: g("TRANSPARENT_AS_WHITE") != "false",
            rotate: g("ROTATE") == "true",
            wrap_by_space: g("WRAP_BY_SPACE") != "false",
            text_size: parse_or(&g("TEXT_SIZE"), defaults.text_size),
            text_align: g("TEXT_ALIGN").parse().unwrap_or(defaults.text_align),
            font_path: g("FONT_PATH"),
            quality: parse_or(&g("QUALITY"), defaults.quality),
            flip: g("FLIP") == "true",
            dry_run: g("DRY_RUN") == "true",
            spool_dir,
        })
    }

    /// Pipeline parameters for image jobs.
    pub fn parameters(&self) -> Parameters {
        Parameters::new()
            .with_algorithm(self.algorithm)
            .with_threshold(self.threshold)
            .with_energy(self.energy)
            .with_transparent_as_white(self.transparent_as_white)
            .with_rotate(self.rotate)
            .with_flip(self.flip)
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            font_size: self.text_size,
            align: self.text_align,
            wrap_by_spaces: self.wrap_by_space,
        }
    }

    /// Options handed to the backend with a job printed using `params`.
    pub fn printer_options(&self, params: &Parameters) -> catprinter::Result<PrinterOptions> {
        Ok(PrinterOptions::new()
            .with_quality(self.quality)?
            .with_energy(i64::from(params.energy))
            .with_flip(params.flip)
            .with_dry_run(self.dry_run))
    }

    /// Spool directory, defaulting to `<data_dir>/spool`.
    pub fn spool_dir_or(&self, data_dir: &Path) -> PathBuf {
        self.spool_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("spool"))
    }
}

fn parse_or<T: std::str::FromStr>(s: &str, default: T) -> T {
    if s.is_empty() {
        return default;
    }
    s.trim().parse().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_from_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let sm = SettingsManager::open(dir.path()).unwrap();
        let cfg = AppConfig::load(&sm).unwrap();
        assert_eq!(cfg.printer_model.name, "GB01");
        assert_eq!(cfg.algorithm, Algorithm::Steinberg);
        assert_eq!(cfg.threshold, 85);
        assert!(cfg.transparent_as_white);
        assert_eq!(cfg.spool_dir_or(dir.path()), dir.path().join("spool"));
    }

    #[test]
    fn test_parameters_cap_out_of_range_values() {
        let cfg = AppConfig {
            threshold: 999,
            energy: -3,
            algorithm: Algorithm::NewV,
            ..AppConfig::default()
        };
        let p = cfg.parameters();
        assert_eq!(p.threshold, 255);
        assert_eq!(p.energy, 0);
        assert_eq!(p.algorithm, Algorithm::NewV);
    }

    #[test]
    fn test_printer_options_follow_params() {
        let cfg = AppConfig {
            quality: 50,
            dry_run: true,
            ..AppConfig::default()
        };
        let params = Parameters::new().with_energy(96).with_flip(true);
        let opts = cfg.printer_options(&params).unwrap();
        assert_eq!(opts.quality, 50);
        assert_eq!(opts.energy, 96);
        assert!(opts.flip);
        assert!(opts.dry_run);
    }

    #[test]
    fn test_printer_options_reject_zero_quality() {
        let cfg = AppConfig {
            quality: 0,
            ..AppConfig::default()
        };
        assert!(cfg.printer_options(&Parameters::new()).is_err());
    }

    #[test]
    fn test_parse_or_fallback() {
        assert_eq!(parse_or("", 7u32), 7);
        assert_eq!(parse_or("x", 7u32), 7);
        assert_eq!(parse_or(" 12 ", 7u32), 12);
    }
}
