//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

type DefTuple = (&'static str, &'static str, &'static str);

const DEFS: &[DefTuple] = &[
    ("PRINTER_MODEL", "GB01", "Printer model (GB01, GB02, GB03, GT01, MX05, MX06, YT01)"),
    ("MONO_ALGORITHM", "steinberg", "Dithering algorithm used for images"),
    ("THRESHOLD", "85", "Threshold / bias for the dithering algorithm (0-255)"),
    ("ENERGY", "64", "Print energy, also drives preview contrast (0-255)"),
    ("TRANSPARENT_AS_WHITE", "true", "Treat transparent pixels as white paper"),
    ("ROTATE", "false", "Rotate images 90 degrees so they print along the feed"),
    ("WRAP_BY_SPACE", "true", "Wrap text at word boundaries"),
    ("TEXT_SIZE", "20", "Font size in pixels for text jobs"),
    ("TEXT_ALIGN", "left", "Text alignment (left, center, right)"),
    ("FONT_PATH", "", "TTF/OTF font used for text jobs"),
    ("QUALITY", "36", "Print speed/quality byte (1-255)"),
    ("FLIP", "false", "Turn output 180 degrees for upside-down print heads"),
    ("DRY_RUN", "false", "Log jobs instead of spooling them"),
    ("SPOOL_DIR", "", "Directory jobs are spooled to (default: <data dir>/spool)"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::validate_setting;

    #[test]
    fn test_defaults_pass_validation() {
        for def in DEFAULT_SETTINGS.values() {
            assert!(
                validate_setting(def.key, def.default).is_ok(),
                "default for {} should be valid",
                def.key
            );
        }
    }

    #[test]
    fn test_threshold_default_is_a_third() {
        assert_eq!(get_default("THRESHOLD"), Some("85"));
        assert_eq!(get_default("NOPE"), None);
    }
}
