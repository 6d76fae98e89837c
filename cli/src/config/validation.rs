//! Setting value validation.

use catprinter::Model;
use image_processor::{Algorithm, Align};

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "PRINTER_MODEL" => {
            Model::lookup(value).map_err(|e| e.to_string())?;
        }
        "MONO_ALGORITHM" => {
            value.parse::<Algorithm>().map_err(|e| e.to_string())?;
        }
        // Any integer; out-of-range values are capped by the pipeline
        "THRESHOLD" | "ENERGY" => {
            value.trim().parse::<i64>().map_err(|_| "must be an integer")?;
        }
        "TEXT_SIZE" => validate_int_range(value, 4, 256)?,
        "TEXT_ALIGN" => {
            value.parse::<Align>()?;
        }
        "QUALITY" => validate_int_range(value, 1, 255)?,
        "FONT_PATH" | "SPOOL_DIR" => {
            if value.len() > 4096 {
                return Err("path is too long".into());
            }
        }
        // Boolean settings
        k if is_boolean_setting(k) => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.trim().parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}

pub(crate) fn is_boolean_setting(key: &str) -> bool {
    matches!(
        key,
        "TRANSPARENT_AS_WHITE" | "ROTATE" | "WRAP_BY_SPACE" | "FLIP" | "DRY_RUN"
    )
}
