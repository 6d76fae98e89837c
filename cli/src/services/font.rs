//! Font lookup for text jobs.
//!
//! An explicit `FONT_PATH` wins; otherwise the first TTF/OTF file in
//! `<data_dir>/fonts` is used.

use std::path::{Path, PathBuf};

use ab_glyph::FontVec;

const MAX_FONT_SIZE: u64 = 50 * 1024 * 1024; // 50MB
const VALID_EXTENSIONS: &[&str] = &[".ttf", ".otf"];

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("Invalid font format (only TTF/OTF supported)")]
    InvalidFormat,
    #[error("Font file too large (max 50MB)")]
    FileTooLarge,
    #[error("No font configured: set FONT_PATH or drop a TTF/OTF into {0}")]
    NoFont(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct FontService {
    data_dir: PathBuf,
}

impl FontService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn fonts_dir(&self) -> PathBuf {
        self.data_dir.join("fonts")
    }

    /// Find the first installed font file, if any.
    fn find_installed_font(&self) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(self.fonts_dir())
            .ok()?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_font_extension(path))
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }

    /// Resolve the font file to use for `font_path` (may be empty).
    pub fn resolve(&self, font_path: &str) -> Result<PathBuf, FontError> {
        if !font_path.is_empty() {
            return Ok(PathBuf::from(font_path));
        }
        self.find_installed_font()
            .ok_or_else(|| FontError::NoFont(self.fonts_dir()))
    }

    /// Load and parse the font.
    pub fn load(&self, font_path: &str) -> Result<FontVec, FontError> {
        let path = self.resolve(font_path)?;
        if !has_font_extension(&path) {
            return Err(FontError::InvalidFormat);
        }
        if std::fs::metadata(&path)?.len() > MAX_FONT_SIZE {
            return Err(FontError::FileTooLarge);
        }
        let data = std::fs::read(&path)?;
        let font = FontVec::try_from_vec(data).map_err(|_| FontError::InvalidFormat)?;
        tracing::debug!(path = %path.display(), "Font loaded");
        Ok(font)
    }
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .is_some_and(|ext| VALID_EXTENSIONS.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let svc = FontService::new(dir.path().to_path_buf());
        assert_eq!(
            svc.resolve("/usr/share/fonts/x.ttf").unwrap(),
            PathBuf::from("/usr/share/fonts/x.ttf")
        );
    }

    #[test]
    fn test_installed_font_discovered() {
        let dir = tempfile::tempdir().unwrap();
        let fonts = dir.path().join("fonts");
        std::fs::create_dir_all(&fonts).unwrap();
        std::fs::write(fonts.join("readme.txt"), b"not a font").unwrap();
        std::fs::write(fonts.join("Mono.TTF"), b"fake").unwrap();

        let svc = FontService::new(dir.path().to_path_buf());
        assert_eq!(svc.resolve("").unwrap(), fonts.join("Mono.TTF"));
        // Right extension, bad contents
        assert!(matches!(svc.load(""), Err(FontError::InvalidFormat)));
    }

    #[test]
    fn test_no_font_configured() {
        let dir = tempfile::tempdir().unwrap();
        let svc = FontService::new(dir.path().to_path_buf());
        assert!(matches!(svc.load(""), Err(FontError::NoFont(_))));
    }

    #[test]
    fn test_wrong_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("font.woff2");
        std::fs::write(&path, b"x").unwrap();
        let svc = FontService::new(dir.path().to_path_buf());
        assert!(matches!(
            svc.load(path.to_str().unwrap()),
            Err(FontError::InvalidFormat)
        ));
    }
}
