//! Hand-off of finished jobs to the print-sending backend.
//!
//! A job is a `<stamp>.pbm` bitmap plus a `<stamp>.json` file holding its
//! [`PrinterOptions`]. The backend watches the spool directory; in dry-run
//! mode nothing is written and the job is only logged.

use std::path::PathBuf;

use anyhow::Context;
use catprinter::PrinterOptions;
use image_processor::PackedBitmap;

/// Writes jobs into a spool directory.
#[derive(Debug, Clone)]
pub struct Spooler {
    dir: PathBuf,
}

impl Spooler {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Spool a job. Returns the path of the written bitmap, or `None` in dry-run mode.
    pub fn submit(
        &self,
        bitmap: &PackedBitmap,
        options: &PrinterOptions,
        description: &str,
    ) -> Result<Option<PathBuf>, anyhow::Error> {
        if options.dry_run {
            tracing::info!(
                width = bitmap.width(),
                height = bitmap.height(),
                energy = options.energy,
                "DRY_RUN: skipping job '{description}'"
            );
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create spool dir {}", self.dir.display()))?;

        let stem = self.unique_stem();
        let pbm_path = self.dir.join(format!("{stem}.pbm"));
        let json_path = self.dir.join(format!("{stem}.json"));

        std::fs::write(&json_path, serde_json::to_vec_pretty(options)?)
            .with_context(|| format!("failed to write {}", json_path.display()))?;
        std::fs::write(&pbm_path, bitmap.to_bytes())
            .with_context(|| format!("failed to write {}", pbm_path.display()))?;

        tracing::info!(
            path = %pbm_path.display(),
            width = bitmap.width(),
            height = bitmap.height(),
            "Spooled job '{description}'"
        );
        Ok(Some(pbm_path))
    }

    fn unique_stem(&self) -> String {
        let base = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
        let mut stem = base.clone();
        let mut n = 1;
        while self.dir.join(format!("{stem}.pbm")).exists() {
            stem = format!("{base}-{n}");
            n += 1;
        }
        stem
    }
}
