//! Known printer models.

use std::fmt;

use tracing::debug;

use crate::{CatPrinterError, PRINT_WIDTH, Result};

/// Static description of one printer model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Model {
    pub name: &'static str,
    /// Dots per printed row.
    pub paper_width: u32,
    /// Accepts compressed row data.
    pub is_new_kind: bool,
    /// Needs extra feeding around a print job.
    pub problem_feeding: bool,
}

const fn model(name: &'static str, is_new_kind: bool, problem_feeding: bool) -> Model {
    Model {
        name,
        paper_width: PRINT_WIDTH,
        is_new_kind,
        problem_feeding,
    }
}

/// Every supported model, in display order.
pub const MODELS: [Model; 7] = [
    model("GB01", false, false),
    model("GB02", false, false),
    model("GB03", true, false),
    model("GT01", false, false),
    model("MX05", false, true),
    model("MX06", false, true),
    model("YT01", false, false),
];

impl Model {
    /// Find a model by name, ignoring case.
    pub fn lookup(name: &str) -> Result<Model> {
        let name = name.trim();
        let found = MODELS
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| CatPrinterError::UnknownModel(name.to_string()))?;
        debug!(model = found.name, width = found.paper_width, "Resolved printer model");
        Ok(found)
    }

    /// All known models.
    pub fn all() -> &'static [Model] {
        &MODELS
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
