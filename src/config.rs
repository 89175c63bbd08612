use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::figure::compose::{DEFAULT_CUTS, FigureOptions};
use crate::foundation::core::{DEFAULT_LABELS, LabelSet};
use crate::foundation::error::{QcError, QcResult};

/// Report settings read from a JSON file. Every field is optional.
///
/// ```json
/// { "labels": [2, 3, 4], "cuts": 5, "segmentation_includes_mask": false }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Tissue label values outlined in segmentation figures.
    pub labels: Vec<u8>,
    /// Cuts per view axis.
    pub cuts: usize,
    /// Whether segmentation figures also outline the brain mask.
    pub segmentation_includes_mask: bool,
    /// Jinja-style HTML template rendered with `images` and `antscmd`.
    /// Relative paths are taken relative to the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|l| l.value()).collect(),
            cuts: DEFAULT_CUTS,
            segmentation_includes_mask: true,
            template: None,
        }
    }
}

impl ReportConfig {
    /// Read and validate a config file.
    pub fn from_path(path: &Path) -> QcResult<Self> {
        if !path.is_file() {
            return Err(QcError::file_not_found(path));
        }
        let f = File::open(path).map_err(|e| QcError::load(path, e))?;
        let mut cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| QcError::config(format!("'{}': {e}", path.display())))?;
        cfg.validate()?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        if let Some(t) = cfg.template.as_mut().filter(|t| t.is_relative()) {
            *t = base.join(&*t);
        }
        Ok(cfg)
    }

    /// Check label range and cut count.
    pub fn validate(&self) -> QcResult<()> {
        if self.cuts == 0 {
            return Err(QcError::config("cuts must be >= 1"));
        }
        if self.labels.is_empty() {
            return Err(QcError::config("labels must not be empty"));
        }
        LabelSet::new(&self.labels).map_err(|e| QcError::config(e.to_string()))?;
        Ok(())
    }

    /// Figure options described by this config.
    pub fn figure_options(&self) -> QcResult<FigureOptions> {
        self.validate()?;
        Ok(FigureOptions {
            labels: LabelSet::new(&self.labels)?,
            cuts: self.cuts,
            segmentation_includes_mask: self.segmentation_includes_mask,
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
