use std::path::{Component, Path, PathBuf};

use crate::foundation::error::{QcError, QcResult};
use crate::layout::naming::SubjectId;

/// Path of `figure` as seen from the report page: its first `sub-<label>` component and
/// everything after it, joined with `/`.
///
/// `/data/sub-07/figures/sst_seg.svg` becomes `sub-07/figures/sst_seg.svg`.
pub fn embed_path(figure: &Path) -> QcResult<String> {
    let (start, _) = SubjectId::find_in_path(figure).ok_or_else(|| {
        QcError::pattern_mismatch("sub-<label>", figure.display().to_string())
    })?;
    let parts: Vec<String> = figure
        .components()
        .skip(start)
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}

/// `<object>` element that pulls an SVG figure into the report page.
pub fn reportlet_snippet(embed: &str) -> String {
    format!(
        r#"<object type="image/svg+xml" data="./{embed}" class="reportlet">filename:{embed}</object>"#
    )
}

/// A figure as it appears in the report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reportlet {
    /// Figure file on disk.
    pub source: PathBuf,
    /// Markup embedding the figure.
    pub snippet: String,
}

impl Reportlet {
    /// Reportlet for the figure at `source`.
    pub fn for_figure(source: &Path) -> QcResult<Self> {
        Ok(Self {
            snippet: reportlet_snippet(&embed_path(source)?),
            source: source.to_path_buf(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/report/embed.rs"]
mod tests;
