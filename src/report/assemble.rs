use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{QcError, QcResult};
use crate::layout::naming::SubjectId;
use crate::report::embed::Reportlet;
use crate::report::template::ReportTemplate;

/// Contents of the pipeline command log, or an empty string when there is none.
pub fn read_command_log(path: &Path) -> QcResult<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no command log");
            Ok(String::new())
        }
        Err(e) => Err(QcError::load(path, e)),
    }
}

/// Everything that goes into one subject's page.
#[derive(Clone, Debug)]
pub struct Report {
    /// Subject the page is about.
    pub subject: SubjectId,
    /// Figures in page order.
    pub reportlets: Vec<Reportlet>,
    /// Pipeline command text.
    pub command: String,
}

impl Report {
    /// Collect reportlets for `figures` (in order) and read the command log.
    pub fn collect(subject: SubjectId, figures: &[PathBuf], command_log: &Path) -> QcResult<Self> {
        let reportlets = figures
            .iter()
            .map(|f| Reportlet::for_figure(f))
            .collect::<QcResult<Vec<_>>>()?;
        Ok(Self {
            subject,
            reportlets,
            command: read_command_log(command_log)?,
        })
    }

    /// Page file name, `<subject>.html`.
    pub fn file_name(&self) -> String {
        format!("{}.html", self.subject)
    }

    /// Render through `template` and write `<report_dir>/<subject>.html`, replacing any
    /// previous page.
    #[tracing::instrument(skip(self, template), fields(subject = %self.subject))]
    pub fn write(&self, template: &ReportTemplate, report_dir: &Path) -> QcResult<PathBuf> {
        let html = template.render(&self.reportlets, &self.command)?;
        std::fs::create_dir_all(report_dir)
            .with_context(|| format!("create report dir '{}'", report_dir.display()))?;
        let out = report_dir.join(self.file_name());
        std::fs::write(&out, html).with_context(|| format!("write report '{}'", out.display()))?;
        tracing::info!(path = %out.display(), figures = self.reportlets.len(), "wrote report");
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/report/assemble.rs"]
mod tests;
