use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::figure::backend::Compositor;
use crate::figure::compose::{FigureComposer, FigureOptions};
use crate::foundation::error::QcResult;
use crate::layout::locator::{SubjectLayout, resolve_dir};
use crate::report::assemble::Report;
use crate::report::embed::embed_path;
use crate::report::template::ReportTemplate;

/// Inputs of one report run.
#[derive(Clone, Debug)]
pub struct ReportRequest {
    /// Pipeline output directory of one subject, named `sub-<label>`.
    pub subject_dir: PathBuf,
    /// Group template directory the pipeline ran against.
    pub template_dir: PathBuf,
    /// Root under which `figures/` is created; defaults to the subject directory.
    pub out_dir: Option<PathBuf>,
    /// Where `<subject>.html` is written.
    pub report_dir: PathBuf,
    /// Figure knobs.
    pub options: FigureOptions,
    /// Page template; the built-in page when `None`.
    pub template: Option<PathBuf>,
}

impl ReportRequest {
    /// Request with default options, figures under the subject directory and the page in
    /// `report_dir`.
    pub fn new(
        subject_dir: impl Into<PathBuf>,
        template_dir: impl Into<PathBuf>,
        report_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            subject_dir: subject_dir.into(),
            template_dir: template_dir.into(),
            out_dir: None,
            report_dir: report_dir.into(),
            options: FigureOptions::default(),
            template: None,
        }
    }
}

/// What a report run produced.
#[derive(Clone, Debug)]
pub struct ReportOutput {
    /// The HTML page.
    pub html: PathBuf,
    /// Figures in page order.
    pub figures: Vec<PathBuf>,
}

/// Build every figure for one subject and then the page that embeds them.
///
/// Figures are made in a fixed order: SST segmentation, SST to template registration, then
/// segmentation and registration for each visit. The first failure aborts the run and no
/// page is written.
#[tracing::instrument(skip(request, compositor), fields(subject_dir = %request.subject_dir.display()))]
pub fn generate_report<C: Compositor>(
    request: &ReportRequest,
    compositor: C,
) -> QcResult<ReportOutput> {
    let layout = SubjectLayout::locate(&request.subject_dir, &request.template_dir)?;
    let template = match &request.template {
        Some(path) => ReportTemplate::from_path(path)?,
        None => ReportTemplate::builtin(),
    };

    let out_root = request.out_dir.as_deref().unwrap_or(&layout.subject_dir);
    let figures_dir = figures_dir(out_root)?;
    // Fail before any drawing if the page could never embed these figures.
    embed_path(&figures_dir.join("sst_seg.svg"))?;

    let mut composer = FigureComposer::with_options(compositor, request.options.clone());
    let mut figures = Vec::with_capacity(2 + 2 * layout.visits.len());

    let sst = &layout.sst;
    figures.push(composer.segmentation_figure(
        &sst.anatomical,
        &sst.segmentation,
        &sst.mask,
        &figures_dir.join("sst_seg.svg"),
    )?);
    figures.push(composer.registration_figure(
        &sst.normalized,
        &layout.template.brain,
        &layout.template.mask,
        &figures_dir.join("sst_reg.svg"),
    )?);

    for visit in &layout.visits {
        let ses = visit.session.as_str();
        figures.push(composer.segmentation_figure(
            &visit.anatomical,
            &visit.segmentation,
            &visit.mask,
            &figures_dir.join(format!("{ses}_seg.svg")),
        )?);
        figures.push(composer.registration_figure(
            &visit.normalized,
            &sst.brain,
            &sst.mask,
            &figures_dir.join(format!("{ses}_reg.svg")),
        )?);
    }

    let report = Report::collect(layout.subject.clone(), &figures, &layout.command_log())?;
    let html = report.write(&template, &request.report_dir)?;
    Ok(ReportOutput { html, figures })
}

fn figures_dir(out_root: &Path) -> QcResult<PathBuf> {
    let dir = out_root.join("figures");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create figures dir '{}'", dir.display()))?;
    resolve_dir(&dir)
}

#[cfg(test)]
#[path = "../../tests/unit/report/pipeline.rs"]
mod tests;
