use std::path::{Component, Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{QcError, QcResult};
use crate::layout::naming::{SessionId, SubjectId, VisitName};

const NII_GZ: &str = ".nii.gz";
const SST_DIR_SUFFIX: &str = "_CTSingleSubjectTemplate";
const COMMAND_LOG_SUFFIX: &str = "_antscommand.txt";

/// Single-subject template outputs, all under one SST directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SstFiles {
    /// Template head image with skull.
    pub anatomical: PathBuf,
    /// Brain extraction mask.
    pub mask: PathBuf,
    /// Six-label tissue segmentation.
    pub segmentation: PathBuf,
    /// Skull-stripped SST warped to the group template.
    pub normalized: PathBuf,
    /// Skull-stripped SST.
    pub brain: PathBuf,
}

impl SstFiles {
    /// Paths under `dir`. Nothing is checked for existence.
    pub fn resolve(dir: &Path) -> Self {
        let f = |stem: &str| dir.join(format!("{stem}{NII_GZ}"));
        Self {
            anatomical: f("T_template0"),
            mask: f("T_templateBrainExtractionMask"),
            segmentation: f("T_templateBrainSegmentation"),
            normalized: f("T_templateBrainNormalizedToTemplate"),
            brain: f("T_templateBrainExtractionBrain"),
        }
    }
}

/// Group template the SST was registered to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateFiles {
    /// Skull-stripped template.
    pub brain: PathBuf,
    /// Template brain mask.
    pub mask: PathBuf,
}

impl TemplateFiles {
    /// Paths under `dir`. Nothing is checked for existence.
    pub fn resolve(dir: &Path) -> Self {
        Self {
            brain: dir.join(format!("template_brain{NII_GZ}")),
            mask: dir.join(format!("template_brain_mask{NII_GZ}")),
        }
    }
}

/// Outputs of one longitudinal visit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitFiles {
    /// Visit directory.
    pub dir: PathBuf,
    /// Session the visit belongs to.
    pub session: SessionId,
    /// Prefix shared by every file of the visit.
    pub base: String,
    /// Co-registered anatomical image, kept next to the visit directory in `coreg/`.
    pub anatomical: PathBuf,
    /// Brain extraction mask.
    pub mask: PathBuf,
    /// Six-label tissue segmentation.
    pub segmentation: PathBuf,
    /// Skull-stripped visit warped to the SST.
    pub normalized: PathBuf,
}

impl VisitFiles {
    /// Paths for the visit directory `dir`, named like `sub-01_ses-03_T1w_1`.
    pub fn resolve(dir: &Path) -> QcResult<Self> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let VisitName { base, session, .. } = VisitName::parse(&name)?;
        let parent = dir.parent().unwrap_or_else(|| Path::new(""));
        let f = |suffix: &str| dir.join(format!("{base}{suffix}{NII_GZ}"));
        Ok(Self {
            dir: dir.to_path_buf(),
            anatomical: parent.join("coreg").join(format!("{base}{NII_GZ}")),
            mask: f("BrainExtractionMask"),
            segmentation: f("BrainSegmentation"),
            normalized: f("BrainNormalizedToTemplate"),
            session,
            base,
        })
    }
}

/// Where everything for one subject lives.
#[derive(Clone, Debug)]
pub struct SubjectLayout {
    /// Parsed subject id.
    pub subject: SubjectId,
    /// Absolute subject output directory.
    pub subject_dir: PathBuf,
    /// Absolute group template directory.
    pub template_dir: PathBuf,
    /// SST outputs.
    pub sst: SstFiles,
    /// Group template files.
    pub template: TemplateFiles,
    /// Visits in lexical order of their directory names.
    pub visits: Vec<VisitFiles>,
}

impl SubjectLayout {
    /// Resolve the layout of `subject_dir` against `template_dir`.
    #[tracing::instrument]
    pub fn locate(subject_dir: &Path, template_dir: &Path) -> QcResult<Self> {
        let subject_dir = resolve_dir(subject_dir)?;
        let template_dir = resolve_dir(template_dir)?;
        let subject = SubjectId::from_dir(&subject_dir)?;

        let sst_dir = subject_dir.join(format!("{subject}{SST_DIR_SUFFIX}"));
        let visits = visit_dirs(&subject_dir, &subject)?
            .iter()
            .map(|d| VisitFiles::resolve(d))
            .collect::<QcResult<Vec<_>>>()?;
        tracing::debug!(%subject, visits = visits.len(), "located subject");

        Ok(Self {
            sst: SstFiles::resolve(&sst_dir),
            template: TemplateFiles::resolve(&template_dir),
            subject,
            subject_dir,
            template_dir,
            visits,
        })
    }

    /// `<subject_dir>/<subject>_antscommand.txt`.
    pub fn command_log(&self) -> PathBuf {
        self.subject_dir
            .join(format!("{}{COMMAND_LOG_SUFFIX}", self.subject))
    }
}

/// Absolute form of an existing directory.
///
/// Symlinks are not followed, so a linked `sub-<label>` keeps its name. Paths with `..`
/// are canonicalized instead.
pub(crate) fn resolve_dir(dir: &Path) -> QcResult<PathBuf> {
    if !dir.is_dir() {
        return Err(QcError::file_not_found(dir));
    }
    let resolved = if dir.components().any(|c| c == Component::ParentDir) {
        dir.canonicalize()
    } else {
        std::path::absolute(dir)
    };
    Ok(resolved.with_context(|| format!("resolve '{}'", dir.display()))?)
}

/// Subdirectories of `subject_dir` matching `<subject>*T1w_*`, sorted by name.
fn visit_dirs(subject_dir: &Path, subject: &SubjectId) -> QcResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(subject_dir)
        .with_context(|| format!("list '{}'", subject_dir.display()))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list '{}'", subject_dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if subject.matches_visit_dir(&name) && entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(dirs)
}

#[cfg(test)]
#[path = "../../tests/unit/layout/locator.rs"]
mod tests;
