use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::figure::backend::{Brightness, Compositor, ContourLayer, FigureView, Panel};
use crate::foundation::core::{LabelSet, MASK_COLOR, TissueLabel};
use crate::foundation::error::{QcError, QcResult};
use crate::segment::split::split_segmentation;
use crate::volume::bbox::{VoxelBox, cuts_from_bbox};
use crate::volume::nifti_io::Volume;

/// Cuts per view axis used by every figure kind unless configured otherwise.
pub const DEFAULT_CUTS: usize = 7;

/// Knobs shared by the three figure kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FigureOptions {
    /// Tissue labels outlined in segmentation figures.
    pub labels: LabelSet,
    /// Cuts per view axis.
    pub cuts: usize,
    /// Whether segmentation figures also outline the brain mask.
    pub segmentation_includes_mask: bool,
}

impl Default for FigureOptions {
    fn default() -> Self {
        Self {
            labels: LabelSet::default(),
            cuts: DEFAULT_CUTS,
            segmentation_includes_mask: true,
        }
    }
}

/// Force the `.svg` suffix: `x` becomes `x.svg`, `x.svg` is kept as is.
pub fn svg_path(out: &Path) -> PathBuf {
    if out.extension().is_some_and(|e| e == "svg") {
        return out.to_path_buf();
    }
    let mut s = OsString::from(out.as_os_str());
    s.push(".svg");
    PathBuf::from(s)
}

/// Loads inputs, picks cuts and layer order, and routes composed SVG to disk.
///
/// Drawing itself is delegated to the injected [`Compositor`].
pub struct FigureComposer<C> {
    compositor: C,
    opts: FigureOptions,
}

impl<C: Compositor> FigureComposer<C> {
    /// Composer with default options.
    pub fn new(compositor: C) -> Self {
        Self::with_options(compositor, FigureOptions::default())
    }

    /// Composer with explicit options.
    pub fn with_options(compositor: C, opts: FigureOptions) -> Self {
        Self { compositor, opts }
    }

    /// Active options.
    pub fn options(&self) -> &FigureOptions {
        &self.opts
    }

    /// Borrow the compositor.
    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    /// Give back the compositor.
    pub fn into_compositor(self) -> C {
        self.compositor
    }

    /// Brain mask outlined on an anatomical image that still has its skull, cropped to the
    /// mask's bounding box.
    #[tracing::instrument(skip(self))]
    pub fn brain_mask_figure(
        &mut self,
        anatomical: &Path,
        mask: &Path,
        out: &Path,
    ) -> QcResult<PathBuf> {
        self.check()?;
        let anat = Volume::open(anatomical)?;
        let mask = Volume::open(mask)?;
        let panel = self.contour_panel(anat, &mask, vec![mask_layer(mask.clone())])?;
        self.emit(
            FigureView {
                panels: vec![panel],
            },
            out,
        )
    }

    /// Tissue contours (and optionally the brain mask) on a skull-stripped anatomical image,
    /// cropped to the mask's bounding box. Per-label scratch volumes are removed afterwards.
    #[tracing::instrument(skip(self))]
    pub fn segmentation_figure(
        &mut self,
        anatomical: &Path,
        segmentation: &Path,
        mask: &Path,
        out: &Path,
    ) -> QcResult<PathBuf> {
        self.check()?;
        let anat = Volume::open(anatomical)?;
        let mask = Volume::open(mask)?;

        let scratch = split_segmentation(segmentation, &self.opts.labels)?;
        let mut layers = Vec::with_capacity(scratch.paths().len() + 1);
        if self.opts.segmentation_includes_mask {
            layers.push(mask_layer(mask.clone()));
        }
        for (label, path) in self.opts.labels.labels().iter().zip(scratch.paths()) {
            layers.push(tissue_layer(*label, Volume::open(path)?));
        }

        let panel = self.contour_panel(anat, &mask, layers)?;
        let written = self.emit(
            FigureView {
                panels: vec![panel],
            },
            out,
        )?;
        drop(scratch);
        Ok(written)
    }

    /// `fixed` and `moving` images through the same cuts, both with estimated brightness.
    /// Cuts come from the bounding box of `mask`, which lives in the fixed space.
    #[tracing::instrument(skip(self))]
    pub fn registration_figure(
        &mut self,
        moving: &Path,
        fixed: &Path,
        mask: &Path,
        out: &Path,
    ) -> QcResult<PathBuf> {
        self.check()?;
        let mask = Volume::open(mask)?;
        let fixed = Volume::open(fixed)?;
        let moving = Volume::open(moving)?;
        let cuts = cuts_from_bbox(&mask, self.opts.cuts);

        let panel = |background: Volume, label: &str| Panel {
            background,
            layers: Vec::new(),
            crop: None,
            cuts: cuts.clone(),
            brightness: Brightness::Estimate,
            label: Some(label.to_string()),
        };
        let view = FigureView {
            panels: vec![panel(fixed, "fixed"), panel(moving, "moving")],
        };
        self.emit(view, out)
    }

    fn contour_panel(
        &self,
        background: Volume,
        mask: &Volume,
        layers: Vec<ContourLayer>,
    ) -> QcResult<Panel> {
        let crop = match VoxelBox::of_mask(mask.data()) {
            Some(b) => Some(b.transfer(mask, &background)?),
            None => {
                tracing::warn!(mask = %mask.path().display(), "mask is empty; showing full view");
                None
            }
        };
        Ok(Panel {
            cuts: cuts_from_bbox(mask, self.opts.cuts),
            background,
            layers,
            crop,
            brightness: Brightness::Full,
            label: None,
        })
    }

    fn check(&self) -> QcResult<()> {
        if self.opts.cuts == 0 {
            return Err(QcError::invalid_argument("cuts per axis must be >= 1"));
        }
        Ok(())
    }

    fn emit(&mut self, view: FigureView, out: &Path) -> QcResult<PathBuf> {
        let out = svg_path(out);
        let svg = self.compositor.compose(&view)?;

        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create figure dir '{}'", parent.display()))?;
        }
        std::fs::write(&out, svg).with_context(|| format!("write figure '{}'", out.display()))?;

        tracing::info!(path = %out.display(), "wrote figure");
        Ok(out)
    }
}

fn mask_layer(volume: Volume) -> ContourLayer {
    ContourLayer {
        volume,
        color: MASK_COLOR.to_string(),
        name: "mask".to_string(),
        title: "brain mask".to_string(),
    }
}

fn tissue_layer(label: TissueLabel, volume: Volume) -> ContourLayer {
    ContourLayer {
        volume,
        color: label.color().to_string(),
        name: format!("seg{}", label.value()),
        title: label.name().to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/figure/compose.rs"]
mod tests;
