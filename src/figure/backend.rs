use crate::foundation::error::QcResult;
use crate::volume::bbox::{Cuts, VoxelBox};
use crate::volume::nifti_io::Volume;

/// How a panel's background intensities are windowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Brightness {
    /// Volume min/max.
    Full,
    /// Robust percentile window.
    Estimate,
}

/// One contour overlay drawn on top of a panel's background.
#[derive(Clone, Debug)]
pub struct ContourLayer {
    /// Volume whose non-zero voxels are outlined.
    pub volume: Volume,
    /// SVG stroke color.
    pub color: String,
    /// Class name of the drawn outlines.
    pub name: String,
    /// Human-readable legend, shown as the outline's tooltip.
    pub title: String,
}

/// A background image with its overlays, viewed through a set of cuts.
#[derive(Clone, Debug)]
pub struct Panel {
    /// Image drawn as the grayscale background.
    pub background: Volume,
    /// Overlays, drawn in order (later layers on top).
    pub layers: Vec<ContourLayer>,
    /// Region of the background grid to show; `None` shows the whole grid.
    pub crop: Option<VoxelBox>,
    /// World-space cut positions per view axis.
    pub cuts: Cuts,
    /// Background windowing.
    pub brightness: Brightness,
    /// Caption drawn on the panel (e.g. `fixed` / `moving`).
    pub label: Option<String>,
}

/// Everything needed to draw one figure. Panels with more than one entry are stacked on the
/// same canvas and alternate on display.
#[derive(Clone, Debug, Default)]
pub struct FigureView {
    /// Panels in draw order.
    pub panels: Vec<Panel>,
}

/// Rendering capability that turns a [`FigureView`] into an SVG document.
pub trait Compositor {
    /// Compose `view` into a standalone SVG document.
    fn compose(&mut self, view: &FigureView) -> QcResult<String>;
}

impl<C: Compositor + ?Sized> Compositor for &mut C {
    fn compose(&mut self, view: &FigureView) -> QcResult<String> {
        (**self).compose(view)
    }
}

impl<C: Compositor + ?Sized> Compositor for Box<C> {
    fn compose(&mut self, view: &FigureView) -> QcResult<String> {
        (**self).compose(view)
    }
}
