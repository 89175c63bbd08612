//! `ctqc` builds visual quality-control reports for longitudinal cortical-thickness
//! pipeline outputs.
//!
//! For one subject it:
//!
//! - locates the single-subject template (SST) and every visit by naming convention
//! - splits tissue segmentations into per-label volumes
//! - composes SVG figures (brain mask, segmentation contours, registration overlay)
//! - assembles an HTML page embedding the figures and the pipeline command
//!
//! Drawing sits behind the [`Compositor`] trait; [`SvgCompositor`] is the built-in one.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod config;
pub(crate) mod figure;
pub(crate) mod layout;
pub(crate) mod report;
pub(crate) mod segment;
pub(crate) mod volume;

pub use crate::foundation::core::{
    BezPath, DEFAULT_LABELS, LabelSet, MASK_COLOR, Point, TissueLabel, ViewAxis,
};
pub use crate::foundation::error::{QcError, QcResult};

pub use crate::config::ReportConfig;
pub use crate::figure::backend::{Brightness, Compositor, ContourLayer, FigureView, Panel};
pub use crate::figure::compose::{DEFAULT_CUTS, FigureComposer, FigureOptions, svg_path};
pub use crate::figure::contour::mask_outline;
pub use crate::figure::svg::SvgCompositor;
pub use crate::layout::locator::{SstFiles, SubjectLayout, TemplateFiles, VisitFiles};
pub use crate::layout::naming::{SessionId, SubjectId, VISIT_MARKER, VisitName};
pub use crate::report::assemble::{Report, read_command_log};
pub use crate::report::embed::{Reportlet, embed_path, reportlet_snippet};
pub use crate::report::pipeline::{ReportOutput, ReportRequest, generate_report};
pub use crate::report::template::ReportTemplate;
pub use crate::segment::split::{ScratchFiles, label_file_path, split_labels, split_segmentation};
pub use crate::volume::bbox::{Cuts, IntensityWindow, VoxelBox, cut_to_index, cuts_from_bbox};
pub use crate::volume::nifti_io::Volume;
