use crate::foundation::error::{QcError, QcResult};

pub use kurbo::{BezPath, Point};

/// Tissue classes produced by the cortical-thickness segmentation (labels 1..=6).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum TissueLabel {
    /// Cerebrospinal fluid.
    Csf = 1,
    /// Cortical gray matter.
    CorticalGm = 2,
    /// White matter.
    WhiteMatter = 3,
    /// Deep (subcortical) gray matter.
    DeepGm = 4,
    /// Brainstem.
    Brainstem = 5,
    /// Cerebellum.
    Cerebellum = 6,
}

impl TissueLabel {
    /// All labels in ascending order.
    pub const ALL: [TissueLabel; 6] = [
        Self::Csf,
        Self::CorticalGm,
        Self::WhiteMatter,
        Self::DeepGm,
        Self::Brainstem,
        Self::Cerebellum,
    ];

    /// Integer value stored in the segmentation volume.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Short human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Csf => "CSF",
            Self::CorticalGm => "cortical GM",
            Self::WhiteMatter => "WM",
            Self::DeepGm => "deep GM",
            Self::Brainstem => "brainstem",
            Self::Cerebellum => "cerebellum",
        }
    }

    /// Contour stroke color used in segmentation figures.
    pub fn color(self) -> &'static str {
        match self {
            Self::Csf => "#00bfff",
            Self::CorticalGm => "#ff00ff",
            Self::WhiteMatter => "#ffd700",
            Self::DeepGm => "#1e90ff",
            Self::Brainstem => "#32cd32",
            Self::Cerebellum => "#ff8c00",
        }
    }
}

impl TryFrom<u8> for TissueLabel {
    type Error = QcError;

    fn try_from(v: u8) -> QcResult<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.value() == v)
            .ok_or_else(|| {
                QcError::invalid_argument(format!("tissue label must be in [1, 6], got {v}"))
            })
    }
}

impl From<TissueLabel> for u8 {
    fn from(l: TissueLabel) -> Self {
        l.value()
    }
}

/// Labels extracted by default: cortical and deep gray matter.
pub const DEFAULT_LABELS: [TissueLabel; 2] = [TissueLabel::CorticalGm, TissueLabel::DeepGm];

/// Stroke color of the brain-mask contour.
pub const MASK_COLOR: &str = "#ff0000";

/// Ordered, duplicate-free set of tissue labels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelSet(Vec<TissueLabel>);

impl LabelSet {
    /// Validate every raw label before building the set. A single out-of-range label rejects
    /// the whole request.
    pub fn new(raw: &[u8]) -> QcResult<Self> {
        let bad: Vec<u8> = raw
            .iter()
            .copied()
            .filter(|v| TissueLabel::try_from(*v).is_err())
            .collect();
        if !bad.is_empty() {
            return Err(QcError::invalid_argument(format!(
                "labels must only include numbers [1-6], got {bad:?}"
            )));
        }

        let mut out = Vec::with_capacity(raw.len());
        for v in raw {
            let l = TissueLabel::try_from(*v)?;
            if !out.contains(&l) {
                out.push(l);
            }
        }
        Ok(Self(out))
    }

    /// Labels in request order.
    pub fn labels(&self) -> &[TissueLabel] {
        &self.0
    }

    /// Raw integer values in request order.
    pub fn values(&self) -> Vec<u8> {
        self.0.iter().map(|l| l.value()).collect()
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self(DEFAULT_LABELS.to_vec())
    }
}

/// Display orientation of a 2-D cut through a volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewAxis {
    /// Constant x (left-right); shows y horizontally, z vertically.
    Sagittal,
    /// Constant y (posterior-anterior); shows x horizontally, z vertically.
    Coronal,
    /// Constant z (inferior-superior); shows x horizontally, y vertically.
    Axial,
}

impl ViewAxis {
    /// Rows of a mosaic, top to bottom.
    pub const ALL: [ViewAxis; 3] = [Self::Sagittal, Self::Coronal, Self::Axial];

    /// Volume axis held constant by this view.
    pub fn index(self) -> usize {
        match self {
            Self::Sagittal => 0,
            Self::Coronal => 1,
            Self::Axial => 2,
        }
    }

    /// Volume axes shown as `(horizontal, vertical)`.
    pub fn plane_axes(self) -> (usize, usize) {
        match self {
            Self::Sagittal => (1, 2),
            Self::Coronal => (0, 2),
            Self::Axial => (0, 1),
        }
    }

    /// World coordinate letter used in cut labels.
    pub fn letter(self) -> char {
        match self {
            Self::Sagittal => 'x',
            Self::Coronal => 'y',
            Self::Axial => 'z',
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
