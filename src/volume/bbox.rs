use ndarray::{Array3, Axis};

use crate::foundation::core::ViewAxis;
use crate::foundation::error::QcResult;
use crate::volume::nifti_io::Volume;

/// Inclusive voxel-space bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoxelBox {
    /// Lowest voxel index per axis.
    pub min: [usize; 3],
    /// Highest voxel index per axis (inclusive).
    pub max: [usize; 3],
}

impl VoxelBox {
    /// The whole grid of a volume of `shape`.
    pub fn full(shape: [usize; 3]) -> Self {
        Self {
            min: [0; 3],
            max: shape.map(|n| n.saturating_sub(1)),
        }
    }

    /// Tight box around every voxel `> 0`, or `None` for an empty mask.
    pub fn of_mask(data: &Array3<f32>) -> Option<Self> {
        let mut out: Option<Self> = None;
        for ((x, y, z), &v) in data.indexed_iter() {
            if v <= 0.0 {
                continue;
            }
            let p = [x, y, z];
            match out.as_mut() {
                None => out = Some(Self { min: p, max: p }),
                Some(b) => {
                    for i in 0..3 {
                        b.min[i] = b.min[i].min(p[i]);
                        b.max[i] = b.max[i].max(p[i]);
                    }
                }
            }
        }
        out
    }

    /// Re-express this box (defined on `from`'s grid) on `to`'s grid by mapping all eight
    /// corners through world space. The result is clamped to `to`'s extent.
    pub fn transfer(&self, from: &Volume, to: &Volume) -> QcResult<Self> {
        let shape = to.shape();
        let mut lo = [f64::INFINITY; 3];
        let mut hi = [f64::NEG_INFINITY; 3];
        for corner in 0..8u8 {
            let ijk = [0, 1, 2].map(|i| {
                if corner & (1 << i) == 0 {
                    self.min[i] as f64
                } else {
                    self.max[i] as f64
                }
            });
            let v = to.world_to_voxel(from.voxel_to_world(ijk))?;
            for i in 0..3 {
                lo[i] = lo[i].min(v[i]);
                hi[i] = hi[i].max(v[i]);
            }
        }

        let clamp = |v: f64, n: usize| -> usize {
            let top = n.saturating_sub(1) as f64;
            v.round().clamp(0.0, top) as usize
        };
        let mut min = [0; 3];
        let mut max = [0; 3];
        for i in 0..3 {
            min[i] = clamp(lo[i], shape[i]);
            max[i] = clamp(hi[i], shape[i]).max(min[i]);
        }
        Ok(Self { min, max })
    }

    /// Voxel count along each axis.
    pub fn extent(&self) -> [usize; 3] {
        [0, 1, 2].map(|i| self.max[i] - self.min[i] + 1)
    }
}

/// Cut positions in world coordinates (mm), one list per view axis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cuts {
    /// Sagittal cut positions.
    pub x: Vec<f64>,
    /// Coronal cut positions.
    pub y: Vec<f64>,
    /// Axial cut positions.
    pub z: Vec<f64>,
}

impl Cuts {
    /// Positions for one view axis.
    pub fn along(&self, axis: ViewAxis) -> &[f64] {
        match axis {
            ViewAxis::Sagittal => &self.x,
            ViewAxis::Coronal => &self.y,
            ViewAxis::Axial => &self.z,
        }
    }

    /// Number of cuts per axis (the longest list).
    pub fn per_axis(&self) -> usize {
        self.x.len().max(self.y.len()).max(self.z.len())
    }
}

/// Fraction of a plane that must be inside the mask for the plane to count when picking cuts.
/// Sagittal, coronal, axial.
const PLANE_FILL: [f64; 3] = [0.2, 0.0, 0.3];

/// Choose `n` cuts per axis that sit inside the mask's extent.
///
/// Per axis, the mask is projected onto the axis and planes with enough masked voxels
/// (see [`PLANE_FILL`]) bound the selection. Narrow or empty selections fall back to any
/// masked plane, and an empty mask falls back to the full axis. Cuts are evenly spaced
/// strictly inside the bounds and converted to world coordinates.
pub fn cuts_from_bbox(mask: &Volume, n: usize) -> Cuts {
    let data = mask.data();
    let shape = mask.shape();

    let mut vox: [Vec<f64>; 3] = Default::default();
    for ax in 0..3 {
        let counts: Vec<usize> = data
            .axis_iter(Axis(ax))
            .map(|plane| plane.iter().filter(|v| **v > 0.0).count())
            .collect();
        let plane_size: usize = (0..3).filter(|i| *i != ax).map(|i| shape[i]).product();
        let th = (plane_size as f64 * PLANE_FILL[ax]) as usize;

        let above = |t: usize| -> Option<(usize, usize)> {
            let first = counts.iter().position(|c| *c > t)?;
            let last = counts.iter().rposition(|c| *c > t)?;
            Some((first, last))
        };

        let bounds = match above(th) {
            Some((lo, hi)) if th == 0 || lo + n + 1 < hi => Some((lo, hi)),
            _ => above(0),
        };
        let (lo, hi) = match bounds {
            Some((lo, hi)) => (lo as f64, hi as f64),
            None => (0.0, shape[ax] as f64),
        };

        let inc = (hi - lo) / (n as f64 + 1.0);
        vox[ax] = (0..n).map(|i| lo + (i as f64 + 1.0) * inc).collect();
    }

    let mut cuts = Cuts::default();
    for i in 0..n {
        let w = mask.voxel_to_world([vox[0][i], vox[1][i], vox[2][i]]);
        cuts.x.push(w[0]);
        cuts.y.push(w[1]);
        cuts.z.push(w[2]);
    }
    cuts
}

/// Map a world-space cut on `axis` to a voxel index of `vol`, holding the other two world
/// coordinates at the volume centre. Clamped to the grid.
pub fn cut_to_index(vol: &Volume, axis: ViewAxis, world: f64) -> QcResult<usize> {
    let mut p = vol.world_center();
    p[axis.index()] = world;
    let ijk = vol.world_to_voxel(p)?;
    let n = vol.shape()[axis.index()];
    Ok(ijk[axis.index()]
        .round()
        .clamp(0.0, n.saturating_sub(1) as f64) as usize)
}

/// Display window for a background image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntensityWindow {
    /// Intensity mapped to black.
    pub low: f32,
    /// Intensity mapped to white.
    pub high: f32,
}

impl IntensityWindow {
    /// Full min/max range of the finite voxels.
    pub fn full(data: &Array3<f32>) -> Self {
        let (low, high) = data
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        if low > high {
            return Self {
                low: 0.0,
                high: 1.0,
            };
        }
        Self { low, high }
    }

    /// Robust window from the 15th and 99.8th percentiles, which keeps bright vessels and
    /// background noise from flattening the contrast.
    pub fn robust(data: &Array3<f32>) -> Self {
        let mut vals: Vec<f32> = data.iter().copied().filter(|v| v.is_finite()).collect();
        if vals.is_empty() {
            return Self {
                low: 0.0,
                high: 1.0,
            };
        }
        vals.sort_by(f32::total_cmp);
        Self {
            low: percentile(&vals, 15.0),
            high: percentile(&vals, 99.8),
        }
    }

    /// Map an intensity to an 8-bit gray level.
    pub fn gray(&self, v: f32) -> u8 {
        if !v.is_finite() {
            return 0;
        }
        let span = self.high - self.low;
        if span <= 0.0 {
            return if v > self.low { 255 } else { 0 };
        }
        (((v - self.low) / span).clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Linear-interpolated percentile of sorted data.
fn percentile(sorted: &[f32], q: f64) -> f32 {
    let last = sorted.len() - 1;
    let rank = q / 100.0 * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi.min(last)] - sorted[lo]) * frac
}

#[cfg(test)]
#[path = "../../tests/unit/volume/bbox.rs"]
mod tests;
