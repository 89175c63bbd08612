use std::path::{Path, PathBuf};

use ndarray::Array3;

use crate::foundation::core::{LabelSet, TissueLabel};
use crate::foundation::error::{QcError, QcResult};
use crate::volume::nifti_io::Volume;

/// Per-label volumes written next to their source segmentation.
///
/// The files are scratch inputs for figure composition: they are deleted when this guard is
/// dropped, including when composition fails part-way.
#[derive(Debug, Default)]
pub struct ScratchFiles {
    paths: Vec<PathBuf>,
}

impl ScratchFiles {
    /// Paths in label request order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Disarm the guard and hand the files to the caller.
    pub fn keep(mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.paths)
    }

    fn push(&mut self, p: PathBuf) {
        self.paths.push(p);
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for p in self.paths.drain(..) {
            match std::fs::remove_file(&p) {
                Ok(()) => tracing::debug!(path = %p.display(), "removed scratch file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "failed to remove scratch file")
                }
            }
        }
    }
}

/// Name of the per-label file derived from a segmentation path:
/// `x.nii.gz` becomes `x_seg<label>.nii.gz` (and `x.nii` becomes `x_seg<label>.nii`).
pub fn label_file_path(segmentation: &Path, label: TissueLabel) -> PathBuf {
    let name = segmentation
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = label.value();
    let derived = if let Some(stem) = name.strip_suffix(".nii.gz") {
        format!("{stem}_seg{n}.nii.gz")
    } else if let Some(stem) = name.strip_suffix(".nii") {
        format!("{stem}_seg{n}.nii")
    } else {
        format!("{name}_seg{n}.nii.gz")
    };
    segmentation.with_file_name(derived)
}

/// Isolate each label: voxels equal to the label keep its value, everything else is zero.
pub fn split_labels(labels: &Array3<f32>, set: &LabelSet) -> Vec<(TissueLabel, Array3<f32>)> {
    set.labels()
        .iter()
        .map(|&l| {
            let v = l.value() as f32;
            (l, labels.mapv(|x| if x == v { v } else { 0.0 }))
        })
        .collect()
}

/// Split a 6-class segmentation into one file per requested label.
///
/// Each output shares the input's shape, affine and header. Paths are returned in request
/// order inside a [`ScratchFiles`] guard.
#[tracing::instrument(skip(set), fields(labels = ?set.values()))]
pub fn split_segmentation(segmentation: &Path, set: &LabelSet) -> QcResult<ScratchFiles> {
    if set.is_empty() {
        return Err(QcError::invalid_argument("at least one tissue label is required"));
    }

    let vol = Volume::open(segmentation)?;
    let mut out = ScratchFiles::default();
    for (label, data) in split_labels(vol.data(), set) {
        let p = label_file_path(segmentation, label);
        vol.write_like(&data, &p)?;
        out.push(p);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/segment/split.rs"]
mod tests;
