use std::path::{Path, PathBuf};

use nalgebra::{Matrix4, Vector4};
use ndarray::{Array3, ArrayD, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, NiftiType, ReaderOptions};

use crate::foundation::error::{QcError, QcResult};

/// `NiftiHeader` is a large stack object; keep it boxed so volumes move cheaply.
type BoxedHeader = Box<NiftiHeader>;

/// A 3-D NIfTI-1 volume held in `(x, y, z)` voxel order with `f32` intensities.
///
/// The header is kept verbatim so derived volumes can be written back with the same
/// dimensions, spacing and orientation.
#[derive(Debug, Clone)]
pub struct Volume {
    path: PathBuf,
    header: BoxedHeader,
    data: Array3<f32>,
    affine: Matrix4<f64>,
}

impl Volume {
    /// Open a `.nii` / `.nii.gz` file.
    ///
    /// A missing path yields [`QcError::FileNotFound`]; anything that is not a readable
    /// 3-D (or 4-D, first frame used) volume yields [`QcError::Load`].
    pub fn open(path: impl AsRef<Path>) -> QcResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(QcError::file_not_found(path));
        }

        let obj = ReaderOptions::new()
            .read_file(path)
            .map_err(|e| QcError::load(path, e))?;
        let header = Box::new(obj.header().clone());
        let raw = obj
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(|e| QcError::load(path, e))?;
        let data = first_3d_frame(raw).map_err(|reason| QcError::load(path, reason))?;
        let affine = header_affine(&header);

        tracing::debug!(path = %path.display(), shape = ?data.shape(), "loaded volume");
        Ok(Self {
            path: path.to_path_buf(),
            header,
            data,
            affine,
        })
    }

    /// Build an in-memory volume from a reference header and voxel data.
    ///
    /// The header's `dim` is updated to the data shape; NIfTI-1 caps each axis at 65535
    /// voxels.
    pub fn from_parts(
        path: impl Into<PathBuf>,
        mut header: NiftiHeader,
        data: Array3<f32>,
    ) -> QcResult<Self> {
        let (nx, ny, nz) = data.dim();
        let dim = |n: usize| {
            u16::try_from(n).map_err(|_| {
                QcError::invalid_argument(format!(
                    "volume shape {:?} exceeds the NIfTI-1 limit of {} voxels per axis",
                    data.shape(),
                    u16::MAX
                ))
            })
        };
        header.dim = [3, dim(nx)?, dim(ny)?, dim(nz)?, 1, 1, 1, 1];
        let affine = header_affine(&header);
        Ok(Self {
            path: path.into(),
            header: Box::new(header),
            data,
            affine,
        })
    }

    /// Path the volume was loaded from (or will be written to).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Original header.
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// Voxel data in `(x, y, z)` order.
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Voxel counts along `(x, y, z)`.
    pub fn shape(&self) -> [usize; 3] {
        let (x, y, z) = self.data.dim();
        [x, y, z]
    }

    /// Voxel spacing in millimetres along `(x, y, z)`. Non-positive spacings read as 1.
    pub fn voxel_sizes(&self) -> [f64; 3] {
        let [_, x, y, z, ..] = self.header.pixdim;
        [x, y, z].map(|v| if v > 0.0 { v as f64 } else { 1.0 })
    }

    /// Voxel-to-world (RAS, mm) transform.
    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    /// Map a (fractional) voxel coordinate into world space.
    pub fn voxel_to_world(&self, ijk: [f64; 3]) -> [f64; 3] {
        let p = self.affine * Vector4::new(ijk[0], ijk[1], ijk[2], 1.0);
        [p.x, p.y, p.z]
    }

    /// Map a world coordinate into (fractional) voxel space.
    pub fn world_to_voxel(&self, xyz: [f64; 3]) -> QcResult<[f64; 3]> {
        let inv = self.affine.try_inverse().ok_or_else(|| {
            QcError::load(&self.path, "voxel-to-world affine is not invertible")
        })?;
        let p = inv * Vector4::new(xyz[0], xyz[1], xyz[2], 1.0);
        Ok([p.x, p.y, p.z])
    }

    /// World coordinate of the volume centre.
    pub fn world_center(&self) -> [f64; 3] {
        let [nx, ny, nz] = self.shape();
        self.voxel_to_world([
            (nx as f64 - 1.0) / 2.0,
            (ny as f64 - 1.0) / 2.0,
            (nz as f64 - 1.0) / 2.0,
        ])
    }

    /// Write `data` next to this volume's geometry: same header, affine and on-disk
    /// datatype, with intensity scaling reset. Compression follows the `.gz` suffix.
    pub fn write_like(&self, data: &Array3<f32>, out: &Path) -> QcResult<()> {
        if data.dim() != self.data.dim() {
            return Err(QcError::invalid_argument(format!(
                "shape {:?} does not match reference {:?}",
                data.shape(),
                self.data.shape()
            )));
        }

        let dtype = self.header.data_type().unwrap_or(NiftiType::Float32);
        write_with_dtype(out, &self.header, data, dtype)
    }

    /// Write a brand-new volume with axis-aligned geometry (`voxel_size` mm spacing, origin at
    /// voxel 0) and return it as if it had been opened from `out`.
    pub fn write_new(
        out: impl AsRef<Path>,
        data: Array3<f32>,
        voxel_size: [f32; 3],
        dtype: NiftiType,
    ) -> QcResult<Self> {
        let out = out.as_ref();
        let [sx, sy, sz] = voxel_size;
        let mut header = NiftiHeader::default();
        header.pixdim = [1.0, sx, sy, sz, 1.0, 1.0, 1.0, 1.0];
        header.sform_code = 1;
        header.qform_code = 0;
        header.srow_x = [sx, 0.0, 0.0, 0.0];
        header.srow_y = [0.0, sy, 0.0, 0.0];
        header.srow_z = [0.0, 0.0, sz, 0.0];
        header.datatype = dtype as i16;

        let vol = Self::from_parts(out, header, data)?;
        write_with_dtype(out, &vol.header, &vol.data, dtype)?;
        Ok(vol)
    }
}

fn write_with_dtype(
    out: &Path,
    reference: &NiftiHeader,
    data: &Array3<f32>,
    dtype: NiftiType,
) -> QcResult<()> {
    let mut header = reference.clone();
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;

    let opts = WriterOptions::new(out).reference_header(&header);
    let written = match dtype {
        NiftiType::Uint8 => opts.write_nifti(&data.mapv(|v| v as u8)),
        NiftiType::Int16 => opts.write_nifti(&data.mapv(|v| v as i16)),
        NiftiType::Uint16 => opts.write_nifti(&data.mapv(|v| v as u16)),
        NiftiType::Int32 => opts.write_nifti(&data.mapv(|v| v as i32)),
        NiftiType::Float64 => opts.write_nifti(&data.mapv(|v| v as f64)),
        _ => opts.write_nifti(data),
    };
    written.map_err(|e| anyhow::anyhow!("write volume '{}': {e}", out.display()))?;

    tracing::debug!(path = %out.display(), ?dtype, "wrote volume");
    Ok(())
}

/// Reduce a decoded N-d array to its first 3-D frame.
fn first_3d_frame(mut raw: ArrayD<f32>) -> Result<Array3<f32>, String> {
    if raw.ndim() < 3 {
        return Err(format!("expected a 3-D volume, got {}-D", raw.ndim()));
    }
    while raw.ndim() > 3 {
        let last = raw.ndim() - 1;
        if raw.len_of(Axis(last)) == 0 {
            return Err("volume has an empty time axis".to_string());
        }
        raw = raw.index_axis_move(Axis(last), 0);
    }
    raw.into_dimensionality::<Ix3>()
        .map_err(|e| format!("reshape to 3-D: {e}"))
}

/// Voxel-to-world transform: sform when set, else qform, else plain voxel scaling.
pub(crate) fn header_affine(h: &NiftiHeader) -> Matrix4<f64> {
    let pix = |i: usize| {
        let v = h.pixdim[i] as f64;
        if v > 0.0 { v } else { 1.0 }
    };

    if h.sform_code > 0 {
        let r = |row: [f32; 4]| row.map(|v| v as f64);
        let [x, y, z] = [r(h.srow_x), r(h.srow_y), r(h.srow_z)];
        return Matrix4::new(
            x[0], x[1], x[2], x[3], //
            y[0], y[1], y[2], y[3], //
            z[0], z[1], z[2], z[3], //
            0.0, 0.0, 0.0, 1.0,
        );
    }

    if h.qform_code > 0 {
        let (b, c, d) = (
            h.quatern_b as f64,
            h.quatern_c as f64,
            h.quatern_d as f64,
        );
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
        let qfac = if h.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let (sx, sy, sz) = (pix(1), pix(2), pix(3) * qfac);
        return Matrix4::new(
            (a * a + b * b - c * c - d * d) * sx,
            2.0 * (b * c - a * d) * sy,
            2.0 * (b * d + a * c) * sz,
            h.quatern_x as f64,
            2.0 * (b * c + a * d) * sx,
            (a * a + c * c - b * b - d * d) * sy,
            2.0 * (c * d - a * b) * sz,
            h.quatern_y as f64,
            2.0 * (b * d - a * c) * sx,
            2.0 * (c * d + a * b) * sy,
            (a * a + d * d - c * c - b * b) * sz,
            h.quatern_z as f64,
            0.0,
            0.0,
            0.0,
            1.0,
        );
    }

    Matrix4::new(
        pix(1), 0.0, 0.0, 0.0, //
        0.0, pix(2), 0.0, 0.0, //
        0.0, 0.0, pix(3), 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/volume/nifti_io.rs"]
mod tests;
