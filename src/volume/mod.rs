pub(crate) mod bbox;
pub(crate) mod nifti_io;
