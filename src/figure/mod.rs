pub(crate) mod backend;
pub(crate) mod compose;
pub(crate) mod contour;
pub(crate) mod svg;
