pub(crate) mod split;
