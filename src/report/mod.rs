pub(crate) mod assemble;
pub(crate) mod embed;
pub(crate) mod pipeline;
pub(crate) mod template;
