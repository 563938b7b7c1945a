pub(crate) mod manifest;
pub(crate) mod mix;
