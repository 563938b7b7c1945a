pub(crate) mod job;
pub(crate) mod media;
pub(crate) mod settings;
