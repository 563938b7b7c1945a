pub(crate) mod compiler;
pub(crate) mod lease;
pub(crate) mod progress;
pub(crate) mod scratch;
