pub(crate) mod decode;
pub(crate) mod probe;
pub(crate) mod resolver;
