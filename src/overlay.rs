pub(crate) mod keyframes;
pub(crate) mod stack;
pub(crate) mod title_card;
