//! The sweep passes run by [`crate::resolve_step`], in order.

pub(crate) mod down;
pub(crate) mod recovery;
pub(crate) mod side;
pub(crate) mod up;
