mod compose;
mod interaction;
mod view;

pub(in crate::app) use compose::{FrameStyle, compose_frame};
