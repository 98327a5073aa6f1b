//! Runtime playback of skinned animation clips.

mod player;

pub use self::player::{AnimateError, AnimationPlayer};
