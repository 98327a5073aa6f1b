//! Skinned-model animation data: the skeleton arrays and animation clips
//! shared between the content pipeline (producer) and the runtime player
//! (consumer), plus the binary codec that carries them between the two.

pub mod codec;
pub mod data;

pub use self::{
    codec::{read_skinning_data, write_skinning_data, CodecError},
    data::{AnimationClip, Keyframe, SkinningData, SkinningDataError},
};
