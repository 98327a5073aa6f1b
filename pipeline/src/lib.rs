//! Build-time content pipeline for skinned FBX models.
//!
//! The host model processor hands over a flattened skeleton and the raw
//! animation channels it gathered from the scene graph; this crate turns
//! them into a [`skinning::SkinningData`]: keyframes are normalized into
//! flat per-clip lists, bone pre-rotations are recovered from the FBX
//! binary itself and injected into clips that are missing them, and the
//! result is ready for the binary codec.

pub mod content;
pub mod correct;
pub mod extract;
pub mod fbx;
pub mod math;
pub mod prerotation;
pub mod processor;

pub use self::{
    content::{
        AnimationContent, ChannelKeyframe, FlattenedBone, SceneNode, Skeleton,
    },
    processor::process_model,
};
