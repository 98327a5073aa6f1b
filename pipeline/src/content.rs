//! Input contract with the host content processor: the flattened skeleton
//! and the raw animation channels it gathered from the imported scene.
//! Plain data, produced outside this crate.

use {
    nalgebra as na,
    std::{collections::HashMap, time::Duration},
};

/// One sample of a single bone's animation channel.
#[derive(Clone, Copy, Debug)]
pub struct ChannelKeyframe {
    pub time: Duration,

    /// Local-space (parent-relative) bone transform at this time.
    pub transform: na::Matrix4<f32>,
}

/// A named animation as imported: per-bone channels keyed by bone name.
#[derive(Clone, Debug, Default)]
pub struct AnimationContent {
    pub duration: Duration,
    pub channels: HashMap<String, Vec<ChannelKeyframe>>,
}

impl AnimationContent {
    pub fn new(duration: Duration) -> Self {
        AnimationContent {
            duration,
            channels: HashMap::new(),
        }
    }
}

/// A node of the imported scene graph. Animations may hang off any node;
/// decorative helper nodes carry channels for bones that are not part of
/// the render skeleton.
#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: String,
    pub animations: HashMap<String, AnimationContent>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        SceneNode {
            name: name.into(),
            animations: HashMap::new(),
            children: Vec::new(),
        }
    }
}

/// One bone of the flattened skeleton, in canonical (topological) order:
/// a parent always precedes its children.
#[derive(Clone, Debug)]
pub struct FlattenedBone {
    pub name: String,

    /// Local-space rest transform, relative to the parent.
    pub local_transform: na::Matrix4<f32>,

    /// Model-space rest transform. Its inverse becomes the inverse bind
    /// pose.
    pub absolute_transform: na::Matrix4<f32>,

    /// Index of the parent bone in the flattened list; `None` for a root.
    pub parent: Option<usize>,
}

/// The flattened skeleton plus the animations found on the skeleton root
/// itself (the standard location, checked before any other node).
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    pub bones: Vec<FlattenedBone>,
    pub animations: HashMap<String, AnimationContent>,
}

impl Skeleton {
    /// Bone name to flattened index, for resolving channel names.
    pub fn bone_index_map(&self) -> HashMap<String, usize> {
        self.bones
            .iter()
            .enumerate()
            .map(|(index, bone)| (bone.name.clone(), index))
            .collect()
    }
}
