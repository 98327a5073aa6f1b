use {
    nalgebra as na,
    std::{collections::HashMap, time::Duration},
};

/// A single bone's local-space transform at one point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    /// Index into the skeleton arrays of `SkinningData`.
    pub bone: usize,

    /// Offset from the start of the clip.
    pub time: Duration,

    /// Local-space (parent-relative) bone transform at this time.
    pub transform: na::Matrix4<f32>,
}

/// One named animation ("idle", "walk", ...) as a flat keyframe list
/// covering all bones, sorted ascending by `(time, bone)`.
///
/// The flat list lets playback consume keyframes with a single forward
/// cursor instead of per-bone lookups.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    /// Total clip length. Looping playback wraps to zero here.
    pub duration: Duration,

    /// Keyframes for all bones, sorted by time, ties broken by bone index.
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, thiserror::Error)]
pub enum SkinningDataError {
    #[error(
        "bone array length mismatch: bind pose {bind_pose}, \
         inverse bind pose {inverse_bind_pose}, hierarchy {parents}"
    )]
    BoneArrayMismatch {
        bind_pose: usize,
        inverse_bind_pose: usize,
        parents: usize,
    },

    #[error("bone {bone} has parent {parent} which does not precede it")]
    ParentOutOfOrder { bone: usize, parent: usize },
}

/// Everything the runtime needs to animate one skinned model: the skeleton
/// definition (bind pose, inverse bind pose, hierarchy) and all clips.
///
/// The three per-bone arrays always have identical length, and every bone's
/// parent has a lower index than the bone itself. Both are checked at
/// construction so the playback loops can rely on them.
///
/// A `SkinningData` with zero bones is an animation-only artifact: it
/// carries clips meant to be merged into a base model's instance with
/// [`merge_clips`](SkinningData::merge_clips).
#[derive(Clone, Debug)]
pub struct SkinningData {
    animation_clips: HashMap<String, AnimationClip>,
    bind_pose: Vec<na::Matrix4<f32>>,
    inverse_bind_pose: Vec<na::Matrix4<f32>>,
    parents: Vec<Option<usize>>,
}

impl SkinningData {
    pub fn new(
        animation_clips: HashMap<String, AnimationClip>,
        bind_pose: Vec<na::Matrix4<f32>>,
        inverse_bind_pose: Vec<na::Matrix4<f32>>,
        parents: Vec<Option<usize>>,
    ) -> Result<Self, SkinningDataError> {
        if bind_pose.len() != inverse_bind_pose.len()
            || bind_pose.len() != parents.len()
        {
            return Err(SkinningDataError::BoneArrayMismatch {
                bind_pose: bind_pose.len(),
                inverse_bind_pose: inverse_bind_pose.len(),
                parents: parents.len(),
            });
        }

        for (bone, parent) in parents.iter().enumerate() {
            if let Some(parent) = *parent {
                if parent >= bone {
                    return Err(SkinningDataError::ParentOutOfOrder {
                        bone,
                        parent,
                    });
                }
            }
        }

        Ok(SkinningData {
            animation_clips,
            bind_pose,
            inverse_bind_pose,
            parents,
        })
    }

    pub fn bone_count(&self) -> usize {
        self.bind_pose.len()
    }

    /// Local-space rest transform per bone, relative to its parent.
    pub fn bind_pose(&self) -> &[na::Matrix4<f32>] {
        &self.bind_pose
    }

    /// Per bone, the matrix taking a model-space vertex into that bone's
    /// local space.
    pub fn inverse_bind_pose(&self) -> &[na::Matrix4<f32>] {
        &self.inverse_bind_pose
    }

    /// Parent index per bone. `None` marks a root.
    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    pub fn animation_clips(&self) -> &HashMap<String, AnimationClip> {
        &self.animation_clips
    }

    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.animation_clips.get(name)
    }

    pub fn clip_names(&self) -> impl Iterator<Item = &str> {
        self.animation_clips.keys().map(|name| name.as_str())
    }

    /// Merges clips from an animation-only artifact into this instance.
    ///
    /// Clip names that already exist here are skipped with a warning. Bone
    /// indices in the merged clips are trusted to match this skeleton; both
    /// artifacts must have been built against the same named skeleton, which
    /// the content pipeline upholds upstream and cannot be verified here.
    ///
    /// Returns the number of clips actually merged.
    pub fn merge_clips(&mut self, other: SkinningData) -> usize {
        if other.bone_count() != 0 {
            tracing::warn!(
                bones = other.bone_count(),
                "merging clips from an artifact that carries its own skeleton"
            );
        }

        let mut merged = 0;
        for (name, clip) in other.animation_clips {
            if self.animation_clips.contains_key(&name) {
                tracing::warn!(
                    clip = %name,
                    "clip already exists in target, skipping merge"
                );
                continue;
            }
            self.animation_clips.insert(name, clip);
            merged += 1;
        }
        merged
    }
}
