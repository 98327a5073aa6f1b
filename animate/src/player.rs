use {
    nalgebra as na,
    skinning::SkinningData,
    std::{sync::Arc, time::Duration},
};

#[derive(Debug, thiserror::Error)]
pub enum AnimateError {
    #[error("animation clip '{name}' does not exist")]
    UnknownClip { name: String },

    #[error("no clip is playing; call start_clip first")]
    NotStarted,
}

struct Playback {
    clip: String,
    time: Duration,
    /// Index of the next unconsumed keyframe in the clip's flat list.
    cursor: usize,
}

/// Plays one clip at a time through the three-stage transform pipeline:
///
/// 1. [`update_local_transforms`](AnimationPlayer::update_local_transforms)
///    decodes keyframes into local-space bone transforms;
/// 2. [`update_world_transforms`](AnimationPlayer::update_world_transforms)
///    composes the hierarchy into model-space transforms;
/// 3. [`update_skin_transforms`](AnimationPlayer::update_skin_transforms)
///    folds in the inverse bind pose for GPU upload.
///
/// Keyframes are consumed by a forward-only cursor over the clip's flat,
/// time-sorted list. A bone's pose snaps to its most recent keyframe; there
/// is no interpolation between keyframes.
pub struct AnimationPlayer {
    data: Arc<SkinningData>,
    local_transforms: Box<[na::Matrix4<f32>]>,
    world_transforms: Box<[na::Matrix4<f32>]>,
    skin_transforms: Box<[na::Matrix4<f32>]>,
    playback: Option<Playback>,
}

impl AnimationPlayer {
    pub fn new(data: Arc<SkinningData>) -> Self {
        let bones = data.bone_count();
        AnimationPlayer {
            data,
            local_transforms: identity_pose(bones),
            world_transforms: identity_pose(bones),
            skin_transforms: identity_pose(bones),
            playback: None,
        }
    }

    /// Starts playing a clip from the beginning: playback time and keyframe
    /// cursor reset to zero, local transforms reset to the bind pose.
    pub fn start_clip(&mut self, name: &str) -> Result<(), AnimateError> {
        if self.data.clip(name).is_none() {
            return Err(AnimateError::UnknownClip {
                name: name.to_owned(),
            });
        }

        tracing::debug!(clip = name, "starting animation clip");

        self.playback = Some(Playback {
            clip: name.to_owned(),
            time: Duration::from_secs(0),
            cursor: 0,
        });
        self.local_transforms
            .copy_from_slice(self.data.bind_pose());
        Ok(())
    }

    /// Runs all three pipeline stages. The one call most users need per
    /// frame.
    pub fn update(
        &mut self,
        time: Duration,
        relative: bool,
        root_transform: &na::Matrix4<f32>,
    ) -> Result<(), AnimateError> {
        self.update_local_transforms(time, relative)?;
        self.update_world_transforms(root_transform)?;
        self.update_skin_transforms()
    }

    /// Stage 1: advance (or seek) playback time and decode keyframes into
    /// local-space bone transforms.
    ///
    /// With `relative` set, `time` is added to the current position,
    /// otherwise it is an absolute position within the clip. Time wraps
    /// modulo the clip duration. Whenever the new position lands before the
    /// current one (loop wrap or backwards seek) the scan cursor and the
    /// local transforms reset to the start state, since the cursor cannot
    /// consume keyframes out of order.
    pub fn update_local_transforms(
        &mut self,
        time: Duration,
        relative: bool,
    ) -> Result<(), AnimateError> {
        let playback = self.playback.as_mut().ok_or(AnimateError::NotStarted)?;
        let clip = match self.data.clip(&playback.clip) {
            Some(clip) => clip,
            None => return Err(AnimateError::NotStarted),
        };

        let mut time = if relative {
            playback.time + time
        } else {
            time
        };

        if clip.duration.is_zero() {
            // A zero-length clip has nowhere to loop to.
            time = Duration::from_secs(0);
        } else {
            while time >= clip.duration {
                time -= clip.duration;
            }
        }

        if time < playback.time {
            playback.cursor = 0;
            self.local_transforms
                .copy_from_slice(self.data.bind_pose());
        }
        playback.time = time;

        while let Some(keyframe) = clip.keyframes.get(playback.cursor) {
            if keyframe.time > time {
                // Unconsumed; picked up by a later tick.
                break;
            }
            self.local_transforms[keyframe.bone] = keyframe.transform;
            playback.cursor += 1;
        }

        Ok(())
    }

    /// Stage 2: compose the bone hierarchy into model-space transforms.
    ///
    /// Bones are processed in increasing index order; every parent precedes
    /// its children, so the parent's world transform is always ready. Root
    /// bones compose with `root_transform` instead.
    pub fn update_world_transforms(
        &mut self,
        root_transform: &na::Matrix4<f32>,
    ) -> Result<(), AnimateError> {
        if self.playback.is_none() {
            return Err(AnimateError::NotStarted);
        }

        for bone in 0..self.world_transforms.len() {
            let local = self.local_transforms[bone];
            self.world_transforms[bone] = match self.data.parents()[bone] {
                Some(parent) => self.world_transforms[parent] * local,
                None => root_transform * local,
            };
        }

        Ok(())
    }

    /// Stage 3: fold the inverse bind pose into each world transform,
    /// producing the final matrices the GPU skinning shader consumes.
    pub fn update_skin_transforms(&mut self) -> Result<(), AnimateError> {
        if self.playback.is_none() {
            return Err(AnimateError::NotStarted);
        }

        for bone in 0..self.skin_transforms.len() {
            self.skin_transforms[bone] =
                self.world_transforms[bone] * self.data.inverse_bind_pose()[bone];
        }

        Ok(())
    }

    /// Final skinning matrices, one per bone, ready for GPU upload.
    pub fn skin_transforms(&self) -> &[na::Matrix4<f32>] {
        &self.skin_transforms
    }

    pub fn world_transforms(&self) -> &[na::Matrix4<f32>] {
        &self.world_transforms
    }

    /// Name of the clip currently playing, if any.
    pub fn current_clip(&self) -> Option<&str> {
        self.playback
            .as_ref()
            .map(|playback| playback.clip.as_str())
    }

    /// Playback position within the current clip.
    pub fn current_time(&self) -> Option<Duration> {
        self.playback.as_ref().map(|playback| playback.time)
    }

    pub fn skinning_data(&self) -> &SkinningData {
        &self.data
    }
}

fn identity_pose(bones: usize) -> Box<[na::Matrix4<f32>]> {
    vec![na::Matrix4::identity(); bones].into_boxed_slice()
}
