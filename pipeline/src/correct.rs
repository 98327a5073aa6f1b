//! Pre-rotation repair for imported clips. Some export paths bake each
//! bone's `PreRotation` into the keyframes, others leave it out entirely,
//! and a clip missing it plays with the affected bones bent out of the
//! rig's intended frame. This pass detects the missing case per bone by
//! comparing keyframe rotations against the bind pose and multiplies the
//! pre-rotation back in.

use {
    crate::{
        math::{compose_trs, decompose_trs},
        prerotation::euler_deg_to_quaternion,
    },
    nalgebra as na,
    skinning::AnimationClip,
    std::collections::HashMap,
};

/// Pre-rotations whose largest axis angle (degrees) falls below this are
/// ignored: the detection signal for small angles drowns in keyframe
/// noise, and the visual error from leaving one out is minor.
pub const MIN_PREROTATION_DEG: f32 = 15.0;

/// How much better (in absolute quaternion dot) the first keyframe must
/// match the pre-rotation-stripped bind pose than the bind pose itself
/// before the clip is declared to be missing the pre-rotation.
pub const CORRECTION_MARGIN: f32 = 0.05;

/// Checks every bone with a known pre-rotation against `clip` and bakes
/// the pre-rotation into the bone's keyframes where it is found missing.
/// Returns the number of bones corrected.
///
/// `prerotations` holds Euler XYZ degrees per bone index; `bind_pose` is
/// the full local-space bind transform array.
pub fn correct_clip(
    name: &str,
    clip: &mut AnimationClip,
    prerotations: &HashMap<usize, na::Vector3<f32>>,
    bind_pose: &[na::Matrix4<f32>],
) -> usize {
    let mut corrected = 0;

    for (&bone, &euler) in prerotations {
        let max_axis = euler.x.abs().max(euler.y.abs()).max(euler.z.abs());
        if max_axis < MIN_PREROTATION_DEG {
            tracing::debug!(
                clip = name,
                bone,
                max_axis,
                "pre-rotation below correction floor, skipping"
            );
            continue;
        }

        let q_pre = euler_deg_to_quaternion(euler);

        let bind = match bind_pose.get(bone) {
            Some(bind) => bind,
            None => continue,
        };
        let bind_rotation = match decompose_trs(bind) {
            Some((_, rotation, _)) => rotation,
            None => {
                tracing::warn!(
                    clip = name,
                    bone,
                    "degenerate bind transform, skipping pre-rotation check"
                );
                continue;
            }
        };

        let first = clip
            .keyframes
            .iter()
            .find(|keyframe| keyframe.bone == bone);
        let key_rotation = match first.and_then(|keyframe| {
            decompose_trs(&keyframe.transform)
        }) {
            Some((_, rotation, _)) => rotation,
            None => continue,
        };

        if !needs_correction(&key_rotation, &bind_rotation, &q_pre) {
            continue;
        }

        apply_correction(clip, bone, &q_pre);
        corrected += 1;
        tracing::debug!(
            clip = name,
            bone,
            angle = q_pre.angle().to_degrees(),
            "injected missing pre-rotation"
        );
    }

    corrected
}

/// The clip is missing the pre-rotation when its first keyframe sits
/// measurably closer to the bind pose with the pre-rotation stripped than
/// to the bind pose itself. Absolute dots, since q and -q are the same
/// rotation.
fn needs_correction(
    key_rotation: &na::UnitQuaternion<f32>,
    bind_rotation: &na::UnitQuaternion<f32>,
    q_pre: &na::UnitQuaternion<f32>,
) -> bool {
    let bind_without_pre = bind_rotation * q_pre.inverse();

    let to_bind = key_rotation.coords.dot(&bind_rotation.coords).abs();
    let to_stripped =
        key_rotation.coords.dot(&bind_without_pre.coords).abs();

    to_stripped - to_bind > CORRECTION_MARGIN
}

/// Multiplies the pre-rotation into every keyframe of `bone`, on the
/// local side of the keyframe's own rotation, leaving scale and
/// translation untouched.
fn apply_correction(
    clip: &mut AnimationClip,
    bone: usize,
    q_pre: &na::UnitQuaternion<f32>,
) {
    for keyframe in &mut clip.keyframes {
        if keyframe.bone != bone {
            continue;
        }

        if let Some((scale, rotation, translation)) =
            decompose_trs(&keyframe.transform)
        {
            keyframe.transform =
                compose_trs(scale, rotation * q_pre, translation);
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, skinning::Keyframe, std::time::Duration};

    fn rot_x_deg(deg: f32) -> na::Matrix4<f32> {
        na::UnitQuaternion::from_axis_angle(
            &na::Vector3::x_axis(),
            deg.to_radians(),
        )
        .to_homogeneous()
    }

    fn clip_with_bone_rotation(deg: f32) -> AnimationClip {
        AnimationClip {
            duration: Duration::from_secs(1),
            keyframes: vec![
                Keyframe {
                    bone: 0,
                    time: Duration::from_secs(0),
                    transform: rot_x_deg(deg),
                },
                Keyframe {
                    bone: 0,
                    time: Duration::from_millis(500),
                    transform: rot_x_deg(deg + 5.0),
                },
            ],
        }
    }

    fn x_angle_deg(transform: &na::Matrix4<f32>) -> f32 {
        let (_, rotation, _) = decompose_trs(transform).unwrap();
        let (roll, _, _) = rotation.euler_angles();
        roll.to_degrees()
    }

    #[test]
    fn small_prerotation_is_left_alone() {
        let mut clip = clip_with_bone_rotation(-90.0);
        let mut prerotations = HashMap::new();
        prerotations.insert(0, na::Vector3::new(14.9, 0.0, 0.0));

        let corrected = correct_clip(
            "walk",
            &mut clip,
            &prerotations,
            &[na::Matrix4::identity()],
        );

        assert_eq!(corrected, 0);
        assert!((x_angle_deg(&clip.keyframes[0].transform) + 90.0).abs() < 1e-3);
    }

    #[test]
    fn missing_prerotation_is_injected() {
        // Identity bind with a 15.1° X pre-rotation: a clip resting at
        // rot_x(-90°) matches the stripped bind (rot_x(-15.1°)) far better
        // than the bind itself, so the pre-rotation gets multiplied in.
        let mut clip = clip_with_bone_rotation(-90.0);
        let mut prerotations = HashMap::new();
        prerotations.insert(0, na::Vector3::new(15.1, 0.0, 0.0));

        let corrected = correct_clip(
            "walk",
            &mut clip,
            &prerotations,
            &[na::Matrix4::identity()],
        );

        assert_eq!(corrected, 1);
        assert!(
            (x_angle_deg(&clip.keyframes[0].transform) + 74.9).abs() < 1e-2
        );
        // Every keyframe of the bone shifts, not just the first.
        assert!(
            (x_angle_deg(&clip.keyframes[1].transform) + 69.9).abs() < 1e-2
        );
    }

    #[test]
    fn margin_threshold_separates_near_cases() {
        // 90° X pre-rotation against an identity bind: a first keyframe of
        // rot_x(-90° + δ) yields a margin of cos(δ/2) − cos((90° − δ)/2),
        // which crosses 0.05 between δ = 38° and δ = 37°.
        let pre = na::Vector3::new(90.0, 0.0, 0.0);
        let bind = [na::Matrix4::identity()];

        let mut prerotations = HashMap::new();
        prerotations.insert(0, pre);

        let mut close = clip_with_bone_rotation(-90.0 + 38.0);
        assert_eq!(correct_clip("a", &mut close, &prerotations, &bind), 0);

        let mut far = clip_with_bone_rotation(-90.0 + 37.0);
        assert_eq!(correct_clip("b", &mut far, &prerotations, &bind), 1);
    }

    #[test]
    fn clip_already_carrying_prerotation_is_untouched() {
        // Keyframes resting right on the bind pose: margin is negative.
        let mut clip = clip_with_bone_rotation(0.0);
        let mut prerotations = HashMap::new();
        prerotations.insert(0, na::Vector3::new(90.0, 0.0, 0.0));

        let corrected = correct_clip(
            "idle",
            &mut clip,
            &prerotations,
            &[na::Matrix4::identity()],
        );
        assert_eq!(corrected, 0);
    }

    #[test]
    fn unknown_bone_indices_are_ignored() {
        let mut clip = clip_with_bone_rotation(-90.0);
        let mut prerotations = HashMap::new();
        prerotations.insert(7, na::Vector3::new(90.0, 0.0, 0.0));

        let corrected = correct_clip(
            "walk",
            &mut clip,
            &prerotations,
            &[na::Matrix4::identity()],
        );
        assert_eq!(corrected, 0);
    }
}
