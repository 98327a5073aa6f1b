use {
    nalgebra as na,
    skinning::{
        read_skinning_data, write_skinning_data, AnimationClip, Keyframe,
        SkinningData,
    },
    std::{collections::HashMap, time::Duration},
};

const EPSILON: f32 = 1e-6;

fn assert_matrices_close(a: &na::Matrix4<f32>, b: &na::Matrix4<f32>) {
    for row in 0..4 {
        for column in 0..4 {
            let delta = (a[(row, column)] - b[(row, column)]).abs();
            assert!(
                delta <= EPSILON,
                "matrix component ({}, {}) differs by {}",
                row,
                column,
                delta
            );
        }
    }
}

fn round_trip(data: &SkinningData) -> SkinningData {
    let mut bytes = Vec::new();
    write_skinning_data(data, &mut bytes).unwrap();
    read_skinning_data(&mut bytes.as_slice()).unwrap()
}

fn translation(x: f32, y: f32, z: f32) -> na::Matrix4<f32> {
    na::Matrix4::new_translation(&na::Vector3::new(x, y, z))
}

#[test]
fn empty_skeleton_round_trips() {
    let data =
        SkinningData::new(HashMap::new(), Vec::new(), Vec::new(), Vec::new())
            .unwrap();

    let restored = round_trip(&data);
    assert_eq!(restored.bone_count(), 0);
    assert_eq!(restored.animation_clips().len(), 0);
}

#[test]
fn single_bone_single_keyframe_round_trips() {
    // One bone, one clip, one keyframe at t=0 with identity transform.
    let mut clips = HashMap::new();
    clips.insert(
        "idle".to_owned(),
        AnimationClip {
            duration: Duration::from_secs(1),
            keyframes: vec![Keyframe {
                bone: 0,
                time: Duration::from_secs(0),
                transform: na::Matrix4::identity(),
            }],
        },
    );

    let data = SkinningData::new(
        clips,
        vec![na::Matrix4::identity()],
        vec![na::Matrix4::identity()],
        vec![None],
    )
    .unwrap();

    let restored = round_trip(&data);

    assert_eq!(restored.bone_count(), 1);
    assert_eq!(restored.parents(), &[None]);

    let clip = restored.clip("idle").expect("clip lost in round trip");
    assert_eq!(clip.duration, Duration::from_secs(1));
    assert_eq!(clip.keyframes.len(), 1);
    assert_eq!(clip.keyframes[0].bone, 0);
    assert_eq!(clip.keyframes[0].time, Duration::from_secs(0));
    assert_matrices_close(
        &clip.keyframes[0].transform,
        &na::Matrix4::identity(),
    );
}

#[test]
fn long_bone_chain_round_trips_exactly() {
    // 65-bone linear chain, 30 keyframes per bone (1950 total).
    const BONES: usize = 65;
    const KEYFRAMES_PER_BONE: usize = 30;

    let bind_pose: Vec<_> = (0..BONES)
        .map(|bone| translation(bone as f32, 0.0, 1.0))
        .collect();
    let inverse_bind_pose: Vec<_> = (0..BONES)
        .map(|bone| translation(-(bone as f32), 0.0, -1.0))
        .collect();
    let parents: Vec<_> = (0..BONES).map(|bone| bone.checked_sub(1)).collect();

    let mut keyframes = Vec::new();
    for step in 0..KEYFRAMES_PER_BONE {
        for bone in 0..BONES {
            keyframes.push(Keyframe {
                bone,
                time: Duration::from_millis(step as u64 * 33),
                transform: translation(
                    bone as f32 * 0.25,
                    step as f32 * 0.5,
                    -1.5,
                ),
            });
        }
    }
    assert_eq!(keyframes.len(), 1950);

    let mut clips = HashMap::new();
    clips.insert(
        "walk".to_owned(),
        AnimationClip {
            duration: Duration::from_secs(1),
            keyframes,
        },
    );

    let data =
        SkinningData::new(clips, bind_pose, inverse_bind_pose, parents)
            .unwrap();
    let restored = round_trip(&data);

    assert_eq!(restored.bone_count(), BONES);
    assert_eq!(restored.parents(), data.parents());
    for bone in 0..BONES {
        assert_matrices_close(
            &restored.bind_pose()[bone],
            &data.bind_pose()[bone],
        );
        assert_matrices_close(
            &restored.inverse_bind_pose()[bone],
            &data.inverse_bind_pose()[bone],
        );
    }

    let clip = restored.clip("walk").unwrap();
    let original = data.clip("walk").unwrap();
    assert_eq!(clip.duration, original.duration);
    assert_eq!(clip.keyframes.len(), original.keyframes.len());
    for (restored, original) in
        clip.keyframes.iter().zip(original.keyframes.iter())
    {
        assert_eq!(restored.bone, original.bone);
        assert_eq!(restored.time, original.time);
        assert_matrices_close(&restored.transform, &original.transform);
    }
}

#[test]
fn multiple_clips_and_awkward_values_round_trip() {
    let mut clips = HashMap::new();
    for (name, seconds) in &[("idle", 0.96667), ("walk", 1.23456789), ("über walk", 2.0)]
    {
        clips.insert(
            (*name).to_owned(),
            AnimationClip {
                duration: Duration::from_secs_f64(*seconds),
                keyframes: vec![Keyframe {
                    bone: 1,
                    time: Duration::from_nanos(333_333_333),
                    transform: translation(0.1, -0.2, 0.3),
                }],
            },
        );
    }

    let data = SkinningData::new(
        clips,
        vec![na::Matrix4::identity(); 2],
        vec![na::Matrix4::identity(); 2],
        vec![None, Some(0)],
    )
    .unwrap();

    let restored = round_trip(&data);
    assert_eq!(restored.animation_clips().len(), 3);
    for (name, clip) in data.animation_clips() {
        let restored = restored.clip(name).expect("clip lost");
        // Nanosecond tick unit makes Duration round trips exact.
        assert_eq!(restored.duration, clip.duration);
        assert_eq!(restored.keyframes[0].time, clip.keyframes[0].time);
    }
}
