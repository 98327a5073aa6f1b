//! The top of the pipeline: takes the imported scene and flattened
//! skeleton, runs extraction and pre-rotation repair, and produces the
//! runtime [`SkinningData`] artifact.

use {
    crate::{
        content::{SceneNode, Skeleton},
        correct::correct_clip,
        extract::{build_clip, build_clip_auto_indexed, collect_animations},
        prerotation::read_prerotations,
    },
    eyre::eyre,
    nalgebra as na,
    skinning::SkinningData,
    std::{collections::HashMap, path::Path},
};

/// Processes one imported model into its runtime skinning artifact.
///
/// With a skeleton this produces a full artifact: bind pose, inverse bind
/// pose, hierarchy and clips, with missing pre-rotations repaired from the
/// FBX source when `source` points at one. Without a skeleton the model is
/// an animation-only container: the artifact carries clips with
/// auto-assigned bone indices and zero bones, to be merged into a skinned
/// base model at load time.
pub fn process_model(
    root: &SceneNode,
    skeleton: Option<&Skeleton>,
    source: Option<&Path>,
) -> eyre::Result<SkinningData> {
    match skeleton {
        Some(skeleton) => process_with_skeleton(root, skeleton, source),
        None => process_animation_only(root),
    }
}

fn process_with_skeleton(
    root: &SceneNode,
    skeleton: &Skeleton,
    source: Option<&Path>,
) -> eyre::Result<SkinningData> {
    let mut bind_pose = Vec::with_capacity(skeleton.bones.len());
    let mut inverse_bind_pose = Vec::with_capacity(skeleton.bones.len());
    let mut parents = Vec::with_capacity(skeleton.bones.len());

    for bone in &skeleton.bones {
        let inverse = bone.absolute_transform.try_inverse().ok_or_else(
            || eyre!("bone '{}' has a singular absolute transform", bone.name),
        )?;

        bind_pose.push(bone.local_transform);
        inverse_bind_pose.push(inverse);
        parents.push(bone.parent);
    }

    let bone_map = skeleton.bone_index_map();
    let prerotations = load_prerotations(source, &bone_map);

    let mut clips = HashMap::new();
    let mut corrected_bones = 0;
    for (name, content) in collect_animations(Some(skeleton), root) {
        let mut clip = build_clip(name, content, &bone_map);
        corrected_bones +=
            correct_clip(name, &mut clip, &prerotations, &bind_pose);
        clips.insert(name.to_owned(), clip);
    }

    tracing::info!(
        bones = skeleton.bones.len(),
        clips = clips.len(),
        corrected_bones,
        "processed skinned model"
    );

    Ok(SkinningData::new(
        clips,
        bind_pose,
        inverse_bind_pose,
        parents,
    )?)
}

/// A model with no skeleton of its own: its clips reference bones of some
/// other model by name, so indices are assigned on the fly and shared
/// across the clips. Pre-rotation repair needs a bind pose and does not
/// apply here; the clips are merged into a corrected base at load time.
fn process_animation_only(root: &SceneNode) -> eyre::Result<SkinningData> {
    let mut bone_map = HashMap::new();
    let mut clips = HashMap::new();

    for (name, content) in collect_animations(None, root) {
        let clip = build_clip_auto_indexed(content, &mut bone_map);
        clips.insert(name.to_owned(), clip);
    }

    if clips.is_empty() {
        tracing::warn!(
            node = %root.name,
            "model has neither skeleton nor animations"
        );
    } else {
        tracing::info!(
            bones = bone_map.len(),
            clips = clips.len(),
            "processed animation-only model"
        );
    }

    Ok(SkinningData::new(
        clips,
        Vec::new(),
        Vec::new(),
        Vec::new(),
    )?)
}

/// Best-effort pre-rotation lookup: extraction failures and unresolvable
/// bone names degrade to "no data", never to a processing error. A model
/// without pre-rotation data still builds, it just skips the repair pass.
fn load_prerotations(
    source: Option<&Path>,
    bone_map: &HashMap<String, usize>,
) -> HashMap<usize, na::Vector3<f32>> {
    let path = match source {
        Some(path) => path,
        None => return HashMap::new(),
    };

    let by_name = match read_prerotations(path) {
        Ok(by_name) => by_name,
        Err(error) => {
            tracing::warn!(
                source = %path.display(),
                %error,
                "failed to read pre-rotations, skipping repair pass"
            );
            return HashMap::new();
        }
    };

    let mut by_index = HashMap::new();
    for (name, euler) in by_name {
        match bone_map.get(&name) {
            Some(&bone) => {
                by_index.insert(bone, euler);
            }
            None => {
                tracing::debug!(
                    bone = %name,
                    "pre-rotation on a node outside the skeleton, ignoring"
                );
            }
        }
    }

    tracing::debug!(
        source = %path.display(),
        bones = by_index.len(),
        "loaded pre-rotations"
    );
    by_index
}
