//! Turns imported animation channels into flat, sorted per-clip keyframe
//! lists with resolved bone indices.

use {
    crate::content::{AnimationContent, SceneNode, Skeleton},
    skinning::{AnimationClip, Keyframe},
    std::collections::HashMap,
};

/// Gathers every named animation reachable from the model, first-found-wins
/// across three locations in priority order: the skeleton root's own
/// animation map, the scene root's, then every descendant node's,
/// depth-first. Some exporters scatter clips across all three.
pub fn collect_animations<'a>(
    skeleton: Option<&'a Skeleton>,
    root: &'a SceneNode,
) -> HashMap<&'a str, &'a AnimationContent> {
    let mut animations = HashMap::new();

    if let Some(skeleton) = skeleton {
        for (name, content) in &skeleton.animations {
            animations.insert(name.as_str(), content);
        }
    }

    for (name, content) in &root.animations {
        if !animations.contains_key(name.as_str()) {
            tracing::debug!(clip = %name, "found animation on scene root");
            animations.insert(name.as_str(), content);
        }
    }

    collect_from_children(root, &mut animations);

    animations
}

fn collect_from_children<'a>(
    node: &'a SceneNode,
    animations: &mut HashMap<&'a str, &'a AnimationContent>,
) {
    for child in &node.children {
        for (name, content) in &child.animations {
            if !animations.contains_key(name.as_str()) {
                tracing::debug!(
                    clip = %name,
                    node = %child.name,
                    "found animation on child node"
                );
                animations.insert(name.as_str(), content);
            }
        }

        collect_from_children(child, animations);
    }
}

/// Flattens one animation's channels into a sorted keyframe list, resolving
/// bone names through the skeleton's index map. Channels whose bone name is
/// not in the map are dropped whole; animation curves on helper nodes
/// outside the render skeleton are expected and harmless.
pub fn build_clip(
    name: &str,
    content: &AnimationContent,
    bone_map: &HashMap<String, usize>,
) -> AnimationClip {
    let mut keyframes = Vec::new();

    for (bone_name, channel) in &content.channels {
        let bone = match bone_map.get(bone_name) {
            Some(&bone) => bone,
            None => {
                tracing::warn!(
                    clip = name,
                    channel = %bone_name,
                    "animation channel matches no skeleton bone, dropping"
                );
                continue;
            }
        };

        for keyframe in channel {
            keyframes.push(Keyframe {
                bone,
                time: keyframe.time,
                transform: keyframe.transform,
            });
        }
    }

    sort_keyframes(&mut keyframes);

    AnimationClip {
        duration: content.duration,
        keyframes,
    }
}

/// Animation-only variant, for assets with no skeleton of their own: bone
/// indices are assigned incrementally in first-seen order and recorded in
/// `bone_map`, which is shared across all clips of the asset so a bone
/// name resolves identically in every clip.
pub fn build_clip_auto_indexed(
    content: &AnimationContent,
    bone_map: &mut HashMap<String, usize>,
) -> AnimationClip {
    let mut keyframes = Vec::new();

    for (bone_name, channel) in &content.channels {
        let bone = match bone_map.get(bone_name) {
            Some(&bone) => bone,
            None => {
                let bone = bone_map.len();
                bone_map.insert(bone_name.clone(), bone);
                bone
            }
        };

        for keyframe in channel {
            keyframes.push(Keyframe {
                bone,
                time: keyframe.time,
                transform: keyframe.transform,
            });
        }
    }

    sort_keyframes(&mut keyframes);

    AnimationClip {
        duration: content.duration,
        keyframes,
    }
}

/// Canonical clip order: time ascending, ties broken by bone index. The
/// playback cursor consumes same-timestamp keyframes across bones in one
/// pass and needs the order deterministic.
fn sort_keyframes(keyframes: &mut Vec<Keyframe>) {
    keyframes.sort_by_key(|keyframe| (keyframe.time, keyframe.bone));
}
