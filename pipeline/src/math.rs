//! Decomposition of affine bone transforms into scale, rotation and
//! translation, and recomposition back. Keyframe matrices carry all three
//! and the rotation part must be isolated before a pre-rotation can be
//! compared against it or multiplied into it.

use nalgebra as na;

/// Column scales below this are degenerate; decomposition refuses them
/// rather than emit a garbage rotation.
const MIN_SCALE: f32 = 1e-6;

/// Splits an affine transform into scale, rotation and translation, with
/// the transform understood as translation ∘ rotation ∘ scale. Returns
/// `None` when a basis column is near zero length.
///
/// Mirrored (negative determinant) bases fold the flip into the scale's
/// X component so the rotation stays proper.
pub fn decompose_trs(
    transform: &na::Matrix4<f32>,
) -> Option<(na::Vector3<f32>, na::UnitQuaternion<f32>, na::Vector3<f32>)> {
    let translation = na::Vector3::new(
        transform[(0, 3)],
        transform[(1, 3)],
        transform[(2, 3)],
    );

    let basis = transform.fixed_slice::<na::U3, na::U3>(0, 0);
    let mut scale = na::Vector3::new(
        basis.column(0).norm(),
        basis.column(1).norm(),
        basis.column(2).norm(),
    );

    if scale.x < MIN_SCALE || scale.y < MIN_SCALE || scale.z < MIN_SCALE {
        return None;
    }

    if basis.determinant() < 0.0 {
        scale.x = -scale.x;
    }

    let rotation = na::Matrix3::from_columns(&[
        basis.column(0) / scale.x,
        basis.column(1) / scale.y,
        basis.column(2) / scale.z,
    ]);
    let rotation = na::UnitQuaternion::from_rotation_matrix(
        &na::Rotation3::from_matrix_unchecked(rotation),
    );

    Some((scale, rotation, translation))
}

/// Rebuilds the affine transform from the parts `decompose_trs` produced.
pub fn compose_trs(
    scale: na::Vector3<f32>,
    rotation: na::UnitQuaternion<f32>,
    translation: na::Vector3<f32>,
) -> na::Matrix4<f32> {
    let mut transform = rotation.to_homogeneous();

    {
        let mut basis = transform.fixed_slice_mut::<na::U3, na::U3>(0, 0);
        let mut x = basis.column_mut(0);
        x *= scale.x;
        let mut y = basis.column_mut(1);
        y *= scale.y;
        let mut z = basis.column_mut(2);
        z *= scale.z;
    }

    transform[(0, 3)] = translation.x;
    transform[(1, 3)] = translation.y;
    transform[(2, 3)] = translation.z;
    transform
}
