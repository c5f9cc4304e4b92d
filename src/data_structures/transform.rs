//! Transform composition for node hierarchies.
//!
//! Local transforms come in two shapes: a raw column-major matrix, or a
//! translation/rotation/scale triple. Both collapse to a [`cgmath::Matrix4`]
//! and compose as `world = parent * local`.

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, One, Quaternion, SquareMatrix, Vector3};

/// A node's transform relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LocalTransform {
    Matrix(Matrix4<f32>),
    Decomposed {
        translation: Vector3<f32>,
        rotation: Quaternion<f32>,
        scale: Vector3<f32>,
    },
}

impl LocalTransform {
    pub fn identity() -> Self {
        Self::Matrix(Matrix4::identity())
    }

    pub fn from_trs(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        // glTF stores quaternions as [x, y, z, w]
        let [x, y, z, w] = rotation;
        Self::Decomposed {
            translation: translation.into(),
            rotation: Quaternion::new(w, x, y, z),
            scale: scale.into(),
        }
    }

    /// Collapses the transform to a matrix. TRS is applied as `T * R * S`.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        match self {
            Self::Matrix(m) => *m,
            Self::Decomposed {
                translation,
                rotation,
                scale,
            } => {
                Matrix4::from_translation(*translation)
                    * Matrix4::from(*rotation)
                    * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
            }
        }
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Matrix4<f32>> for LocalTransform {
    fn from(m: Matrix4<f32>) -> Self {
        Self::Matrix(m)
    }
}

/// `parent * local`. Roots pass the identity as parent.
pub fn compose(parent: &Matrix4<f32>, local: &LocalTransform) -> Matrix4<f32> {
    parent * local.to_matrix()
}

/// Upper-left 3x3 block of an affine matrix.
pub fn upper3x3(m: &Matrix4<f32>) -> Matrix3<f32> {
    Matrix3::from_cols(m.x.truncate(), m.y.truncate(), m.z.truncate())
}

/// The matrix that keeps normals perpendicular to surfaces under `world`:
/// `transpose(inverse(upper3x3(world)))`.
///
/// A singular block (zero scale on some axis) has no inverse. In that case
/// the block itself is returned and the caller's renormalisation deals with
/// the degenerate result.
pub fn normal_matrix(world: &Matrix4<f32>) -> Matrix3<f32> {
    let m = upper3x3(world);
    match m.invert() {
        Some(inv) => inv.transpose(),
        None => m,
    }
}

/// Transforms a normal and renormalises it. Degenerate results fall back to +Y.
pub fn transform_normal(normal_matrix: &Matrix3<f32>, normal: [f32; 3]) -> [f32; 3] {
    let n = normal_matrix * Vector3::from(normal);
    let len2 = n.magnitude2();
    if len2 > f32::EPSILON && len2.is_finite() {
        (n / len2.sqrt()).into()
    } else {
        [0.0, 1.0, 0.0]
    }
}

/// Transforms a position as a point (w = 1).
pub fn transform_point(world: &Matrix4<f32>, p: [f32; 3]) -> [f32; 3] {
    let v = world * Vector3::from(p).extend(1.0);
    [v.x, v.y, v.z]
}

pub fn identity() -> Matrix4<f32> {
    Matrix4::one()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rotation3};

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn root_world_equals_local() {
        let local = LocalTransform::from_trs([1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0], [2.0, 2.0, 2.0]);
        assert_eq!(compose(&identity(), &local), local.to_matrix());
    }

    #[test]
    fn child_world_is_parent_times_local() {
        let parent = Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0));
        let local = LocalTransform::Matrix(Matrix4::from_scale(2.0));
        let world = compose(&parent, &local);
        assert!(approx(transform_point(&world, [1.0, 0.0, 0.0]), [7.0, 0.0, 0.0]));
    }

    #[test]
    fn trs_applies_scale_before_rotation_before_translation() {
        let rotation = Quaternion::from_angle_z(Deg(90.0));
        let local = LocalTransform::Decomposed {
            translation: Vector3::new(0.0, 0.0, 1.0),
            rotation,
            scale: Vector3::new(2.0, 1.0, 1.0),
        };
        let p = transform_point(&local.to_matrix(), [1.0, 0.0, 0.0]);
        assert!(approx(p, [0.0, 2.0, 1.0]), "got {p:?}");
    }

    #[test]
    fn normals_stay_unit_under_non_uniform_scale() {
        let world = Matrix4::from_nonuniform_scale(4.0, 1.0, 1.0);
        let nm = normal_matrix(&world);
        let n = transform_normal(&nm, [1.0, 1.0, 0.0]);
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        assert!((len - 1.0).abs() < 1e-5);
        // inverse-transpose pushes the normal away from the stretched axis
        assert!(n[1] > n[0]);
    }

    #[test]
    fn singular_block_does_not_produce_nan() {
        let world = Matrix4::from_nonuniform_scale(0.0, 1.0, 1.0);
        let nm = normal_matrix(&world);
        let n = transform_normal(&nm, [1.0, 0.0, 0.0]);
        assert_eq!(n, [0.0, 1.0, 0.0]);
    }
}
