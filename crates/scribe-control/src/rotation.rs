//! 刚体变换与旋转矩阵
//!
//! 变换树按 `x, y, z, w` 存储四元数，而 nalgebra 的 `Quaternion::new`
//! 接受 `w, x, y, z`，转换时显式重排。

use nalgebra::{Matrix3, Quaternion as NaQuaternion, UnitQuaternion, Vector3};
use scribe_protocol::{Point, Quaternion};

/// 两个坐标系之间的相对位姿
///
/// `lookup(target, source)` 返回的变换把 `source` 坐标系中的点映射到 `target` 坐标系：
/// `p_target = R * p_source + t`。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub translation: Point,
    pub rotation: Quaternion,
}

impl Transform {
    /// 单位变换
    pub const IDENTITY: Self = Transform {
        translation: Point::ORIGIN,
        rotation: Quaternion::IDENTITY,
    };

    /// 查询失败时使用的退化占位变换（零平移、全零四元数）
    pub const PLACEHOLDER: Self = Transform {
        translation: Point::ORIGIN,
        rotation: Quaternion::ZERO,
    };

    pub const fn new(translation: Point, rotation: Quaternion) -> Self {
        Transform {
            translation,
            rotation,
        }
    }

    /// 纯平移
    pub const fn from_translation(translation: Point) -> Self {
        Transform::new(translation, Quaternion::IDENTITY)
    }

    /// 平移向量
    pub fn translation_vector(&self) -> Vector3<f64> {
        point_to_vector(self.translation)
    }

    /// 旋转矩阵（先归一化）
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        rotation_matrix(&self.rotation)
    }

    /// 复合：`self ∘ other`，先应用 `other` 再应用 `self`
    pub fn compose(&self, other: &Transform) -> Transform {
        let r = to_unit(&self.rotation);
        let translation = r * other.translation_vector() + self.translation_vector();
        let rotation = r * to_unit(&other.rotation);
        Transform::new(vector_to_point(&translation), from_unit(&rotation))
    }

    /// 逆变换
    pub fn inverse(&self) -> Transform {
        let r_inv = to_unit(&self.rotation).inverse();
        let translation = -(r_inv * self.translation_vector());
        Transform::new(vector_to_point(&translation), from_unit(&r_inv))
    }

    /// 把 `source` 坐标系中的点变换到 `target` 坐标系
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation_matrix() * p + self.translation_vector()
    }
}

/// 四元数转旋转矩阵
///
/// 先归一化；模接近 0 的四元数（包括退化占位）得到单位矩阵，并记录 `warn!`。
pub fn rotation_matrix(q: &Quaternion) -> Matrix3<f64> {
    to_unit(q).to_rotation_matrix().into_inner()
}

pub fn point_to_vector(p: Point) -> Vector3<f64> {
    Vector3::new(p.x, p.y, p.z)
}

pub fn vector_to_point(v: &Vector3<f64>) -> Point {
    Point::new(v.x, v.y, v.z)
}

fn to_unit(q: &Quaternion) -> UnitQuaternion<f64> {
    let [w, x, y, z] = q.normalize().to_wxyz();
    UnitQuaternion::new_unchecked(NaQuaternion::new(w, x, y, z))
}

fn from_unit(q: &UnitQuaternion<f64>) -> Quaternion {
    // nalgebra 内部同样按 i, j, k, w 存储
    let c = &q.quaternion().coords;
    Quaternion::new(c[0], c[1], c[2], c[3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_quaternion_gives_identity_matrix() {
        let m = rotation_matrix(&Quaternion::IDENTITY);
        assert_relative_eq!(m, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_90_degree_about_z() {
        let half = FRAC_PI_2 / 2.0;
        let q = Quaternion::new(0.0, 0.0, half.sin(), half.cos());
        let m = rotation_matrix(&q);
        let expected = Matrix3::new(
            0.0, -1.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0,
        );
        assert_relative_eq!(m, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_90_degree_about_x() {
        let q = Quaternion::from_axis_angle([1.0, 0.0, 0.0], FRAC_PI_2);
        let m = rotation_matrix(&q);
        let expected = Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, 0.0, -1.0, //
            0.0, 1.0, 0.0,
        );
        assert_relative_eq!(m, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_non_unit_quaternion_is_normalized() {
        let half = FRAC_PI_2 / 2.0;
        let unit = Quaternion::new(0.0, 0.0, half.sin(), half.cos());
        let scaled = Quaternion::new(0.0, 0.0, unit.z * 3.0, unit.w * 3.0);

        let m = rotation_matrix(&scaled);
        assert_relative_eq!(m, rotation_matrix(&unit), epsilon = 1e-9);
        assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_placeholder_quaternion_maps_to_identity() {
        let m = rotation_matrix(&Quaternion::ZERO);
        assert_eq!(m, Matrix3::identity());
        assert!(m.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_compose_with_inverse_is_identity() {
        let t = Transform::new(
            Point::new(0.1, -0.2, 0.3),
            Quaternion::from_axis_angle([0.0, 1.0, 0.0], 0.7),
        );
        let id = t.compose(&t.inverse());
        assert_relative_eq!(id.translation_vector(), Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(id.rotation_matrix(), Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_compose_applies_right_operand_first() {
        let rotate = Transform::new(
            Point::ORIGIN,
            Quaternion::from_axis_angle([0.0, 0.0, 1.0], FRAC_PI_2),
        );
        let shift = Transform::from_translation(Point::new(1.0, 0.0, 0.0));

        // 先平移到 (1,0,0)，再绕 Z 旋转 90° 到 (0,1,0)
        let p = rotate.compose(&shift).transform_point(&Vector3::zeros());
        assert_relative_eq!(p, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }
}
