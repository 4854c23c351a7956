//! 笛卡尔空间几何类型
//!
//! 提供点、四元数和位姿的表示，字段顺序与变换树消息保持一致
//! （四元数按 `x, y, z, w` 存储）。
//!
//! # 示例
//!
//! ```rust
//! use scribe_protocol::{Point, Pose, Quaternion};
//!
//! let pose = Pose::new(Point::new(0.5, 0.0, 0.4), Quaternion::new(1.0, 0.0, 0.0, 0.0));
//! assert!(pose.is_finite());
//! ```

use std::fmt;

/// 四元数归一化阈值（避免除零）
///
/// 当四元数的模平方小于此值时，归一化会返回单位四元数。
pub const QUATERNION_NORM_THRESHOLD: f64 = 1e-10;

/// 三维点（米）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    /// X 坐标（米）
    pub x: f64,
    /// Y 坐标（米）
    pub y: f64,
    /// Z 坐标（米）
    pub z: f64,
}

impl Point {
    /// 原点
    pub const ORIGIN: Self = Point::new(0.0, 0.0, 0.0);

    /// 创建新的三维点
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Point { x, y, z }
    }

    /// 所有分量是否为有限值
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// 转为数组 `[x, y, z]`
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Point {
    fn from(v: [f64; 3]) -> Self {
        Point::new(v[0], v[1], v[2])
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// 四元数（存储顺序 `x, y, z, w`）
///
/// 变换树与位姿消息都按 `x, y, z, w` 存放分量，转换成旋转矩阵时
/// 必须显式重排为 `w, x, y, z`。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    /// 虚部 i
    pub x: f64,
    /// 虚部 j
    pub y: f64,
    /// 虚部 k
    pub z: f64,
    /// 实部
    pub w: f64,
}

impl Quaternion {
    /// 单位四元数（无旋转）
    pub const IDENTITY: Self = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// 全零四元数
    ///
    /// 变换查询失败时使用的占位值，不是合法的单位四元数。
    pub const ZERO: Self = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 0.0,
    };

    /// 按存储顺序 `x, y, z, w` 创建
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Quaternion { x, y, z, w }
    }

    /// 绕单位轴旋转 `angle` 弧度
    pub fn from_axis_angle(axis: [f64; 3], angle: f64) -> Self {
        let (s, c) = (angle / 2.0).sin_cos();
        Quaternion::new(axis[0] * s, axis[1] * s, axis[2] * s, c)
    }

    /// 模平方
    pub fn norm_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    /// 所有分量是否为有限值
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    /// 归一化（确保单位四元数）
    ///
    /// 如果四元数的模接近 0（模平方 < [`QUATERNION_NORM_THRESHOLD`]），
    /// 返回单位四元数以避免除零和 NaN 扩散。全零占位四元数走的就是这条路径。
    pub fn normalize(&self) -> Self {
        let norm_sq = self.norm_squared();

        if norm_sq < QUATERNION_NORM_THRESHOLD {
            tracing::warn!(
                "Normalizing near-zero quaternion (norm²={:.2e}): {}, returning identity",
                norm_sq,
                self
            );
            return Quaternion::IDENTITY;
        }

        let norm = norm_sq.sqrt();
        Quaternion {
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
            w: self.w / norm,
        }
    }

    /// 重排为 `[w, x, y, z]`
    pub fn to_wxyz(self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::IDENTITY
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Q(x={:.3}, y={:.3}, z={:.3}, w={:.3})",
            self.x, self.y, self.z, self.w
        )
    }
}

/// 末端位姿（位置 + 姿态）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// 位置（米）
    pub position: Point,
    /// 姿态
    pub orientation: Quaternion,
}

impl Pose {
    pub const fn new(position: Point, orientation: Quaternion) -> Self {
        Pose {
            position,
            orientation,
        }
    }

    /// 所有分量是否为有限值
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pose[{} {}]", self.position, self.orientation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_non_unit_quaternion() {
        let q = Quaternion::new(0.0, 0.0, 2.0, 2.0).normalize();
        let expected = std::f64::consts::FRAC_1_SQRT_2;
        assert!((q.z - expected).abs() < 1e-12);
        assert!((q.w - expected).abs() < 1e-12);
        assert!((q.norm_squared() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_zero_quaternion_returns_identity() {
        assert_eq!(Quaternion::ZERO.normalize(), Quaternion::IDENTITY);
    }

    #[test]
    fn test_to_wxyz_reorders_components() {
        let q = Quaternion::new(0.1, 0.2, 0.3, 0.9);
        assert_eq!(q.to_wxyz(), [0.9, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_pose_finite_check() {
        let mut pose = Pose::new(Point::new(0.5, 0.0, 0.4), Quaternion::IDENTITY);
        assert!(pose.is_finite());

        pose.position.y = f64::NAN;
        assert!(!pose.is_finite());

        pose.position.y = 0.0;
        pose.orientation.w = f64::INFINITY;
        assert!(!pose.is_finite());
    }

    #[test]
    fn test_axis_angle_quarter_turn() {
        let q = Quaternion::from_axis_angle([0.0, 0.0, 1.0], std::f64::consts::FRAC_PI_2);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!((q.z - h).abs() < 1e-12);
        assert!((q.w - h).abs() < 1e-12);
    }
}
