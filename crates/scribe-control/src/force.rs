//! 末端接触力估计
//!
//! 只用第 6 关节的力矩推算工具坐标系 Z 方向的接触力：
//!
//! 1. 由基座→第 6 关节的旋转把手爪重力变换到第 6 关节坐标系
//! 2. 与手爪质心位置逐元素相乘，取 Y 分量作为重力力矩偏置
//! 3. 原始力矩减去标定偏置和重力偏置
//! 4. 除以第 6 关节→工具尖端的力臂（逐元素，力臂分量为 0 时结果为 0）
//! 5. 旋转到工具坐标系，取 Z 分量
//!
//! 第 2 步是逐元素乘积，不是叉积。

use crate::config::{ConfigError, FrameNames};
use crate::rotation::{point_to_vector, rotation_matrix};
use crate::transform::{FrameResolver, TransformProvider};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// 运动学常量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicConstants {
    /// 连杆长度 L1（米）
    pub link_length_1: f64,
    /// 连杆长度 L2（米）
    pub link_length_2: f64,
    /// 手爪质量（kg）
    pub gripper_mass: f64,
    /// 重力加速度（m/s²）
    pub gravity: f64,
    /// 手爪质心相对手爪坐标系的偏移
    pub center_of_mass: [f64; 3],
    /// 工具尖端相对手爪坐标系的偏移
    pub tool_tip: [f64; 3],
    /// 手爪坐标系相对第 6 关节坐标系的偏移
    pub joint6_to_hand: [f64; 3],
}

impl Default for KinematicConstants {
    fn default() -> Self {
        Self {
            link_length_1: 0.1070,
            link_length_2: 0.1130,
            gripper_mass: 1.795750991,
            gravity: 9.81,
            center_of_mass: [-0.01, 0.0, 0.03],
            tool_tip: [0.0, 0.0, 0.1034],
            joint6_to_hand: [0.088, -0.1070, 0.0],
        }
    }
}

impl KinematicConstants {
    /// 标定力臂 `L1 + L2`
    pub fn lever_arm(&self) -> f64 {
        self.link_length_1 + self.link_length_2
    }

    /// 手爪重力（世界坐标系）
    pub fn gripper_weight(&self) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, -self.gripper_mass * self.gravity)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scalars = [
            ("kinematics.link_length_1", self.link_length_1),
            ("kinematics.link_length_2", self.link_length_2),
            ("kinematics.gripper_mass", self.gripper_mass),
            ("kinematics.gravity", self.gravity),
        ];
        for (field, value) in scalars {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be > 0, got {}",
                    field, value
                )));
            }
        }

        let vectors = [
            ("kinematics.center_of_mass", self.center_of_mass),
            ("kinematics.tool_tip", self.tool_tip),
            ("kinematics.joint6_to_hand", self.joint6_to_hand),
        ];
        for (field, v) in vectors {
            if v.iter().any(|c| !c.is_finite()) {
                return Err(ConfigError::Invalid(format!("{} must be finite", field)));
            }
        }
        Ok(())
    }
}

/// 第 6 关节处的重力力矩（逐元素乘积）
///
/// `f6` 为第 6 关节坐标系中的重力，`lever` 为质心在第 6 关节坐标系中的位置。
pub fn gravity_moment(f6: &Vector3<f64>, lever: &Vector3<f64>) -> Vector3<f64> {
    f6.component_mul(lever)
}

/// 逐元素除法，分母分量为 0 时对应结果为 0
pub fn divide_guarded(numerator: &Vector3<f64>, denominator: &Vector3<f64>) -> Vector3<f64> {
    numerator.zip_map(denominator, |n, d| if d == 0.0 { 0.0 } else { n / d })
}

/// 单次估计的中间量，便于日志和测试
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceEstimate {
    /// 重力引起的第 6 关节力矩偏置
    pub gravity_offset: f64,
    /// 扣除偏置后的力矩
    pub corrected_torque: f64,
    /// 工具坐标系中的力
    pub force: Vector3<f64>,
}

impl ForceEstimate {
    pub fn force_z(&self) -> f64 {
        self.force.z
    }
}

/// 末端力估计器
#[derive(Debug, Clone)]
pub struct ForceEstimator {
    constants: KinematicConstants,
    base_frame: String,
    frames: FrameNames,
}

impl ForceEstimator {
    pub fn new(constants: KinematicConstants, base_frame: impl Into<String>, frames: FrameNames) -> Self {
        Self {
            constants,
            base_frame: base_frame.into(),
            frames,
        }
    }

    pub fn constants(&self) -> &KinematicConstants {
        &self.constants
    }

    /// 估计工具坐标系中的接触力
    ///
    /// 变换查询失败时由 `resolver` 替换为占位变换，估计照常进行。
    pub fn estimate<T: TransformProvider>(
        &self,
        resolver: &FrameResolver<T>,
        raw_torque: f64,
        calibration_offset: f64,
    ) -> ForceEstimate {
        let joint6 = self.frames.joint6.as_str();

        let base_to_joint6 = resolver.resolve(&self.base_frame, joint6);
        let joint6_to_hand = resolver.resolve(joint6, &self.frames.hand);

        let rw6 = base_to_joint6.rotation_matrix();
        let r6f = joint6_to_hand.rotation_matrix();
        let p6f = joint6_to_hand.translation_vector();

        // 旋转矩阵正交，逆即转置
        let f6 = rw6.transpose() * self.constants.gripper_weight();
        let com = Vector3::from(self.constants.center_of_mass);
        let m6 = gravity_moment(&f6, &(p6f + r6f * com));
        let gravity_offset = m6.y;

        let corrected_torque = raw_torque - calibration_offset - gravity_offset;

        let p6e = point_to_vector(resolver.resolve(joint6, &self.frames.tool_tip).translation);
        let r6e = rotation_matrix(&resolver.resolve(&self.frames.tool_tip, joint6).rotation);

        let f6_contact = divide_guarded(&Vector3::new(0.0, corrected_torque, 0.0), &p6e);
        let force = r6e * f6_contact;

        trace!(
            "raw={:.4} calib={:.4} gravity={:.4} corrected={:.4} force_z={:.4}",
            raw_torque, calibration_offset, gravity_offset, corrected_torque, force.z
        );

        ForceEstimate {
            gravity_offset,
            corrected_torque,
            force,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ControllerMetrics;
    use crate::rotation::Transform;
    use crate::transform::TransformError;
    use approx::assert_relative_eq;
    use scribe_protocol::{Point, Quaternion};
    use std::collections::HashMap;
    use std::sync::Arc;

    /// 按 (target, source) 查表，未登记的返回单位变换
    #[derive(Default)]
    struct Table(HashMap<(String, String), Transform>);

    impl Table {
        fn with(mut self, target: &str, source: &str, t: Transform) -> Self {
            self.0.insert((target.into(), source.into()), t);
            self
        }
    }

    impl TransformProvider for Table {
        fn lookup(&self, target: &str, source: &str) -> Result<Transform, TransformError> {
            Ok(self
                .0
                .get(&(target.to_string(), source.to_string()))
                .copied()
                .unwrap_or(Transform::IDENTITY))
        }
    }

    struct Unavailable;

    impl TransformProvider for Unavailable {
        fn lookup(&self, _: &str, source: &str) -> Result<Transform, TransformError> {
            Err(TransformError::Lookup {
                frame: source.to_string(),
            })
        }
    }

    fn estimator() -> ForceEstimator {
        ForceEstimator::new(
            KinematicConstants::default(),
            "panda_link0",
            FrameNames::default(),
        )
    }

    fn resolver<T: TransformProvider>(provider: T) -> FrameResolver<T> {
        FrameResolver::new(provider, Arc::new(ControllerMetrics::new()))
    }

    #[test]
    fn test_identity_transforms_and_zero_torque_give_zero_force() {
        let est = estimator().estimate(&resolver(Table::default()), 0.0, 0.0);
        assert_eq!(est.force_z(), 0.0);
        assert!(est.force.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_divide_guard_zeroes_components() {
        let n = Vector3::new(3.0, -2.0, 7.5);
        let d = Vector3::new(0.0, 4.0, 0.0);
        let out = divide_guarded(&n, &d);
        assert_eq!(out, Vector3::new(0.0, -0.5, 0.0));
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_gravity_moment_is_elementwise() {
        let f = Vector3::new(1.0, 2.0, 3.0);
        let r = Vector3::new(4.0, 5.0, 6.0);
        assert_eq!(gravity_moment(&f, &r), Vector3::new(4.0, 10.0, 18.0));
    }

    #[test]
    fn test_gravity_offset_with_aligned_frames() {
        // 所有旋转为单位阵时 F6 = (0, 0, -mg)，Y 分量为 0，重力偏置为 0
        let table = Table::default().with(
            "panda_link6",
            "panda_hand",
            Transform::from_translation(Point::new(0.088, -0.1070, 0.0)),
        );
        let est = estimator().estimate(&resolver(table), 0.0, 0.0);
        assert_eq!(est.gravity_offset, 0.0);
    }

    #[test]
    fn test_gravity_offset_with_tilted_joint6() {
        // 第 6 关节绕 X 轴 -90°：世界 -Z 在第 6 关节坐标系中变为 +Y
        let tilt = Transform::new(
            Point::ORIGIN,
            Quaternion::from_axis_angle([1.0, 0.0, 0.0], -std::f64::consts::FRAC_PI_2),
        );
        let hand = Transform::from_translation(Point::new(0.088, -0.1070, 0.0));
        let table = Table::default()
            .with("panda_link0", "panda_link6", tilt)
            .with("panda_link6", "panda_hand", hand);

        let constants = KinematicConstants::default();
        let weight = constants.gripper_mass * constants.gravity;
        // lever.y = -0.1070 + com.y(0)
        let expected = weight * -0.1070;

        let est = estimator().estimate(&resolver(table), 0.0, 0.0);
        assert_relative_eq!(est.gravity_offset, expected, epsilon = 1e-9);
        assert_relative_eq!(est.corrected_torque, -expected, epsilon = 1e-9);
    }

    #[test]
    fn test_force_from_corrected_torque() {
        // 力臂 (0, 0.2, 0.1)，工具坐标系绕 X 轴 +90°：Y → Z
        let tip = Transform::from_translation(Point::new(0.0, 0.2, 0.1));
        let tool = Transform::new(
            Point::ORIGIN,
            Quaternion::from_axis_angle([1.0, 0.0, 0.0], std::f64::consts::FRAC_PI_2),
        );
        let table = Table::default()
            .with("panda_link6", "panda_hand_tcp", tip)
            .with("panda_hand_tcp", "panda_link6", tool);

        let est = estimator().estimate(&resolver(table), 1.5, 0.5);
        assert_relative_eq!(est.corrected_torque, 1.0, epsilon = 1e-12);
        // F6' = (0, 1.0 / 0.2, 0) = (0, 5, 0)，旋转后 Z = 5
        assert_relative_eq!(est.force_z(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unavailable_transforms_never_produce_nan() {
        let est = estimator().estimate(&resolver(Unavailable), 3.0, 0.2);
        assert!(est.force.iter().all(|v| v.is_finite()));
        // 占位变换的平移为 0，力臂全部为 0
        assert_eq!(est.force_z(), 0.0);
    }

    #[test]
    fn test_kinematic_constants_validation() {
        assert!(KinematicConstants::default().validate().is_ok());
        assert_relative_eq!(KinematicConstants::default().lever_arm(), 0.22, epsilon = 1e-12);

        let bad = KinematicConstants {
            gripper_mass: -1.0,
            ..Default::default()
        };
        assert!(bad.validate().unwrap_err().to_string().contains("gripper_mass"));

        let bad = KinematicConstants {
            tool_tip: [0.0, f64::NAN, 0.0],
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
