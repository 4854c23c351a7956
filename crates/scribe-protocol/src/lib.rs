//! # Scribe Protocol
//!
//! 绘图控制器的消息与请求定义（无硬件、无运行时依赖）
//!
//! ## 模块
//!
//! - `geometry`: 点、四元数、位姿
//! - `joint`: 关节状态与关节目标
//! - `trajectory`: 关节轨迹与轨迹包
//! - `telemetry`: 末端力遥测与执行状态
//! - `request`: 经过校验的运动请求
//!
//! ## 四元数存储顺序
//!
//! 所有消息按 `x, y, z, w` 存储四元数，与变换树保持一致。

pub mod geometry;
pub mod joint;
pub mod request;
pub mod telemetry;
pub mod trajectory;

pub use geometry::{Point, Pose, QUATERNION_NORM_THRESHOLD, Quaternion};
pub use joint::{Header, JointGoal, JointState, Stamp};
pub use request::MotionRequest;
pub use telemetry::{EndEffectorForce, TrajectoryStatus};
pub use trajectory::{BundleMode, JointTrajectory, JointTrajectoryBundle, JointTrajectoryPoint};

use thiserror::Error;

/// 请求校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 笛卡尔路径没有路点
    #[error("Cartesian path must contain at least one waypoint")]
    EmptyWaypoints,

    /// 关节目标为空
    #[error("Joint goal must name at least one joint")]
    EmptyJointGoal,

    /// 数值为 NaN 或 Inf
    #[error("Non-finite value in {field}")]
    NonFinite { field: String },

    /// 同一关节在目标中出现多次
    #[error("Joint '{0}' appears more than once in joint goal")]
    DuplicateJoint(String),
}
