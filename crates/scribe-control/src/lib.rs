//! # Scribe Control
//!
//! 绘图机械臂的控制循环：
//!
//! - 固定频率的状态机，串行处理位姿目标与笛卡尔路径两条队列
//! - 上电时的一次性重力标定
//! - 由第 6 关节力矩和坐标变换估计末端接触力
//!
//! 运动规划、轨迹执行和变换树都是外部协作方，以 trait 的形式接入：
//! [`MotionPlanner`]、[`TransformProvider`]、[`JointStateSource`]。
//! `mock` feature（默认开启）提供可离线运行的模拟实现。
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use scribe_control::mock::{MockPlanner, SharedJointStates, StaticTransformTree};
//! use scribe_control::{Controller, ControllerConfig};
//! use scribe_protocol::{Point, Pose, Quaternion};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), scribe_control::ControlError> {
//! let config = ControllerConfig::default();
//! let tree = Arc::new(StaticTransformTree::panda_default(&config));
//! let joints = Arc::new(SharedJointStates::new());
//! let (controller, handle, outbound) =
//!     Controller::new(config, MockPlanner::new(), tree, joints)?;
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let task = tokio::spawn(controller.run(shutdown_rx));
//!
//! handle
//!     .submit_pose_goal(Pose::new(Point::new(0.4, 0.0, 0.3), Quaternion::IDENTITY))
//!     .await?;
//! let bundle = outbound.bundles.recv().expect("executor channel open");
//! println!("{} trajectories", bundle.trajectories.len());
//!
//! let _ = shutdown_tx.send(true);
//! let _ = task.await;
//! # Ok(())
//! # }
//! ```

pub mod calibration;
pub mod config;
pub mod controller;
pub mod error;
pub mod force;
pub mod intake;
pub mod joints;
pub mod metrics;
#[cfg(feature = "mock")]
pub mod mock;
pub mod outbound;
pub mod planner;
pub mod queue;
pub mod rotation;
pub mod state;
pub mod transform;

pub use calibration::{CalibrationState, CalibrationStep};
pub use config::{ConfigError, ControllerConfig, FrameNames};
pub use controller::Controller;
pub use error::ControlError;
pub use force::{ForceEstimate, ForceEstimator, KinematicConstants};
pub use intake::{Command, ControllerHandle};
pub use joints::{JointStateSource, merge_joint_goal};
pub use metrics::{ControllerMetrics, MetricsSnapshot};
pub use outbound::OutboundReceivers;
pub use planner::{MotionPlanner, PlanError, PlanStatus};
pub use queue::RequestQueues;
pub use rotation::{Transform, rotation_matrix};
pub use state::{Event, State, transition};
pub use transform::{FrameResolver, TransformError, TransformProvider};
