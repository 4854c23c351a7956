//! 运动规划器接口
//!
//! 控制循环把规划委托给外部规划器。规划器负责逆解与轨迹生成，
//! 控制器只关心三件事：发起规划、查询规划状态、取走规划好的轨迹。
//!
//! # 规划状态
//!
//! 位姿目标与关节目标的规划调用返回后，轨迹可能仍在后台生成，
//! 控制器在空闲周期轮询 [`MotionPlanner::plan_status`]，
//! 读到 [`PlanStatus::Succeeded`] 后清除状态并进入执行。
//! 笛卡尔规划在调用返回时即已生成轨迹。

use scribe_protocol::{JointState, JointTrajectory, Pose};
use std::future::Future;
use thiserror::Error;

/// 规划器错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// 逆解或路径搜索无解
    #[error("No solution found: {0}")]
    NoSolution(String),

    /// 规划器拒绝请求（例如目标超出工作空间）
    #[error("Request rejected by planner: {0}")]
    Rejected(String),

    /// 规划后端内部错误
    #[error("Planner backend error: {0}")]
    Backend(String),
}

/// 后台规划状态
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlanStatus {
    /// 无在途规划
    #[default]
    Idle,
    /// 规划进行中
    Pending,
    /// 规划成功，轨迹可取
    Succeeded,
    /// 规划失败
    Failed(PlanError),
}

/// 外部运动规划器
///
/// 所有规划调用都在控制任务内被 await，返回的 future 必须是 `Send`。
pub trait MotionPlanner: Send {
    /// 整臂规划到目标位姿
    fn plan_to_pose(&mut self, target: &Pose) -> impl Future<Output = Result<(), PlanError>> + Send;

    /// 把一组路点连成一条笛卡尔路径
    fn plan_cartesian(
        &mut self,
        waypoints: &[Pose],
    ) -> impl Future<Output = Result<(), PlanError>> + Send;

    /// 规划到完整关节配置
    fn plan_to_joint_state(
        &mut self,
        target: &JointState,
    ) -> impl Future<Output = Result<(), PlanError>> + Send;

    /// 当前后台规划状态
    fn plan_status(&self) -> PlanStatus;

    /// 清除规划状态（回到 `Idle`）
    fn clear_plan_status(&mut self);

    /// 取走已规划好的轨迹
    fn take_trajectories(&mut self) -> Vec<JointTrajectory>;
}
