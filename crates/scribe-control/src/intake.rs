//! 请求入口
//!
//! [`ControllerHandle`] 可以克隆并在任意任务中使用。每个请求作为
//! [`Command`] 发给控制任务，由控制任务串行处理后通过 oneshot 应答，
//! 因此请求处理与控制周期天然互斥，不需要锁。

use crate::error::ControlError;
use scribe_protocol::{JointGoal, MotionRequest, Pose, TrajectoryStatus};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// 应答通道
pub type Ack = oneshot::Sender<Result<(), ControlError>>;

/// 发给控制任务的命令
#[derive(Debug)]
pub enum Command {
    /// 位姿目标或笛卡尔路径（入队）
    Submit { request: MotionRequest, ack: Ack },
    /// 关节目标（绕过队列，立即规划）
    SubmitJointGoal { goal: JointGoal, ack: Ack },
    /// 执行器状态通知（无应答）
    TrajectoryStatus(TrajectoryStatus),
}

/// 控制器句柄
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ControllerHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// 提交位姿目标
    ///
    /// # Errors
    /// - `ControlError::InvalidRequest`: 位姿含 NaN/Inf
    /// - `ControlError::ChannelClosed`: 控制任务已退出
    pub async fn submit_pose_goal(&self, pose: Pose) -> Result<(), ControlError> {
        self.submit(MotionRequest::pose_goal(pose)?).await
    }

    /// 提交笛卡尔路径
    ///
    /// # Errors
    /// - `ControlError::InvalidRequest`: 路点为空或含 NaN/Inf
    /// - `ControlError::ChannelClosed`: 控制任务已退出
    pub async fn submit_cartesian_path(&self, waypoints: Vec<Pose>) -> Result<(), ControlError> {
        self.submit(MotionRequest::cartesian_waypoints(waypoints)?).await
    }

    /// 提交已校验的运动请求
    pub async fn submit(&self, request: MotionRequest) -> Result<(), ControlError> {
        let (ack, rx) = oneshot::channel();
        self.send(Command::Submit { request, ack })?;
        rx.await.map_err(|_| ControlError::ChannelClosed)?
    }

    /// 提交关节目标，规划调用返回后应答
    ///
    /// # Errors
    /// - `ControlError::JointStateUnavailable`: 尚未收到关节状态
    /// - `ControlError::PlanInFlight`: 已有规划在途
    /// - `ControlError::Planning` / `ControlError::PlanningTimeout`: 规划失败
    pub async fn submit_joint_goal(&self, goal: JointGoal) -> Result<(), ControlError> {
        let (ack, rx) = oneshot::channel();
        self.send(Command::SubmitJointGoal { goal, ack })?;
        rx.await.map_err(|_| ControlError::ChannelClosed)?
    }

    /// 转发执行器状态（不等待处理）
    pub fn notify_trajectory_status(&self, token: &str) -> Result<(), ControlError> {
        self.send(Command::TrajectoryStatus(TrajectoryStatus::parse(token)))
    }

    /// 控制任务是否已退出
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, command: Command) -> Result<(), ControlError> {
        self.tx.send(command).map_err(|e| {
            debug!("Controller task gone, dropping {:?}", e.0);
            ControlError::ChannelClosed
        })
    }
}
