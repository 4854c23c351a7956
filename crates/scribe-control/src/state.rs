//! 控制循环状态机
//!
//! 状态转移是纯函数 [`transition`]，控制器只负责产生事件。
//!
//! ```text
//!   CALIBRATE ──(skipped / finished)──▶ WAITING ◀──────────────────────┐
//!                                        │  ▲                          │
//!              submit / done / replan    │  │ idle, plan failed        │
//!                                        ▼  │                          │
//!                                  PLAN_POSE_GOAL ──(planned)──▶ WAITING
//!                                        │
//!                                 (pose queue empty)
//!                                        ▼
//!                                  PLAN_CARTESIAN ──(empty)──▶ WAITING
//!                                        │
//!                                   (planned)
//!                                        ▼
//!   WAITING ──(plan succeeded)──▶ EXECUTING ──(published)──────────────┘
//! ```

use std::fmt;

/// 控制循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    /// 重力标定（进程启动时的状态）
    #[default]
    Calibrate,
    /// 空闲：发布力遥测，轮询规划状态
    Waiting,
    /// 检查位姿目标队列
    PlanPoseGoal,
    /// 检查笛卡尔路点队列
    PlanCartesian,
    /// 下发已规划的轨迹
    Executing,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Calibrate => "CALIBRATE",
            State::Waiting => "WAITING",
            State::PlanPoseGoal => "PLAN_POSE_GOAL",
            State::PlanCartesian => "PLAN_CARTESIAN",
            State::Executing => "EXECUTING",
        }
    }

    /// 新的规划请求能否立即打断当前状态
    ///
    /// 标定和执行阶段不能被打断，请求会被记下，稍后处理。
    pub fn accepts_replan(&self) -> bool {
        !matches!(self, State::Calibrate | State::Executing)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 驱动状态转移的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// 仿真硬件，跳过标定
    CalibrationSkipped,
    /// 尚未读到力矩
    AwaitingTorque,
    /// 采集了一个标定样本
    CalibrationSampled,
    /// 标定完成
    CalibrationFinished,
    /// 位姿目标队列为空
    PoseQueueEmpty,
    /// 位姿目标已发起规划
    PosePlanned,
    /// 笛卡尔队列为空
    CartesianQueueEmpty,
    /// 笛卡尔路径规划完成
    CartesianPlanned,
    /// 规划失败或超时（请求已丢弃）
    PlanFailed,
    /// 轨迹已下发
    TrajectoriesPublished,
    /// 空闲周期，规划器尚无结果
    Idle,
    /// 规划器报告成功
    PlanSucceeded,
    /// 收到位姿目标
    PoseGoalSubmitted,
    /// 收到笛卡尔路径
    CartesianPathSubmitted,
    /// 关节目标已处理（无论成功与否）
    JointGoalHandled,
    /// 执行器报告轨迹完成
    ExecutionFinished,
    /// 之前被推迟的重新规划
    ReplanRequested,
}

/// 状态转移函数
///
/// 未列出的 (状态, 事件) 组合保持原状态。
pub fn transition(state: State, event: Event) -> State {
    use Event::*;
    use State::*;

    match (state, event) {
        (Calibrate, CalibrationSkipped | CalibrationFinished) => Waiting,
        (Calibrate, _) => Calibrate,

        (PlanPoseGoal, PoseQueueEmpty) => PlanCartesian,
        (PlanPoseGoal, PosePlanned) => Waiting,

        (PlanCartesian, CartesianQueueEmpty) => Waiting,
        (PlanCartesian, CartesianPlanned) => Executing,

        (PlanPoseGoal | PlanCartesian, PlanFailed) => Waiting,

        (Executing, TrajectoriesPublished) => Waiting,
        (
            Executing,
            PoseGoalSubmitted | CartesianPathSubmitted | ExecutionFinished | ReplanRequested,
        ) => Executing,

        (Waiting, PlanSucceeded) => Executing,

        (_, PoseGoalSubmitted | ExecutionFinished | ReplanRequested) => PlanPoseGoal,
        (_, CartesianPathSubmitted) => PlanCartesian,
        (_, JointGoalHandled) => Waiting,

        _ => state,
    }
}
