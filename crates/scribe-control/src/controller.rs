//! 控制循环
//!
//! [`Controller`] 独占全部控制状态（当前状态、两个队列、标定、力估计），
//! 由单个 tokio 任务驱动：固定频率的周期与入站命令在同一个 `select!`
//! 中串行处理，彼此天然互斥。
//!
//! 规划调用在任务内被 await，期间不处理其他命令或周期。
//! 配置了 `planning_timeout_ms` 时，超时的规划按失败处理。
//!
//! # 单次规划
//!
//! 位姿目标或关节目标发起规划后，直到规划器报告成功或失败之前，
//! 新的请求只入队并记下"需要重新规划"，不会发起第二次规划。

use crate::calibration::{CalibrationState, CalibrationStep};
use crate::config::ControllerConfig;
use crate::error::ControlError;
use crate::force::ForceEstimator;
use crate::intake::{Command, ControllerHandle};
use crate::joints::{JointStateSource, merge_joint_goal};
use crate::metrics::{ControllerMetrics, MetricsSnapshot};
use crate::outbound::{Outbound, OutboundReceivers};
use crate::planner::{MotionPlanner, PlanError, PlanStatus};
use crate::queue::RequestQueues;
use crate::state::{Event, State, transition};
use crate::transform::{FrameResolver, TransformProvider};
use scribe_protocol::{
    EndEffectorForce, JointGoal, JointState, JointTrajectoryBundle, MotionRequest, Point,
    TrajectoryStatus,
};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// 绘图控制器
pub struct Controller<P, T, J> {
    config: ControllerConfig,
    state: State,
    queues: RequestQueues,
    calibration: CalibrationState,
    estimator: ForceEstimator,
    resolver: FrameResolver<T>,
    joints: J,
    planner: P,
    outbound: Outbound,
    commands: mpsc::UnboundedReceiver<Command>,
    metrics: Arc<ControllerMetrics>,
    force_control_enabled: bool,
    /// 位姿/关节目标规划已发起，等待规划器报告结果
    plan_in_flight: bool,
    /// 有被推迟的重新规划请求
    replan_requested: bool,
    start_position: Point,
}

impl<P, T, J> Controller<P, T, J>
where
    P: MotionPlanner,
    T: TransformProvider,
    J: JointStateSource,
{
    /// 创建控制器
    ///
    /// 返回控制器本身、请求句柄和出站通道接收端。
    ///
    /// # Errors
    /// - `ControlError::Config`: 配置校验失败
    pub fn new(
        config: ControllerConfig,
        planner: P,
        transforms: T,
        joints: J,
    ) -> Result<(Self, ControllerHandle, OutboundReceivers), ControlError> {
        config.validate()?;

        let metrics = Arc::new(ControllerMetrics::new());
        let (outbound, receivers) = Outbound::new(metrics.clone());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let estimator = ForceEstimator::new(
            config.kinematics.clone(),
            config.base_frame_id.clone(),
            config.frames.clone(),
        );
        let start_position = Point::new(config.initial_x, config.initial_y, 0.0);

        let controller = Self {
            state: State::Calibrate,
            queues: RequestQueues::new(),
            calibration: CalibrationState::new(),
            estimator,
            resolver: FrameResolver::new(transforms, metrics.clone()),
            joints,
            planner,
            outbound,
            commands: command_rx,
            metrics,
            force_control_enabled: false,
            plan_in_flight: false,
            replan_requested: false,
            start_position,
            config,
        };

        Ok((controller, ControllerHandle::new(command_tx), receivers))
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// 最近一次记录的书写起点
    pub fn start_position(&self) -> Point {
        self.start_position
    }

    pub fn force_control_enabled(&self) -> bool {
        self.force_control_enabled
    }

    pub fn plan_in_flight(&self) -> bool {
        self.plan_in_flight
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    pub fn queues(&self) -> &RequestQueues {
        &self.queues
    }

    pub fn metrics(&self) -> Arc<ControllerMetrics> {
        self.metrics.clone()
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    /// 运行控制循环，直到 `shutdown` 变为 `true` 或发送端被丢弃
    ///
    /// 返回退出时的指标快照。
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> MetricsSnapshot {
        let period = self.config.tick_period();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Controller started: robot={}, group={}, rate={} Hz, simulated={}",
            self.config.robot_name,
            self.config.group_name,
            self.config.tick_rate_hz,
            self.config.use_simulated_hardware
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
                Some(command) = self.commands.recv() => {
                    self.handle_command(command).await;
                },
                _ = interval.tick() => {
                    self.tick().await;
                },
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            "Controller stopped after {} ticks ({} bundles published, {} plan failures)",
            snapshot.ticks, snapshot.bundles_published, snapshot.plan_failures
        );
        snapshot
    }

    /// 处理一个入站命令
    pub async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { request, ack } => {
                let result = self.enqueue(request);
                let _ = ack.send(result);
            },
            Command::SubmitJointGoal { goal, ack } => {
                let result = self.plan_joint_goal(&goal).await;
                let _ = ack.send(result);
            },
            Command::TrajectoryStatus(status) => self.on_trajectory_status(status),
        }
        self.settle();
    }

    /// 执行一个控制周期
    pub async fn tick(&mut self) {
        self.metrics.ticks.fetch_add(1, Ordering::Relaxed);

        match self.state {
            State::Calibrate => self.calibrate(),
            State::PlanPoseGoal => self.plan_pose_goal().await,
            State::PlanCartesian => self.plan_cartesian().await,
            State::Executing => self.execute(),
            State::Waiting => self.wait(),
        }

        self.settle();
    }

    /// 校验并入队
    ///
    /// # Errors
    /// - `ControlError::InvalidRequest`: 路点为空或含 NaN/Inf，请求不入队
    pub fn enqueue(&mut self, request: MotionRequest) -> Result<(), ControlError> {
        if let Err(e) = request.validate() {
            warn!("Rejecting {} request: {}", request.kind(), e);
            return Err(e.into());
        }

        let event = match &request {
            MotionRequest::PoseGoal(pose) => {
                info!("REQUEST RECEIVED: pose goal {}", pose);
                Event::PoseGoalSubmitted
            },
            MotionRequest::CartesianWaypoints(waypoints) => {
                info!(
                    "REQUEST RECEIVED: cartesian path with {} waypoints",
                    waypoints.len()
                );
                // 位姿目标队列优先
                if self.queues.pose_goals_pending() > 0 {
                    Event::ReplanRequested
                } else {
                    Event::CartesianPathSubmitted
                }
            },
        };

        self.force_control_enabled = request.uses_force_control();
        self.queues.push(request);
        self.request_planning(event);
        Ok(())
    }

    /// 关节目标：合并到当前关节配置后立即规划
    ///
    /// 被拒绝（规划在途、没有关节状态）时状态不变。发起规划后无论成败，
    /// 状态都回到 `WAITING`（标定阶段除外），被打断的队列规划推迟到下次空闲。
    pub async fn plan_joint_goal(&mut self, goal: &JointGoal) -> Result<(), ControlError> {
        info!("REQUEST RECEIVED: joint goal for {} joints", goal.len());

        if self.plan_in_flight {
            warn!("Joint goal rejected: plan in flight");
            return Err(ControlError::PlanInFlight);
        }
        let Some(current) = self.joints.latest() else {
            warn!("Joint goal rejected: no joint state yet");
            return Err(ControlError::JointStateUnavailable);
        };

        let result = self.try_plan_joint_goal(&current, goal).await;
        if let Err(e) = &result {
            warn!("Joint goal not planned: {}", e);
        }

        let interrupted = matches!(self.state, State::PlanPoseGoal | State::PlanCartesian);
        self.apply(Event::JointGoalHandled);
        if interrupted || !self.queues.is_empty() {
            self.replan_requested = true;
        }
        result
    }

    /// 执行器状态通知
    pub fn on_trajectory_status(&mut self, status: TrajectoryStatus) {
        match status {
            TrajectoryStatus::Done => {
                let tip = self
                    .resolver
                    .resolve(&self.config.base_frame_id, &self.config.frames.tool_tip);
                self.start_position = tip.translation;
                info!(
                    "Trajectory finished, start position is now {}",
                    self.start_position
                );
                self.request_planning(Event::ExecutionFinished);
            },
            TrajectoryStatus::Other(token) => {
                debug!("Ignoring trajectory status '{}'", token);
            },
        }
    }

    async fn try_plan_joint_goal(
        &mut self,
        current: &JointState,
        goal: &JointGoal,
    ) -> Result<(), ControlError> {
        self.force_control_enabled = false;
        let target = merge_joint_goal(current, goal, &self.config.base_frame_id);

        let timeout = self.config.planning_timeout();
        if let Err(e) = run_planning(timeout, self.planner.plan_to_joint_state(&target)).await {
            self.metrics.plan_failures.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }

        self.plan_in_flight = true;
        self.metrics.joint_goals_planned.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn calibrate(&mut self) {
        if self.config.use_simulated_hardware {
            self.calibration.skip();
            self.apply(Event::CalibrationSkipped);
            return;
        }

        let torque = self.raw_torque();
        let lever_arm = self.estimator.constants().lever_arm();
        let event = match self.calibration.step(torque, lever_arm) {
            CalibrationStep::AwaitingTorque => Event::AwaitingTorque,
            CalibrationStep::Sampled { .. } => {
                self.metrics.calibration_samples.fetch_add(1, Ordering::Relaxed);
                Event::CalibrationSampled
            },
            CalibrationStep::Finished { .. } => {
                self.metrics.calibration_samples.fetch_add(1, Ordering::Relaxed);
                Event::CalibrationFinished
            },
            CalibrationStep::Skipped => Event::CalibrationFinished,
        };
        self.apply(event);
    }

    async fn plan_pose_goal(&mut self) {
        let Some(pose) = self.queues.pop_pose_goal() else {
            self.apply(Event::PoseQueueEmpty);
            return;
        };

        info!("Planning pose goal {}", pose);
        let timeout = self.config.planning_timeout();
        match run_planning(timeout, self.planner.plan_to_pose(&pose)).await {
            Ok(()) => {
                self.plan_in_flight = true;
                self.metrics.pose_goals_planned.fetch_add(1, Ordering::Relaxed);
                self.apply(Event::PosePlanned);
            },
            Err(e) => self.on_plan_failure(e),
        }
    }

    async fn plan_cartesian(&mut self) {
        let Some((waypoints, requests)) = self.queues.drain_cartesian() else {
            self.apply(Event::CartesianQueueEmpty);
            return;
        };

        info!(
            "Planning cartesian path: {} waypoints from {} requests",
            waypoints.len(),
            requests
        );
        let timeout = self.config.planning_timeout();
        match run_planning(timeout, self.planner.plan_cartesian(&waypoints)).await {
            Ok(()) => {
                self.metrics.cartesian_batches_planned.fetch_add(1, Ordering::Relaxed);
                self.metrics
                    .cartesian_waypoints_planned
                    .fetch_add(waypoints.len() as u64, Ordering::Relaxed);
                self.apply(Event::CartesianPlanned);
            },
            Err(e) => self.on_plan_failure(e),
        }
    }

    fn execute(&mut self) {
        let trajectories = self.planner.take_trajectories();
        self.outbound.publish_bundle(JointTrajectoryBundle::publish(trajectories));
        self.apply(Event::TrajectoriesPublished);
    }

    fn wait(&mut self) {
        self.publish_force();

        match self.planner.plan_status() {
            PlanStatus::Succeeded => {
                self.planner.clear_plan_status();
                self.plan_in_flight = false;
                self.apply(Event::PlanSucceeded);
            },
            PlanStatus::Failed(e) => {
                self.planner.clear_plan_status();
                self.plan_in_flight = false;
                self.on_plan_failure(e.into());
            },
            PlanStatus::Idle | PlanStatus::Pending => self.apply(Event::Idle),
        }
    }

    fn publish_force(&mut self) {
        let raw_torque = self.raw_torque().unwrap_or_else(|| {
            debug!(
                "No effort for joint index {}, using 0.0",
                self.config.torque_joint_index
            );
            0.0
        });

        let estimate = self
            .estimator
            .estimate(&self.resolver, raw_torque, self.calibration.offset());

        self.outbound.publish_force(EndEffectorForce {
            force_z: estimate.force_z(),
            force_control_enabled: self.force_control_enabled,
        });
    }

    fn raw_torque(&self) -> Option<f64> {
        self.joints
            .latest()
            .and_then(|state| state.effort_at(self.config.torque_joint_index))
    }

    fn on_plan_failure(&mut self, err: ControlError) {
        error!("Planning failed, dropping request: {}", err);
        self.metrics.plan_failures.fetch_add(1, Ordering::Relaxed);
        self.apply(Event::PlanFailed);
    }

    /// 立即触发规划，或在不能打断时记下来
    fn request_planning(&mut self, event: Event) {
        if self.plan_in_flight || !self.state.accepts_replan() {
            debug!(
                "Deferring replan ({:?}) in state {} (plan in flight: {})",
                event, self.state, self.plan_in_flight
            );
            self.replan_requested = true;
            return;
        }
        self.replan_requested = false;
        self.apply(event);
    }

    /// 回到空闲后处理被推迟的重新规划
    fn settle(&mut self) {
        if self.replan_requested && self.state == State::Waiting && !self.plan_in_flight {
            self.replan_requested = false;
            self.apply(Event::ReplanRequested);
        }
    }

    fn apply(&mut self, event: Event) {
        let next = transition(self.state, event);
        if next != self.state {
            debug!("{} --{:?}--> {}", self.state, event, next);
        }
        self.state = next;
    }
}

async fn run_planning<F>(timeout: Option<Duration>, plan: F) -> Result<(), ControlError>
where
    F: Future<Output = Result<(), PlanError>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, plan).await {
            Ok(result) => result.map_err(ControlError::from),
            Err(_) => Err(ControlError::PlanningTimeout(limit)),
        },
        None => plan.await.map_err(ControlError::from),
    }
}
