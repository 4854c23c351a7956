//! 模拟协作方
//!
//! 用于测试和离线运行，不依赖任何外部进程：
//!
//! - [`StaticTransformTree`]: 静态变换树，可注入查询失败
//! - [`SharedJointStates`]: 可从任意线程更新的最新关节状态
//! - [`MockPlanner`]: 记录所有规划请求，按配置的结果应答

use crate::config::ControllerConfig;
use crate::joints::JointStateSource;
use crate::planner::{MotionPlanner, PlanError, PlanStatus};
use crate::rotation::Transform;
use crate::transform::{TransformError, TransformProvider};
use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, RwLock};
use scribe_protocol::{
    JointState, JointTrajectory, JointTrajectoryPoint, Point, Pose, Quaternion,
};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// 变换树最大深度（防止环）
const MAX_TREE_DEPTH: usize = 64;

/// 静态变换树
///
/// 每个坐标系记录其父坐标系以及 `parent_T_child`。
#[derive(Debug, Default)]
pub struct StaticTransformTree {
    edges: RwLock<HashMap<String, (String, Transform)>>,
    failing: RwLock<HashSet<String>>,
}

impl StaticTransformTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panda 机械臂的默认树：基座 → 第 6 关节 → 手爪 → 工具尖端
    ///
    /// 第 6 关节位于书写起点正上方，手爪和工具尖端使用运动学常量中的偏移。
    pub fn panda_default(config: &ControllerConfig) -> Self {
        let k = &config.kinematics;
        let tree = Self::new();
        tree.set_transform(
            &config.base_frame_id,
            &config.frames.joint6,
            Transform::new(
                Point::new(config.initial_x, config.initial_y, 0.5),
                Quaternion::from_axis_angle([1.0, 0.0, 0.0], std::f64::consts::PI),
            ),
        );
        tree.set_transform(
            &config.frames.joint6,
            &config.frames.hand,
            Transform::from_translation(Point::from(k.joint6_to_hand)),
        );
        tree.set_transform(
            &config.frames.hand,
            &config.frames.tool_tip,
            Transform::from_translation(Point::from(k.tool_tip)),
        );
        tree
    }

    /// 设置（或替换）`parent_T_child`
    pub fn set_transform(&self, parent: &str, child: &str, transform: Transform) {
        self.edges
            .write()
            .insert(child.to_string(), (parent.to_string(), transform));
    }

    /// 之后所有涉及 `frame` 的查询都失败
    pub fn fail_frame(&self, frame: &str) {
        self.failing.write().insert(frame.to_string());
    }

    pub fn restore_frame(&self, frame: &str) {
        self.failing.write().remove(frame);
    }

    /// 返回 (根坐标系, root_T_frame)
    fn to_root(&self, frame: &str) -> Result<(String, Transform), TransformError> {
        let edges = self.edges.read();

        let known = edges.contains_key(frame) || edges.values().any(|(parent, _)| parent == frame);
        if !known {
            return Err(TransformError::Lookup {
                frame: frame.to_string(),
            });
        }

        let mut current = frame.to_string();
        let mut root_t_frame = Transform::IDENTITY;
        for _ in 0..MAX_TREE_DEPTH {
            match edges.get(&current) {
                Some((parent, parent_t_current)) => {
                    root_t_frame = parent_t_current.compose(&root_t_frame);
                    current = parent.clone();
                },
                None => return Ok((current, root_t_frame)),
            }
        }

        Err(TransformError::Connectivity {
            target: frame.to_string(),
            source_frame: current,
        })
    }
}

impl TransformProvider for StaticTransformTree {
    fn lookup(&self, target_frame: &str, source_frame: &str) -> Result<Transform, TransformError> {
        {
            let failing = self.failing.read();
            if let Some(frame) = [target_frame, source_frame]
                .into_iter()
                .find(|f| failing.contains(*f))
            {
                return Err(TransformError::Extrapolation(format!(
                    "no recent data for '{}'",
                    frame
                )));
            }
        }

        let (target_root, root_t_target) = self.to_root(target_frame)?;
        let (source_root, root_t_source) = self.to_root(source_frame)?;
        if target_root != source_root {
            return Err(TransformError::Connectivity {
                target: target_frame.to_string(),
                source_frame: source_frame.to_string(),
            });
        }

        Ok(root_t_target.inverse().compose(&root_t_source))
    }
}

/// 最新关节状态缓存
#[derive(Debug, Default)]
pub struct SharedJointStates {
    latest: ArcSwapOption<JointState>,
}

impl SharedJointStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, state: JointState) {
        self.latest.store(Some(Arc::new(state)));
    }

    pub fn clear(&self) {
        self.latest.store(None);
    }
}

impl JointStateSource for SharedJointStates {
    fn latest(&self) -> Option<JointState> {
        self.latest.load_full().map(|state| (*state).clone())
    }
}

/// 模拟规划的结果
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    /// 规划成功并生成一条轨迹
    Succeed,
    /// 规划调用直接返回错误
    Fail(PlanError),
    /// 调用成功，但后台规划随后失败（通过 `plan_status` 报告）
    FailInBackground(PlanError),
    /// 永不返回
    Hang,
}

#[derive(Debug)]
struct MockPlannerInner {
    outcome: PlanOutcome,
    /// 位姿/关节规划成功后直接报告 `Succeeded`
    auto_complete: bool,
    trajectory_duration: Duration,
    status: PlanStatus,
    trajectories: Vec<JointTrajectory>,
    planned_poses: Vec<Pose>,
    cartesian_batches: Vec<Vec<Pose>>,
    joint_targets: Vec<JointState>,
}

impl MockPlannerInner {
    fn trajectory(&self, points: usize) -> JointTrajectory {
        let points = points.max(1);
        let step = self.trajectory_duration / points as u32;
        JointTrajectory {
            joint_names: (1..=7).map(|i| format!("panda_joint{}", i)).collect(),
            points: (1..=points)
                .map(|i| JointTrajectoryPoint {
                    positions: vec![0.0; 7],
                    velocities: vec![0.0; 7],
                    time_from_start: step * i as u32,
                })
                .collect(),
        }
    }
}

/// 模拟规划器
///
/// 可克隆，克隆体共享同一份状态：一份交给控制器，另一份留在测试中检查。
#[derive(Debug, Clone)]
pub struct MockPlanner {
    inner: Arc<Mutex<MockPlannerInner>>,
}

impl Default for MockPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlanner {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockPlannerInner {
                outcome: PlanOutcome::Succeed,
                auto_complete: true,
                trajectory_duration: Duration::from_millis(500),
                status: PlanStatus::Idle,
                trajectories: Vec::new(),
                planned_poses: Vec::new(),
                cartesian_batches: Vec::new(),
                joint_targets: Vec::new(),
            })),
        }
    }

    pub fn set_outcome(&self, outcome: PlanOutcome) {
        self.inner.lock().outcome = outcome;
    }

    pub fn set_auto_complete(&self, auto_complete: bool) {
        self.inner.lock().auto_complete = auto_complete;
    }

    pub fn set_trajectory_duration(&self, duration: Duration) {
        self.inner.lock().trajectory_duration = duration;
    }

    /// 把挂起的后台规划标记为成功
    pub fn complete_pending(&self) {
        let mut inner = self.inner.lock();
        if inner.status == PlanStatus::Pending {
            inner.status = PlanStatus::Succeeded;
        }
    }

    pub fn planned_poses(&self) -> Vec<Pose> {
        self.inner.lock().planned_poses.clone()
    }

    pub fn cartesian_batches(&self) -> Vec<Vec<Pose>> {
        self.inner.lock().cartesian_batches.clone()
    }

    pub fn joint_targets(&self) -> Vec<JointState> {
        self.inner.lock().joint_targets.clone()
    }

    /// 按当前配置的结果完成一次规划
    ///
    /// `points` 为生成轨迹的点数；`background` 表示结果通过 `plan_status` 报告。
    fn finish(
        &self,
        points: usize,
        background: bool,
    ) -> impl Future<Output = Result<(), PlanError>> + Send + use<> {
        let inner = self.inner.clone();
        async move {
            let outcome = inner.lock().outcome.clone();
            match outcome {
                PlanOutcome::Hang => std::future::pending().await,
                PlanOutcome::Fail(e) => Err(e),
                PlanOutcome::FailInBackground(e) if background => {
                    inner.lock().status = PlanStatus::Failed(e);
                    Ok(())
                },
                PlanOutcome::FailInBackground(e) => Err(e),
                PlanOutcome::Succeed => {
                    let mut guard = inner.lock();
                    let trajectory = guard.trajectory(points);
                    guard.trajectories.push(trajectory);
                    if background {
                        guard.status = if guard.auto_complete {
                            PlanStatus::Succeeded
                        } else {
                            PlanStatus::Pending
                        };
                    }
                    Ok(())
                },
            }
        }
    }
}

impl MotionPlanner for MockPlanner {
    fn plan_to_pose(&mut self, target: &Pose) -> impl Future<Output = Result<(), PlanError>> + Send {
        self.inner.lock().planned_poses.push(*target);
        self.finish(2, true)
    }

    fn plan_cartesian(
        &mut self,
        waypoints: &[Pose],
    ) -> impl Future<Output = Result<(), PlanError>> + Send {
        self.inner.lock().cartesian_batches.push(waypoints.to_vec());
        self.finish(waypoints.len(), false)
    }

    fn plan_to_joint_state(
        &mut self,
        target: &JointState,
    ) -> impl Future<Output = Result<(), PlanError>> + Send {
        self.inner.lock().joint_targets.push(target.clone());
        self.finish(2, true)
    }

    fn plan_status(&self) -> PlanStatus {
        self.inner.lock().status.clone()
    }

    fn clear_plan_status(&mut self) {
        self.inner.lock().status = PlanStatus::Idle;
    }

    fn take_trajectories(&mut self) -> Vec<JointTrajectory> {
        std::mem::take(&mut self.inner.lock().trajectories)
    }
}
