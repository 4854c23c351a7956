//! 模拟会话
//!
//! 在模拟协作方上运行控制器：
//!
//! - 控制循环在 tokio 任务中运行
//! - 模拟执行器在阻塞线程中消费轨迹包，等待轨迹时长后回复 `"done"`
//! - 力遥测在另一个阻塞线程中汇总并记录日志

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use scribe_control::mock::{MockPlanner, SharedJointStates, StaticTransformTree};
use scribe_control::{
    Controller, ControllerConfig, ControllerHandle, ControllerMetrics, JointStateSource,
    MetricsSnapshot,
};
use scribe_protocol::{EndEffectorForce, JointState, JointTrajectoryBundle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, spawn_blocking};
use tracing::{debug, info, trace};

/// 每隔多少个力样本输出一次 debug 日志
const FORCE_LOG_INTERVAL: u64 = 100;

/// Panda 就绪位姿（rad）
const READY_POSITIONS: [f64; 7] = [0.0, -0.785, 0.0, -2.356, 0.0, 1.571, 0.785];

/// 会话选项
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// 执行器回复 `"done"` 前的等待时间，`None` 时按轨迹时长
    pub executor_delay: Option<Duration>,
}

/// 力遥测汇总
#[derive(Debug, Clone, Default)]
pub struct ForceLog {
    pub samples: u64,
    /// |force_z| 的最大值（N）
    pub peak_force_z: f64,
    pub last: Option<EndEffectorForce>,
}

impl ForceLog {
    fn record(&mut self, sample: EndEffectorForce) {
        self.samples += 1;
        self.peak_force_z = self.peak_force_z.max(sample.force_z.abs());
        self.last = Some(sample);
    }
}

/// 会话结束时的汇总
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub metrics: MetricsSnapshot,
    /// 模拟执行器执行过的轨迹包数
    pub bundles_executed: u64,
    pub forces: ForceLog,
}

/// 模拟会话
pub struct SimulatedSession {
    handle: ControllerHandle,
    metrics: Arc<ControllerMetrics>,
    executed: Arc<AtomicU64>,
    shutdown: watch::Sender<bool>,
    controller_task: JoinHandle<MetricsSnapshot>,
    executor_task: JoinHandle<u64>,
    force_task: JoinHandle<ForceLog>,
}

impl SimulatedSession {
    /// 构建控制器并启动全部任务
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn start(config: ControllerConfig, options: SessionOptions) -> Result<Self> {
        let tree = Arc::new(StaticTransformTree::panda_default(&config));
        let joints = Arc::new(SharedJointStates::new());
        joints.set(ready_joint_state());

        let (controller, handle, outbound) =
            Controller::new(config, MockPlanner::new(), tree, joints.clone())
                .context("创建控制器失败")?;
        let metrics = controller.metrics();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let controller_task = tokio::spawn(controller.run(shutdown_rx));

        let executed = Arc::new(AtomicU64::new(0));
        let executor = SimulatedExecutor {
            handle: handle.clone(),
            joints,
            delay: options.executor_delay,
            executed: executed.clone(),
        };
        let executor_task = spawn_blocking(move || executor.run(outbound.bundles));
        let force_task = spawn_blocking(move || log_forces(outbound.forces));

        info!("Simulated session started");
        Ok(Self {
            handle,
            metrics,
            executed,
            shutdown,
            controller_task,
            executor_task,
            force_task,
        })
    }

    pub fn handle(&self) -> &ControllerHandle {
        &self.handle
    }

    pub fn metrics(&self) -> &Arc<ControllerMetrics> {
        &self.metrics
    }

    /// 模拟执行器已完成的轨迹包数
    pub fn bundles_executed(&self) -> u64 {
        self.executed.load(Ordering::Acquire)
    }

    /// 停止控制循环并等待所有任务退出
    ///
    /// 控制任务退出后出站通道断开，执行器和力遥测线程随之结束。
    pub async fn stop(self) -> Result<SessionSummary> {
        let _ = self.shutdown.send(true);

        let metrics = self.controller_task.await.context("控制任务异常退出")?;
        let bundles_executed = self.executor_task.await.context("执行器线程异常退出")?;
        let forces = self.force_task.await.context("力遥测线程异常退出")?;

        info!("Simulated session stopped after {} ticks", metrics.ticks);
        Ok(SessionSummary {
            metrics,
            bundles_executed,
            forces,
        })
    }
}

fn ready_joint_state() -> JointState {
    let mut state = JointState::from_positions(
        READY_POSITIONS
            .iter()
            .enumerate()
            .map(|(i, q)| (format!("panda_joint{}", i + 1), *q)),
    );
    state.effort = vec![0.0; READY_POSITIONS.len()];
    state
}

/// 模拟执行器
///
/// 每个轨迹包：等待执行时长，把关节状态更新为轨迹终点，然后回复 `"done"`。
struct SimulatedExecutor {
    handle: ControllerHandle,
    joints: Arc<SharedJointStates>,
    delay: Option<Duration>,
    executed: Arc<AtomicU64>,
}

impl SimulatedExecutor {
    /// 在阻塞线程中运行，出站通道断开时返回已执行的包数
    fn run(self, bundles: Receiver<JointTrajectoryBundle>) -> u64 {
        while let Ok(bundle) = bundles.recv() {
            let duration = self.delay.unwrap_or_else(|| {
                bundle
                    .trajectories
                    .iter()
                    .map(|t| t.duration())
                    .max()
                    .unwrap_or_default()
            });
            debug!(
                "Executing bundle with {} trajectories for {:?}",
                bundle.trajectories.len(),
                duration
            );
            std::thread::sleep(duration);

            self.move_to_end(&bundle);
            self.executed.fetch_add(1, Ordering::AcqRel);

            if self.handle.notify_trajectory_status("done").is_err() {
                break;
            }
        }

        let executed = self.executed.load(Ordering::Acquire);
        debug!("Executor finished after {} bundles", executed);
        executed
    }

    fn move_to_end(&self, bundle: &JointTrajectoryBundle) {
        let Some(mut state) = self.joints.latest() else {
            return;
        };

        for trajectory in &bundle.trajectories {
            let Some(end) = trajectory.points.last() else {
                continue;
            };
            for (name, position) in trajectory.joint_names.iter().zip(&end.positions) {
                if let Some(i) = state.index_of(name) {
                    state.position[i] = *position;
                }
            }
        }
        self.joints.set(state);
    }
}

/// 力遥测汇总（阻塞线程）
fn log_forces(forces: Receiver<EndEffectorForce>) -> ForceLog {
    let mut log = ForceLog::default();

    while let Ok(sample) = forces.recv() {
        log.record(sample);
        trace!(
            "force_z = {:.4} N (force control: {})",
            sample.force_z, sample.force_control_enabled
        );
        if log.samples % FORCE_LOG_INTERVAL == 0 {
            debug!(
                "{} force samples, latest force_z = {:.4} N",
                log.samples, sample.force_z
            );
        }
    }

    log
}
