//! 控制循环指标
//!
//! 原子计数器，可以在任何线程读取，不引入锁竞争。
//! 控制任务写入，CLI 或测试通过 `Arc<ControllerMetrics>` 读取快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// 控制循环实时指标
///
/// # 使用示例
///
/// ```rust
/// use scribe_control::ControllerMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(ControllerMetrics::default());
/// metrics.ticks.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.ticks, 1);
/// ```
#[derive(Debug, Default)]
pub struct ControllerMetrics {
    /// 已执行的控制周期数
    pub ticks: AtomicU64,

    /// 标定阶段采集的力矩样本数
    pub calibration_samples: AtomicU64,

    /// 成功发起的位姿目标规划次数
    pub pose_goals_planned: AtomicU64,

    /// 成功的笛卡尔批量规划次数（一次规划可包含多个请求）
    pub cartesian_batches_planned: AtomicU64,

    /// 笛卡尔规划消耗的路点总数
    pub cartesian_waypoints_planned: AtomicU64,

    /// 成功发起的关节目标规划次数
    pub joint_goals_planned: AtomicU64,

    /// 规划失败次数（含超时）
    ///
    /// 失败的请求被丢弃，不会重试。
    pub plan_failures: AtomicU64,

    /// 下发给执行器的轨迹包数量
    pub bundles_published: AtomicU64,

    /// 发布的末端力样本数量
    pub force_samples_published: AtomicU64,

    /// 遥测通道满时丢弃的力样本数量
    ///
    /// 持续增长说明遥测消费者跟不上控制频率。
    pub force_samples_dropped: AtomicU64,

    /// 坐标变换查询失败次数（已用占位变换替代）
    pub transform_failures: AtomicU64,
}

impl ControllerMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 不同计数器之间可能有微小的时间差，适合监控场景。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            calibration_samples: self.calibration_samples.load(Ordering::Relaxed),
            pose_goals_planned: self.pose_goals_planned.load(Ordering::Relaxed),
            cartesian_batches_planned: self.cartesian_batches_planned.load(Ordering::Relaxed),
            cartesian_waypoints_planned: self.cartesian_waypoints_planned.load(Ordering::Relaxed),
            joint_goals_planned: self.joint_goals_planned.load(Ordering::Relaxed),
            plan_failures: self.plan_failures.load(Ordering::Relaxed),
            bundles_published: self.bundles_published.load(Ordering::Relaxed),
            force_samples_published: self.force_samples_published.load(Ordering::Relaxed),
            force_samples_dropped: self.force_samples_dropped.load(Ordering::Relaxed),
            transform_failures: self.transform_failures.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
        self.calibration_samples.store(0, Ordering::Relaxed);
        self.pose_goals_planned.store(0, Ordering::Relaxed);
        self.cartesian_batches_planned.store(0, Ordering::Relaxed);
        self.cartesian_waypoints_planned.store(0, Ordering::Relaxed);
        self.joint_goals_planned.store(0, Ordering::Relaxed);
        self.plan_failures.store(0, Ordering::Relaxed);
        self.bundles_published.store(0, Ordering::Relaxed);
        self.force_samples_published.store(0, Ordering::Relaxed);
        self.force_samples_dropped.store(0, Ordering::Relaxed);
        self.transform_failures.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub calibration_samples: u64,
    pub pose_goals_planned: u64,
    pub cartesian_batches_planned: u64,
    pub cartesian_waypoints_planned: u64,
    pub joint_goals_planned: u64,
    pub plan_failures: u64,
    pub bundles_published: u64,
    pub force_samples_published: u64,
    pub force_samples_dropped: u64,
    pub transform_failures: u64,
}

impl MetricsSnapshot {
    /// 规划总次数（成功 + 失败）
    pub fn plans_attempted(&self) -> u64 {
        self.pose_goals_planned
            + self.cartesian_batches_planned
            + self.joint_goals_planned
            + self.plan_failures
    }

    /// 规划失败率（百分比）
    ///
    /// 返回 0.0 到 100.0 之间的值。如果没有规划过，返回 0.0。
    pub fn plan_failure_rate(&self) -> f64 {
        let attempted = self.plans_attempted();
        if attempted == 0 {
            return 0.0;
        }
        (self.plan_failures as f64 / attempted as f64) * 100.0
    }
}
