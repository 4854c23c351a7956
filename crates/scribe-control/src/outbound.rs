//! 出站通道
//!
//! 控制循环向执行器下发轨迹包、向遥测消费者发布末端力。
//! 两者都不阻塞控制任务：
//!
//! - 轨迹包通道无界，轨迹不能丢
//! - 力遥测通道有界（[`FORCE_CHANNEL_CAPACITY`]），满时丢弃新样本并计数
//!
//! 接收端断开不算错误，只记录 `debug!`。

use crate::metrics::ControllerMetrics;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use scribe_protocol::{EndEffectorForce, JointTrajectoryBundle};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::debug;

/// 力遥测通道容量（100 Hz 下约 0.6 秒）
pub const FORCE_CHANNEL_CAPACITY: usize = 64;

/// 出站通道的接收端，交给执行器和遥测消费者
#[derive(Debug)]
pub struct OutboundReceivers {
    pub bundles: Receiver<JointTrajectoryBundle>,
    pub forces: Receiver<EndEffectorForce>,
}

/// 出站通道的发送端（控制任务持有）
pub(crate) struct Outbound {
    bundles: Sender<JointTrajectoryBundle>,
    forces: Sender<EndEffectorForce>,
    metrics: Arc<ControllerMetrics>,
}

impl Outbound {
    pub(crate) fn new(metrics: Arc<ControllerMetrics>) -> (Self, OutboundReceivers) {
        let (bundle_tx, bundle_rx) = unbounded();
        let (force_tx, force_rx) = bounded(FORCE_CHANNEL_CAPACITY);
        (
            Self {
                bundles: bundle_tx,
                forces: force_tx,
                metrics,
            },
            OutboundReceivers {
                bundles: bundle_rx,
                forces: force_rx,
            },
        )
    }

    /// 下发轨迹包
    pub(crate) fn publish_bundle(&self, bundle: JointTrajectoryBundle) {
        let count = bundle.trajectories.len();
        match self.bundles.send(bundle) {
            Ok(()) => {
                self.metrics.bundles_published.fetch_add(1, Ordering::Relaxed);
                debug!("Published trajectory bundle with {} trajectories", count);
            },
            Err(_) => debug!("Trajectory executor disconnected, dropping bundle"),
        }
    }

    /// 发布末端力样本
    pub(crate) fn publish_force(&self, sample: EndEffectorForce) {
        match self.forces.try_send(sample) {
            Ok(()) => {
                self.metrics.force_samples_published.fetch_add(1, Ordering::Relaxed);
            },
            Err(TrySendError::Full(_)) => {
                self.metrics.force_samples_dropped.fetch_add(1, Ordering::Relaxed);
            },
            Err(TrySendError::Disconnected(_)) => {
                debug!("Force telemetry consumer disconnected, dropping sample");
            },
        }
    }
}
