//! 重力标定
//!
//! 真实硬件上电后，连续采集 [`TARGET_SAMPLES`] 个周期的第 6 关节力矩，
//! 每个样本除以力臂 `L1 + L2` 后累加，最终偏置为累加和的平均值。
//! 仿真硬件不上报力矩，直接跳过，偏置为 0。
//!
//! 结果一旦确定就不再变化。

use tracing::{debug, info};

/// 标定需要的样本数
pub const TARGET_SAMPLES: u32 = 100;

/// 单个周期的标定结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStep {
    /// 已完成（或已跳过），本周期无事可做
    Skipped,
    /// 尚未读到力矩，继续等待
    AwaitingTorque,
    /// 采集了一个样本
    Sampled { samples_taken: u32 },
    /// 采满样本，偏置已确定
    Finished { offset: f64 },
}

/// 标定状态
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationState {
    accumulator: f64,
    samples_taken: u32,
    target_samples: u32,
    result: Option<f64>,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationState {
    pub fn new() -> Self {
        Self::with_target(TARGET_SAMPLES)
    }

    pub(crate) fn with_target(target_samples: u32) -> Self {
        Self {
            accumulator: 0.0,
            samples_taken: 0,
            target_samples: target_samples.max(1),
            result: None,
        }
    }

    /// 仿真硬件：不采样，偏置为 0
    pub fn skip(&mut self) {
        if self.result.is_none() {
            debug!("Simulated hardware, skipping gravity calibration");
            self.result = Some(0.0);
        }
    }

    /// 推进一个周期
    ///
    /// `torque` 为本周期读到的第 6 关节力矩，`lever_arm` 为 `L1 + L2`。
    pub fn step(&mut self, torque: Option<f64>, lever_arm: f64) -> CalibrationStep {
        if self.result.is_some() {
            return CalibrationStep::Skipped;
        }

        let Some(torque) = torque else {
            return CalibrationStep::AwaitingTorque;
        };

        self.accumulator += torque / lever_arm;
        self.samples_taken += 1;

        if self.samples_taken >= self.target_samples {
            let offset = self.accumulator / self.samples_taken as f64;
            self.result = Some(offset);
            info!(
                "Gravity calibration finished after {} samples, offset = {:.6}",
                self.samples_taken, offset
            );
            CalibrationStep::Finished { offset }
        } else {
            CalibrationStep::Sampled {
                samples_taken: self.samples_taken,
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    pub fn samples_taken(&self) -> u32 {
        self.samples_taken
    }

    pub fn result(&self) -> Option<f64> {
        self.result
    }

    /// 标定偏置，未完成时视为 0
    pub fn offset(&self) -> f64 {
        self.result.unwrap_or(0.0)
    }
}
