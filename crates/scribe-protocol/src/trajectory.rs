//! 关节轨迹与下发给执行器的轨迹包

use std::fmt;
use std::time::Duration;

/// 轨迹点
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointTrajectoryPoint {
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
    /// 相对轨迹起点的时间
    pub time_from_start: Duration,
}

/// 关节空间轨迹
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointTrajectory {
    pub joint_names: Vec<String>,
    pub points: Vec<JointTrajectoryPoint>,
}

impl JointTrajectory {
    /// 轨迹总时长（最后一个点的时间）
    pub fn duration(&self) -> Duration {
        self.points
            .last()
            .map(|p| p.time_from_start)
            .unwrap_or_default()
    }
}

/// 轨迹包模式
///
/// 执行器只在 `Publish` 模式下执行轨迹；其余模式原样透传其标签。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BundleMode {
    #[default]
    Publish,
    Other(String),
}

impl BundleMode {
    pub fn as_str(&self) -> &str {
        match self {
            BundleMode::Publish => "publish",
            BundleMode::Other(tag) => tag,
        }
    }
}

impl From<&str> for BundleMode {
    fn from(tag: &str) -> Self {
        match tag {
            "publish" => BundleMode::Publish,
            other => BundleMode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BundleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 下发给轨迹执行器的轨迹包
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointTrajectoryBundle {
    /// 是否清空执行器中尚未执行的轨迹
    pub clear: bool,
    pub mode: BundleMode,
    pub trajectories: Vec<JointTrajectory>,
}

impl JointTrajectoryBundle {
    /// 创建 `clear = false`、`mode = publish` 的轨迹包
    pub fn publish(trajectories: Vec<JointTrajectory>) -> Self {
        JointTrajectoryBundle {
            clear: false,
            mode: BundleMode::Publish,
            trajectories,
        }
    }
}
