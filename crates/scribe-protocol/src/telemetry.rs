//! 遥测与执行状态消息

use std::fmt;

/// 末端接触力遥测
///
/// 控制循环在每个空闲周期发布一次。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EndEffectorForce {
    /// 工具坐标系 Z 方向的瞬时接触力（N）
    pub force_z: f64,
    /// 最近一次接受的请求是否为笛卡尔路径（力控模式）
    pub force_control_enabled: bool,
}

/// 执行器上报的轨迹状态
///
/// 只有 `"done"` 有语义；其他标签原样保留，用于日志。
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrajectoryStatus {
    /// 当前轨迹执行完成
    Done,
    Other(String),
}

impl TrajectoryStatus {
    /// 执行器完成标记
    pub const DONE_TOKEN: &'static str = "done";

    pub fn parse(token: &str) -> Self {
        if token == Self::DONE_TOKEN {
            TrajectoryStatus::Done
        } else {
            TrajectoryStatus::Other(token.to_string())
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TrajectoryStatus::Done)
    }
}

impl fmt::Display for TrajectoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryStatus::Done => f.write_str(Self::DONE_TOKEN),
            TrajectoryStatus::Other(token) => f.write_str(token),
        }
    }
}
