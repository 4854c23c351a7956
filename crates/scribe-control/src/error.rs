//! 控制层错误类型定义

use crate::config::ConfigError;
use crate::planner::PlanError;
use scribe_protocol::ProtocolError;
use std::time::Duration;
use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug)]
pub enum ControlError {
    /// 请求校验失败（入队前拒绝）
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ProtocolError),

    /// 外部规划器报告失败
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanError),

    /// 规划调用超过配置的超时
    #[error("Planning timed out after {0:?}")]
    PlanningTimeout(Duration),

    /// 已有规划在途，拒绝新的同步规划
    #[error("Another plan is still in flight")]
    PlanInFlight,

    /// 尚未收到关节状态
    #[error("No joint state received yet")]
    JointStateUnavailable,

    /// 控制循环已退出（命令通道关闭）
    #[error("Controller channel closed")]
    ChannelClosed,

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
