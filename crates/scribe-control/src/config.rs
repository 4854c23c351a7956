//! 控制器配置
//!
//! 启动时读取一次，之后不可变。支持从 TOML 文件加载，
//! 未给出的字段使用默认值（`#[serde(default)]`）。
//!
//! ```toml
//! use_simulated_hardware = false
//! initial_x = 0.5
//! tick_rate_hz = 100.0
//! planning_timeout_ms = 5000
//!
//! [frames]
//! tool_tip = "panda_hand_tcp"
//!
//! [kinematics]
//! gripper_mass = 1.8
//! ```

use crate::force::KinematicConstants;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),

    /// TOML 解析失败
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML 序列化失败
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// 字段取值非法
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 变换树中用到的坐标系名称
///
/// 基座坐标系由 [`ControllerConfig::base_frame_id`] 给出。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameNames {
    /// 第 6 关节连杆坐标系
    pub joint6: String,
    /// 手爪坐标系
    pub hand: String,
    /// 工具尖端坐标系
    pub tool_tip: String,
}

impl Default for FrameNames {
    fn default() -> Self {
        Self {
            joint6: "panda_link6".to_string(),
            hand: "panda_hand".to_string(),
            tool_tip: "panda_hand_tcp".to_string(),
        }
    }
}

/// 控制器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// 是否为仿真硬件（仿真硬件跳过重力标定）
    pub use_simulated_hardware: bool,
    /// 初始书写起点 X（米）
    pub initial_x: f64,
    /// 初始书写起点 Y（米）
    pub initial_y: f64,
    pub robot_name: String,
    /// 规划组名称
    pub group_name: String,
    /// 基座坐标系
    pub base_frame_id: String,
    /// 控制循环频率（Hz）
    pub tick_rate_hz: f64,
    /// 单次规划调用超时（毫秒），`None` 表示无限等待
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_timeout_ms: Option<u64>,
    /// 用于力估计的关节力矩下标（第 6 关节 = 5）
    pub torque_joint_index: usize,
    pub frames: FrameNames,
    pub kinematics: KinematicConstants,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            use_simulated_hardware: true,
            initial_x: 0.5,
            initial_y: 0.0,
            robot_name: "panda".to_string(),
            group_name: "panda_manipulator".to_string(),
            base_frame_id: "panda_link0".to_string(),
            tick_rate_hz: 100.0,
            planning_timeout_ms: None,
            torque_joint_index: 5,
            frames: FrameNames::default(),
            kinematics: KinematicConstants::default(),
        }
    }
}

impl ControllerConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ControllerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 校验配置
    ///
    /// # Errors
    /// - 频率非正或非有限值
    /// - 坐标系名称为空
    /// - 连杆长度、质量、重力加速度非正
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tick_rate_hz must be > 0, got {}",
                self.tick_rate_hz
            )));
        }
        if self.tick_rate_hz > 10000.0 {
            tracing::warn!(
                "Very high control frequency: {} Hz. Planning calls will dominate the loop.",
                self.tick_rate_hz
            );
        }
        if self.planning_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "planning_timeout_ms must be > 0 when set".to_string(),
            ));
        }

        let frames = [
            ("base_frame_id", &self.base_frame_id),
            ("frames.joint6", &self.frames.joint6),
            ("frames.hand", &self.frames.hand),
            ("frames.tool_tip", &self.frames.tool_tip),
        ];
        if let Some((field, _)) = frames.iter().find(|(_, name)| name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
        }

        if !self.initial_x.is_finite() || !self.initial_y.is_finite() {
            return Err(ConfigError::Invalid(
                "initial_x/initial_y must be finite".to_string(),
            ));
        }

        self.kinematics.validate()
    }

    /// 控制周期
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }

    /// 规划超时
    pub fn planning_timeout(&self) -> Option<Duration> {
        self.planning_timeout_ms.map(Duration::from_millis)
    }
}
