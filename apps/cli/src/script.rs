//! 请求脚本
//!
//! JSON 脚本按顺序列出要提交给控制器的请求，逐条提交并等待应答。
//!
//! ```json
//! {
//!   "name": "square",
//!   "description": "沿正方形画一圈",
//!   "commands": [
//!     { "type": "PoseGoal", "position": { "x": 0.5, "y": 0.0, "z": 0.3 } },
//!     { "type": "CartesianPath", "waypoints": [
//!         { "position": { "x": 0.5, "y": 0.1, "z": 0.3 } },
//!         { "position": { "x": 0.6, "y": 0.1, "z": 0.3 } }
//!     ] },
//!     { "type": "Wait", "duration_ms": 500 }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use scribe_control::ControllerHandle;
use scribe_protocol::{JointGoal, Point, Pose, Quaternion};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// 请求脚本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// 脚本名称
    pub name: String,

    /// 脚本描述
    #[serde(default)]
    pub description: String,

    /// 命令序列
    pub commands: Vec<ScriptCommand>,
}

/// 脚本中的位姿，省略 orientation 时为单位四元数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSpec {
    pub position: Point,
    #[serde(default = "identity_orientation")]
    pub orientation: Quaternion,
}

fn identity_orientation() -> Quaternion {
    Quaternion::IDENTITY
}

impl From<PoseSpec> for Pose {
    fn from(spec: PoseSpec) -> Self {
        Pose::new(spec.position, spec.orientation)
    }
}

/// 关节目标中的单个关节
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    pub position: f64,
}

/// 脚本命令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScriptCommand {
    /// 位姿目标（入队）
    PoseGoal {
        position: Point,
        #[serde(default = "identity_orientation")]
        orientation: Quaternion,
    },

    /// 笛卡尔路径（入队，开启力控）
    CartesianPath { waypoints: Vec<PoseSpec> },

    /// 关节目标（立即规划）
    JointGoal { joints: Vec<JointSpec> },

    /// 等待命令
    Wait { duration_ms: u64 },
}

impl ScriptCommand {
    /// 单行描述，用于打印进度
    pub fn describe(&self) -> String {
        match self {
            ScriptCommand::PoseGoal { position, .. } => format!(
                "位姿目标 ({:.3}, {:.3}, {:.3})",
                position.x, position.y, position.z
            ),
            ScriptCommand::CartesianPath { waypoints } => {
                format!("笛卡尔路径 {} 个路点", waypoints.len())
            },
            ScriptCommand::JointGoal { joints } => format!("关节目标 {} 个关节", joints.len()),
            ScriptCommand::Wait { duration_ms } => format!("等待 {} ms", duration_ms),
        }
    }
}

/// 脚本执行配置
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    /// 失败时是否继续
    pub continue_on_error: bool,

    /// 命令之间的间隔（毫秒）
    pub execution_delay_ms: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            execution_delay_ms: 0,
        }
    }
}

/// 脚本执行器
#[derive(Debug, Default)]
pub struct ScriptExecutor {
    config: ScriptConfig,
}

impl ScriptExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ScriptConfig) -> Self {
        self.config = config;
        self
    }

    /// 加载脚本文件
    pub fn load_script<P: AsRef<Path>>(path: P) -> Result<Script> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取脚本文件失败: {}", path.display()))?;

        let script: Script = serde_json::from_str(&content).context("解析脚本 JSON 失败")?;

        Ok(script)
    }

    /// 逐条提交脚本命令
    pub async fn execute(&self, script: &Script, handle: &ControllerHandle) -> ScriptResult {
        let started = Instant::now();
        let mut result = ScriptResult {
            script_name: script.name.clone(),
            total_commands: script.commands.len(),
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration: Duration::ZERO,
        };

        for (i, cmd) in script.commands.iter().enumerate() {
            println!("命令 {}/{}: {}", i + 1, result.total_commands, cmd.describe());

            match Self::execute_command(handle, cmd).await {
                Ok(()) => {
                    println!("  ✅ 成功");
                    result.succeeded.push(i);
                },

                Err(err) => {
                    println!("  ❌ 失败: {:#}", err);
                    result.failed.push((i, format!("{:#}", err)));

                    if !self.config.continue_on_error {
                        println!("❌ 脚本执行失败，停止执行");
                        break;
                    }
                },
            }

            if self.config.execution_delay_ms > 0 && i + 1 < script.commands.len() {
                tokio::time::sleep(Duration::from_millis(self.config.execution_delay_ms)).await;
            }
        }

        result.duration = started.elapsed();
        result
    }

    async fn execute_command(handle: &ControllerHandle, cmd: &ScriptCommand) -> Result<()> {
        match cmd {
            ScriptCommand::PoseGoal {
                position,
                orientation,
            } => {
                handle
                    .submit_pose_goal(Pose::new(*position, *orientation))
                    .await?;
            },

            ScriptCommand::CartesianPath { waypoints } => {
                let waypoints = waypoints.iter().copied().map(Pose::from).collect();
                handle.submit_cartesian_path(waypoints).await?;
            },

            ScriptCommand::JointGoal { joints } => {
                let goal = JointGoal::new(joints.iter().map(|j| (j.name.as_str(), j.position)))?;
                handle.submit_joint_goal(goal).await?;
            },

            ScriptCommand::Wait { duration_ms } => {
                tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
            },
        }

        Ok(())
    }
}

/// 脚本执行结果
#[derive(Debug)]
pub struct ScriptResult {
    pub script_name: String,

    /// 总命令数
    pub total_commands: usize,

    /// 成功的命令索引
    pub succeeded: Vec<usize>,

    /// 失败的命令索引和错误
    pub failed: Vec<(usize, String)>,

    /// 执行耗时
    pub duration: Duration,
}

impl ScriptResult {
    /// 未执行的命令数（失败后停止）
    pub fn skipped(&self) -> usize {
        self.total_commands - self.succeeded.len() - self.failed.len()
    }
}
