//! run 命令
//!
//! 在模拟协作方上运行控制循环，直到 Ctrl+C 或到达指定时长。

use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::RecvTimeoutError;
use scribe_control::ControllerConfig;
use std::path::Path;
use std::time::Duration;
use tokio::task::spawn_blocking;

use super::config::load_config;
use crate::sim::{SessionOptions, SessionSummary, SimulatedSession};

/// 覆盖配置文件中的字段
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// 按真实硬件运行（执行重力标定）
    #[arg(long)]
    pub real_hardware: bool,

    /// 控制循环频率（Hz）
    #[arg(long)]
    pub tick_rate: Option<f64>,

    /// 单次规划调用超时（毫秒）
    #[arg(long)]
    pub planning_timeout_ms: Option<u64>,

    /// 书写起点 X（米）
    #[arg(long)]
    pub initial_x: Option<f64>,

    /// 书写起点 Y（米）
    #[arg(long)]
    pub initial_y: Option<f64>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ControllerConfig) {
        if self.real_hardware {
            config.use_simulated_hardware = false;
        }
        if let Some(rate) = self.tick_rate {
            config.tick_rate_hz = rate;
        }
        if let Some(ms) = self.planning_timeout_ms {
            config.planning_timeout_ms = Some(ms);
        }
        if let Some(x) = self.initial_x {
            config.initial_x = x;
        }
        if let Some(y) = self.initial_y {
            config.initial_y = y;
        }
    }
}

/// 模拟执行器参数
#[derive(Args, Debug, Clone, Default)]
pub struct ExecutorArgs {
    /// 执行器回复 "done" 前的等待（毫秒），默认按轨迹时长
    #[arg(long)]
    pub executor_delay_ms: Option<u64>,
}

impl ExecutorArgs {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            executor_delay: self.executor_delay_ms.map(Duration::from_millis),
        }
    }
}

/// run 命令参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 运行时长（秒），不指定时运行到 Ctrl+C
    #[arg(short, long)]
    pub duration_secs: Option<u64>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(flatten)]
    pub executor: ExecutorArgs,
}

impl RunCommand {
    pub async fn execute(&self, config_path: Option<&Path>) -> Result<()> {
        let config = resolve_config(config_path, &self.overrides)?;

        println!("🚀 启动控制循环 ({} Hz)", config.tick_rate_hz);
        if !config.use_simulated_hardware {
            println!("⚖️  真实硬件模式：先执行重力标定");
        }

        let session = SimulatedSession::start(config, self.executor.session_options())?;

        match self.duration_secs {
            Some(secs) => println!("💡 运行 {} 秒，按 Ctrl+C 提前停止", secs),
            None => println!("💡 按 Ctrl+C 停止"),
        }
        wait_for_stop(self.duration_secs.map(Duration::from_secs)).await?;

        let summary = session.stop().await?;
        print_summary(&summary);
        Ok(())
    }
}

/// 加载配置、应用命令行覆盖并校验
pub fn resolve_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ControllerConfig> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config);
    config.validate().context("命令行覆盖后的配置无效")?;
    Ok(config)
}

/// 等待 Ctrl+C 或超时
pub async fn wait_for_stop(limit: Option<Duration>) -> Result<()> {
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .context("注册 Ctrl+C 处理器失败")?;

    let interrupted = spawn_blocking(move || match limit {
        Some(limit) => !matches!(stop_rx.recv_timeout(limit), Err(RecvTimeoutError::Timeout)),
        None => stop_rx.recv().is_ok(),
    })
    .await
    .context("等待停止信号失败")?;

    if interrupted {
        println!();
        println!("🛑 收到停止信号");
    }
    Ok(())
}

pub fn print_summary(summary: &SessionSummary) {
    let m = &summary.metrics;

    println!();
    println!("📊 运行统计:");
    println!("  控制周期: {}", m.ticks);
    println!("  标定样本: {}", m.calibration_samples);
    println!("  位姿目标规划: {}", m.pose_goals_planned);
    println!(
        "  笛卡尔路径规划: {} 批 / {} 个路点",
        m.cartesian_batches_planned, m.cartesian_waypoints_planned
    );
    println!("  关节目标规划: {}", m.joint_goals_planned);
    println!(
        "  规划失败: {} ({:.1}%)",
        m.plan_failures,
        m.plan_failure_rate() * 100.0
    );
    println!(
        "  轨迹包: 发布 {} / 执行 {}",
        m.bundles_published, summary.bundles_executed
    );
    println!(
        "  力样本: {} (丢弃 {})",
        m.force_samples_published, m.force_samples_dropped
    );
    println!("  变换查询失败: {}", m.transform_failures);
    if let Some(last) = summary.forces.last {
        println!(
            "  末端力: 最新 {:.3} N, 峰值 {:.3} N",
            last.force_z, summary.forces.peak_force_z
        );
    }
}
