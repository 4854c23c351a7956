//! script 命令
//!
//! 启动模拟会话，按顺序提交脚本中的请求，等待执行器空闲后打印统计。

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::run::{ConfigOverrides, ExecutorArgs, print_summary, resolve_config};
use crate::script::{ScriptConfig, ScriptExecutor};
use crate::sim::SimulatedSession;

/// 脚本执行命令参数
#[derive(Args, Debug)]
pub struct ScriptCommand {
    /// 脚本文件路径（JSON）
    pub file: PathBuf,

    /// 失败时继续执行
    #[arg(long)]
    pub continue_on_error: bool,

    /// 命令之间的间隔（毫秒）
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,

    /// 提交完成后等待执行器空闲的最长时间（秒）
    #[arg(long, default_value_t = 30)]
    pub settle_secs: u64,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(flatten)]
    pub executor: ExecutorArgs,
}

impl ScriptCommand {
    pub async fn execute(&self, config_path: Option<&Path>) -> Result<()> {
        println!("📜 加载脚本: {}", self.file.display());
        let script = ScriptExecutor::load_script(&self.file)?;

        println!("📋 脚本: {}", script.name);
        if !script.description.is_empty() {
            println!("    {}", script.description);
        }
        println!("    {} 个命令", script.commands.len());
        println!();

        let config = resolve_config(config_path, &self.overrides)?;
        let session = SimulatedSession::start(config, self.executor.session_options())?;

        let executor = ScriptExecutor::new().with_config(ScriptConfig {
            continue_on_error: self.continue_on_error,
            execution_delay_ms: self.delay_ms,
        });
        let result = executor.execute(&script, session.handle()).await;

        wait_until_idle(&session, Duration::from_secs(self.settle_secs)).await;
        let summary = session.stop().await?;

        println!();
        println!("📋 脚本执行结果: {}", result.script_name);
        println!("  总命令数: {}", result.total_commands);
        println!("  成功: {}", result.succeeded.len());
        println!("  失败: {}", result.failed.len());
        println!("  未执行: {}", result.skipped());
        println!("  耗时: {:.2} 秒", result.duration.as_secs_f64());

        if !result.failed.is_empty() {
            println!();
            println!("❌ 失败的命令:");
            for (idx, err) in &result.failed {
                println!("  命令 {}: {}", idx + 1, err);
            }
        }

        print_summary(&summary);

        if !result.failed.is_empty() {
            anyhow::bail!("{} 个命令失败", result.failed.len());
        }
        Ok(())
    }
}

/// 等待已接受的请求全部规划并执行完毕
///
/// 发布的轨迹包都已执行、且连续几个轮询周期没有新的规划时视为空闲。
async fn wait_until_idle(session: &SimulatedSession, limit: Duration) {
    const POLL: Duration = Duration::from_millis(50);
    const QUIET_POLLS: u32 = 4;

    let deadline = tokio::time::Instant::now() + limit;
    let mut last = session.metrics().snapshot();
    let mut quiet = 0;

    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(POLL).await;
        let now = session.metrics().snapshot();

        let drained = session.bundles_executed() == now.bundles_published;
        let unchanged = now.plans_attempted() == last.plans_attempted();
        quiet = if drained && unchanged { quiet + 1 } else { 0 };
        last = now;

        if quiet >= QUIET_POLLS {
            return;
        }
    }

    tracing::warn!("Executor still busy after {:?}", limit);
}
