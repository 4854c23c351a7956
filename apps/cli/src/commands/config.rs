//! 配置管理命令
//!
//! 配置文件路径：`--config` 指定，否则为 `<config_dir>/scribe/config.toml`。
//! 默认路径下没有文件时使用内置默认值。

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use scribe_control::ControllerConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 平台配置目录下的默认配置文件
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("scribe");
    path.push("config.toml");
    Ok(path)
}

/// 解析配置文件路径
pub fn resolve_config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_file(),
    }
}

/// 加载配置
///
/// 显式指定的文件必须存在；默认路径不存在时返回默认配置。
pub fn load_config(explicit: Option<&Path>) -> Result<ControllerConfig> {
    let path = resolve_config_file(explicit)?;

    if !path.exists() {
        if explicit.is_some() {
            bail!("配置文件不存在: {}", path.display());
        }
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(ControllerConfig::default());
    }

    ControllerConfig::load_from_file(&path)
        .with_context(|| format!("加载配置文件失败: {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 以 TOML 打印生效的配置
    Show,

    /// 检查配置文件
    Check,

    /// 写出默认配置文件
    Init {
        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self, explicit: Option<&Path>) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::show_(explicit),

            ConfigCommand::Check => Self::check_(explicit),

            ConfigCommand::Init { force } => Self::init_(explicit, force),
        }
    }

    fn show_(explicit: Option<&Path>) -> Result<()> {
        let config = load_config(explicit)?;
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn check_(explicit: Option<&Path>) -> Result<()> {
        let path = resolve_config_file(explicit)?;
        let config = load_config(explicit)?;

        println!("配置文件: {}", path.display());
        if !path.exists() {
            println!("  (不存在，使用默认值)");
        }
        println!("  仿真硬件: {}", config.use_simulated_hardware);
        println!("  书写起点: ({}, {})", config.initial_x, config.initial_y);
        println!("  控制频率: {} Hz", config.tick_rate_hz);
        match config.planning_timeout_ms {
            Some(ms) => println!("  规划超时: {} ms", ms),
            None => println!("  规划超时: 无"),
        }
        println!(
            "  坐标系: {} → {} → {} → {}",
            config.base_frame_id, config.frames.joint6, config.frames.hand, config.frames.tool_tip
        );
        println!("✅ 配置有效");

        Ok(())
    }

    fn init_(explicit: Option<&Path>, force: bool) -> Result<()> {
        let path = resolve_config_file(explicit)?;

        if path.exists() && !force {
            bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("创建配置目录失败")?;
        }

        let content = ControllerConfig::default().to_toml_string()?;
        fs::write(&path, content).context("写入配置文件失败")?;

        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }
}
