//! # Scribe CLI
//!
//! 在模拟协作方上运行绘图控制器。
//!
//! ```bash
//! # 写出默认配置并检查
//! scribe-cli config init
//! scribe-cli config check
//!
//! # 运行控制循环 10 秒（真实硬件模式会先做重力标定）
//! scribe-cli run --duration-secs 10 --real-hardware
//!
//! # 按顺序提交脚本中的请求
//! scribe-cli script apps/cli/scripts/square.json
//! ```
//!
//! 日志级别通过 `RUST_LOG` 调整，例如 `RUST_LOG=scribe_control=debug`。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod script;
mod sim;

use commands::{ConfigCommand, RunCommand, ScriptCommand};

/// Scribe CLI - 绘图控制器命令行工具
#[derive(Parser, Debug)]
#[command(name = "scribe-cli")]
#[command(about = "Run the board scribe drawing controller against simulated collaborators", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认：<config_dir>/scribe/config.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 运行控制循环
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 执行请求脚本
    Script {
        #[command(flatten)]
        args: ScriptCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scribe_cli=info".parse()?)
                .add_directive("scribe_control=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(config),

        Commands::Run { args } => args.execute(config).await,

        Commands::Script { args } => args.execute(config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "scribe-cli",
            "run",
            "--duration-secs",
            "5",
            "--real-hardware",
            "--tick-rate",
            "50",
        ]);
        match cli.command {
            Commands::Run { args } => {
                assert_eq!(args.duration_secs, Some(5));
                assert!(args.overrides.real_hardware);
                assert_eq!(args.overrides.tick_rate, Some(50.0));
            },
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["scribe-cli", "config", "show", "--config", "/tmp/s.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
        assert!(matches!(cli.command, Commands::Config(ConfigCommand::Show)));
    }

    #[test]
    fn test_parse_script() {
        let cli = Cli::parse_from(["scribe-cli", "script", "draw.json", "--continue-on-error"]);
        match cli.command {
            Commands::Script { args } => {
                assert_eq!(args.file, PathBuf::from("draw.json"));
                assert!(args.continue_on_error);
                assert_eq!(args.settle_secs, 30);
            },
            other => panic!("unexpected command {:?}", other),
        }
    }
}
