//! # Trekbot CLI
//!
//! 自主避障导航的命令行工具：仿真运行 + 离线帧分析。
//!
//! ```bash
//! # 写出默认配置，按需修改阈值
//! trekbot-cli config init
//!
//! # 在仿真走廊里导航，最多 30 秒，录制采集的帧
//! trekbot-cli navigate --world corridor --max-seconds 30 --record-frames ./frames
//!
//! # 5 秒后车轮卡死，观察卡住恢复
//! trekbot-cli navigate --world open --stuck-after 5
//!
//! # 离线检查录制的帧
//! trekbot-cli detect ./frames/000012-obstacle-6003ms.pgm
//! trekbot-cli diff ./frames/000001-stuck-1000ms.pgm ./frames/000003-stuck-2001ms.pgm
//! ```
//!
//! 日志级别由 `RUST_LOG` 控制，默认 `trekbot=info`。

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod sim;

use commands::{ConfigCommand, DetectCommand, DiffCommand, NavigateCommand};

/// Trekbot CLI - 自主避障导航命令行工具
#[derive(Parser, Debug)]
#[command(name = "trekbot-cli")]
#[command(about = "Command-line interface for Trekbot obstacle navigation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 在仿真场地中运行自主导航
    Navigate {
        #[command(flatten)]
        args: NavigateCommand,
    },

    /// 对 PGM 帧运行障碍检测
    Detect {
        #[command(flatten)]
        args: DetectCommand,
    },

    /// 比较两帧，判断是否卡住
    Diff {
        #[command(flatten)]
        args: DiffCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    trekbot_sdk::logging::init_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),

        Commands::Navigate { args } => args.execute(),

        Commands::Detect { args } => args.execute(),

        Commands::Diff { args } => args.execute(),
    }
}
