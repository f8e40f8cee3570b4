//! 配置管理命令
//!
//! 导航参数保存在 `<配置目录>/trekbot/navigation.toml`。
//! 设置 `TREKBOT_CONFIG_DIR` 时改用该目录（测试和多机调试用）。

use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};
use trekbot_sdk::NavigationConfig;

/// 覆盖配置目录的环境变量
pub const CONFIG_DIR_ENV: &str = "TREKBOT_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "navigation.toml";

/// 配置目录
fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("trekbot");
    Ok(path)
}

/// 默认配置文件路径（不保证存在）
pub fn config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    path.push(CONFIG_FILE_NAME);
    Ok(path)
}

/// 加载导航配置
///
/// - 指定了 `explicit`：必须存在且合法
/// - 否则读取默认路径；文件不存在时使用内置默认值
pub fn load_navigation_config(explicit: Option<&Path>) -> Result<NavigationConfig> {
    if let Some(path) = explicit {
        return NavigationConfig::load_from_file(path)
            .with_context(|| format!("加载配置失败: {}", path.display()));
    }

    let path = config_file()?;
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(NavigationConfig::default());
    }
    NavigationConfig::load_from_file(&path)
        .with_context(|| format!("加载配置失败: {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 写出默认配置
    Init {
        /// 覆盖已有文件
        #[arg(short, long)]
        force: bool,
    },

    /// 打印当前生效的配置
    Show {
        /// 配置文件（默认使用配置目录下的文件）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 打印配置文件路径
    Path,

    /// 校验配置文件
    Check {
        /// 要校验的文件（默认使用配置目录下的文件）
        file: Option<PathBuf>,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Init { force } => Self::init_(force),

            ConfigCommand::Show { config } => Self::show_(config.as_deref()),

            ConfigCommand::Path => {
                println!("{}", config_file()?.display());
                Ok(())
            },

            ConfigCommand::Check { file } => Self::check_(file),
        }
    }

    fn init_(force: bool) -> Result<()> {
        let path = config_file()?;
        if path.exists() && !force {
            anyhow::bail!(
                "配置文件已存在: {}（使用 --force 覆盖）",
                path.display()
            );
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("创建配置目录失败")?;
        }
        NavigationConfig::default()
            .save_to_file(&path)
            .context("写入配置文件失败")?;

        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }

    fn show_(config: Option<&Path>) -> Result<()> {
        let config = load_navigation_config(config)?;
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn check_(file: Option<PathBuf>) -> Result<()> {
        let path = match file {
            Some(path) => path,
            None => config_file()?,
        };

        let config = NavigationConfig::load_from_file(&path)
            .with_context(|| format!("配置无效: {}", path.display()))?;

        println!("✅ 配置有效: {}", path.display());
        println!(
            "  障碍阈值: {:.1} cm, 相机: {}, 最大回溯: {}, 最大卡住恢复: {}",
            config.range.obstacle_threshold_cm,
            config.camera.resolution,
            config.recovery.max_backtrack_attempts,
            config.recovery.max_stuck_attempts,
        );
        Ok(())
    }
}
