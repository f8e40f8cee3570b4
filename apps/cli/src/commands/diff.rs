//! 离线帧差命令
//!
//! 比较两张 PGM 帧，给出卡住检测的结论。

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use trekbot_sdk::vision::{GrayFrame, StuckDetector, StuckVerdict, pgm};

use super::config::load_navigation_config;

/// 帧差命令参数
#[derive(Args, Debug)]
pub struct DiffCommand {
    /// 较早的帧（PGM）
    pub previous: PathBuf,

    /// 较晚的帧（PGM）
    pub current: PathBuf,

    /// 配置文件（阈值默认取自配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 覆盖降采样步长
    #[arg(long)]
    pub step: Option<usize>,

    /// 覆盖卡住阈值
    #[arg(long)]
    pub threshold: Option<f64>,
}

fn read_frame(path: &Path) -> Result<GrayFrame> {
    let bytes = fs::read(path).with_context(|| format!("读取帧失败: {}", path.display()))?;
    pgm::decode(&bytes).with_context(|| format!("解码帧失败: {}", path.display()))
}

impl DiffCommand {
    pub fn execute(&self) -> Result<()> {
        let mut stuck_config = load_navigation_config(self.config.as_deref())?.stuck_config();
        if let Some(step) = self.step {
            stuck_config.sample_step = step;
        }
        if let Some(threshold) = self.threshold {
            stuck_config.difference_threshold = threshold;
        }
        stuck_config.validate()?;

        let previous = read_frame(&self.previous)?;
        let current = read_frame(&self.current)?;
        let verdict = StuckDetector::new(stuck_config).compare(&previous, &current)?;

        match verdict {
            StuckVerdict::Stuck { difference } => {
                println!(
                    "difference: {:.3} (< {:.3})",
                    difference, stuck_config.difference_threshold
                );
                println!("verdict: stuck");
            },
            StuckVerdict::Moving { difference } => {
                println!(
                    "difference: {:.3} (>= {:.3})",
                    difference, stuck_config.difference_threshold
                );
                println!("verdict: moving");
            },
            StuckVerdict::Warmup => println!("verdict: warmup"),
        }
        Ok(())
    }
}
