//! 离线障碍检测命令
//!
//! 对一张 PGM 帧跑边缘密度检测，用于调节阈值。

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use trekbot_sdk::vision::{DIRECTION_LEFT, DIRECTION_RIGHT, ObstacleDetector, pgm};

use super::config::load_navigation_config;

/// 检测命令参数
#[derive(Args, Debug)]
pub struct DetectCommand {
    /// 输入帧（二进制 PGM）
    pub frame: PathBuf,

    /// 配置文件（阈值默认取自配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 覆盖梯度幅值阈值
    #[arg(long)]
    pub edge_threshold: Option<u16>,

    /// 覆盖边缘密度阈值
    #[arg(long)]
    pub density_threshold: Option<f64>,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

fn direction_label(direction: f64) -> &'static str {
    if direction == DIRECTION_LEFT {
        "left"
    } else if direction == DIRECTION_RIGHT {
        "right"
    } else {
        "ahead"
    }
}

impl DetectCommand {
    pub fn execute(&self) -> Result<()> {
        let mut detector_config = load_navigation_config(self.config.as_deref())?.detector_config();
        if let Some(edge) = self.edge_threshold {
            detector_config.edge_threshold = edge;
        }
        if let Some(density) = self.density_threshold {
            detector_config.density_threshold = density;
        }
        detector_config.validate()?;

        let bytes = fs::read(&self.frame)
            .with_context(|| format!("读取帧失败: {}", self.frame.display()))?;
        let frame = pgm::decode(&bytes)
            .with_context(|| format!("解码帧失败: {}", self.frame.display()))?;

        let detection = ObstacleDetector::new(detector_config).detect(&frame)?;
        let histogram = detection.histogram;

        if self.json {
            let value = serde_json::json!({
                "width": frame.width(),
                "height": frame.height(),
                "present": detection.present,
                "direction": detection.direction,
                "density": detection.density,
                "histogram": {
                    "left": histogram.left,
                    "center": histogram.center,
                    "right": histogram.right,
                    "scanned": histogram.scanned,
                },
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        println!("帧: {} ({})", self.frame.display(), frame.resolution());
        println!(
            "边缘: 左 {} / 中 {} / 右 {}（扫描 {} 像素，密度 {:.4}，阈值 {:.4}）",
            histogram.left,
            histogram.center,
            histogram.right,
            histogram.scanned,
            detection.density,
            detector_config.density_threshold,
        );
        if detection.present {
            println!("obstacle: {}", direction_label(detection.direction));
        } else {
            println!("obstacle: none");
        }
        Ok(())
    }
}
