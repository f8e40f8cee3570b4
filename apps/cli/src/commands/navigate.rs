//! 仿真导航命令
//!
//! 在内置场地中运行完整的自主导航（四个线程 + 状态机），直到：
//! - 导航自行停止（回溯/卡住恢复次数耗尽）
//! - 达到 `--max-seconds`
//! - Ctrl-C

use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use trekbot_sdk::driver::{AsyncFrameRecorder, RecordedFrame};
use trekbot_sdk::vision::pgm;
use trekbot_sdk::{NavigationHandle, NavigationOutcome, NavigatorBuilder};
use tracing::{info, warn};

use super::config::load_navigation_config;
use crate::sim::{SimOptions, SimReport, SimRobot, World};

/// 导航命令参数
#[derive(Args, Debug)]
pub struct NavigateCommand {
    /// 配置文件（默认使用配置目录下的文件）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 仿真场地
    #[arg(short, long, value_enum, default_value_t = World::Corridor)]
    pub world: World,

    /// 运行多少秒后车轮卡死（模拟被卡住）
    #[arg(long)]
    pub stuck_after: Option<f64>,

    /// 最长运行时间（秒），0 表示无限
    #[arg(short, long, default_value_t = 60)]
    pub max_seconds: u64,

    /// 把监控线程采集的帧保存为 PGM
    #[arg(short, long)]
    pub record_frames: Option<PathBuf>,

    /// 仿真随机种子，0 表示每次不同
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// 关闭传感器噪声和丢帧
    #[arg(long)]
    pub ideal_sensors: bool,

    /// 以 JSON 输出结果
    #[arg(long)]
    pub json: bool,
}

impl NavigateCommand {
    fn sim_options(&self) -> Result<SimOptions> {
        let jam_after = match self.stuck_after {
            Some(secs) => Some(
                Duration::try_from_secs_f64(secs)
                    .with_context(|| format!("无效的 --stuck-after: {}", secs))?,
            ),
            None => None,
        };

        let mut options = SimOptions {
            jam_after,
            seed: self.seed,
            ..SimOptions::default()
        };
        if self.ideal_sensors {
            options.range_noise_cm = 0.0;
            options.range_dropout = 0.0;
            options.frame_dropout = 0.0;
        }
        Ok(options)
    }

    pub fn execute(&self) -> Result<()> {
        let config = load_navigation_config(self.config.as_deref())?;
        let robot = SimRobot::new(self.world.arena(), self.sim_options()?);
        let mut builder = NavigatorBuilder::new().config(config);

        let mut writer = None;
        let mut dropped = None;
        if let Some(dir) = &self.record_frames {
            fs::create_dir_all(dir)
                .with_context(|| format!("创建录制目录失败: {}", dir.display()))?;
            let (recorder, rx) = AsyncFrameRecorder::new();
            dropped = Some(recorder.dropped_frames().clone());
            builder = builder.frame_callback(Arc::new(recorder));
            writer = Some(spawn_frame_writer(dir.clone(), rx)?);
        }

        let mut navigator = builder.build(
            robot.range_sensor(),
            robot.camera(),
            robot.drive(),
            robot.indicator(),
        )?;
        let handle = navigator.handle();

        let ctrlc_handle = handle.clone();
        ctrlc::set_handler(move || {
            ctrlc_handle.request_stop();
        })
        .context("设置 Ctrl-C 处理失败")?;

        let (done_tx, done_rx) = bounded::<()>(0);
        let watchdog = spawn_watchdog(handle.clone(), self.max_seconds, done_rx)?;

        info!("Navigating world {:?}", self.world);
        let result = navigator.run_navigation();

        drop(done_tx);
        if watchdog.join().is_err() {
            warn!("Watchdog thread panicked");
        }

        // 录制钩子的发送端随导航器释放，写盘线程随之结束
        drop(navigator);
        let written = match writer {
            Some(writer) => writer
                .join()
                .map_err(|_| anyhow::anyhow!("帧写盘线程 panic"))??,
            None => 0,
        };

        let outcome = result.context("导航异常终止")?;
        let report = robot.report();
        let dropped = dropped.map_or(0, |d| d.load(Ordering::Relaxed));

        if self.json {
            print_json(&outcome, &report, written, dropped)?;
        } else {
            print_summary(&handle, &outcome, &report);
            if let Some(dir) = &self.record_frames {
                println!(
                    "录制: {} 帧写入 {}（丢弃 {}）",
                    written,
                    dir.display(),
                    dropped
                );
            }
        }
        Ok(())
    }
}

/// 超时后请求停止；发送端关闭时提前退出
fn spawn_watchdog(
    handle: NavigationHandle,
    max_seconds: u64,
    done: Receiver<()>,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("trekbot-watchdog".into())
        .spawn(move || {
            if max_seconds == 0 {
                let _ = done.recv();
                return;
            }
            if let Err(RecvTimeoutError::Timeout) =
                done.recv_timeout(Duration::from_secs(max_seconds))
            {
                info!("Time limit of {}s reached", max_seconds);
                handle.request_stop();
            }
        })
        .context("启动 watchdog 线程失败")
}

fn frame_file_name(record: &RecordedFrame) -> String {
    format!(
        "{:06}-{}-{}ms.pgm",
        record.sequence, record.source, record.elapsed_ms
    )
}

fn spawn_frame_writer(
    dir: PathBuf,
    rx: Receiver<RecordedFrame>,
) -> Result<thread::JoinHandle<Result<u64>>> {
    thread::Builder::new()
        .name("trekbot-recorder".into())
        .spawn(move || write_frames(&dir, rx))
        .context("启动帧写盘线程失败")
}

fn write_frames(dir: &Path, rx: Receiver<RecordedFrame>) -> Result<u64> {
    let mut written = 0;
    for record in rx {
        let path = dir.join(frame_file_name(&record));
        fs::write(&path, pgm::encode(&record.frame))
            .with_context(|| format!("写入帧失败: {}", path.display()))?;
        written += 1;
    }
    Ok(written)
}

fn print_summary(handle: &NavigationHandle, outcome: &NavigationOutcome, report: &SimReport) {
    let metrics = &outcome.metrics;

    println!("停止原因: {}", outcome.reason);
    println!("最终状态: {}", handle.state());
    println!(
        "耗时 {:.2}s，回溯 {} 次，卡住恢复 {} 次",
        outcome.elapsed.as_secs_f64(),
        outcome.backtrack_attempts,
        outcome.stuck_attempts
    );
    println!(
        "位姿 ({:.1}, {:.1}) cm，朝向 {:.0}°，里程 {:.1} cm，碰撞 {} 次{}",
        report.pose.x,
        report.pose.y,
        report.pose.heading_deg(),
        report.odometer_cm,
        report.collisions,
        if report.jammed { "（车轮卡死）" } else { "" }
    );
    println!(
        "测距 {} 次（错误率 {:.1}%，触发 {}），采集 {} 帧（丢帧率 {:.1}%，触发 {}），卡住检查 {} 次（触发 {}）",
        metrics.range_samples,
        metrics.range_error_rate(),
        metrics.range_triggers,
        metrics.frames_captured,
        metrics.frame_miss_rate(),
        metrics.camera_triggers,
        metrics.stuck_checks,
        metrics.stuck_triggers,
    );
    println!(
        "决策 {} 轮，状态切换 {} 次，转向 {} 次，电机命令 {} 条",
        metrics.decision_cycles,
        metrics.state_transitions,
        metrics.turns,
        metrics.motor_commands,
    );
}

fn print_json(
    outcome: &NavigationOutcome,
    report: &SimReport,
    written: u64,
    dropped: u64,
) -> Result<()> {
    let metrics = &outcome.metrics;
    let value = serde_json::json!({
        "reason": format!("{:?}", outcome.reason),
        "elapsed_ms": outcome.elapsed.as_millis() as u64,
        "backtrack_attempts": outcome.backtrack_attempts,
        "stuck_attempts": outcome.stuck_attempts,
        "pose": {
            "x_cm": report.pose.x,
            "y_cm": report.pose.y,
            "heading_deg": report.pose.heading_deg(),
        },
        "odometer_cm": report.odometer_cm,
        "collisions": report.collisions,
        "jammed": report.jammed,
        "metrics": {
            "range_samples": metrics.range_samples,
            "range_errors": metrics.range_errors,
            "range_triggers": metrics.range_triggers,
            "frames_captured": metrics.frames_captured,
            "frames_missing": metrics.frames_missing,
            "camera_triggers": metrics.camera_triggers,
            "stuck_checks": metrics.stuck_checks,
            "stuck_triggers": metrics.stuck_triggers,
            "decision_cycles": metrics.decision_cycles,
            "state_transitions": metrics.state_transitions,
            "turns": metrics.turns,
            "backtracks": metrics.backtracks,
            "stuck_recoveries": metrics.stuck_recoveries,
            "motor_commands": metrics.motor_commands,
        },
        "recorded_frames": written,
        "dropped_frames": dropped,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
