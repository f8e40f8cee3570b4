//! 传感器监控线程
//!
//! 三个独立循环，各自按周期采样并只向感知快照写入证据：
//!
//! - `range_loop`：超声波距离低于阈值 → 正前方障碍
//! - `camera_loop`：边缘密度检测 → 带方向的障碍
//! - `stuck_loop`：前进期间前后两帧几乎相同 → 疑似卡住
//!
//! 传感器的瞬时失败（读数错误、空帧）只记录并在下一个周期重试；
//! 破坏内部契约的情况（帧尺寸不符、检测器拒绝输入）作为故障上报并退出。
//! 所有循环在 `should_continue` 变为 false 后的一个睡眠分片内退出。

use crate::config::{CameraConfig, RangeConfig, StuckMonitorConfig};
use crate::error::NavigationError;
use crate::hooks::{FrameSource, HookManager};
use crate::metrics::NavigationMetrics;
use crate::shared::NavigationShared;
use crate::state::NavState;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};
use trekbot_hal::{Camera, GrayFrame, HalError, RangeSensor, Resolution};
use trekbot_vision::{DIRECTION_AHEAD, ObstacleDetector, StuckConfig, StuckDetector, StuckVerdict};

/// 工作线程退出守卫
///
/// - 线程 panic 时上报 `MonitorPanicked`，决策线程随后进入 Stopped
/// - `ends_run` 为 true 时（决策线程），无论如何退出都结束本次运行，让监控线程随之退出
pub(crate) struct ThreadGuard<'a> {
    shared: &'a NavigationShared,
    name: &'static str,
    ends_run: bool,
}

impl<'a> ThreadGuard<'a> {
    pub(crate) fn monitor(shared: &'a NavigationShared, name: &'static str) -> Self {
        Self {
            shared,
            name,
            ends_run: false,
        }
    }

    pub(crate) fn decision(shared: &'a NavigationShared) -> Self {
        Self {
            shared,
            name: "decision",
            ends_run: true,
        }
    }
}

impl Drop for ThreadGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("{} thread panicked", self.name);
            self.shared
                .control
                .raise_fault(NavigationError::MonitorPanicked(self.name));
        }
        if self.ends_run {
            self.shared.control.finish();
        }
        trace!("{} thread exited", self.name);
    }
}

fn check_resolution(
    shared: &NavigationShared,
    expected: Resolution,
    frame: &GrayFrame,
) -> bool {
    let actual = frame.resolution();
    if actual != expected {
        shared
            .control
            .raise_fault(NavigationError::ResolutionMismatch { expected, actual });
        return false;
    }
    true
}

/// 记录一次读取失败（设备丢失等不可恢复的错误提升为 error 级别）
///
/// 无论哪类错误，本轮都只跳过，不影响导航。
fn log_read_failure(device: &str, e: &HalError) {
    if e.is_fatal() {
        error!("{} unavailable: {}", device, e);
    } else {
        debug!("{} read failed: {}", device, e);
    }
}

/// 超声波测距循环
pub fn range_loop<R: RangeSensor>(mut sensor: R, shared: &NavigationShared, config: &RangeConfig) {
    let metrics = &shared.metrics;
    debug!(
        "Range monitor started (threshold {:.1} cm, every {:?})",
        config.obstacle_threshold_cm,
        config.poll_interval()
    );

    while shared.control.is_running() {
        match sensor.measure_distance() {
            Ok(distance) if distance.is_finite() && distance >= 0.0 => {
                NavigationMetrics::bump(&metrics.range_samples);
                trace!("Range: {:.1} cm", distance);
                if distance < config.obstacle_threshold_cm {
                    debug!("Ultrasonic obstacle detected at {:.1} cm", distance);
                    shared.perception.report_obstacle(DIRECTION_AHEAD);
                    NavigationMetrics::bump(&metrics.range_triggers);
                }
            },
            Ok(distance) => {
                NavigationMetrics::bump(&metrics.range_errors);
                debug!("Ignoring invalid range reading: {}", distance);
            },
            Err(e) => {
                NavigationMetrics::bump(&metrics.range_errors);
                log_read_failure("Range sensor", &e);
            },
        }
        shared.control.pace(config.poll_interval());
    }
    debug!("Range monitor stopped");
}

/// 相机障碍检测循环
pub fn camera_loop<C: Camera + ?Sized>(
    camera: &C,
    shared: &NavigationShared,
    config: &CameraConfig,
    detector: &ObstacleDetector,
    hooks: &HookManager,
) {
    let metrics = &shared.metrics;
    debug!(
        "Camera obstacle monitor started ({} every {:?})",
        config.resolution,
        config.poll_interval()
    );

    while shared.control.is_running() {
        match camera.capture_grayscale(config.resolution) {
            Ok(Some(frame)) => {
                NavigationMetrics::bump(&metrics.frames_captured);
                if !check_resolution(shared, config.resolution, &frame) {
                    break;
                }
                hooks.trigger_all(FrameSource::ObstacleCamera, &frame);

                match detector.detect(&frame) {
                    Ok(detection) if detection.present => {
                        info!(
                            "Camera detected obstacle (direction {:+.1}, edge density {:.3})",
                            detection.direction, detection.density
                        );
                        shared.perception.report_obstacle(detection.direction);
                        NavigationMetrics::bump(&metrics.camera_triggers);
                    },
                    Ok(detection) => {
                        trace!("Camera clear (edge density {:.3})", detection.density);
                    },
                    Err(e) => {
                        shared.control.raise_fault(e.into());
                        break;
                    },
                }
            },
            Ok(None) => {
                NavigationMetrics::bump(&metrics.frames_missing);
                debug!("Failed to capture image for obstacle detection");
            },
            Err(e) => {
                NavigationMetrics::bump(&metrics.camera_errors);
                log_read_failure("Camera", &e);
            },
        }
        shared.control.pace(config.poll_interval());
    }
    debug!("Camera obstacle monitor stopped");
}

/// 帧差卡住检测循环
///
/// 只在 MovingForward 期间比较；其他状态下丢弃参考帧并清除卡住标志，
/// 避免把转向/倒车前后的画面拿来比较。
pub fn stuck_loop<C: Camera + ?Sized>(
    camera: &C,
    shared: &NavigationShared,
    config: &StuckMonitorConfig,
    resolution: Resolution,
    hooks: &HookManager,
) {
    let metrics = &shared.metrics;
    let mut detector = StuckDetector::new(StuckConfig {
        difference_threshold: config.difference_threshold,
        sample_step: config.sample_step,
    });
    let mut last_check: Option<Instant> = None;
    debug!("Stuck monitor started (every {:?})", config.check_interval());

    while shared.control.is_running() {
        if shared.nav_state() != NavState::MovingForward {
            if detector.has_reference() {
                trace!("Not moving forward, dropping stuck reference frame");
            }
            detector.reset();
            shared.perception.set_stuck(false);
        } else if last_check.is_none_or(|t| t.elapsed() >= config.check_interval()) {
            last_check = Some(Instant::now());

            match camera.capture_grayscale(resolution) {
                Ok(Some(frame)) => {
                    NavigationMetrics::bump(&metrics.frames_captured);
                    if !check_resolution(shared, resolution, &frame) {
                        break;
                    }
                    hooks.trigger_all(FrameSource::StuckMonitor, &frame);

                    match detector.observe(frame) {
                        Ok(StuckVerdict::Warmup) => {
                            trace!("Stuck monitor captured reference frame");
                        },
                        Ok(StuckVerdict::Stuck { difference }) => {
                            NavigationMetrics::bump(&metrics.stuck_checks);
                            NavigationMetrics::bump(&metrics.stuck_triggers);
                            warn!("Robot might be stuck (frame difference {:.2})", difference);
                            shared.perception.set_stuck(true);
                        },
                        Ok(StuckVerdict::Moving { difference }) => {
                            NavigationMetrics::bump(&metrics.stuck_checks);
                            trace!("Frame difference {:.2}, moving", difference);
                            shared.perception.set_stuck(false);
                        },
                        Err(e) => {
                            shared.control.raise_fault(e.into());
                            break;
                        },
                    }
                },
                Ok(None) => {
                    NavigationMetrics::bump(&metrics.frames_missing);
                    debug!("Failed to capture image for stuck detection");
                },
                Err(e) => {
                    NavigationMetrics::bump(&metrics.camera_errors);
                    log_read_failure("Camera", &e);
                },
            }
        }
        shared.control.pace(config.state_poll_interval());
    }
    debug!("Stuck monitor stopped");
}
