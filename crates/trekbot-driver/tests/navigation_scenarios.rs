//! 端到端导航场景测试
//!
//! 用 Mock 硬件驱动完整的 `run_navigation`（四个真实线程），验证：
//! 1. 正前方近距离障碍 → 先倒车不转向，两次回溯后停止
//! 2. 静止画面 → 卡住恢复用尽后停止
//! 3. 视觉报告左侧障碍 → 右转避让
//! 4. 外部请求停止 → 及时返回且线程全部退出

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use trekbot_driver::{
    AsyncFrameRecorder, FrameSource, NavState, NavigationConfig, NavigationHandle, Navigator,
    NavigatorBuilder, StopReason,
};
use trekbot_hal::mock::{
    DriveCommand, IndicatorCommand, MockCamera, MockDrive, MockIndicator, MockRangeSensor,
};
use trekbot_hal::{Camera, GrayFrame, HalError, IndicatorColor, Resolution, WheelSpeed};

const RES: Resolution = Resolution::new(48, 48);

/// 亮度循环变化的纯色帧：没有边缘，相邻几次采集的帧差都很大（机器人在正常移动）
struct FlickerCamera {
    captures: AtomicU64,
}

impl FlickerCamera {
    fn new() -> Self {
        Self {
            captures: AtomicU64::new(0),
        }
    }
}

impl Camera for FlickerCamera {
    fn capture_grayscale(&self, resolution: Resolution) -> Result<Option<GrayFrame>, HalError> {
        let n = self.captures.fetch_add(1, Ordering::Relaxed);
        let level = 30 + (n % 8) as u8 * 25;
        Ok(Some(GrayFrame::uniform(
            resolution.width,
            resolution.height,
            level,
        )))
    }
}

fn fast_config() -> NavigationConfig {
    let mut config = NavigationConfig::default();
    config.idle_backoff_ms = 1;
    config.range.poll_interval_ms = 2;
    config.camera.poll_interval_ms = 5;
    config.camera.resolution = RES;
    config.stuck.check_interval_ms = 10;
    config.stuck.state_poll_interval_ms = 2;
    config.motion.turn_duration_ms = 6;
    config.motion.backup_duration_ms = 4;
    config
}

fn drive(left: i32, right: i32) -> DriveCommand {
    DriveCommand::Drive {
        left: WheelSpeed::new(left),
        right: WheelSpeed::new(right),
    }
}

/// `after` 之后请求停止
fn stop_after(handle: NavigationHandle, after: Duration) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        thread::sleep(after);
        handle.request_stop();
    })
}

#[test]
fn test_close_obstacle_ahead_exhausts_backtracking() {
    let mut config = fast_config();
    // 卡住检测不参与本场景
    config.stuck.check_interval_ms = 5_000;

    let motors = MockDrive::new();
    let lights = MockIndicator::new();
    let mut navigator = Navigator::new(
        MockRangeSensor::new(10.0),
        MockCamera::uniform(RES, 128),
        motors.clone(),
        lights.clone(),
        config,
    )
    .unwrap();

    let outcome = navigator.run_navigation().unwrap();

    assert_eq!(outcome.reason, StopReason::BacktrackExhausted);
    assert_eq!(outcome.backtrack_attempts, 2);
    assert_eq!(outcome.metrics.backtracks, 2);
    assert!(outcome.metrics.range_triggers >= 1);
    assert!(outcome.elapsed < Duration::from_secs(5));

    let commands = motors.commands();
    // 测距没有方位：第一个动作是倒车，此前只有前进/停止，没有转向
    let first_reversal = commands.iter().position(|c| *c == drive(-40, -40)).unwrap();
    assert!(
        commands[..first_reversal]
            .iter()
            .all(|c| *c == drive(80, 80) || *c == DriveCommand::Stop),
        "{:?}",
        commands
    );
    assert_eq!(commands[first_reversal - 1], DriveCommand::Stop);

    // 灯光顺序：发现障碍（红）→ 清除 → 回溯（黄），中间没有转向（蓝）
    let signals = lights.commands();
    let red = signals
        .iter()
        .position(|c| *c == IndicatorCommand::Set(IndicatorColor::RED))
        .unwrap();
    assert_eq!(
        signals[red + 1..red + 3],
        [
            IndicatorCommand::Clear,
            IndicatorCommand::Set(IndicatorColor::YELLOW)
        ]
    );

    // 两次倒车，第一次后右转，第二次后左转
    let reversals = commands.iter().filter(|c| **c == drive(-40, -40)).count();
    assert_eq!(reversals, 2);
    let first_right = commands.iter().position(|c| *c == drive(40, -40)).unwrap();
    let first_left = commands.iter().position(|c| *c == drive(-40, 40)).unwrap();
    assert!(first_right < first_left);
    assert_eq!(commands.last(), Some(&DriveCommand::Stop));

    let handle = navigator.handle();
    assert!(!handle.is_running());
    assert_eq!(handle.state(), NavState::Stopped);
}

#[test]
fn test_static_scene_exhausts_stuck_recovery() {
    let motors = MockDrive::new();
    let mut navigator = Navigator::new(
        MockRangeSensor::new(200.0),
        MockCamera::uniform(RES, 90),
        motors.clone(),
        MockIndicator::new(),
        fast_config(),
    )
    .unwrap();

    let outcome = navigator.run_navigation().unwrap();

    assert_eq!(outcome.reason, StopReason::StuckExhausted);
    assert_eq!(outcome.stuck_attempts, 3);
    assert_eq!(outcome.metrics.stuck_recoveries, 3);
    assert!(outcome.metrics.stuck_triggers >= 3);
    assert_eq!(outcome.metrics.backtracks, 0);
    assert_eq!(motors.last_command(), Some(DriveCommand::Stop));
}

#[test]
fn test_camera_obstacle_on_left_turns_right() {
    let third = RES.width / 3;
    let left_clutter = GrayFrame::from_fn(RES.width, RES.height, |x, _| {
        if x < third && x % 2 == 0 { 255 } else { 0 }
    });
    let camera = MockCamera::new(GrayFrame::uniform(RES.width, RES.height, 50));
    // 卡住监控启动时也会采集一次，预置两帧保证障碍监控能看到
    camera.push_frame(left_clutter.clone());
    camera.push_frame(left_clutter);

    let mut config = fast_config();
    config.stuck.check_interval_ms = 5_000;
    config.camera.poll_interval_ms = 1;

    let motors = MockDrive::new();
    let mut navigator = Navigator::new(
        MockRangeSensor::new(200.0),
        camera,
        motors.clone(),
        MockIndicator::new(),
        config,
    )
    .unwrap();

    let stopper = stop_after(navigator.handle(), Duration::from_millis(150));
    let outcome = navigator.run_navigation().unwrap();
    stopper.join().unwrap();

    assert_eq!(outcome.reason, StopReason::StopRequested);
    assert!(outcome.metrics.camera_triggers >= 1);
    assert!(outcome.metrics.turns >= 1);
    assert!(motors.commands().contains(&drive(40, -40)));
    assert!(!motors.commands().contains(&drive(-40, 40)));
}

#[test]
fn test_stop_request_returns_promptly() {
    let motors = MockDrive::new();
    let lights = MockIndicator::new();
    let mut navigator = Navigator::new(
        MockRangeSensor::new(200.0),
        FlickerCamera::new(),
        motors.clone(),
        lights.clone(),
        fast_config(),
    )
    .unwrap();

    let handle = navigator.handle();
    let stopper = stop_after(handle.clone(), Duration::from_millis(80));
    let start = Instant::now();
    let outcome = navigator.run_navigation().unwrap();
    stopper.join().unwrap();

    assert_eq!(outcome.reason, StopReason::StopRequested);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!handle.is_running());
    assert_eq!(handle.state(), NavState::Stopped);

    // 正常前进：绿灯、前进，最后停车、灭灯
    assert_eq!(motors.commands().first(), Some(&drive(80, 80)));
    assert_eq!(motors.last_command(), Some(DriveCommand::Stop));
    assert!(lights
        .commands()
        .contains(&trekbot_hal::mock::IndicatorCommand::Set(IndicatorColor::GREEN)));
    assert_eq!(
        lights.commands().last(),
        Some(&trekbot_hal::mock::IndicatorCommand::Clear)
    );

    let metrics = outcome.metrics;
    assert!(metrics.stuck_checks >= 1);
    assert_eq!(metrics.stuck_triggers, 0);
    assert_eq!(metrics.range_triggers, 0);
}

#[test]
fn test_blind_camera_still_navigates_with_range() {
    let mut config = fast_config();
    config.stuck.check_interval_ms = 5_000;
    let mut navigator = Navigator::new(
        MockRangeSensor::new(5.0),
        MockCamera::blind(),
        MockDrive::new(),
        MockIndicator::new(),
        config,
    )
    .unwrap();

    let outcome = navigator.run_navigation().unwrap();
    assert_eq!(outcome.reason, StopReason::BacktrackExhausted);
    assert!(outcome.metrics.frames_missing >= 1);
    assert_eq!(outcome.metrics.frames_captured, 0);
}

#[test]
fn test_navigator_can_run_twice() {
    let mut config = fast_config();
    config.stuck.check_interval_ms = 5_000;
    let range = MockRangeSensor::new(10.0);
    let mut navigator = Navigator::new(
        range.clone(),
        MockCamera::uniform(RES, 0),
        MockDrive::new(),
        MockIndicator::new(),
        config,
    )
    .unwrap();

    let first = navigator.run_navigation().unwrap();
    let second = navigator.run_navigation().unwrap();
    assert_eq!(first.reason, StopReason::BacktrackExhausted);
    assert_eq!(second.reason, StopReason::BacktrackExhausted);
    // 每次运行的计数器独立
    assert_eq!(second.metrics.backtracks, 2);
}

#[test]
fn test_frames_are_recorded_from_both_monitors() {
    let (recorder, frames) = AsyncFrameRecorder::with_capacity(1024);
    let dropped = recorder.dropped_frames().clone();

    let mut navigator = NavigatorBuilder::new()
        .config(fast_config())
        .frame_callback(Arc::new(recorder))
        .build(
            MockRangeSensor::new(200.0),
            FlickerCamera::new(),
            MockDrive::new(),
            MockIndicator::new(),
        )
        .unwrap();

    let stopper = stop_after(navigator.handle(), Duration::from_millis(80));
    navigator.run_navigation().unwrap();
    stopper.join().unwrap();

    let sources: Vec<FrameSource> = frames.try_iter().map(|r| r.source).collect();
    assert!(sources.contains(&FrameSource::ObstacleCamera));
    assert!(sources.contains(&FrameSource::StuckMonitor));
    assert_eq!(dropped.load(Ordering::Relaxed), 0);
}
