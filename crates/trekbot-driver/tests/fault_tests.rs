//! 故障传播测试
//!
//! 验证致命故障终止导航并以错误返回，同时保证：
//! 1. 所有工作线程都已退出
//! 2. 电机最后收到（或尝试）停止命令

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use trekbot_driver::{NavigationConfig, NavigationError, Navigator};
use trekbot_hal::mock::{DriveCommand, MockCamera, MockDrive, MockIndicator, MockRangeSensor};
use trekbot_hal::{HalError, RangeSensor, Resolution};

const RES: Resolution = Resolution::new(48, 48);

fn fast_config() -> NavigationConfig {
    let mut config = NavigationConfig::default();
    config.idle_backoff_ms = 1;
    config.range.poll_interval_ms = 2;
    config.camera.poll_interval_ms = 5;
    config.camera.resolution = RES;
    config.stuck.check_interval_ms = 5_000;
    config.stuck.state_poll_interval_ms = 2;
    config.motion.turn_duration_ms = 6;
    config.motion.backup_duration_ms = 4;
    config
}

/// 读取若干次后 panic 的测距传感器
struct PanickingRange {
    remaining: u32,
}

impl RangeSensor for PanickingRange {
    fn measure_distance(&mut self) -> Result<f64, HalError> {
        if self.remaining == 0 {
            panic!("range driver bug");
        }
        self.remaining -= 1;
        Ok(100.0)
    }
}

/// 一直返回远距离，并统计在运行结束后是否还被调用
struct CountingRange {
    reads: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
    late_reads: Arc<AtomicU64>,
}

impl RangeSensor for CountingRange {
    fn measure_distance(&mut self) -> Result<f64, HalError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.finished.load(Ordering::Relaxed) {
            self.late_reads.fetch_add(1, Ordering::Relaxed);
        }
        Ok(100.0)
    }
}

#[test]
fn test_motor_failure_aborts_navigation() {
    let motors = MockDrive::new();
    let range = MockRangeSensor::new(200.0);
    let mut navigator = Navigator::new(
        range.clone(),
        MockCamera::uniform(RES, 0),
        motors.clone(),
        MockIndicator::new(),
        fast_config(),
    )
    .unwrap();

    // 前进过程中电机失效，随后出现障碍迫使决策线程下发新命令
    let failer = {
        let motors = motors.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            motors.set_should_fail(true);
            range.set_distance(10.0);
        })
    };

    let start = Instant::now();
    let err = navigator.run_navigation().unwrap_err();
    failer.join().unwrap();

    assert!(err.is_motor(), "unexpected error: {}", err);
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(!navigator.handle().is_running());
}

#[test]
fn test_motor_failure_on_first_command() {
    let motors = MockDrive::new();
    motors.set_should_fail(true);
    let mut navigator = Navigator::new(
        MockRangeSensor::new(200.0),
        MockCamera::blind(),
        motors.clone(),
        MockIndicator::new(),
        fast_config(),
    )
    .unwrap();

    assert!(matches!(
        navigator.run_navigation(),
        Err(NavigationError::Motor(_))
    ));
    assert!(motors.commands().is_empty());
}

#[test]
fn test_monitor_panic_stops_robot() {
    let motors = MockDrive::new();
    let mut navigator = Navigator::new(
        PanickingRange { remaining: 5 },
        MockCamera::uniform(RES, 0),
        motors.clone(),
        MockIndicator::new(),
        fast_config(),
    )
    .unwrap();

    let err = navigator.run_navigation().unwrap_err();
    assert!(
        matches!(err, NavigationError::MonitorPanicked("range")),
        "unexpected error: {}",
        err
    );
    assert_eq!(motors.last_command(), Some(DriveCommand::Stop));
}

#[test]
fn test_wrong_frame_size_is_fatal() {
    let motors = MockDrive::new();
    let mut navigator = Navigator::new(
        MockRangeSensor::new(200.0),
        MockCamera::uniform(Resolution::new(64, 48), 0),
        motors.clone(),
        MockIndicator::new(),
        fast_config(),
    )
    .unwrap();

    let err = navigator.run_navigation().unwrap_err();
    match err {
        NavigationError::ResolutionMismatch { expected, actual } => {
            assert_eq!(expected, RES);
            assert_eq!(actual, Resolution::new(64, 48));
        },
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(motors.last_command(), Some(DriveCommand::Stop));
}

#[test]
fn test_indicator_failure_does_not_abort() {
    let lights = MockIndicator::new();
    lights.set_should_fail(true);
    let mut navigator = Navigator::new(
        MockRangeSensor::new(10.0),
        MockCamera::uniform(RES, 0),
        MockDrive::new(),
        lights,
        fast_config(),
    )
    .unwrap();

    let outcome = navigator.run_navigation().unwrap();
    assert!(outcome.metrics.indicator_failures > 0);
}

#[test]
fn test_no_sensor_reads_after_return() {
    let reads = Arc::new(AtomicU64::new(0));
    let finished = Arc::new(AtomicBool::new(false));
    let late_reads = Arc::new(AtomicU64::new(0));

    let mut navigator = Navigator::new(
        CountingRange {
            reads: reads.clone(),
            finished: finished.clone(),
            late_reads: late_reads.clone(),
        },
        MockCamera::uniform(RES, 0),
        MockDrive::new(),
        MockIndicator::new(),
        fast_config(),
    )
    .unwrap();

    let handle = navigator.handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(40));
        handle.request_stop();
    });
    navigator.run_navigation().unwrap();
    stopper.join().unwrap();

    // 返回时所有线程已 join，此后不会再有读取
    finished.store(true, Ordering::Relaxed);
    thread::sleep(Duration::from_millis(30));
    assert!(reads.load(Ordering::Relaxed) > 0);
    assert_eq!(late_reads.load(Ordering::Relaxed), 0);
}
