//! Mock 硬件（测试与仿真用）
//!
//! 每个 Mock 都是共享状态上的可克隆句柄：一个副本交给导航核心，
//! 另一个留在测试里用来注入读数、检查电机命令记录。

use crate::{
    Camera, DeviceError, DeviceErrorKind, DriveMotors, GrayFrame, HalError, Indicator,
    IndicatorColor, RangeSensor, Resolution, WheelSpeed,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

fn mock_failure(what: &str, kind: DeviceErrorKind) -> HalError {
    HalError::Device(DeviceError::new(kind, format!("mock {} failure", what)))
}

// ==================== 测距 ====================

#[derive(Debug)]
struct RangeState {
    /// 预置读数（优先返回），`Err` 表示一次读取错误
    scripted: VecDeque<Result<f64, DeviceErrorKind>>,
    /// 预置读数耗尽后持续返回的距离
    steady: f64,
}

/// 可编排的测距传感器
#[derive(Debug, Clone)]
pub struct MockRangeSensor {
    state: Arc<Mutex<RangeState>>,
    reads: Arc<AtomicU64>,
}

impl MockRangeSensor {
    /// 持续返回 `distance_cm`
    pub fn new(distance_cm: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(RangeState {
                scripted: VecDeque::new(),
                steady: distance_cm,
            })),
            reads: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 修改持续读数
    pub fn set_distance(&self, distance_cm: f64) {
        self.state.lock().steady = distance_cm;
    }

    /// 追加一次性读数
    pub fn push_reading(&self, distance_cm: f64) {
        self.state.lock().scripted.push_back(Ok(distance_cm));
    }

    /// 追加一次读取错误
    pub fn push_error(&self) {
        self.push_device_error(DeviceErrorKind::Backend);
    }

    /// 追加一次指定类别的设备错误
    pub fn push_device_error(&self, kind: DeviceErrorKind) {
        self.state.lock().scripted.push_back(Err(kind));
    }

    /// 已读取次数
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl RangeSensor for MockRangeSensor {
    fn measure_distance(&mut self) -> Result<f64, HalError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        match state.scripted.pop_front() {
            Some(Ok(distance)) => Ok(distance),
            Some(Err(kind)) => Err(mock_failure("range sensor", kind)),
            None => Ok(state.steady),
        }
    }
}

// ==================== 相机 ====================

#[derive(Debug)]
enum CameraReply {
    Frame(GrayFrame),
    Missing,
    Error(DeviceErrorKind),
}

#[derive(Debug)]
struct CameraState {
    scripted: VecDeque<CameraReply>,
    /// 预置帧耗尽后持续返回的帧（`None` 表示持续采集失败）
    steady: Option<GrayFrame>,
}

/// 可编排的相机
///
/// 默认按请求分辨率生成纯色帧；预置帧原样返回，不检查分辨率，
/// 便于测试分辨率不匹配等平台契约错误。
#[derive(Debug, Clone)]
pub struct MockCamera {
    state: Arc<Mutex<CameraState>>,
    captures: Arc<AtomicU64>,
}

impl MockCamera {
    /// 持续返回指定帧
    pub fn new(frame: GrayFrame) -> Self {
        Self::with_steady(Some(frame))
    }

    /// 持续返回 `resolution` 尺寸的纯色帧
    pub fn uniform(resolution: Resolution, intensity: u8) -> Self {
        Self::new(GrayFrame::uniform(
            resolution.width,
            resolution.height,
            intensity,
        ))
    }

    /// 永远采集不到帧
    pub fn blind() -> Self {
        Self::with_steady(None)
    }

    fn with_steady(steady: Option<GrayFrame>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CameraState {
                scripted: VecDeque::new(),
                steady,
            })),
            captures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn set_frame(&self, frame: Option<GrayFrame>) {
        self.state.lock().steady = frame;
    }

    pub fn push_frame(&self, frame: GrayFrame) {
        self.state.lock().scripted.push_back(CameraReply::Frame(frame));
    }

    /// 追加一次"没有采集到帧"
    pub fn push_missing(&self) {
        self.state.lock().scripted.push_back(CameraReply::Missing);
    }

    /// 追加一次设备错误
    pub fn push_error(&self) {
        self.push_device_error(DeviceErrorKind::Backend);
    }

    /// 追加一次指定类别的设备错误
    pub fn push_device_error(&self, kind: DeviceErrorKind) {
        self.state.lock().scripted.push_back(CameraReply::Error(kind));
    }

    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::Relaxed)
    }
}

impl Camera for MockCamera {
    fn capture_grayscale(&self, _resolution: Resolution) -> Result<Option<GrayFrame>, HalError> {
        self.captures.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        match state.scripted.pop_front() {
            Some(CameraReply::Frame(frame)) => Ok(Some(frame)),
            Some(CameraReply::Missing) => Ok(None),
            Some(CameraReply::Error(kind)) => Err(mock_failure("camera", kind)),
            None => Ok(state.steady.clone()),
        }
    }
}

// ==================== 驱动电机 ====================

/// 电机命令记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCommand {
    Drive { left: WheelSpeed, right: WheelSpeed },
    Stop,
}

/// 带时间戳的电机命令
#[derive(Debug, Clone, Copy)]
pub struct RecordedDrive {
    pub command: DriveCommand,
    pub at: Instant,
}

/// 记录所有命令的驱动电机
#[derive(Debug, Clone, Default)]
pub struct MockDrive {
    log: Arc<Mutex<Vec<RecordedDrive>>>,
    fail: Arc<AtomicBool>,
}

impl MockDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的所有命令都返回错误
    pub fn set_should_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// 按顺序返回已记录的命令
    pub fn commands(&self) -> Vec<DriveCommand> {
        self.log.lock().iter().map(|r| r.command).collect()
    }

    /// 带时间戳的命令记录
    pub fn history(&self) -> Vec<RecordedDrive> {
        self.log.lock().clone()
    }

    pub fn last_command(&self) -> Option<DriveCommand> {
        self.log.lock().last().map(|r| r.command)
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }

    fn record(&self, command: DriveCommand) -> Result<(), HalError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(mock_failure("drive", DeviceErrorKind::Backend));
        }
        tracing::trace!("mock drive: {:?}", command);
        self.log.lock().push(RecordedDrive {
            command,
            at: Instant::now(),
        });
        Ok(())
    }
}

impl DriveMotors for MockDrive {
    fn drive(&mut self, left: WheelSpeed, right: WheelSpeed) -> Result<(), HalError> {
        self.record(DriveCommand::Drive { left, right })
    }

    fn stop(&mut self) -> Result<(), HalError> {
        self.record(DriveCommand::Stop)
    }
}

// ==================== 指示灯 ====================

/// 指示灯命令记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorCommand {
    Set(IndicatorColor),
    Clear,
}

/// 记录所有命令的指示灯，可配置为总是失败
#[derive(Debug, Clone, Default)]
pub struct MockIndicator {
    log: Arc<Mutex<Vec<IndicatorCommand>>>,
    fail: Arc<AtomicBool>,
}

impl MockIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub fn commands(&self) -> Vec<IndicatorCommand> {
        self.log.lock().clone()
    }

    fn record(&self, command: IndicatorCommand) -> Result<(), HalError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(mock_failure("indicator", DeviceErrorKind::Backend));
        }
        self.log.lock().push(command);
        Ok(())
    }
}

impl Indicator for MockIndicator {
    fn set_color(&mut self, color: IndicatorColor) -> Result<(), HalError> {
        self.record(IndicatorCommand::Set(color))
    }

    fn clear(&mut self) -> Result<(), HalError> {
        self.record(IndicatorCommand::Clear)
    }
}
