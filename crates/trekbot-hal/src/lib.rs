//! # Trekbot Hardware Abstraction Layer
//!
//! 导航核心只通过这里的能力接口访问硬件：
//!
//! - [`RangeSensor`] - 超声波测距（厘米）
//! - [`Camera`] - 灰度帧采集（可能因瞬时故障返回 `None`）
//! - [`DriveMotors`] - 差速驱动（左右轮速度 / 停止）
//! - [`Indicator`] - 底灯指示（非关键，失败只记录不影响导航）
//!
//! 具体的传感器协议、PWM 编码、图像管线由平台实现，不在本层关心范围内。

use std::fmt;
use std::ops::Neg;
use thiserror::Error;

pub use trekbot_vision::{GrayFrame, Resolution};

#[cfg(feature = "mock")]
pub mod mock;

/// 硬件层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] DeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Device not ready")]
    NotReady,
}

impl HalError {
    /// 设备已丢失或无权访问（重试不会恢复）
    ///
    /// 导航核心仍按瞬时故障处理，只用它决定日志级别。
    pub fn is_fatal(&self) -> bool {
        match self {
            HalError::Device(e) => e.is_fatal(),
            HalError::Io(_) | HalError::Timeout | HalError::NotReady => false,
        }
    }
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    InvalidResponse,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            DeviceErrorKind::NoDevice | DeviceErrorKind::AccessDenied | DeviceErrorKind::NotFound
        )
    }
}

impl From<String> for DeviceError {
    fn from(message: String) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for DeviceError {
    fn from(message: &str) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

/// 轮速（百分比，-100..=100，负值为后退）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WheelSpeed(i8);

impl WheelSpeed {
    pub const ZERO: WheelSpeed = WheelSpeed(0);
    pub const MAX: WheelSpeed = WheelSpeed(100);

    /// 创建轮速，超出范围的值被钳位到 -100..=100
    pub fn new(percent: i32) -> Self {
        Self(percent.clamp(-100, 100) as i8)
    }

    pub fn percent(self) -> i8 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// 速度减半（向零取整）
    pub fn half(self) -> Self {
        Self(self.0 / 2)
    }
}

impl Neg for WheelSpeed {
    type Output = WheelSpeed;

    fn neg(self) -> Self::Output {
        WheelSpeed(-self.0)
    }
}

impl fmt::Display for WheelSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// 指示灯颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndicatorColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl IndicatorColor {
    /// 前进
    pub const GREEN: IndicatorColor = IndicatorColor::rgb(0, 255, 0);
    /// 发现障碍
    pub const RED: IndicatorColor = IndicatorColor::rgb(255, 0, 0);
    /// 卡住
    pub const AMBER: IndicatorColor = IndicatorColor::rgb(255, 165, 0);
    /// 转向
    pub const BLUE: IndicatorColor = IndicatorColor::rgb(0, 0, 255);
    /// 倒车回溯
    pub const YELLOW: IndicatorColor = IndicatorColor::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// 超声波测距
pub trait RangeSensor {
    /// 读取距离（厘米）；可能短暂阻塞，可能有噪声
    fn measure_distance(&mut self) -> Result<f64, HalError>;
}

/// 灰度相机
///
/// 障碍监控和卡住监控两个线程会同时采集，因此以 `&self` 调用，
/// 实现需要自行处理内部同步（通常还要求 `Sync`）。
pub trait Camera {
    /// 按指定分辨率采集一帧；瞬时采集失败返回 `Ok(None)`
    fn capture_grayscale(&self, resolution: Resolution) -> Result<Option<GrayFrame>, HalError>;
}

/// 差速驱动电机
pub trait DriveMotors {
    /// 以给定左右轮速持续运动，直到下一次命令
    fn drive(&mut self, left: WheelSpeed, right: WheelSpeed) -> Result<(), HalError>;

    /// 停止
    fn stop(&mut self) -> Result<(), HalError>;
}

/// 状态指示灯（非关键）
pub trait Indicator {
    fn set_color(&mut self, color: IndicatorColor) -> Result<(), HalError>;

    fn clear(&mut self) -> Result<(), HalError>;
}

impl<T: RangeSensor + ?Sized> RangeSensor for &mut T {
    fn measure_distance(&mut self) -> Result<f64, HalError> {
        (**self).measure_distance()
    }
}

impl<T: Camera + ?Sized> Camera for &T {
    fn capture_grayscale(&self, resolution: Resolution) -> Result<Option<GrayFrame>, HalError> {
        (**self).capture_grayscale(resolution)
    }
}

impl<T: DriveMotors + ?Sized> DriveMotors for &mut T {
    fn drive(&mut self, left: WheelSpeed, right: WheelSpeed) -> Result<(), HalError> {
        (**self).drive(left, right)
    }

    fn stop(&mut self) -> Result<(), HalError> {
        (**self).stop()
    }
}

impl<T: Indicator + ?Sized> Indicator for &mut T {
    fn set_color(&mut self, color: IndicatorColor) -> Result<(), HalError> {
        (**self).set_color(color)
    }

    fn clear(&mut self) -> Result<(), HalError> {
        (**self).clear()
    }
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn measure_distance(&mut self) -> Result<f64, HalError> {
        (**self).measure_distance()
    }
}

impl<T: Camera + ?Sized> Camera for Box<T> {
    fn capture_grayscale(&self, resolution: Resolution) -> Result<Option<GrayFrame>, HalError> {
        (**self).capture_grayscale(resolution)
    }
}

impl<T: DriveMotors + ?Sized> DriveMotors for Box<T> {
    fn drive(&mut self, left: WheelSpeed, right: WheelSpeed) -> Result<(), HalError> {
        (**self).drive(left, right)
    }

    fn stop(&mut self) -> Result<(), HalError> {
        (**self).stop()
    }
}

impl<T: Indicator + ?Sized> Indicator for Box<T> {
    fn set_color(&mut self, color: IndicatorColor) -> Result<(), HalError> {
        (**self).set_color(color)
    }

    fn clear(&mut self) -> Result<(), HalError> {
        (**self).clear()
    }
}
