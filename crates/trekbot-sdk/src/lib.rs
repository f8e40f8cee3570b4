//! Trekbot SDK - 小型轮式机器人自主避障导航
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **视觉层** (`vision`): 灰度帧、边缘密度障碍检测、帧差卡住检测
//! - **硬件层** (`hal`): 测距、相机、驱动电机、指示灯能力接口
//! - **导航层** (`driver`): 传感器监控线程、感知快照、导航状态机
//!
//! # 快速开始
//!
//! ```rust,ignore
//! use trekbot_sdk::prelude::*;
//!
//! trekbot_sdk::logging::init_logger();
//!
//! let mut navigator = Navigator::new(range, camera, drive, indicator, NavigationConfig::default())?;
//! let outcome = navigator.run_navigation()?;
//! ```

pub mod logging;
pub mod prelude;

pub use trekbot_driver as driver;
pub use trekbot_hal as hal;
pub use trekbot_vision as vision;

// 导航层（推荐入口）
pub use trekbot_driver::{
    ConfigError, MetricsSnapshot, NavState, NavigationConfig, NavigationError, NavigationHandle,
    NavigationOutcome, Navigator, NavigatorBuilder, StopReason,
};

// 硬件层
pub use trekbot_hal::{
    Camera, DriveMotors, HalError, Indicator, IndicatorColor, RangeSensor, WheelSpeed,
};

// 视觉层
pub use trekbot_vision::{GrayFrame, ObstacleDetector, Resolution, StuckDetector, VisionError};
