//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use trekbot_sdk::prelude::*;
//! ```

pub use crate::driver::{
    NavState, NavigationConfig, NavigationHandle, NavigationOutcome, Navigator, NavigatorBuilder,
    StopReason,
};
pub use crate::hal::{Camera, DriveMotors, Indicator, IndicatorColor, RangeSensor, WheelSpeed};
pub use crate::vision::{GrayFrame, Resolution};

// 错误类型
pub use crate::driver::NavigationError;
pub use crate::hal::HalError;
pub use crate::vision::VisionError;
