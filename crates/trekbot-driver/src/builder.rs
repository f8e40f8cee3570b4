//! Builder 模式实现
//!
//! 提供链式构造 [`Navigator`] 的便捷方式。

use crate::config::NavigationConfig;
use crate::error::NavigationError;
use crate::hooks::{FrameCallback, HookManager};
use crate::navigator::Navigator;
use std::sync::Arc;
use trekbot_hal::{Camera, DriveMotors, Indicator, RangeSensor};

/// Navigator Builder（链式构造）
///
/// # Example
///
/// ```rust
/// use trekbot_driver::{NavigationConfig, NavigatorBuilder};
/// use trekbot_driver::recording::AsyncFrameRecorder;
/// use std::sync::Arc;
/// # use trekbot_hal::mock::{MockCamera, MockDrive, MockIndicator, MockRangeSensor};
///
/// let (recorder, _frames) = AsyncFrameRecorder::new();
/// let navigator = NavigatorBuilder::new()
///     .config(NavigationConfig::default())
///     .frame_callback(Arc::new(recorder))
///     .build(
///         MockRangeSensor::new(100.0),
///         MockCamera::blind(),
///         MockDrive::new(),
///         MockIndicator::new(),
///     )
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct NavigatorBuilder {
    config: Option<NavigationConfig>,
    hooks: HookManager,
}

impl NavigatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置导航配置（可选，默认 [`NavigationConfig::default`]）
    pub fn config(mut self, config: NavigationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 注册帧回调（可多次调用）
    pub fn frame_callback(mut self, callback: Arc<dyn FrameCallback>) -> Self {
        self.hooks.add_callback(callback);
        self
    }

    /// 校验配置并构建导航器
    pub fn build<R, C, D, I>(
        self,
        range: R,
        camera: C,
        drive: D,
        indicator: I,
    ) -> Result<Navigator<R, C, D, I>, NavigationError>
    where
        R: RangeSensor + Send,
        C: Camera + Sync,
        D: DriveMotors + Send,
        I: Indicator + Send,
    {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(Navigator::from_parts(
            range, camera, drive, indicator, config, self.hooks,
        ))
    }
}
