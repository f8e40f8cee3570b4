//! # Trekbot Driver
//!
//! 自主避障导航核心：
//!
//! - 三个传感器监控线程（超声波、相机障碍、卡住）只向无锁感知快照写入证据
//! - 决策线程运行导航状态机，独占驱动电机和指示灯
//! - [`Navigator::run_navigation`] 在作用域线程中运行全部工作线程，返回前全部 join
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use trekbot_driver::{NavigationConfig, Navigator};
//! # use trekbot_hal::mock::{MockCamera, MockDrive, MockIndicator, MockRangeSensor};
//! # use trekbot_hal::Resolution;
//!
//! let mut navigator = Navigator::new(
//!     MockRangeSensor::new(100.0),
//!     MockCamera::uniform(Resolution::SQUARE_480, 128),
//!     MockDrive::new(),
//!     MockIndicator::new(),
//!     NavigationConfig::default(),
//! )?;
//!
//! let handle = navigator.handle();
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(10));
//!     handle.request_stop();
//! });
//!
//! let outcome = navigator.run_navigation()?;
//! println!("stopped: {}", outcome.reason);
//! # Ok::<(), trekbot_driver::NavigationError>(())
//! ```

mod builder;
pub mod config;
pub mod control;
mod error;
pub mod hooks;
pub mod machine;
pub mod metrics;
pub mod monitors;
pub mod motion;
mod navigator;
pub mod recording;
pub mod shared;
pub mod snapshot;
pub mod state;

pub use builder::NavigatorBuilder;
pub use config::{
    CameraConfig, ConfigError, MotionConfig, NavigationConfig, RangeConfig, RecoveryConfig,
    StuckMonitorConfig,
};
pub use control::RunControl;
pub use error::NavigationError;
pub use hooks::{FrameCallback, FrameSource, HookManager};
pub use machine::{NavigationContext, PendingTurn, StateMachine, TurnKind};
pub use metrics::{MetricsSnapshot, NavigationMetrics};
pub use motion::Motion;
pub use navigator::{NavigationHandle, NavigationOutcome, Navigator};
pub use recording::{AsyncFrameRecorder, RecordedFrame};
pub use shared::NavigationShared;
pub use snapshot::{PerceptionSnapshot, PerceptionView};
pub use state::{AtomicNavState, NavState, StopReason};
