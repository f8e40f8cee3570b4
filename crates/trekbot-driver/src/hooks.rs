//! 帧钩子（Hook System）
//!
//! 相机监控和卡住监控每采集到一帧都会触发已注册的回调，用于录制或在线调试。
//!
//! 回调在监控线程中同步执行，必须非阻塞；需要落盘的场景使用
//! [`AsyncFrameRecorder`](crate::recording::AsyncFrameRecorder) 转交给后台线程。
//!
//! # 使用示例
//!
//! ```rust
//! use trekbot_driver::hooks::{FrameCallback, FrameSource, HookManager};
//! use trekbot_driver::recording::AsyncFrameRecorder;
//! use trekbot_vision::GrayFrame;
//! use std::sync::Arc;
//!
//! let mut hooks = HookManager::new();
//! let (recorder, _rx) = AsyncFrameRecorder::new();
//! hooks.add_callback(Arc::new(recorder));
//!
//! hooks.trigger_all(FrameSource::ObstacleCamera, &GrayFrame::uniform(4, 4, 0));
//! ```

use std::fmt;
use std::sync::Arc;
use trekbot_vision::GrayFrame;

/// 帧来自哪个监控
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSource {
    /// 相机障碍监控
    ObstacleCamera,
    /// 卡住监控
    StuckMonitor,
}

impl fmt::Display for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObstacleCamera => f.write_str("obstacle"),
            Self::StuckMonitor => f.write_str("stuck"),
        }
    }
}

/// 帧回调
///
/// 禁止阻塞操作（I/O、长时间持锁），推荐 `try_send` 到 Channel。
pub trait FrameCallback: Send + Sync {
    fn on_frame(&self, source: FrameSource, frame: &GrayFrame);
}

/// 钩子管理器
///
/// 在导航开始前配置，运行期间只读，因此可以直接在多个监控线程间共享。
#[derive(Default)]
pub struct HookManager {
    callbacks: Vec<Arc<dyn FrameCallback>>,
}

impl HookManager {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    pub fn add_callback(&mut self, callback: Arc<dyn FrameCallback>) {
        self.callbacks.push(callback);
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    /// 触发所有回调
    pub fn trigger_all(&self, source: FrameSource, frame: &GrayFrame) {
        for callback in self.callbacks.iter() {
            callback.on_frame(source, frame);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for HookManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookManager")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
