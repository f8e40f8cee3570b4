//! 导航层错误类型定义

use crate::config::ConfigError;
use trekbot_hal::{HalError, Resolution};
use trekbot_vision::VisionError;
use thiserror::Error;

/// 导航层错误类型
///
/// 传感器的瞬时故障（读不到距离、采不到帧）不会变成错误，
/// 监控线程只记录并重试；这里只包含会终止本次导航的故障。
#[derive(Error, Debug)]
pub enum NavigationError {
    /// 视觉算法拒绝了输入（内部契约被破坏）
    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    /// 驱动电机命令失败（致命：无法保证机器人停下）
    #[error("Drive motor error: {0}")]
    Motor(#[source] HalError),

    /// 配置无效或无法加载
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 工作线程 panic
    #[error("{0} thread panicked")]
    MonitorPanicked(&'static str),

    /// 工作线程创建失败
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// 相机返回的帧尺寸与请求的分辨率不一致
    #[error("Camera returned {actual} frame, expected {expected}")]
    ResolutionMismatch {
        expected: Resolution,
        actual: Resolution,
    },
}

impl NavigationError {
    /// 是否来自驱动电机
    pub fn is_motor(&self) -> bool {
        matches!(self, Self::Motor(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_error_display() {
        let err = NavigationError::MonitorPanicked("range");
        assert_eq!(format!("{}", err), "range thread panicked");

        let err = NavigationError::ResolutionMismatch {
            expected: Resolution::SQUARE_480,
            actual: Resolution::new(640, 480),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("640x480") && msg.contains("480x480"), "{}", msg);

        let err = NavigationError::Motor(HalError::Timeout);
        assert!(err.is_motor());
        assert!(format!("{}", err).contains("Read timeout"));
    }

    #[test]
    fn test_vision_error_converts() {
        let err: NavigationError = VisionError::EmptyComparison.into();
        assert!(matches!(err, NavigationError::Vision(_)));
        assert!(!err.is_motor());
    }
}
