//! # Trekbot Vision
//!
//! 灰度帧与轻量感知算法，不依赖任何硬件或线程：
//!
//! - `frame` - 灰度帧值类型与采集分辨率
//! - `primitives` - 梯度幅值、帧差（纯函数）
//! - `obstacle` - 边缘密度障碍检测（存在与否 + 左/中/右）
//! - `stuck` - 帧差卡住检测
//! - `pgm` - P5 编解码（录制与离线分析）
//!
//! ## 使用示例
//!
//! ```rust
//! use trekbot_vision::{GrayFrame, ObstacleDetector};
//!
//! let detector = ObstacleDetector::default();
//! let frame = GrayFrame::uniform(480, 480, 128);
//! let result = detector.detect(&frame).unwrap();
//! assert!(!result.present);
//! ```

mod error;
pub mod frame;
pub mod obstacle;
pub mod pgm;
pub mod primitives;
pub mod stuck;

pub use error::VisionError;
pub use frame::{GrayFrame, Resolution};
pub use obstacle::{
    DIRECTION_AHEAD, DIRECTION_LEFT, DIRECTION_RIGHT, DetectorConfig, EdgeHistogram,
    ObstacleDetection, ObstacleDetector,
};
pub use primitives::{edge_magnitude, frame_difference};
pub use stuck::{StuckConfig, StuckDetector, StuckVerdict};
