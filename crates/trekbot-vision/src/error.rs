//! 视觉层错误类型定义

use thiserror::Error;

/// 视觉层错误类型
///
/// 这里的错误都代表"平台契约被破坏"（例如相机返回了尺寸不符的像素缓冲），
/// 而不是环境因素。上层应将其视为致命错误。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisionError {
    /// 像素缓冲长度与宽高不一致
    #[error("Frame buffer size mismatch: {width}x{height} needs {expected} bytes, got {len}")]
    FrameSizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        len: usize,
    },

    /// 帧尺寸低于算法最低要求
    #[error("Frame too small: {width}x{height} (minimum {min_width}x{min_height})")]
    FrameTooSmall {
        width: usize,
        height: usize,
        min_width: usize,
        min_height: usize,
    },

    /// 两帧没有可比较的重叠区域
    #[error("Frame comparison has no overlapping samples")]
    EmptyComparison,

    /// 无效配置
    #[error("Invalid vision config: {0}")]
    InvalidConfig(String),

    /// PGM 编解码错误
    #[error("Invalid PGM data: {0}")]
    InvalidPgm(String),
}
