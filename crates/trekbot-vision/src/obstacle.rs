//! 障碍物检测器
//!
//! 基于边缘密度的单帧障碍判定：
//!
//! 1. 画面按宽度三等分为 左 / 中 / 右 三个区域
//! 2. 只扫描画面下半部分（离车体更近，对当前路径更有意义）
//! 3. 每个像素计算简化梯度幅值，超过 `edge_threshold` 计入所在区域
//! 4. 边缘密度 = 边缘像素数 / 扫描像素数；超过 `density_threshold` 判定有障碍
//! 5. 方向：左边缘多 → -1.0，右边缘多 → +1.0，相等 → 0.0（正前方/不确定）
//!
//! 边缘密度近似"附近有纹理/杂物"，左右偏斜近似"哪一侧被挡住"，
//! 成本低到可以在每个采样周期运行，不需要深度传感器。

use crate::error::VisionError;
use crate::frame::GrayFrame;
use crate::primitives::edge_magnitude;
use tracing::trace;

/// 障碍在左侧
pub const DIRECTION_LEFT: f64 = -1.0;
/// 正前方或无法判定
pub const DIRECTION_AHEAD: f64 = 0.0;
/// 障碍在右侧
pub const DIRECTION_RIGHT: f64 = 1.0;

/// 检测器最小帧宽（三等分后每个区域至少 1 列）
pub const MIN_FRAME_WIDTH: usize = 3;
/// 检测器最小帧高（下半部分至少 1 行可计算纵向梯度）
pub const MIN_FRAME_HEIGHT: usize = 3;

/// 障碍检测配置
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    /// 梯度幅值阈值（0..=510，默认 50）
    pub edge_threshold: u16,
    /// 边缘密度阈值（(0, 1]，默认 0.05）
    pub density_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            edge_threshold: 50,
            density_threshold: 0.05,
        }
    }
}

impl DetectorConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<(), VisionError> {
        if !(self.density_threshold > 0.0 && self.density_threshold <= 1.0) {
            return Err(VisionError::InvalidConfig(format!(
                "density_threshold must be in (0, 1], got {}",
                self.density_threshold
            )));
        }
        if self.edge_threshold > 510 {
            return Err(VisionError::InvalidConfig(format!(
                "edge_threshold must be <= 510, got {}",
                self.edge_threshold
            )));
        }
        Ok(())
    }
}

/// 区域边缘直方图（单次检测的临时结果，不跨调用保存）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeHistogram {
    pub left: u32,
    pub center: u32,
    pub right: u32,
    /// 参与扫描的像素数
    pub scanned: u32,
}

impl EdgeHistogram {
    pub fn total(&self) -> u32 {
        self.left + self.center + self.right
    }

    /// 边缘密度；未扫描任何像素时为 0
    pub fn density(&self) -> f64 {
        if self.scanned == 0 {
            return 0.0;
        }
        self.total() as f64 / self.scanned as f64
    }

    /// 左右偏斜 → 方向
    pub fn skew_direction(&self) -> f64 {
        match self.left.cmp(&self.right) {
            std::cmp::Ordering::Greater => DIRECTION_LEFT,
            std::cmp::Ordering::Less => DIRECTION_RIGHT,
            std::cmp::Ordering::Equal => DIRECTION_AHEAD,
        }
    }
}

/// 单帧检测结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleDetection {
    /// 是否存在障碍
    pub present: bool,
    /// 障碍方向 ∈ {-1.0, 0.0, 1.0}；仅当 `present` 时有意义
    pub direction: f64,
    /// 本帧边缘密度
    pub density: f64,
    /// 区域统计
    pub histogram: EdgeHistogram,
}

impl ObstacleDetection {
    pub fn clear(histogram: EdgeHistogram) -> Self {
        Self {
            present: false,
            direction: DIRECTION_AHEAD,
            density: histogram.density(),
            histogram,
        }
    }
}

/// 边缘密度障碍检测器
#[derive(Debug, Clone, Default)]
pub struct ObstacleDetector {
    config: DetectorConfig,
}

impl ObstacleDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// 统计下半帧的区域边缘数
    ///
    /// # 错误
    /// - `VisionError::FrameTooSmall`: 宽 < 3 或 高 < 3
    pub fn histogram(&self, frame: &GrayFrame) -> Result<EdgeHistogram, VisionError> {
        let (width, height) = (frame.width(), frame.height());
        if width < MIN_FRAME_WIDTH || height < MIN_FRAME_HEIGHT {
            return Err(VisionError::FrameTooSmall {
                width,
                height,
                min_width: MIN_FRAME_WIDTH,
                min_height: MIN_FRAME_HEIGHT,
            });
        }

        let region_width = width / 3;
        let mut counts = [0u32; 3];
        let mut scanned = 0u32;

        // 最后一行/列没有右邻、下邻，不参与
        for y in height / 2..height - 1 {
            for x in 0..width - 1 {
                scanned += 1;
                if edge_magnitude(frame, x, y) > self.config.edge_threshold {
                    counts[(x / region_width).min(2)] += 1;
                }
            }
        }

        Ok(EdgeHistogram {
            left: counts[0],
            center: counts[1],
            right: counts[2],
            scanned,
        })
    }

    /// 检测单帧
    pub fn detect(&self, frame: &GrayFrame) -> Result<ObstacleDetection, VisionError> {
        let histogram = self.histogram(frame)?;
        let density = histogram.density();

        trace!(
            "Edge counts - left: {}, center: {}, right: {}, density: {:.4}",
            histogram.left, histogram.center, histogram.right, density
        );

        if density > self.config.density_threshold {
            Ok(ObstacleDetection {
                present: true,
                direction: histogram.skew_direction(),
                density,
                histogram,
            })
        } else {
            Ok(ObstacleDetection::clear(histogram))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 指定列范围内画高对比度竖条纹，其余为纯色背景
    fn striped(width: usize, height: usize, columns: std::ops::Range<usize>) -> GrayFrame {
        GrayFrame::from_fn(width, height, |x, _| {
            if columns.contains(&x) && x % 2 == 0 {
                255
            } else {
                0
            }
        })
    }

    #[test]
    fn test_uniform_frame_has_no_obstacle() {
        let detector = ObstacleDetector::default();
        for level in [0u8, 77, 255] {
            let result = detector.detect(&GrayFrame::uniform(90, 60, level)).unwrap();
            assert!(!result.present);
            assert_eq!(result.histogram.total(), 0);
            assert_eq!(result.density, 0.0);
        }
    }

    #[test]
    fn test_left_strip_points_left() {
        let detector = ObstacleDetector::default();
        let result = detector.detect(&striped(90, 60, 0..30)).unwrap();
        assert!(result.present);
        assert_eq!(result.direction, DIRECTION_LEFT);
        assert_eq!(result.histogram.right, 0);
    }

    #[test]
    fn test_right_strip_points_right() {
        let detector = ObstacleDetector::default();
        let result = detector.detect(&striped(90, 60, 61..90)).unwrap();
        assert!(result.present);
        assert_eq!(result.direction, DIRECTION_RIGHT);
    }

    #[test]
    fn test_center_strip_is_ahead() {
        let detector = ObstacleDetector::default();
        let result = detector.detect(&striped(90, 60, 31..59)).unwrap();
        assert!(result.present);
        assert_eq!(result.histogram.left, 0);
        assert_eq!(result.histogram.right, 0);
        assert_eq!(result.direction, DIRECTION_AHEAD);
    }

    #[test]
    fn test_upper_half_is_ignored() {
        let detector = ObstacleDetector::default();
        let frame = GrayFrame::from_fn(90, 60, |x, y| if y < 29 && x % 2 == 0 { 255 } else { 0 });
        assert!(!detector.detect(&frame).unwrap().present);
    }

    #[test]
    fn test_sparse_edges_below_density_threshold() {
        let detector = ObstacleDetector::default();
        // 单列亮线两侧各一个边缘：2 / 89 ≈ 0.022 < 0.05
        let frame = GrayFrame::from_fn(90, 60, |x, _| if x == 10 { 255 } else { 0 });
        let result = detector.detect(&frame).unwrap();
        assert!(result.histogram.total() > 0);
        assert!(!result.present);
    }

    #[test]
    fn test_edge_threshold_is_strict() {
        // 每列交替 0/25：横向差 25 + 纵向 0 = 25，不超过 25
        let detector = ObstacleDetector::new(DetectorConfig {
            edge_threshold: 25,
            ..Default::default()
        });
        let frame = GrayFrame::from_fn(30, 30, |x, _| if x % 2 == 0 { 25 } else { 0 });
        assert_eq!(detector.histogram(&frame).unwrap().total(), 0);
    }

    #[test]
    fn test_scanned_pixel_count() {
        let detector = ObstacleDetector::default();
        let histogram = detector.histogram(&GrayFrame::uniform(10, 8, 0)).unwrap();
        // y ∈ [4, 7), x ∈ [0, 9)
        assert_eq!(histogram.scanned, 3 * 9);
    }

    #[test]
    fn test_too_small_frame_is_error() {
        let detector = ObstacleDetector::default();
        let err = detector.detect(&GrayFrame::uniform(2, 10, 0)).unwrap_err();
        assert!(matches!(err, VisionError::FrameTooSmall { width: 2, .. }));
        let err = detector.detect(&GrayFrame::uniform(10, 2, 0)).unwrap_err();
        assert!(matches!(err, VisionError::FrameTooSmall { height: 2, .. }));
    }

    #[test]
    fn test_config_validation() {
        assert!(DetectorConfig::default().validate().is_ok());
        let bad = DetectorConfig {
            density_threshold: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = DetectorConfig {
            density_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = DetectorConfig {
            edge_threshold: 600,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
