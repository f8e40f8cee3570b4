//! 卡住检测器
//!
//! 机器人被命令前进时，前后两次采样的画面几乎不变 → 很可能没有真实位移。
//! 检测器保存上一帧作为参考，每来一帧与参考比较后替换参考。

use crate::error::VisionError;
use crate::frame::GrayFrame;
use crate::primitives::frame_difference;

/// 卡住检测配置
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StuckConfig {
    /// 平均亮度差阈值，低于此值判定为卡住（默认 5.0）
    pub difference_threshold: f64,
    /// 降采样步长（默认每 10 个像素取 1 个）
    pub sample_step: usize,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            difference_threshold: 5.0,
            sample_step: 10,
        }
    }
}

impl StuckConfig {
    pub fn validate(&self) -> Result<(), VisionError> {
        if !(self.difference_threshold >= 0.0 && self.difference_threshold.is_finite()) {
            return Err(VisionError::InvalidConfig(format!(
                "difference_threshold must be a finite value >= 0, got {}",
                self.difference_threshold
            )));
        }
        if self.sample_step == 0 {
            return Err(VisionError::InvalidConfig(
                "sample_step must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 单次观测结论
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StuckVerdict {
    /// 还没有参考帧，本次只记录
    Warmup,
    /// 画面有变化
    Moving { difference: f64 },
    /// 画面几乎不变
    Stuck { difference: f64 },
}

impl StuckVerdict {
    pub fn is_stuck(&self) -> bool {
        matches!(self, StuckVerdict::Stuck { .. })
    }

    pub fn difference(&self) -> Option<f64> {
        match *self {
            StuckVerdict::Warmup => None,
            StuckVerdict::Moving { difference } | StuckVerdict::Stuck { difference } => {
                Some(difference)
            },
        }
    }
}

/// 帧差卡住检测器
#[derive(Debug, Default)]
pub struct StuckDetector {
    config: StuckConfig,
    reference: Option<GrayFrame>,
}

impl StuckDetector {
    pub fn new(config: StuckConfig) -> Self {
        Self {
            config,
            reference: None,
        }
    }

    pub fn config(&self) -> &StuckConfig {
        &self.config
    }

    /// 是否持有参考帧
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// 丢弃参考帧（非前进状态下调用，卡住检测没有意义）
    pub fn reset(&mut self) {
        self.reference = None;
    }

    /// 两帧直接比较
    pub fn compare(&self, previous: &GrayFrame, current: &GrayFrame) -> Result<StuckVerdict, VisionError> {
        let difference = frame_difference(previous, current, self.config.sample_step)?;
        if difference < self.config.difference_threshold {
            Ok(StuckVerdict::Stuck { difference })
        } else {
            Ok(StuckVerdict::Moving { difference })
        }
    }

    /// 观测一帧：与参考帧比较，然后以当前帧替换参考帧
    pub fn observe(&mut self, frame: GrayFrame) -> Result<StuckVerdict, VisionError> {
        let verdict = match self.reference.as_ref() {
            Some(previous) => self.compare(previous, &frame)?,
            None => StuckVerdict::Warmup,
        };
        self.reference = Some(frame);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured(seed: usize) -> GrayFrame {
        GrayFrame::from_fn(100, 100, |x, y| ((x * 31 + y * 17 + seed * 53) % 256) as u8)
    }

    #[test]
    fn test_first_observation_is_warmup() {
        let mut detector = StuckDetector::default();
        assert_eq!(detector.observe(textured(0)).unwrap(), StuckVerdict::Warmup);
        assert!(detector.has_reference());
    }

    #[test]
    fn test_static_scene_is_stuck() {
        let mut detector = StuckDetector::default();
        detector.observe(textured(0)).unwrap();
        let verdict = detector.observe(textured(0)).unwrap();
        assert!(verdict.is_stuck());
        assert_eq!(verdict.difference(), Some(0.0));
    }

    #[test]
    fn test_changing_scene_is_moving() {
        let mut detector = StuckDetector::default();
        detector.observe(GrayFrame::uniform(100, 100, 50)).unwrap();
        let verdict = detector.observe(GrayFrame::uniform(100, 100, 80)).unwrap();
        assert_eq!(verdict, StuckVerdict::Moving { difference: 30.0 });
    }

    #[test]
    fn test_threshold_is_strict_less_than() {
        let mut detector = StuckDetector::default();
        detector.observe(GrayFrame::uniform(50, 50, 100)).unwrap();
        // 差值正好 5.0 → 不算卡住
        let verdict = detector.observe(GrayFrame::uniform(50, 50, 105)).unwrap();
        assert!(!verdict.is_stuck());
        // 差值 4.0 → 卡住
        let verdict = detector.observe(GrayFrame::uniform(50, 50, 101)).unwrap();
        assert!(verdict.is_stuck());
    }

    #[test]
    fn test_reset_discards_reference() {
        let mut detector = StuckDetector::default();
        detector.observe(textured(1)).unwrap();
        detector.reset();
        assert!(!detector.has_reference());
        assert_eq!(detector.observe(textured(1)).unwrap(), StuckVerdict::Warmup);
    }

    #[test]
    fn test_config_validation() {
        assert!(StuckConfig::default().validate().is_ok());
        assert!(
            StuckConfig {
                sample_step: 0,
                ..Default::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            StuckConfig {
                difference_threshold: -1.0,
                ..Default::default()
            }
            .validate()
            .is_err()
        );
    }
}
