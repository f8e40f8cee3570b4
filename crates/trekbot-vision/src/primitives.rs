//! 感知原语
//!
//! 纯函数：梯度幅值、帧差。没有状态，没有分配，可以在任意线程调用。

use crate::error::VisionError;
use crate::frame::GrayFrame;

/// 简化梯度幅值
///
/// `|I(x,y) - I(x+1,y)| + |I(x,y) - I(x,y+1)|`，取值范围 0..=510。
///
/// 要求 `x + 1 < width` 且 `y + 1 < height`。
#[inline]
pub fn edge_magnitude(frame: &GrayFrame, x: usize, y: usize) -> u16 {
    let here = frame.intensity(x, y) as i16;
    let right = frame.intensity(x + 1, y) as i16;
    let below = frame.intensity(x, y + 1) as i16;
    (here - right).unsigned_abs() + (here - below).unsigned_abs()
}

/// 降采样平均绝对亮度差
///
/// 在两帧重叠区域内，每隔 `step` 个像素（行、列同步）取样，
/// 返回 `Σ|a - b| / 样本数`。
///
/// - 两帧相同 → 0.0
/// - 整体平移 Δ（无饱和）→ Δ
///
/// # 错误
/// - `VisionError::InvalidConfig`: `step == 0`
/// - `VisionError::EmptyComparison`: 重叠区域为空
pub fn frame_difference(a: &GrayFrame, b: &GrayFrame, step: usize) -> Result<f64, VisionError> {
    if step == 0 {
        return Err(VisionError::InvalidConfig(
            "frame difference sample step must be > 0".to_string(),
        ));
    }

    let width = a.width().min(b.width());
    let height = a.height().min(b.height());
    if width == 0 || height == 0 {
        return Err(VisionError::EmptyComparison);
    }

    let mut total: u64 = 0;
    let mut samples: u64 = 0;
    for y in (0..height).step_by(step) {
        for x in (0..width).step_by(step) {
            let pa = a.intensity(x, y) as i16;
            let pb = b.intensity(x, y) as i16;
            total += (pa - pb).unsigned_abs() as u64;
            samples += 1;
        }
    }

    Ok(total as f64 / samples as f64)
}
