//! 灰度帧类型
//!
//! `GrayFrame` 是一次相机采集的不可变结果：宽、高和逐像素的 8 位亮度。
//! 所有权从采集端移交给分析端，分析完成后即被丢弃。

use crate::error::VisionError;
use std::fmt;

/// 采集分辨率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    /// 宽度（像素）
    pub width: usize,
    /// 高度（像素）
    pub height: usize,
}

impl Resolution {
    /// 480x480 方形（机载相机默认分辨率）
    pub const SQUARE_480: Resolution = Resolution::new(480, 480);

    /// 240x240 方形（低成本预览）
    pub const SQUARE_240: Resolution = Resolution::new(240, 240);

    /// 640x480（4:3）
    pub const VGA: Resolution = Resolution::new(640, 480);

    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// 像素总数
    pub const fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::SQUARE_480
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// 灰度帧（行优先存储）
#[derive(Clone, PartialEq, Eq)]
pub struct GrayFrame {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl GrayFrame {
    /// 从像素缓冲创建帧
    ///
    /// # 错误
    /// - `VisionError::FrameSizeMismatch`: `pixels.len() != width * height`，或乘积溢出
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, VisionError> {
        let expected = width.checked_mul(height).unwrap_or(usize::MAX);
        if pixels.len() != expected {
            return Err(VisionError::FrameSizeMismatch {
                width,
                height,
                expected,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// 全帧同一亮度
    pub fn uniform(width: usize, height: usize, intensity: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![intensity; width * height],
        }
    }

    /// 逐像素生成，`f(x, y)` 返回该点亮度
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// 行优先像素缓冲
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// 取出像素缓冲（消费帧）
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// 读取 (x, y) 处亮度
    ///
    /// 调用方负责保证坐标在范围内；越界会 panic（与切片索引一致）。
    #[inline]
    pub fn intensity(&self, x: usize, y: usize) -> u8 {
        debug_assert!(x < self.width && y < self.height);
        self.pixels[y * self.width + x]
    }

    /// 读取 (x, y) 处亮度，越界返回 `None`
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// 返回整体亮度平移 `delta` 后的新帧（饱和到 0..=255）
    pub fn shifted(&self, delta: i16) -> Self {
        let pixels = self
            .pixels
            .iter()
            .map(|&p| (p as i16 + delta).clamp(0, 255) as u8)
            .collect();
        Self {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

impl fmt::Debug for GrayFrame {
    // 像素缓冲动辄几十万字节，不打印
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrayFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
