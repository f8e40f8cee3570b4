//! 二进制 PGM（P5）编解码
//!
//! 用于保存录制的帧、离线分析。只支持 8 位灰度（maxval ≤ 255）。

use crate::error::VisionError;
use crate::frame::GrayFrame;

/// 编码为 P5 格式
pub fn encode(frame: &GrayFrame) -> Vec<u8> {
    let header = format!("P5\n{} {}\n255\n", frame.width(), frame.height());
    let mut out = Vec::with_capacity(header.len() + frame.pixels().len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(frame.pixels());
    out
}

/// 从 P5 字节流解码
pub fn decode(bytes: &[u8]) -> Result<GrayFrame, VisionError> {
    let mut cursor = HeaderCursor { bytes, pos: 0 };

    let magic = cursor.token()?;
    if magic != b"P5" {
        return Err(VisionError::InvalidPgm(format!(
            "unsupported magic {:?}",
            String::from_utf8_lossy(magic)
        )));
    }

    let width = cursor.number("width")?;
    let height = cursor.number("height")?;
    let maxval = cursor.number("maxval")?;
    if maxval == 0 || maxval > 255 {
        return Err(VisionError::InvalidPgm(format!(
            "maxval {} not supported (8-bit only)",
            maxval
        )));
    }

    // 头部与像素之间恰好一个空白字符
    cursor.pos += 1;
    let expected = width.checked_mul(height).ok_or_else(|| {
        VisionError::InvalidPgm(format!("frame size {}x{} overflows", width, height))
    })?;
    let data = bytes.get(cursor.pos..).unwrap_or_default();
    if data.len() < expected {
        return Err(VisionError::InvalidPgm(format!(
            "truncated pixel data: expected {} bytes, got {}",
            expected,
            data.len()
        )));
    }

    GrayFrame::new(width, height, data[..expected].to_vec())
}

struct HeaderCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HeaderCursor<'a> {
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'#' {
                while let Some(&c) = self.bytes.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn token(&mut self) -> Result<&'a [u8], VisionError> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(VisionError::InvalidPgm("unexpected end of header".to_string()));
        }
        Ok(&self.bytes[start..self.pos])
    }

    fn number(&mut self, field: &str) -> Result<usize, VisionError> {
        let token = self.token()?;
        std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| VisionError::InvalidPgm(format!("invalid {} in header", field)))
    }
}
