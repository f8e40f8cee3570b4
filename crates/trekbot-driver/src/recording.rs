//! 异步帧录制（Async Frame Recorder）
//!
//! 回调只把帧 `try_send` 进有界 Channel，落盘由接收端所在的后台线程完成。
//! 队列满时丢帧并计数，绝不阻塞监控线程。
//!
//! 480x480 灰度帧约 225 KB，默认容量 64 帧（约 14 MB）。

use crate::hooks::{FrameCallback, FrameSource};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use trekbot_vision::GrayFrame;

/// 默认队列容量（帧）
pub const DEFAULT_CAPACITY: usize = 64;

/// 录制的帧
#[derive(Debug, Clone)]
pub struct RecordedFrame {
    /// 从录制器创建开始的序号（含被丢弃的帧）
    pub sequence: u64,
    pub source: FrameSource,
    /// 相对录制器创建时刻的时间（毫秒）
    pub elapsed_ms: u64,
    pub frame: GrayFrame,
}

/// 异步帧录制钩子
pub struct AsyncFrameRecorder {
    tx: Sender<RecordedFrame>,
    started: Instant,
    sequence: AtomicU64,
    dropped_frames: Arc<AtomicU64>,
    frame_counter: Arc<AtomicU64>,
}

impl AsyncFrameRecorder {
    /// 默认容量
    #[must_use]
    pub fn new() -> (Self, Receiver<RecordedFrame>) {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, Receiver<RecordedFrame>) {
        let (tx, rx) = bounded(capacity);
        let recorder = Self {
            tx,
            started: Instant::now(),
            sequence: AtomicU64::new(0),
            dropped_frames: Arc::new(AtomicU64::new(0)),
            frame_counter: Arc::new(AtomicU64::new(0)),
        };
        (recorder, rx)
    }

    /// 丢帧计数器（队列满或接收端已关闭）
    #[must_use]
    pub fn dropped_frames(&self) -> &Arc<AtomicU64> {
        &self.dropped_frames
    }

    /// 成功入队的帧计数器
    #[must_use]
    pub fn frame_counter(&self) -> &Arc<AtomicU64> {
        &self.frame_counter
    }
}

impl FrameCallback for AsyncFrameRecorder {
    fn on_frame(&self, source: FrameSource, frame: &GrayFrame) {
        let record = RecordedFrame {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            source,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            frame: frame.clone(),
        };

        match self.tx.try_send(record) {
            Ok(()) => {
                self.frame_counter.fetch_add(1, Ordering::Relaxed);
            },
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_forwards_frames() {
        let (recorder, rx) = AsyncFrameRecorder::new();
        let frame = GrayFrame::uniform(4, 4, 9);

        recorder.on_frame(FrameSource::ObstacleCamera, &frame);
        recorder.on_frame(FrameSource::StuckMonitor, &frame);

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(first.source, FrameSource::ObstacleCamera);
        assert_eq!(second.sequence, 1);
        assert_eq!(second.frame, frame);
        assert_eq!(recorder.frame_counter().load(Ordering::Relaxed), 2);
        assert_eq!(recorder.dropped_frames().load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_recorder_drops_when_full() {
        let (recorder, rx) = AsyncFrameRecorder::with_capacity(2);
        let frame = GrayFrame::uniform(2, 2, 0);

        for _ in 0..5 {
            recorder.on_frame(FrameSource::ObstacleCamera, &frame);
        }
        assert_eq!(recorder.frame_counter().load(Ordering::Relaxed), 2);
        assert_eq!(recorder.dropped_frames().load(Ordering::Relaxed), 3);
        assert_eq!(rx.len(), 2);
    }

    #[test]
    fn test_recorder_counts_disconnected_as_dropped() {
        let (recorder, rx) = AsyncFrameRecorder::new();
        drop(rx);
        recorder.on_frame(FrameSource::StuckMonitor, &GrayFrame::uniform(2, 2, 0));
        assert_eq!(recorder.dropped_frames().load(Ordering::Relaxed), 1);
    }
}
