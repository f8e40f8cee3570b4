//! 感知快照
//!
//! 监控线程写、决策线程读的共享标志，全部是原子量，不加锁：
//!
//! - `obstacle_present` + `obstacle_direction`：任一障碍监控都可以报告，
//!   只有决策线程在处理后清除
//! - `stuck_suspected`：只由卡住监控设置，由卡住监控或卡住恢复清除
//!
//! 方向以 `f64` 位模式存放在 `AtomicU64` 中。写入顺序是先方向后标志（Release），
//! 读取顺序是先标志后方向（Acquire），读到"有障碍"时一定能看到对应的方向。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// 快照的一次性拷贝
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerceptionView {
    pub obstacle_present: bool,
    /// -1.0 左，0.0 正前/不确定，+1.0 右；无障碍时无意义
    pub obstacle_direction: f64,
    pub stuck_suspected: bool,
}

/// 感知快照
#[derive(Debug)]
pub struct PerceptionSnapshot {
    obstacle_present: AtomicBool,
    obstacle_direction: AtomicU64,
    stuck_suspected: AtomicBool,
}

impl Default for PerceptionSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl PerceptionSnapshot {
    /// 所有标志为 false
    pub fn new() -> Self {
        Self {
            obstacle_present: AtomicBool::new(false),
            obstacle_direction: AtomicU64::new(0.0f64.to_bits()),
            stuck_suspected: AtomicBool::new(false),
        }
    }

    /// 报告障碍（后写入者覆盖方向）
    pub fn report_obstacle(&self, direction: f64) {
        self.obstacle_direction
            .store(direction.to_bits(), Ordering::Relaxed);
        self.obstacle_present.store(true, Ordering::Release);
    }

    /// 清除障碍标志（决策线程处理完障碍后调用）
    pub fn clear_obstacle(&self) {
        self.obstacle_present.store(false, Ordering::Release);
    }

    /// 有障碍时返回方向
    pub fn obstacle(&self) -> Option<f64> {
        if self.obstacle_present.load(Ordering::Acquire) {
            Some(f64::from_bits(self.obstacle_direction.load(Ordering::Relaxed)))
        } else {
            None
        }
    }

    pub fn set_stuck(&self, suspected: bool) {
        self.stuck_suspected.store(suspected, Ordering::Release);
    }

    pub fn stuck_suspected(&self) -> bool {
        self.stuck_suspected.load(Ordering::Acquire)
    }

    pub fn view(&self) -> PerceptionView {
        let obstacle = self.obstacle();
        PerceptionView {
            obstacle_present: obstacle.is_some(),
            obstacle_direction: obstacle.unwrap_or(0.0),
            stuck_suspected: self.stuck_suspected(),
        }
    }

    /// 恢复到初始状态（新一次导航开始时）
    pub fn reset(&self) {
        self.obstacle_present.store(false, Ordering::Release);
        self.obstacle_direction
            .store(0.0f64.to_bits(), Ordering::Relaxed);
        self.stuck_suspected.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_snapshot_starts_clear() {
        let snapshot = PerceptionSnapshot::new();
        assert_eq!(snapshot.obstacle(), None);
        assert!(!snapshot.stuck_suspected());
        assert_eq!(snapshot.view(), PerceptionView::default());
    }

    #[test]
    fn test_last_writer_wins_direction() {
        let snapshot = PerceptionSnapshot::new();
        snapshot.report_obstacle(-1.0);
        snapshot.report_obstacle(0.0);
        assert_eq!(snapshot.obstacle(), Some(0.0));

        snapshot.clear_obstacle();
        assert_eq!(snapshot.obstacle(), None);
    }

    #[test]
    fn test_reset_clears_everything() {
        let snapshot = PerceptionSnapshot::new();
        snapshot.report_obstacle(1.0);
        snapshot.set_stuck(true);
        snapshot.reset();
        assert_eq!(snapshot.view(), PerceptionView::default());
    }

    #[test]
    fn test_concurrent_reporters_never_tear_direction() {
        let snapshot = Arc::new(PerceptionSnapshot::new());
        let writers: Vec<_> = [-1.0f64, 1.0]
            .into_iter()
            .map(|dir| {
                let snapshot = snapshot.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        snapshot.report_obstacle(dir);
                    }
                })
            })
            .collect();

        for _ in 0..1000 {
            if let Some(dir) = snapshot.obstacle() {
                assert!(dir == -1.0 || dir == 1.0 || dir == 0.0, "torn direction {}", dir);
            }
        }
        for w in writers {
            w.join().unwrap();
        }
    }
}
