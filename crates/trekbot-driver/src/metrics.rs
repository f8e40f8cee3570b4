//! 导航运行指标
//!
//! 原子计数器，监控线程和决策线程直接递增，任何线程都可以无锁读取快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// 导航实时指标
#[derive(Debug, Default)]
pub struct NavigationMetrics {
    /// 成功的测距次数
    pub range_samples: AtomicU64,
    /// 测距失败（含无效读数）次数
    pub range_errors: AtomicU64,
    /// 测距触发障碍次数
    pub range_triggers: AtomicU64,

    /// 采集到的帧数（障碍和卡住监控合计）
    pub frames_captured: AtomicU64,
    /// 采集返回空帧次数
    pub frames_missing: AtomicU64,
    /// 相机设备错误次数
    pub camera_errors: AtomicU64,
    /// 视觉触发障碍次数
    pub camera_triggers: AtomicU64,

    /// 完成的帧差比较次数
    pub stuck_checks: AtomicU64,
    /// 判定为卡住的次数
    pub stuck_triggers: AtomicU64,

    /// 决策周期数
    pub decision_cycles: AtomicU64,
    /// 状态切换次数
    pub state_transitions: AtomicU64,
    /// 执行的转向次数
    pub turns: AtomicU64,
    /// 回溯次数
    pub backtracks: AtomicU64,
    /// 卡住恢复次数
    pub stuck_recoveries: AtomicU64,

    /// 指示灯失败次数（不影响导航）
    pub indicator_failures: AtomicU64,
    /// 成功下发的电机命令数
    pub motor_commands: AtomicU64,
}

impl NavigationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 递增计数器
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 读取所有计数器
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            range_samples: self.range_samples.load(Ordering::Relaxed),
            range_errors: self.range_errors.load(Ordering::Relaxed),
            range_triggers: self.range_triggers.load(Ordering::Relaxed),
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_missing: self.frames_missing.load(Ordering::Relaxed),
            camera_errors: self.camera_errors.load(Ordering::Relaxed),
            camera_triggers: self.camera_triggers.load(Ordering::Relaxed),
            stuck_checks: self.stuck_checks.load(Ordering::Relaxed),
            stuck_triggers: self.stuck_triggers.load(Ordering::Relaxed),
            decision_cycles: self.decision_cycles.load(Ordering::Relaxed),
            state_transitions: self.state_transitions.load(Ordering::Relaxed),
            turns: self.turns.load(Ordering::Relaxed),
            backtracks: self.backtracks.load(Ordering::Relaxed),
            stuck_recoveries: self.stuck_recoveries.load(Ordering::Relaxed),
            indicator_failures: self.indicator_failures.load(Ordering::Relaxed),
            motor_commands: self.motor_commands.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器（每次导航开始时）
    pub fn reset(&self) {
        for counter in [
            &self.range_samples,
            &self.range_errors,
            &self.range_triggers,
            &self.frames_captured,
            &self.frames_missing,
            &self.camera_errors,
            &self.camera_triggers,
            &self.stuck_checks,
            &self.stuck_triggers,
            &self.decision_cycles,
            &self.state_transitions,
            &self.turns,
            &self.backtracks,
            &self.stuck_recoveries,
            &self.indicator_failures,
            &self.motor_commands,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub range_samples: u64,
    pub range_errors: u64,
    pub range_triggers: u64,
    pub frames_captured: u64,
    pub frames_missing: u64,
    pub camera_errors: u64,
    pub camera_triggers: u64,
    pub stuck_checks: u64,
    pub stuck_triggers: u64,
    pub decision_cycles: u64,
    pub state_transitions: u64,
    pub turns: u64,
    pub backtracks: u64,
    pub stuck_recoveries: u64,
    pub indicator_failures: u64,
    pub motor_commands: u64,
}

impl MetricsSnapshot {
    /// 测距失败率（百分比）
    pub fn range_error_rate(&self) -> f64 {
        let total = self.range_samples + self.range_errors;
        if total == 0 {
            return 0.0;
        }
        (self.range_errors as f64 / total as f64) * 100.0
    }

    /// 采集空帧率（百分比）
    pub fn frame_miss_rate(&self) -> f64 {
        let total = self.frames_captured + self.frames_missing;
        if total == 0 {
            return 0.0;
        }
        (self.frames_missing as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot_and_reset() {
        let metrics = NavigationMetrics::new();
        NavigationMetrics::bump(&metrics.range_samples);
        NavigationMetrics::bump(&metrics.range_samples);
        NavigationMetrics::bump(&metrics.range_samples);
        NavigationMetrics::bump(&metrics.range_errors);
        NavigationMetrics::bump(&metrics.turns);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.range_samples, 3);
        assert_eq!(snapshot.turns, 1);
        assert_eq!(snapshot.range_error_rate(), 25.0);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_rates_with_no_samples() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.range_error_rate(), 0.0);
        assert_eq!(snapshot.frame_miss_rate(), 0.0);
    }
}
