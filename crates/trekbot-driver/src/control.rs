//! 运行控制
//!
//! 一次导航的协作式停止标志和故障槽：
//!
//! - `should_continue`：只有决策线程（或它的退出守卫）把它置为 false，
//!   监控线程每轮检查一次
//! - `stop_requested`：外部请求，决策线程在下一个周期开始时响应
//! - 故障槽：任意线程报告的致命错误，保留第一个

use crate::error::NavigationError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::error;

/// 监控线程单次睡眠的最长时间，保证停止后能及时退出
pub const MAX_SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct RunControl {
    should_continue: AtomicBool,
    stop_requested: AtomicBool,
    fault_raised: AtomicBool,
    fault: Mutex<Option<NavigationError>>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        Self {
            should_continue: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            fault_raised: AtomicBool::new(false),
            fault: Mutex::new(None),
        }
    }

    /// 开始新一次运行（清除上一次的停止请求和故障）
    pub(crate) fn begin(&self) {
        self.fault.lock().take();
        self.fault_raised.store(false, Ordering::Release);
        self.stop_requested.store(false, Ordering::Release);
        self.should_continue.store(true, Ordering::Release);
    }

    /// 导航是否仍在进行
    pub fn is_running(&self) -> bool {
        self.should_continue.load(Ordering::Acquire)
    }

    /// 结束运行（决策线程专用）
    pub(crate) fn finish(&self) {
        self.should_continue.store(false, Ordering::Release);
    }

    /// 请求停止；决策线程在下一个周期进入 Stopped
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// 报告致命故障（只保留第一个）
    pub fn raise_fault(&self, fault: NavigationError) {
        let mut slot = self.fault.lock();
        if slot.is_none() {
            error!("Navigation fault: {}", fault);
            *slot = Some(fault);
            self.fault_raised.store(true, Ordering::Release);
        }
    }

    pub fn has_fault(&self) -> bool {
        self.fault_raised.load(Ordering::Acquire)
    }

    pub(crate) fn take_fault(&self) -> Option<NavigationError> {
        self.fault.lock().take()
    }

    /// 按不超过 [`MAX_SLEEP_SLICE`] 的分片睡眠 `interval`，运行结束时提前返回
    ///
    /// 返回睡眠结束时是否仍在运行。
    pub fn pace(&self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(MAX_SLEEP_SLICE));
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_begin_and_finish() {
        let control = RunControl::new();
        assert!(!control.is_running());

        control.begin();
        assert!(control.is_running());
        control.finish();
        assert!(!control.is_running());
    }

    #[test]
    fn test_first_fault_wins() {
        let control = RunControl::new();
        control.begin();
        control.raise_fault(NavigationError::MonitorPanicked("range"));
        control.raise_fault(NavigationError::MonitorPanicked("camera"));

        assert!(control.has_fault());
        assert!(matches!(
            control.take_fault(),
            Some(NavigationError::MonitorPanicked("range"))
        ));

        // 新一次运行清除故障和停止请求
        control.request_stop();
        control.begin();
        assert!(!control.has_fault());
        assert!(!control.stop_requested());
    }

    #[test]
    fn test_pace_returns_early_when_finished() {
        let control = Arc::new(RunControl::new());
        control.begin();

        let stopper = {
            let control = control.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                control.finish();
            })
        };

        let start = Instant::now();
        assert!(!control.pace(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
        stopper.join().unwrap();
    }

    #[test]
    fn test_pace_full_interval() {
        let control = RunControl::new();
        control.begin();
        let start = Instant::now();
        assert!(control.pace(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
