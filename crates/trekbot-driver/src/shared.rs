//! 线程间共享的导航状态

use crate::control::RunControl;
use crate::metrics::NavigationMetrics;
use crate::snapshot::PerceptionSnapshot;
use crate::state::{AtomicNavState, NavState};
use std::sync::atomic::Ordering;

/// 监控线程、决策线程和外部句柄共同持有的状态
#[derive(Debug, Default)]
pub struct NavigationShared {
    pub perception: PerceptionSnapshot,
    pub state: AtomicNavState,
    pub control: RunControl,
    pub metrics: NavigationMetrics,
}

impl NavigationShared {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为新一次导航复位：快照清空、状态回到 MovingForward、计数器清零、进入运行
    pub fn reset(&self) {
        self.perception.reset();
        self.state.set(NavState::MovingForward, Ordering::Release);
        self.metrics.reset();
        self.control.begin();
    }

    pub fn nav_state(&self) -> NavState {
        self.state.get(Ordering::Acquire)
    }
}
