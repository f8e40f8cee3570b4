//! 导航状态定义
//!
//! 决策线程是唯一的写者；卡住监控和外部观察者通过 [`AtomicNavState`] 读取。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 导航状态
///
/// - **MovingForward**: 前进，等待传感器证据
/// - **AvoidingObstacle**: 发现障碍，根据方向选择转向或回溯
/// - **Turning**: 按待执行的转向旋转
/// - **Backtracking**: 方向不明，倒车后交替左右转
/// - **Stuck**: 疑似卡住，短倒车 + 小角度转向
/// - **Stopped**: 终止状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum NavState {
    #[default]
    MovingForward = 0,
    AvoidingObstacle = 1,
    Turning = 2,
    Backtracking = 3,
    Stuck = 4,
    Stopped = 5,
}

impl NavState {
    /// 从 u8 转换
    ///
    /// 无效值视为 Stopped。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::MovingForward,
            1 => Self::AvoidingObstacle,
            2 => Self::Turning,
            3 => Self::Backtracking,
            4 => Self::Stuck,
            _ => Self::Stopped,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否为终止状态
    pub fn is_terminal(self) -> bool {
        self == Self::Stopped
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MovingForward => "MovingForward",
            Self::AvoidingObstacle => "AvoidingObstacle",
            Self::Turning => "Turning",
            Self::Backtracking => "Backtracking",
            Self::Stuck => "Stuck",
            Self::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 导航状态（原子版本，用于线程间共享）
#[derive(Debug)]
pub struct AtomicNavState {
    inner: AtomicU8,
}

impl AtomicNavState {
    pub fn new(state: NavState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> NavState {
        NavState::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, state: NavState, ordering: Ordering) {
        self.inner.store(state.as_u8(), ordering);
    }
}

impl Default for AtomicNavState {
    fn default() -> Self {
        Self::new(NavState::default())
    }
}

/// 导航结束原因（正常结束；故障通过错误返回）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// 回溯次数用尽，找不到出路
    BacktrackExhausted,
    /// 卡住恢复次数用尽
    StuckExhausted,
    /// 外部请求停止
    StopRequested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BacktrackExhausted => "no clear path found after maximum backtrack attempts",
            Self::StuckExhausted => "still stuck after maximum recovery attempts",
            Self::StopRequested => "stop requested",
        };
        f.write_str(text)
    }
}
