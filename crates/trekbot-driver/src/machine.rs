//! 导航状态机
//!
//! 决策线程独占 [`NavigationContext`]、驱动电机和指示灯，
//! 每个周期读取一次感知快照，执行当前状态的动作并决定下一个状态。
//!
//! | 状态 | 动作 | 下一个状态 |
//! |------|------|-----------|
//! | MovingForward | 有障碍：停车、红灯 / 卡住：停车、琥珀灯 / 否则：绿灯、前进 | AvoidingObstacle / Stuck / MovingForward |
//! | AvoidingObstacle | 清除障碍标志，方向 <0 右转、>0 左转、=0 回溯 | Turning / Backtracking |
//! | Turning | 蓝灯，转过 `max_turn_angle * direction` | MovingForward |
//! | Backtracking | 黄灯，次数用尽则停止；否则倒车并交替左右转 | Turning / Stopped |
//! | Stuck | 琥珀灯，次数用尽则停止；否则短倒车 + 小角度转向 | MovingForward / Stopped |
//! | Stopped | 停车、灭灯、结束运行 | Stopped |
//!
//! 只有避障转向（方向来自障碍检测）成功后才重置回溯/卡住计数；
//! 回溯产生的恢复转向不重置，保证回溯上限一定能到达。

use crate::config::{NavigationConfig, RecoveryConfig};
use crate::error::NavigationError;
use crate::metrics::NavigationMetrics;
use crate::motion::Motion;
use crate::shared::NavigationShared;
use crate::state::{NavState, StopReason};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use trekbot_hal::{DriveMotors, HalError, Indicator, IndicatorColor};
use trekbot_vision::{DIRECTION_LEFT, DIRECTION_RIGHT};

/// 转向来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    /// 障碍方向已知的避障转向
    Avoidance,
    /// 回溯后的恢复转向
    Recovery,
}

/// 待执行的转向
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingTurn {
    /// -1.0 左，+1.0 右
    pub direction: f64,
    pub kind: TurnKind,
}

/// 决策线程私有的导航上下文
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationContext {
    pub state: NavState,
    pub backtrack_attempts: u32,
    pub stuck_attempts: u32,
    /// 进入 AvoidingObstacle 时从快照读到的障碍方向
    pub obstacle_direction: f64,
    pub pending_turn: Option<PendingTurn>,
    pub stop_reason: Option<StopReason>,
}

/// 导航状态机
pub struct StateMachine<'a, D, I> {
    ctx: NavigationContext,
    motion: Motion<'a, D>,
    indicator: I,
    lit: Option<IndicatorColor>,
    halted: bool,
    shared: &'a NavigationShared,
    recovery: RecoveryConfig,
    max_turn_angle: f64,
    idle_backoff: Duration,
}

impl<'a, D: DriveMotors, I: Indicator> StateMachine<'a, D, I> {
    pub fn new(
        drive: D,
        indicator: I,
        config: &NavigationConfig,
        shared: &'a NavigationShared,
    ) -> Self {
        shared.state.set(NavState::MovingForward, Ordering::Release);
        Self {
            ctx: NavigationContext::default(),
            motion: Motion::new(drive, config.motion.clone(), &shared.metrics),
            indicator,
            lit: None,
            halted: false,
            shared,
            recovery: config.recovery.clone(),
            max_turn_angle: config.motion.max_turn_angle_deg,
            idle_backoff: config.idle_backoff(),
        }
    }

    pub fn context(&self) -> &NavigationContext {
        &self.ctx
    }

    pub fn state(&self) -> NavState {
        self.ctx.state
    }

    /// 运行决策循环直到进入 Stopped
    ///
    /// 电机错误不会中断循环：记入故障槽，下一个周期转入 Stopped。
    pub fn run(&mut self) -> Option<StopReason> {
        info!("Decision loop started");
        while self.shared.control.is_running() {
            let before = self.ctx.state;
            match self.step() {
                Ok(after) => {
                    if before == NavState::MovingForward && after == NavState::MovingForward {
                        std::thread::sleep(self.idle_backoff);
                    }
                },
                Err(e) => self.shared.control.raise_fault(e),
            }
        }
        info!("Decision loop finished in state {}", self.ctx.state);
        self.ctx.stop_reason
    }

    /// 执行一个决策周期，返回新的状态
    pub fn step(&mut self) -> Result<NavState, NavigationError> {
        NavigationMetrics::bump(&self.shared.metrics.decision_cycles);

        if !self.ctx.state.is_terminal() {
            if self.shared.control.has_fault() {
                warn!("Stopping navigation after fault");
                self.transition(NavState::Stopped);
            } else if self.shared.control.stop_requested() {
                info!("Stop requested");
                self.ctx.stop_reason.get_or_insert(StopReason::StopRequested);
                self.transition(NavState::Stopped);
            }
        }

        let next = match self.ctx.state {
            NavState::MovingForward => self.on_moving_forward(),
            NavState::AvoidingObstacle => Ok(self.on_avoiding_obstacle()),
            NavState::Turning => self.on_turning(),
            NavState::Backtracking => self.on_backtracking(),
            NavState::Stuck => self.on_stuck(),
            NavState::Stopped => Ok(self.on_stopped()),
        }
        .map_err(NavigationError::Motor)?;

        self.transition(next);
        Ok(next)
    }

    fn on_moving_forward(&mut self) -> Result<NavState, HalError> {
        if let Some(direction) = self.shared.perception.obstacle() {
            info!("Obstacle detected (direction {:+.1}), stopping", direction);
            self.motion.stop()?;
            self.signal(IndicatorColor::RED);
            self.ctx.obstacle_direction = direction;
            return Ok(NavState::AvoidingObstacle);
        }

        if self.shared.perception.stuck_suspected() {
            warn!("Robot appears to be stuck, stopping");
            self.motion.stop()?;
            self.signal(IndicatorColor::AMBER);
            return Ok(NavState::Stuck);
        }

        self.signal(IndicatorColor::GREEN);
        self.motion.drive_forward()?;
        Ok(NavState::MovingForward)
    }

    fn on_avoiding_obstacle(&mut self) -> NavState {
        let direction = self.ctx.obstacle_direction;
        self.shared.perception.clear_obstacle();
        self.clear_indicator();

        if direction < 0.0 {
            info!("Obstacle on the left, turning right");
            self.ctx.pending_turn = Some(PendingTurn {
                direction: DIRECTION_RIGHT,
                kind: TurnKind::Avoidance,
            });
            NavState::Turning
        } else if direction > 0.0 {
            info!("Obstacle on the right, turning left");
            self.ctx.pending_turn = Some(PendingTurn {
                direction: DIRECTION_LEFT,
                kind: TurnKind::Avoidance,
            });
            NavState::Turning
        } else {
            info!("Obstacle straight ahead, backtracking");
            NavState::Backtracking
        }
    }

    fn on_turning(&mut self) -> Result<NavState, HalError> {
        self.signal(IndicatorColor::BLUE);

        let Some(turn) = self.ctx.pending_turn.take() else {
            warn!("Entered Turning without a pending turn, resuming forward motion");
            return Ok(NavState::MovingForward);
        };

        self.motion.turn_by_angle(self.max_turn_angle * turn.direction)?;
        NavigationMetrics::bump(&self.shared.metrics.turns);

        if turn.kind == TurnKind::Avoidance {
            if self.ctx.backtrack_attempts > 0 || self.ctx.stuck_attempts > 0 {
                debug!(
                    "Clear turn completed, resetting recovery counters (backtrack={}, stuck={})",
                    self.ctx.backtrack_attempts, self.ctx.stuck_attempts
                );
            }
            self.ctx.backtrack_attempts = 0;
            self.ctx.stuck_attempts = 0;
        }
        Ok(NavState::MovingForward)
    }

    fn on_backtracking(&mut self) -> Result<NavState, HalError> {
        self.signal(IndicatorColor::YELLOW);

        if self.ctx.backtrack_attempts >= self.recovery.max_backtrack_attempts {
            warn!(
                "No clear path found after {} backtrack attempts, stopping",
                self.ctx.backtrack_attempts
            );
            self.ctx.stop_reason = Some(StopReason::BacktrackExhausted);
            return Ok(NavState::Stopped);
        }

        self.ctx.backtrack_attempts += 1;
        NavigationMetrics::bump(&self.shared.metrics.backtracks);
        info!(
            "Backtracking (attempt {}/{})",
            self.ctx.backtrack_attempts, self.recovery.max_backtrack_attempts
        );

        let backup = self.motion.config().backup_duration();
        self.motion.reverse_for(backup)?;

        let direction = if self.ctx.backtrack_attempts % 2 == 0 {
            DIRECTION_LEFT
        } else {
            DIRECTION_RIGHT
        };
        self.ctx.pending_turn = Some(PendingTurn {
            direction,
            kind: TurnKind::Recovery,
        });
        Ok(NavState::Turning)
    }

    fn on_stuck(&mut self) -> Result<NavState, HalError> {
        self.signal(IndicatorColor::AMBER);

        if self.ctx.stuck_attempts >= self.recovery.max_stuck_attempts {
            warn!(
                "Still stuck after {} recovery attempts, stopping",
                self.ctx.stuck_attempts
            );
            self.ctx.stop_reason = Some(StopReason::StuckExhausted);
            return Ok(NavState::Stopped);
        }

        self.ctx.stuck_attempts += 1;
        NavigationMetrics::bump(&self.shared.metrics.stuck_recoveries);
        info!(
            "Attempting to get unstuck (attempt {}/{})",
            self.ctx.stuck_attempts, self.recovery.max_stuck_attempts
        );

        let backup = self.motion.config().backup_duration() / 2;
        self.motion.reverse_for(backup)?;

        let direction = if self.ctx.stuck_attempts % 2 == 0 {
            DIRECTION_LEFT * 0.5
        } else {
            DIRECTION_RIGHT * 0.5
        };
        self.motion.turn_by_angle(self.max_turn_angle * direction / 2.0)?;

        self.shared.perception.set_stuck(false);
        Ok(NavState::MovingForward)
    }

    fn on_stopped(&mut self) -> NavState {
        if !self.halted {
            self.halted = true;
            if let Err(e) = self.motion.stop() {
                error!("Failed to stop drive motors: {}", e);
                self.shared.control.raise_fault(NavigationError::Motor(e));
            }
            self.clear_indicator();
        }
        self.shared.control.finish();
        NavState::Stopped
    }

    fn transition(&mut self, next: NavState) {
        if next == self.ctx.state {
            return;
        }
        info!("Navigation state: {} -> {}", self.ctx.state, next);
        NavigationMetrics::bump(&self.shared.metrics.state_transitions);
        self.ctx.state = next;
        self.shared.state.set(next, Ordering::Release);
    }

    fn signal(&mut self, color: IndicatorColor) {
        if self.lit == Some(color) {
            return;
        }
        match self.indicator.set_color(color) {
            Ok(()) => self.lit = Some(color),
            Err(e) => {
                warn!("Failed to update indicator: {}", e);
                NavigationMetrics::bump(&self.shared.metrics.indicator_failures);
                self.lit = None;
            },
        }
    }

    fn clear_indicator(&mut self) {
        self.lit = None;
        if let Err(e) = self.indicator.clear() {
            warn!("Failed to clear indicator: {}", e);
            NavigationMetrics::bump(&self.shared.metrics.indicator_failures);
        }
    }
}
