//! 导航运行时
//!
//! [`Navigator`] 持有四个硬件能力和配置。每次 [`Navigator::run_navigation`]：
//!
//! 1. 复位共享状态（快照清空、状态 MovingForward、计数器清零）
//! 2. 在 `std::thread::scope` 中启动命名线程：
//!    `trekbot-range`、`trekbot-camera`、`trekbot-stuck`、`trekbot-decision`
//! 3. 决策线程进入 Stopped 后结束运行，监控线程在一个睡眠分片内退出
//! 4. 全部线程 join 后才返回：正常结束返回 [`NavigationOutcome`]，故障返回错误
//!
//! 硬件以借用方式交给线程，返回后仍归 `Navigator` 所有，可以再次运行。

use crate::builder::NavigatorBuilder;
use crate::config::NavigationConfig;
use crate::error::NavigationError;
use crate::hooks::HookManager;
use crate::machine::{NavigationContext, StateMachine};
use crate::metrics::MetricsSnapshot;
use crate::monitors::{ThreadGuard, camera_loop, range_loop, stuck_loop};
use crate::shared::NavigationShared;
use crate::snapshot::PerceptionView;
use crate::state::{NavState, StopReason};
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use trekbot_hal::{Camera, DriveMotors, Indicator, RangeSensor};
use trekbot_vision::ObstacleDetector;

type DecisionResult = Result<(Option<StopReason>, NavigationContext), NavigationError>;

/// 一次导航的结果
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationOutcome {
    pub reason: StopReason,
    /// 结束时的回溯计数
    pub backtrack_attempts: u32,
    /// 结束时的卡住恢复计数
    pub stuck_attempts: u32,
    pub elapsed: Duration,
    pub metrics: MetricsSnapshot,
}

/// 运行期间从其他线程观察/停止导航的句柄
#[derive(Debug, Clone)]
pub struct NavigationHandle {
    shared: Arc<NavigationShared>,
}

impl NavigationHandle {
    /// 当前导航状态
    pub fn state(&self) -> NavState {
        self.shared.nav_state()
    }

    /// 感知快照拷贝
    pub fn perception(&self) -> PerceptionView {
        self.shared.perception.view()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.shared.control.is_running()
    }

    /// 请求停止；决策线程在下一个周期进入 Stopped
    ///
    /// 只作用于正在进行（或即将在同一次 `run_navigation` 中进行）的运行，
    /// 新的运行开始时会清除之前的请求。
    pub fn request_stop(&self) {
        info!("Navigation stop requested");
        self.shared.control.request_stop();
    }
}

/// 自主避障导航器
pub struct Navigator<R, C, D, I> {
    range: R,
    camera: C,
    drive: D,
    indicator: I,
    config: NavigationConfig,
    hooks: HookManager,
    shared: Arc<NavigationShared>,
}

fn spawn_worker<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    name: &'static str,
    f: F,
) -> Result<ScopedJoinHandle<'scope, T>, NavigationError>
where
    T: Send + 'scope,
    F: FnOnce() -> T + Send + 'scope,
{
    thread::Builder::new()
        .name(format!("trekbot-{}", name))
        .spawn_scoped(scope, f)
        .map_err(|source| NavigationError::Spawn { name, source })
}

impl<R, C, D, I> Navigator<R, C, D, I>
where
    R: RangeSensor + Send,
    C: Camera + Sync,
    D: DriveMotors + Send,
    I: Indicator + Send,
{
    /// 使用给定配置创建导航器（配置会先校验）
    pub fn new(
        range: R,
        camera: C,
        drive: D,
        indicator: I,
        config: NavigationConfig,
    ) -> Result<Self, NavigationError> {
        NavigatorBuilder::new()
            .config(config)
            .build(range, camera, drive, indicator)
    }

    pub(crate) fn from_parts(
        range: R,
        camera: C,
        drive: D,
        indicator: I,
        config: NavigationConfig,
        hooks: HookManager,
    ) -> Self {
        Self {
            range,
            camera,
            drive,
            indicator,
            config,
            hooks,
            shared: Arc::new(NavigationShared::new()),
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// 获取观察/停止句柄（可以在运行前获取并交给其他线程）
    pub fn handle(&self) -> NavigationHandle {
        NavigationHandle {
            shared: self.shared.clone(),
        }
    }

    /// 取回硬件
    pub fn into_parts(self) -> (R, C, D, I) {
        (self.range, self.camera, self.drive, self.indicator)
    }

    /// 运行一次自主导航，直到停止
    ///
    /// 返回前所有工作线程都已退出。
    pub fn run_navigation(&mut self) -> Result<NavigationOutcome, NavigationError> {
        let shared: &NavigationShared = &self.shared;
        let config = &self.config;
        let hooks = &self.hooks;
        let camera = &self.camera;
        let range = &mut self.range;
        let drive = &mut self.drive;
        let indicator = &mut self.indicator;
        let detector = ObstacleDetector::new(config.detector_config());
        let detector = &detector;

        shared.reset();
        let started = Instant::now();
        info!(
            "Navigation started (camera {}, obstacle threshold {:.1} cm)",
            config.camera.resolution, config.range.obstacle_threshold_cm
        );

        let result: DecisionResult = thread::scope(|scope| {
            let abort = |e: NavigationError| {
                shared.control.finish();
                e
            };

            let range_worker = spawn_worker(scope, "range", move || {
                let _guard = ThreadGuard::monitor(shared, "range");
                range_loop(range, shared, &config.range);
            })
            .map_err(abort)?;

            let camera_worker = spawn_worker(scope, "camera", move || {
                let _guard = ThreadGuard::monitor(shared, "camera");
                camera_loop(camera, shared, &config.camera, detector, hooks);
            })
            .map_err(abort)?;

            let stuck_worker = spawn_worker(scope, "stuck", move || {
                let _guard = ThreadGuard::monitor(shared, "stuck");
                stuck_loop(camera, shared, &config.stuck, config.camera.resolution, hooks);
            })
            .map_err(abort)?;

            let decision_worker = spawn_worker(scope, "decision", move || {
                let _guard = ThreadGuard::decision(shared);
                let mut machine = StateMachine::new(drive, indicator, config, shared);
                let reason = machine.run();
                (reason, machine.context().clone())
            })
            .map_err(abort)?;

            let decision = decision_worker
                .join()
                .map_err(|_| NavigationError::MonitorPanicked("decision"));

            for (name, worker) in [
                ("range", range_worker),
                ("camera", camera_worker),
                ("stuck", stuck_worker),
            ] {
                if worker.join().is_err() {
                    shared
                        .control
                        .raise_fault(NavigationError::MonitorPanicked(name));
                }
            }
            decision
        });

        let elapsed = started.elapsed();

        if matches!(result, Err(NavigationError::MonitorPanicked("decision"))) {
            warn!("Decision thread panicked, issuing safety stop");
            if let Err(e) = self.drive.stop() {
                error!("Safety stop failed: {}", e);
            }
        }

        if let Some(fault) = self.shared.control.take_fault() {
            error!("Navigation aborted after {:.1?}: {}", elapsed, fault);
            return Err(fault);
        }
        let (reason, context) = result?;
        let reason = reason.unwrap_or(StopReason::StopRequested);

        let outcome = NavigationOutcome {
            reason,
            backtrack_attempts: context.backtrack_attempts,
            stuck_attempts: context.stuck_attempts,
            elapsed,
            metrics: self.shared.metrics.snapshot(),
        };
        info!(
            "Navigation finished after {:.1?}: {} (backtracks {}, stuck recoveries {})",
            elapsed, reason, outcome.metrics.backtracks, outcome.metrics.stuck_recoveries
        );
        Ok(outcome)
    }
}
