//! 仿真机器人
//!
//! 在二维场地里模拟差速小车，向导航核心提供全部四个硬件能力：
//!
//! | 能力 | 仿真方式 |
//! |------|----------|
//! | 测距 | 沿车头方向光线步进，叠加均匀噪声和偶发超时 |
//! | 相机 | 地面为平滑纹理（随里程和朝向变化），视野内的近处障碍画成高对比条纹 |
//! | 驱动 | 差速运动学，碰撞时停在原地只保留转向 |
//! | 指示灯 | 只记录最后一次颜色 |
//!
//! 仿真是惰性的：每次访问硬件时按真实流逝时间推进位姿，不需要单独的仿真线程。
//! 单位统一为厘米、弧度（逆时针为正）。

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::{Duration, Instant};
use trekbot_sdk::hal::{
    Camera, DriveMotors, GrayFrame, HalError, Indicator, IndicatorColor, RangeSensor, Resolution,
    WheelSpeed,
};
use tracing::{debug, warn};

/// 车身半径（测距从车头算起）
pub const ROBOT_RADIUS_CM: f64 = 8.0;
/// 轮距
pub const WHEEL_BASE_CM: f64 = 10.0;
/// 100% 轮速对应的线速度
pub const MAX_WHEEL_SPEED_CM_S: f64 = 60.0;
/// 测距量程
pub const MAX_RANGE_CM: f64 = 400.0;
/// 相机能"看清"障碍的距离
pub const VIEW_RANGE_CM: f64 = 45.0;
/// 相机左右两个视野方向相对车头的夹角
pub const VIEW_SIDE_ANGLE_RAD: f64 = 25.0 * PI / 180.0;

const RAY_STEP_CM: f64 = 1.0;
const PHYSICS_STEP: Duration = Duration::from_millis(10);

/// 轴对齐矩形障碍
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Block {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    fn contains(&self, x: f64, y: f64, margin: f64) -> bool {
        x >= self.min_x - margin
            && x <= self.max_x + margin
            && y >= self.min_y - margin
            && y <= self.max_y + margin
    }
}

/// 位姿
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn heading_deg(&self) -> f64 {
        self.theta.to_degrees()
    }
}

/// 场地
#[derive(Debug, Clone, PartialEq)]
pub struct Arena {
    /// 外墙尺寸（宽, 高）；`None` 表示无边界
    pub bounds: Option<(f64, f64)>,
    pub blocks: Vec<Block>,
    pub start: Pose,
}

/// 内置场地
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum World {
    /// 空旷地面，没有任何障碍
    Open,
    /// 600x80 的长走廊
    Corridor,
    /// 300x200 的房间，中央有一个箱子
    Room,
    /// 40x40 的小隔间，四面都是墙
    Boxed,
}

impl World {
    pub fn arena(self) -> Arena {
        match self {
            World::Open => Arena {
                bounds: None,
                blocks: Vec::new(),
                start: Pose::new(0.0, 0.0, 0.0),
            },
            World::Corridor => Arena {
                bounds: Some((600.0, 80.0)),
                blocks: Vec::new(),
                start: Pose::new(40.0, 40.0, 0.0),
            },
            World::Room => Arena {
                bounds: Some((300.0, 200.0)),
                blocks: vec![Block::new(130.0, 80.0, 170.0, 120.0)],
                start: Pose::new(40.0, 100.0, 0.0),
            },
            World::Boxed => Arena {
                bounds: Some((40.0, 40.0)),
                blocks: Vec::new(),
                start: Pose::new(20.0, 20.0, PI / 2.0),
            },
        }
    }
}

impl Arena {
    /// 点是否被占据；`margin` 用于按车身半径膨胀障碍
    pub fn is_blocked(&self, x: f64, y: f64, margin: f64) -> bool {
        if let Some((width, height)) = self.bounds {
            if x < margin || y < margin || x > width - margin || y > height - margin {
                return true;
            }
        }
        self.blocks.iter().any(|b| b.contains(x, y, margin))
    }

    /// 从 `(x, y)` 沿 `theta` 到第一个障碍的距离，量程外返回 [`MAX_RANGE_CM`]
    pub fn ray_distance(&self, x: f64, y: f64, theta: f64) -> f64 {
        let (sin, cos) = theta.sin_cos();
        let mut travelled = 0.0;
        while travelled < MAX_RANGE_CM {
            travelled += RAY_STEP_CM;
            if self.is_blocked(x + cos * travelled, y + sin * travelled, 0.0) {
                return travelled;
            }
        }
        MAX_RANGE_CM
    }
}

/// 仿真参数
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// 测距噪声幅度（±cm）
    pub range_noise_cm: f64,
    /// 单次测距超时概率
    pub range_dropout: f64,
    /// 单次采集丢帧概率
    pub frame_dropout: f64,
    /// 从开始运行起多久后车轮卡死
    pub jam_after: Option<Duration>,
    /// 随机种子，0 表示每次不同
    pub seed: u64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            range_noise_cm: 0.5,
            range_dropout: 0.01,
            frame_dropout: 0.02,
            jam_after: None,
            seed: 0,
        }
    }
}

/// 运行统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimReport {
    pub pose: Pose,
    /// 累计行驶里程（只计平移）
    pub odometer_cm: f64,
    pub collisions: u64,
    pub jammed: bool,
    pub indicator: Option<IndicatorColor>,
}

struct SimState {
    arena: Arena,
    options: SimOptions,
    rng: StdRng,
    pose: Pose,
    left: WheelSpeed,
    right: WheelSpeed,
    started: Instant,
    last_update: Instant,
    odometer_cm: f64,
    collisions: u64,
    /// 上一步是否处于碰撞中（只在进入碰撞时计数）
    in_contact: bool,
    jammed: bool,
    indicator: Option<IndicatorColor>,
}

impl SimState {
    /// 推进到 `now`
    fn advance(&mut self, now: Instant) {
        let mut remaining = now.saturating_duration_since(self.last_update);
        self.last_update = now;

        let jam_due = self
            .options
            .jam_after
            .is_some_and(|limit| now.saturating_duration_since(self.started) >= limit);
        if jam_due && !self.jammed {
            warn!("Simulated wheels jammed");
            self.jammed = true;
        }
        if self.jammed {
            return;
        }

        while !remaining.is_zero() {
            let dt = remaining.min(PHYSICS_STEP);
            remaining -= dt;
            self.step(dt.as_secs_f64());
        }
    }

    fn step(&mut self, dt: f64) {
        let left = self.left.percent() as f64 / 100.0 * MAX_WHEEL_SPEED_CM_S;
        let right = self.right.percent() as f64 / 100.0 * MAX_WHEEL_SPEED_CM_S;
        let linear = (left + right) / 2.0;
        let angular = (right - left) / WHEEL_BASE_CM;

        let pose = self.pose;
        let (x, y, theta) = if angular.abs() < 1e-9 {
            (
                pose.x + linear * pose.theta.cos() * dt,
                pose.y + linear * pose.theta.sin() * dt,
                pose.theta,
            )
        } else {
            let radius = linear / angular;
            let theta = pose.theta + angular * dt;
            (
                pose.x + radius * (theta.sin() - pose.theta.sin()),
                pose.y + radius * (pose.theta.cos() - theta.cos()),
                theta,
            )
        };

        let theta = normalize_angle(theta);
        if self.arena.is_blocked(x, y, ROBOT_RADIUS_CM) {
            if !self.in_contact {
                self.collisions += 1;
                debug!("Simulated collision at ({:.1}, {:.1})", pose.x, pose.y);
            }
            self.in_contact = true;
            self.pose.theta = theta;
            return;
        }

        self.in_contact = false;
        self.odometer_cm += (linear * dt).abs();
        self.pose = Pose::new(x, y, theta);
    }

    fn measure(&mut self) -> Result<f64, HalError> {
        self.advance(Instant::now());
        if self.rng.gen_bool(self.options.range_dropout) {
            return Err(HalError::Timeout);
        }

        let Pose { x, y, theta } = self.pose;
        let distance = self.arena.ray_distance(x, y, theta) - ROBOT_RADIUS_CM;
        let noise = self.options.range_noise_cm;
        let jitter = if noise > 0.0 {
            self.rng.gen_range(-noise..=noise)
        } else {
            0.0
        };
        Ok((distance + jitter).max(0.0))
    }

    fn render(&mut self, resolution: Resolution) -> Option<GrayFrame> {
        self.advance(Instant::now());
        if self.rng.gen_bool(self.options.frame_dropout) {
            return None;
        }

        let Pose { x, y, theta } = self.pose;
        // 画面左侧对应车头逆时针方向
        let near = [
            self.arena.ray_distance(x, y, theta + VIEW_SIDE_ANGLE_RAD) - ROBOT_RADIUS_CM,
            self.arena.ray_distance(x, y, theta) - ROBOT_RADIUS_CM,
            self.arena.ray_distance(x, y, theta - VIEW_SIDE_ANGLE_RAD) - ROBOT_RADIUS_CM,
        ]
        .map(|d| d < VIEW_RANGE_CM);

        let phase = self.odometer_cm * 0.17;
        let rows: Vec<f64> = (0..resolution.height)
            .map(|row| 30.0 * (row as f64 * 0.03 + phase).sin())
            .collect();
        let cols: Vec<f64> = (0..resolution.width)
            .map(|col| 20.0 * (col as f64 * 0.02 + theta * 4.0).sin())
            .collect();
        let brightness: f64 = self.rng.gen_range(-1.0..=1.0);

        let third = (resolution.width / 3).max(1);
        // 近处障碍占据画面下部（检测器只扫描下半帧）
        let clutter_top = resolution.height / 3;
        Some(GrayFrame::from_fn(
            resolution.width,
            resolution.height,
            |col, row| {
                let region = (col / third).min(2);
                if near[region] && row >= clutter_top {
                    return if col % 2 == 0 { 20 } else { 230 };
                }
                (110.0 + rows[row] + cols[col] + brightness).round() as u8
            },
        ))
    }
}

fn normalize_angle(theta: f64) -> f64 {
    let mut theta = theta % (2.0 * PI);
    if theta > PI {
        theta -= 2.0 * PI;
    } else if theta < -PI {
        theta += 2.0 * PI;
    }
    theta
}

/// 仿真机器人（共享状态上的句柄）
#[derive(Clone)]
pub struct SimRobot {
    state: Arc<Mutex<SimState>>,
}

impl SimRobot {
    pub fn new(arena: Arena, options: SimOptions) -> Self {
        let rng = if options.seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(options.seed)
        };
        let now = Instant::now();
        Self {
            state: Arc::new(Mutex::new(SimState {
                pose: arena.start,
                arena,
                options,
                rng,
                left: WheelSpeed::ZERO,
                right: WheelSpeed::ZERO,
                started: now,
                last_update: now,
                odometer_cm: 0.0,
                collisions: 0,
                in_contact: false,
                jammed: false,
                indicator: None,
            })),
        }
    }

    pub fn range_sensor(&self) -> SimRangeSensor {
        SimRangeSensor(self.clone())
    }

    pub fn camera(&self) -> SimCamera {
        SimCamera(self.clone())
    }

    pub fn drive(&self) -> SimDrive {
        SimDrive(self.clone())
    }

    pub fn indicator(&self) -> SimIndicator {
        SimIndicator(self.clone())
    }

    /// 推进到当前时刻并返回统计
    pub fn report(&self) -> SimReport {
        let mut state = self.state.lock();
        state.advance(Instant::now());
        SimReport {
            pose: state.pose,
            odometer_cm: state.odometer_cm,
            collisions: state.collisions,
            jammed: state.jammed,
            indicator: state.indicator,
        }
    }
}

pub struct SimRangeSensor(SimRobot);

impl RangeSensor for SimRangeSensor {
    fn measure_distance(&mut self) -> Result<f64, HalError> {
        self.0.state.lock().measure()
    }
}

pub struct SimCamera(SimRobot);

impl Camera for SimCamera {
    fn capture_grayscale(&self, resolution: Resolution) -> Result<Option<GrayFrame>, HalError> {
        Ok(self.0.state.lock().render(resolution))
    }
}

pub struct SimDrive(SimRobot);

impl DriveMotors for SimDrive {
    fn drive(&mut self, left: WheelSpeed, right: WheelSpeed) -> Result<(), HalError> {
        let mut state = self.0.state.lock();
        state.advance(Instant::now());
        state.left = left;
        state.right = right;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HalError> {
        self.drive(WheelSpeed::ZERO, WheelSpeed::ZERO)
    }
}

pub struct SimIndicator(SimRobot);

impl Indicator for SimIndicator {
    fn set_color(&mut self, color: IndicatorColor) -> Result<(), HalError> {
        self.0.state.lock().indicator = Some(color);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), HalError> {
        self.0.state.lock().indicator = None;
        Ok(())
    }
}
