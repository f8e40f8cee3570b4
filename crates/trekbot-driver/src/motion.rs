//! 运动原语
//!
//! 在 [`DriveMotors`] 之上封装前进、定时倒车、定角转向、停止。
//! 转向和倒车是开环的：按标定时间保持速度，然后停止。
//!
//! 所有电机错误原样向上传播，由决策层统一按致命故障处理。

use crate::config::MotionConfig;
use crate::metrics::NavigationMetrics;
use std::time::Duration;
use tracing::{debug, trace};
use trekbot_hal::{DriveMotors, HalError, WheelSpeed};

/// 最近一次下发的电机命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastCommand {
    Drive(WheelSpeed, WheelSpeed),
    Stopped,
}

/// 运动原语
pub struct Motion<'a, D> {
    drive: D,
    config: MotionConfig,
    metrics: &'a NavigationMetrics,
    last: Option<LastCommand>,
}

impl<'a, D: DriveMotors> Motion<'a, D> {
    pub fn new(drive: D, config: MotionConfig, metrics: &'a NavigationMetrics) -> Self {
        Self {
            drive,
            config,
            metrics,
            last: None,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// 以前进速度直行；已经在直行时不重复下发
    pub fn drive_forward(&mut self) -> Result<(), HalError> {
        let speed = self.config.forward_speed();
        if self.last == Some(LastCommand::Drive(speed, speed)) {
            return Ok(());
        }
        self.send(speed, speed)
    }

    /// 停止
    pub fn stop(&mut self) -> Result<(), HalError> {
        self.drive.stop()?;
        NavigationMetrics::bump(&self.metrics.motor_commands);
        self.last = Some(LastCommand::Stopped);
        trace!("drive: stop");
        Ok(())
    }

    /// 以一半前进速度倒车 `duration`，然后停止
    pub fn reverse_for(&mut self, duration: Duration) -> Result<(), HalError> {
        let speed = self.config.reverse_speed();
        debug!("Reversing for {:?}", duration);
        self.send(speed, speed)?;
        spin_sleep::sleep(duration);
        self.stop()
    }

    /// 原地转过 `angle_deg`：负值左转，正值右转，0 不转
    ///
    /// 持续时间按 `turn_duration_ms / max_turn_angle_deg` 线性换算，结束后停止。
    pub fn turn_by_angle(&mut self, angle_deg: f64) -> Result<(), HalError> {
        let speed = self.config.turn_speed();
        let duration = self.config.turn_duration(angle_deg);

        if angle_deg < 0.0 {
            debug!("Turning left {:.1}° for {:?}", -angle_deg, duration);
            self.send(-speed, speed)?;
        } else if angle_deg > 0.0 {
            debug!("Turning right {:.1}° for {:?}", angle_deg, duration);
            self.send(speed, -speed)?;
        }
        spin_sleep::sleep(duration);
        self.stop()
    }

    fn send(&mut self, left: WheelSpeed, right: WheelSpeed) -> Result<(), HalError> {
        self.drive.drive(left, right)?;
        NavigationMetrics::bump(&self.metrics.motor_commands);
        self.last = Some(LastCommand::Drive(left, right));
        trace!("drive: left={} right={}", left, right);
        Ok(())
    }
}
