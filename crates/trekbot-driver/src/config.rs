//! # 导航配置
//!
//! 所有阈值、周期和运动参数集中在 [`NavigationConfig`]，可以从 TOML 文件加载。
//! 缺省值与机器人出厂标定一致。
//!
//! ```toml
//! idle_backoff_ms = 20
//!
//! [range]
//! obstacle_threshold_cm = 15.0
//! poll_interval_ms = 30
//!
//! [camera]
//! poll_interval_ms = 500
//! resolution = { width = 480, height = 480 }
//! edge_threshold = 50
//! edge_density_threshold = 0.05
//!
//! [stuck]
//! check_interval_ms = 1000
//! state_poll_interval_ms = 100
//! difference_threshold = 5.0
//! sample_step = 10
//!
//! [motion]
//! move_speed = 80
//! turn_duration_ms = 300
//! max_turn_angle_deg = 90.0
//! backup_duration_ms = 400
//!
//! [recovery]
//! max_backtrack_attempts = 2
//! max_stuck_attempts = 3
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use trekbot_hal::{Resolution, WheelSpeed};
use trekbot_vision::{DetectorConfig, StuckConfig};

/// 配置加载/校验错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn require_positive_ms(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than 0 ms"));
    }
    Ok(())
}

/// 导航总配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// 前进状态无变化时的决策间隔（毫秒）
    pub idle_backoff_ms: u64,
    pub range: RangeConfig,
    pub camera: CameraConfig,
    pub stuck: StuckMonitorConfig,
    pub motion: MotionConfig,
    pub recovery: RecoveryConfig,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            idle_backoff_ms: 20,
            range: RangeConfig::default(),
            camera: CameraConfig::default(),
            stuck: StuckMonitorConfig::default(),
            motion: MotionConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl NavigationConfig {
    /// 从 TOML 文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 解析 TOML 文本；缺失的字段取默认值
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: NavigationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存到文件（不会自动创建父目录）
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 校验所有参数
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive_ms("idle_backoff_ms", self.idle_backoff_ms)?;
        self.range.validate()?;
        self.camera.validate()?;
        self.stuck.validate()?;
        self.motion.validate()?;
        Ok(())
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// 障碍检测器参数
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            edge_threshold: self.camera.edge_threshold,
            density_threshold: self.camera.edge_density_threshold,
        }
    }

    /// 卡住检测器参数
    pub fn stuck_config(&self) -> StuckConfig {
        StuckConfig {
            difference_threshold: self.stuck.difference_threshold,
            sample_step: self.stuck.sample_step,
        }
    }
}

/// 超声波监控
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// 小于该距离即认为正前方有障碍（厘米）
    pub obstacle_threshold_cm: f64,
    pub poll_interval_ms: u64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            obstacle_threshold_cm: 15.0,
            poll_interval_ms: 30,
        }
    }
}

impl RangeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.obstacle_threshold_cm.is_finite() && self.obstacle_threshold_cm > 0.0) {
            return Err(invalid(
                "range.obstacle_threshold_cm",
                format!("must be a positive distance, got {}", self.obstacle_threshold_cm),
            ));
        }
        require_positive_ms("range.poll_interval_ms", self.poll_interval_ms)
    }
}

/// 相机障碍监控
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub poll_interval_ms: u64,
    /// 采集分辨率（障碍和卡住监控共用）
    pub resolution: Resolution,
    /// 梯度幅值阈值
    pub edge_threshold: u16,
    /// 边缘密度阈值（0..1）
    pub edge_density_threshold: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let detector = DetectorConfig::default();
        Self {
            poll_interval_ms: 500,
            resolution: Resolution::SQUARE_480,
            edge_threshold: detector.edge_threshold,
            edge_density_threshold: detector.density_threshold,
        }
    }
}

impl CameraConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require_positive_ms("camera.poll_interval_ms", self.poll_interval_ms)?;
        if self.resolution.pixel_count() == 0 {
            return Err(invalid("camera.resolution", "must not be empty"));
        }
        DetectorConfig {
            edge_threshold: self.edge_threshold,
            density_threshold: self.edge_density_threshold,
        }
        .validate()
        .map_err(|e| invalid("camera", e.to_string()))
    }
}

/// 卡住监控
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StuckMonitorConfig {
    /// 两次帧差检查的最小间隔
    pub check_interval_ms: u64,
    /// 轮询导航状态的周期
    pub state_poll_interval_ms: u64,
    /// 平均帧差低于该值即认为卡住
    pub difference_threshold: f64,
    /// 帧差采样步长（像素）
    pub sample_step: usize,
}

impl Default for StuckMonitorConfig {
    fn default() -> Self {
        let stuck = StuckConfig::default();
        Self {
            check_interval_ms: 1000,
            state_poll_interval_ms: 100,
            difference_threshold: stuck.difference_threshold,
            sample_step: stuck.sample_step,
        }
    }
}

impl StuckMonitorConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn state_poll_interval(&self) -> Duration {
        Duration::from_millis(self.state_poll_interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require_positive_ms("stuck.check_interval_ms", self.check_interval_ms)?;
        require_positive_ms("stuck.state_poll_interval_ms", self.state_poll_interval_ms)?;
        StuckConfig {
            difference_threshold: self.difference_threshold,
            sample_step: self.sample_step,
        }
        .validate()
        .map_err(|e| invalid("stuck", e.to_string()))
    }
}

/// 运动原语参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// 前进速度（百分比，转向用一半，倒车用负的一半）
    pub move_speed: u8,
    /// 转过 `max_turn_angle_deg` 所需的时间
    pub turn_duration_ms: u64,
    pub max_turn_angle_deg: f64,
    /// 回溯倒车时间（卡住恢复用一半）
    pub backup_duration_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 80,
            turn_duration_ms: 300,
            max_turn_angle_deg: 90.0,
            backup_duration_ms: 400,
        }
    }
}

impl MotionConfig {
    pub fn forward_speed(&self) -> WheelSpeed {
        WheelSpeed::new(i32::from(self.move_speed))
    }

    pub fn turn_speed(&self) -> WheelSpeed {
        self.forward_speed().half()
    }

    pub fn reverse_speed(&self) -> WheelSpeed {
        -self.forward_speed().half()
    }

    pub fn backup_duration(&self) -> Duration {
        Duration::from_millis(self.backup_duration_ms)
    }

    /// 转过 `angle_deg`（取绝对值）所需时间，按 `turn_duration_ms / max_turn_angle_deg` 线性换算
    pub fn turn_duration(&self, angle_deg: f64) -> Duration {
        let ms = angle_deg.abs() * self.turn_duration_ms as f64 / self.max_turn_angle_deg;
        Duration::from_nanos((ms * 1_000_000.0).round() as u64)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.move_speed == 0 || self.move_speed > 100 {
            return Err(invalid(
                "motion.move_speed",
                format!("must be in 1..=100, got {}", self.move_speed),
            ));
        }
        if !(self.max_turn_angle_deg.is_finite() && self.max_turn_angle_deg > 0.0) {
            return Err(invalid(
                "motion.max_turn_angle_deg",
                format!("must be positive, got {}", self.max_turn_angle_deg),
            ));
        }
        Ok(())
    }
}

/// 恢复策略上限
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub max_backtrack_attempts: u32,
    pub max_stuck_attempts: u32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_backtrack_attempts: 2,
            max_stuck_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = NavigationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.range.obstacle_threshold_cm, 15.0);
        assert_eq!(config.camera.resolution, Resolution::SQUARE_480);
        assert_eq!(config.recovery.max_backtrack_attempts, 2);
        assert_eq!(config.recovery.max_stuck_attempts, 3);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = NavigationConfig::from_toml_str(
            r#"
            idle_backoff_ms = 5

            [range]
            obstacle_threshold_cm = 25.0

            [recovery]
            max_backtrack_attempts = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.idle_backoff_ms, 5);
        assert_eq!(config.range.obstacle_threshold_cm, 25.0);
        // 未指定的字段保持默认
        assert_eq!(config.range.poll_interval_ms, 30);
        assert_eq!(config.recovery.max_backtrack_attempts, 4);
        assert_eq!(config.recovery.max_stuck_attempts, 3);
        assert_eq!(config.motion, MotionConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = NavigationConfig::from_toml_str("[range]\npoll_interval_ms = 0\n").unwrap_err();
        assert!(format!("{}", err).contains("range.poll_interval_ms"), "{}", err);

        let err = NavigationConfig::from_toml_str("[motion]\nmove_speed = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "motion.move_speed", .. }));

        let err = NavigationConfig::from_toml_str("[stuck]\nsample_step = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "stuck", .. }));

        let err = NavigationConfig::from_toml_str("[camera]\nedge_density_threshold = 1.5\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "camera", .. }));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = NavigationConfig::from_toml_str("[range\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("navigation.toml");

        let mut config = NavigationConfig::default();
        config.camera.resolution = Resolution::new(240, 240);
        config.motion.move_speed = 60;
        config.save_to_file(&path).unwrap();

        let loaded = NavigationConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = NavigationConfig::load_from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_motion_derived_values() {
        let motion = MotionConfig::default();
        assert_eq!(motion.forward_speed(), WheelSpeed::new(80));
        assert_eq!(motion.turn_speed(), WheelSpeed::new(40));
        assert_eq!(motion.reverse_speed(), WheelSpeed::new(-40));
        assert_eq!(motion.turn_duration(90.0), Duration::from_millis(300));
        assert_eq!(motion.turn_duration(-90.0), Duration::from_millis(300));
        assert_eq!(motion.turn_duration(22.5), Duration::from_micros(75_000));
        assert_eq!(motion.turn_duration(0.0), Duration::ZERO);
    }

    #[test]
    fn test_detector_configs_follow_sections() {
        let mut config = NavigationConfig::default();
        config.camera.edge_threshold = 80;
        config.stuck.sample_step = 4;
        assert_eq!(config.detector_config().edge_threshold, 80);
        assert_eq!(config.stuck_config().sample_step, 4);
    }
}
