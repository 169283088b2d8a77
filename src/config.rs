//! 追踪器配置
//!
//! 所有可调参数集中于此。默认值即标定值，进程不读取任何
//! 命令行参数、环境变量或配置文件。

use std::time::Duration;

/// 追踪器配置
///
/// # Example
///
/// ```
/// use linetrack::TrackerConfig;
/// use std::time::Duration;
///
/// // 标定默认值
/// let config = TrackerConfig::default();
/// assert_eq!(config.standard, 0.3);
///
/// // 分时宿主环境：给轮询回路一个小间隔，避免空转占满一个核
/// let config = TrackerConfig {
///     poll_interval: Duration::from_millis(2),
///     ..TrackerConfig::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// 参考反射率（“在线上”的标定点）
    pub standard: f64,
    /// 基础电机速度
    pub base: f64,
    /// 比例增益
    pub ratio: f64,
    /// 微分增益
    pub dfactor: f64,
    /// 积分记忆衰减因子（指数滑动平均）
    pub ifactor: f64,
    /// 按钮与巡线回路的轮询间隔
    ///
    /// `Duration::ZERO` 表示纯忙轮询——在真实嵌入式目标上这是正确行为，
    /// 回路频率只受传感器 IO 延迟限制。
    pub poll_interval: Duration,
    /// 遥测采样周期
    pub telemetry_period: Duration,
    /// 启停防抖间隔
    ///
    /// 防止同一次物理按压被同时当作启动和停止两个手势。
    pub debounce_guard: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            standard: 0.3,
            base: 200.0,
            ratio: 800.0,
            dfactor: 1.0,
            ifactor: 0.3,
            poll_interval: Duration::ZERO,
            telemetry_period: Duration::from_secs(1),
            debounce_guard: Duration::from_secs(1),
        }
    }
}
