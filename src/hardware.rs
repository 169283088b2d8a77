//! 硬件协作者接口
//!
//! 核心逻辑只依赖这里的 trait；真实设备驱动和仿真/测试实现
//! 都通过它们注入，控制算法本身可以完全脱离硬件测试。

use crate::error::HardwareError;

/// 标量采样源（触碰传感器、反射率传感器）
///
/// 返回 [0.0, 1.0] 区间内的采样值：触碰传感器以 0.5 为按下阈值，
/// 反射率传感器的读数直接作为误差来源使用。
pub trait SampleSource {
    /// 读取一次采样
    fn fetch_sample(&mut self) -> Result<f64, HardwareError>;

    /// 释放传感器句柄
    ///
    /// 默认实现为 no-op；持有真实句柄的实现应覆盖。
    fn close(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }
}

/// 电压采样源
///
/// 纯观测用途，读数不参与控制。
pub trait VoltageSource {
    /// 读取电池电压（毫伏）
    fn voltage_millivolts(&mut self) -> Result<i32, HardwareError>;
}

/// 电机输出接口
///
/// 速度通过 `set_speed` 设置后需要再调用一次 `forward()` 才立即生效，
/// 巡线回路每次迭代都会重发这两个指令。
pub trait Motor {
    /// 设置目标速度（有符号整数）
    fn set_speed(&mut self, speed: i32) -> Result<(), HardwareError>;

    /// 前进（应用当前速度）
    fn forward(&mut self) -> Result<(), HardwareError>;

    /// 滑行（不主动刹车）
    fn coast(&mut self) -> Result<(), HardwareError>;

    /// 释放电机句柄
    fn close(&mut self) -> Result<(), HardwareError>;
}

/// 显示/日志接收端
///
/// Fire-and-forget：调用不返回错误，也不应显著阻塞控制回路。
pub trait DisplaySink: Send + Sync {
    /// 清屏
    fn clear(&self);

    /// 在指定行绘制一行文本
    fn draw_line(&self, text: &str, row: u8);

    /// 刷新到设备
    fn refresh(&self);
}
