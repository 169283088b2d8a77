//! 错误类型定义

use thiserror::Error;

/// 硬件协作者错误
///
/// 由传感器、电机、显示等外部硬件实现返回。
/// 核心逻辑不关心底层驱动细节，只区分读取 / 指令 / 释放三类失败。
#[derive(Error, Debug)]
pub enum HardwareError {
    /// 传感器读取失败
    #[error("sensor read failed: {0}")]
    SensorRead(String),

    /// 电机指令失败
    #[error("motor command failed: {0}")]
    Motor(String),

    /// 设备释放失败
    ///
    /// 释放是 best-effort：调用方记录日志但不阻塞停机。
    #[error("device release failed: {0}")]
    Release(String),
}

/// 追踪器错误（对外 API）
#[derive(Error, Debug)]
pub enum TrackerError {
    /// 硬件错误（按钮传感器或巡线回路，致命）
    #[error("hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// 巡线线程 panic
    #[error("control thread panicked")]
    ControlPanicked,
}
