//! 共享状态上下文
//!
//! 每个回路在每次迭代结束时发布一份最新快照（`ArcSwap` 无锁读写），
//! 最新值直接覆盖旧值，没有排队。编排器和测试通过快照观察回路进度，
//! 不需要接触任何硬件句柄。

use arc_swap::ArcSwap;
use std::sync::Arc;

/// 巡线回路快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlSnapshot {
    /// 增广后的误差
    pub delta: f64,
    /// 左电机功率
    pub left_power: f64,
    /// 右电机功率
    pub right_power: f64,
    /// 指数滑动平均保存的误差（下一迭代的记忆项）
    pub stored_delta: f64,
    /// 已执行的控制迭代数
    pub iterations: u64,
}

/// 遥测快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// 电池电压（毫伏）
    pub voltage_mv: i32,
    /// 采样序号
    pub iterations: u64,
}

/// 共享状态上下文
///
/// # 性能
///
/// - 无锁读取（`ArcSwap::load`），适合被高频回路更新
/// - 读取返回快照副本，副本很小（< 64 字节）
#[derive(Debug)]
pub struct TrackerContext {
    /// 巡线回路最新快照
    pub control: ArcSwap<ControlSnapshot>,
    /// 遥测最新快照
    pub telemetry: ArcSwap<TelemetrySnapshot>,
}

impl TrackerContext {
    /// 创建新上下文（全零初始快照）
    pub fn new() -> Self {
        Self {
            control: ArcSwap::from_pointee(ControlSnapshot::default()),
            telemetry: ArcSwap::from_pointee(TelemetrySnapshot::default()),
        }
    }

    /// 读取巡线回路最新快照
    pub fn control_snapshot(&self) -> ControlSnapshot {
        self.control.load().as_ref().clone()
    }

    /// 读取遥测最新快照
    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.load().as_ref().clone()
    }
}

impl Default for TrackerContext {
    fn default() -> Self {
        Self::new()
    }
}
