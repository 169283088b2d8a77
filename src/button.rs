//! 按钮边沿检测
//!
//! 把 0.0–1.0 的触碰采样去抖成一次完整的“按下-松开”手势。
//! 阈值穿越本身就是全部去噪手段，没有额外滤波。

use crate::error::HardwareError;
use crate::hardware::SampleSource;
use std::time::Duration;

/// 按下判定阈值
pub const PRESS_THRESHOLD: f64 = 0.5;

/// 阻塞等待一次完整的按下-松开手势
///
/// 先轮询采样直到越过阈值（按下），再继续轮询直到跌回阈值以下（松开），
/// 两个跳变都完成后才返回。
///
/// 无超时：没有按压就永远阻塞——启停由操作员控制，这是接受的设计。
///
/// `poll_interval` 为零时紧轮询（嵌入式目标上的正确行为）；
/// 非零时每次采样之间用 `spin_sleep` 等待该间隔。
///
/// # 错误
///
/// 传感器读取失败立即向上传播，对调用方是致命的。
pub fn wait_for_press_release<S>(
    source: &mut S,
    poll_interval: Duration,
) -> Result<(), HardwareError>
where
    S: SampleSource + ?Sized,
{
    while source.fetch_sample()? < PRESS_THRESHOLD {
        pause(poll_interval);
    }
    while source.fetch_sample()? > PRESS_THRESHOLD {
        pause(poll_interval);
    }
    Ok(())
}

fn pause(interval: Duration) {
    if !interval.is_zero() {
        spin_sleep::sleep(interval);
    }
}
