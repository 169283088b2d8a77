//! 电压遥测采样
//!
//! 固定周期（默认 1 Hz）读取电池电压并输出到显示端。
//! 纯观测子系统：读数不参与控制，读取失败也不影响其他任务。

use crate::hardware::{DisplaySink, VoltageSource};
use crate::run_state::RunFlag;
use crate::state::{TelemetrySnapshot, TrackerContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 遥测回路任务
///
/// 在运行标志为 Running 期间：读一次电压，输出 `Measure`/`Volt` 两行，
/// 发布快照，然后休眠一个周期。标志翻回 Idle 后，最多一个周期内退出。
///
/// 读取失败是非致命的：记录告警后照常休眠进入下一个周期（与致命的
/// 按钮/反射率读取失败不同）。
pub fn telemetry_loop<V, D>(
    mut voltage: V,
    display: Arc<D>,
    run_flag: RunFlag,
    ctx: Arc<TrackerContext>,
    period: Duration,
) where
    V: VoltageSource,
    D: DisplaySink + ?Sized,
{
    let mut iterations: u64 = 0;

    while run_flag.is_running() {
        match voltage.voltage_millivolts() {
            Ok(mv) => {
                iterations += 1;
                display.clear();
                display.draw_line(&format!("Measure: {iterations}"), 0);
                display.draw_line(&format!("Volt: {mv}mV"), 1);
                display.refresh();

                ctx.telemetry.store(Arc::new(TelemetrySnapshot {
                    voltage_mv: mv,
                    iterations,
                }));
            },
            Err(e) => warn!("voltage read failed: {e}"),
        }

        spin_sleep::sleep(period);
    }

    debug!("telemetry loop exited after {iterations} samples");
}
