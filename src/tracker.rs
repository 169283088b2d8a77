//! 追踪器编排
//!
//! 主流程：等待启动手势 → 置 Running → 拉起遥测与巡线线程 →
//! 防抖间隔 → 等待停止手势 → 置 Idle → join 两个线程。
//!
//! 三个执行流之间唯一的协调原语是共享运行标志；线程在标志翻到
//! Running 之后才拉起，所以 Idle→Running 严格先于任何回路迭代。

use crate::button::wait_for_press_release;
use crate::config::TrackerConfig;
use crate::control::control_loop;
use crate::error::TrackerError;
use crate::hardware::{DisplaySink, Motor, SampleSource, VoltageSource};
use crate::run_state::RunFlag;
use crate::state::{ControlSnapshot, TelemetrySnapshot, TrackerContext};
use crate::telemetry::telemetry_loop;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

/// 硬件协作者集合
///
/// 所有注入的硬件句柄集中到一个结构体，避免参数列表过长。
/// 反射率传感器和两个电机会被移动进巡线线程并由其独占，
/// 电压源被移动进遥测线程；按钮留在编排器手里。
pub struct Rig<B, R, V, M, D>
where
    D: ?Sized,
{
    /// 启停按钮（触碰传感器）
    pub button: B,
    /// 反射率传感器
    pub reflectance: R,
    /// 电压采样源
    pub voltage: V,
    /// 左电机
    pub left_motor: M,
    /// 右电机
    pub right_motor: M,
    /// 显示/日志接收端（两个回路共享）
    pub display: Arc<D>,
}

/// 一次启停周期结束时的最终快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerReport {
    /// 巡线回路最后一次迭代
    pub control: ControlSnapshot,
    /// 遥测最后一次采样
    pub telemetry: TelemetrySnapshot,
}

/// 运行一次完整的启停周期（阻塞）
///
/// 每个进程生命周期只有一个 Running→Idle 周期：本函数返回后标志
/// 不会再回到 Running。
///
/// 停机顺序：停止手势（或按钮读取失败）→ 置 Idle → 释放按钮句柄 →
/// join 遥测线程 → join 巡线线程（取回其释放结果）。即使按钮中途
/// 失效，也先收拢两个线程再向上传播错误，保证电机已经滑行并释放。
///
/// # 错误
///
/// - 按钮读取失败：致命（编排器没有按钮无法继续）
/// - 巡线回路错误或 panic：致命，join 后向上传播
/// - 遥测线程 panic：仅记录（纯观测子系统）
pub fn run_tracker<B, R, V, M, D>(
    rig: Rig<B, R, V, M, D>,
    config: TrackerConfig,
) -> Result<TrackerReport, TrackerError>
where
    B: SampleSource,
    R: SampleSource + Send + 'static,
    V: VoltageSource + Send + 'static,
    M: Motor + Send + 'static,
    D: DisplaySink + ?Sized + Send + Sync + 'static,
{
    let Rig {
        mut button,
        reflectance,
        voltage,
        left_motor,
        right_motor,
        display,
    } = rig;

    let run_flag = RunFlag::new();
    let ctx = Arc::new(TrackerContext::new());

    // 启动手势：无超时阻塞等待
    wait_for_press_release(&mut button, config.poll_interval)?;

    display.draw_line("Starting...", 6);
    display.refresh();
    info!("start gesture detected, entering Running");

    run_flag.set_running();

    let telemetry_flag = run_flag.clone();
    let telemetry_ctx = ctx.clone();
    let telemetry_display = display.clone();
    let telemetry_period = config.telemetry_period;
    let telemetry_thread = thread::spawn(move || {
        telemetry_loop(
            voltage,
            telemetry_display,
            telemetry_flag,
            telemetry_ctx,
            telemetry_period,
        );
    });

    let control_flag = run_flag.clone();
    let control_ctx = ctx.clone();
    let control_display = display.clone();
    let control_config = config.clone();
    let control_thread = thread::spawn(move || {
        control_loop(
            reflectance,
            left_motor,
            right_motor,
            control_display,
            control_flag,
            control_ctx,
            &control_config,
        )
    });

    // 防抖：同一次物理按压不会被同时当作启动和停止
    spin_sleep::sleep(config.debounce_guard);

    // 停止手势。读取失败也要先把线程收拢干净再传播错误。
    let gesture = wait_for_press_release(&mut button, config.poll_interval);

    run_flag.set_idle();
    info!("stop requested, entering Idle");

    if let Err(e) = button.close() {
        warn!("button sensor release failed: {e}");
    }

    if telemetry_thread.join().is_err() {
        error!("telemetry thread panicked");
    }

    let control_result = match control_thread.join() {
        Ok(result) => result.map_err(TrackerError::from),
        Err(_) => Err(TrackerError::ControlPanicked),
    };

    gesture?;
    control_result?;

    Ok(TrackerReport {
        control: ctx.control_snapshot(),
        telemetry: ctx.telemetry_snapshot(),
    })
}
