//! 巡线控制回路
//!
//! 差速 PD/PI 控制律与拥有电机/反射率传感器句柄的回路任务。
//! 纯计算（[`LineFollower`]）与副作用（电机指令、显示输出）分离，
//! 控制律本身可以脱离任何硬件做单元测试。
//!
//! # 控制律
//!
//! 每次迭代：
//!
//! ```text
//! delta  = sample - standard
//! delta += (delta - stored_delta) * dfactor
//! left   = -ratio * delta + base
//! right  = +ratio * delta + base
//! stored_delta = stored_delta * ifactor + delta * (1 - ifactor)
//! ```
//!
//! 微分项参照的是上一迭代经过指数平滑后的 `stored_delta`，不是原始误差。
//! 微分与积分项因此互相耦合——这是既定的单程滤波行为，必须原样保留，
//! 不要“修正”成教科书式的 PD。

use crate::config::TrackerConfig;
use crate::error::HardwareError;
use crate::hardware::{DisplaySink, Motor, SampleSource};
use crate::run_state::RunFlag;
use crate::state::{ControlSnapshot, TrackerContext};
use std::sync::Arc;
use tracing::{debug, warn};

/// 单次控制迭代的输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    /// 增广后的误差
    pub delta: f64,
    /// 左电机功率
    pub left_power: f64,
    /// 右电机功率
    pub right_power: f64,
    /// 更新后的存储误差
    pub stored_delta: f64,
}

impl ControlOutput {
    /// 左电机整数速度指令（向零截断，与原控制器一致）
    pub fn left_speed(&self) -> i32 {
        self.left_power as i32
    }

    /// 右电机整数速度指令
    pub fn right_speed(&self) -> i32 {
        self.right_power as i32
    }
}

/// 巡线控制律（纯状态机）
///
/// 唯一跨迭代保留的状态是 `stored_delta`，初始化为 `standard`。
/// 符号约定编码“沿线右沿行驶”：读数比参考值亮时左侧减速、右侧加速。
#[derive(Debug, Clone)]
pub struct LineFollower {
    standard: f64,
    base: f64,
    ratio: f64,
    dfactor: f64,
    ifactor: f64,
    stored_delta: f64,
}

impl LineFollower {
    /// 按配置创建，`stored_delta` 初始化为 `standard`
    pub fn new(config: &TrackerConfig) -> Self {
        Self::with_stored_delta(config, config.standard)
    }

    /// 指定初始存储误差创建（测试与分析用）
    pub fn with_stored_delta(config: &TrackerConfig, stored_delta: f64) -> Self {
        Self {
            standard: config.standard,
            base: config.base,
            ratio: config.ratio,
            dfactor: config.dfactor,
            ifactor: config.ifactor,
            stored_delta,
        }
    }

    /// 当前存储误差
    pub fn stored_delta(&self) -> f64 {
        self.stored_delta
    }

    /// 执行一次控制迭代
    pub fn step(&mut self, sample: f64) -> ControlOutput {
        let mut delta = sample - self.standard;
        delta += (delta - self.stored_delta) * self.dfactor;

        let left_power = -self.ratio * delta + self.base;
        let right_power = self.ratio * delta + self.base;

        self.stored_delta = self.stored_delta * self.ifactor + delta * (1.0 - self.ifactor);

        ControlOutput {
            delta,
            left_power,
            right_power,
            stored_delta: self.stored_delta,
        }
    }
}

/// 巡线回路任务
///
/// 在运行标志为 Running 期间以传感器 IO 限速的频率迭代：读采样、
/// 算功率、发电机指令、输出状态行。电机与反射率传感器句柄由本任务
/// 独占，退出时（无论正常停机还是中途出错）都走同一条释放路径：
/// 两个电机滑行（不刹车），然后恰好释放一次所有句柄。
///
/// # 错误
///
/// 传感器读取或电机指令失败对本任务是致命的：停止迭代、完成释放后
/// 把错误返回给 join 它的编排器。释放本身的失败只记录日志。
pub fn control_loop<R, M, D>(
    mut sensor: R,
    mut left: M,
    mut right: M,
    display: Arc<D>,
    run_flag: RunFlag,
    ctx: Arc<TrackerContext>,
    config: &TrackerConfig,
) -> Result<(), HardwareError>
where
    R: SampleSource,
    M: Motor,
    D: DisplaySink + ?Sized,
{
    let mut follower = LineFollower::new(config);
    let result = drive(
        &mut sensor,
        &mut left,
        &mut right,
        display.as_ref(),
        &run_flag,
        &ctx,
        config,
        &mut follower,
    );

    // 释放恰好一次，失败不阻塞停机
    if let Err(e) = left.coast() {
        warn!("left motor coast failed: {e}");
    }
    if let Err(e) = right.coast() {
        warn!("right motor coast failed: {e}");
    }
    if let Err(e) = left.close() {
        warn!("left motor release failed: {e}");
    }
    if let Err(e) = right.close() {
        warn!("right motor release failed: {e}");
    }
    if let Err(e) = sensor.close() {
        warn!("reflectance sensor release failed: {e}");
    }

    debug!("control loop exited");
    result
}

#[allow(clippy::too_many_arguments)]
fn drive<R, M, D>(
    sensor: &mut R,
    left: &mut M,
    right: &mut M,
    display: &D,
    run_flag: &RunFlag,
    ctx: &TrackerContext,
    config: &TrackerConfig,
    follower: &mut LineFollower,
) -> Result<(), HardwareError>
where
    R: SampleSource,
    M: Motor,
    D: DisplaySink + ?Sized,
{
    left.forward()?;
    right.forward()?;

    let mut iterations: u64 = 0;

    while run_flag.is_running() {
        let sample = sensor.fetch_sample()?;
        let out = follower.step(sample);
        iterations += 1;

        // fire-and-forget 的状态输出，不参与控制
        display.draw_line(&format!("Delta: {:.6}", out.delta), 3);
        display.draw_line(&format!("LPower: {:.6}", out.left_power), 4);
        display.draw_line(&format!("RPower: {:.6}", out.right_power), 5);
        display.draw_line(&format!("Stored: {:.6}", out.stored_delta), 6);
        display.refresh();

        left.set_speed(out.left_speed())?;
        right.set_speed(out.right_speed())?;

        // 重发 forward 使新速度立即生效
        left.forward()?;
        right.forward()?;

        ctx.control.store(Arc::new(ControlSnapshot {
            delta: out.delta,
            left_power: out.left_power,
            right_power: out.right_power,
            stored_delta: out.stored_delta,
            iterations,
        }));

        if !config.poll_interval.is_zero() {
            spin_sleep::sleep(config.poll_interval);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{MotorEvent, NullDisplay, RecordingMotor, ScriptedSamples};
    use rand::Rng;
    use std::time::Duration;

    fn config() -> TrackerConfig {
        TrackerConfig::default()
    }

    #[test]
    fn test_power_sum_invariant() {
        // 对任意采样序列，left + right == 2 * BASE
        let mut follower = LineFollower::new(&config());
        let mut rng = rand::thread_rng();

        for _ in 0..1000 {
            let sample: f64 = rng.gen_range(0.0..=1.0);
            let out = follower.step(sample);
            assert!((out.left_power + out.right_power - 400.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_step_from_calibration_memory() {
        // stored_delta = 0.3，sample = 0.4：
        // 原始误差 0.1，增广后 0.1 + (0.1 - 0.3) * 1 = -0.1
        // left = -800 * (-0.1) + 200 = 280，right = 800 * (-0.1) + 200 = 120
        let mut follower = LineFollower::new(&config());
        assert_eq!(follower.stored_delta(), 0.3);

        let out = follower.step(0.4);
        assert!((out.delta - (-0.1)).abs() < 1e-12);
        assert!((out.left_power - 280.0).abs() < 1e-9);
        assert!((out.right_power - 120.0).abs() < 1e-9);

        // stored' = 0.3 * 0.3 + (-0.1) * 0.7 = 0.02
        assert!((out.stored_delta - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_on_line_with_zeroed_memory_holds_base() {
        // 记忆项为零时，sample == standard 每次都精确输出 BASE/BASE
        let mut follower = LineFollower::with_stored_delta(&config(), 0.0);

        for _ in 0..3 {
            let out = follower.step(0.3);
            assert!(out.delta.abs() < 1e-12);
            assert!((out.left_power - 200.0).abs() < 1e-12);
            assert!((out.right_power - 200.0).abs() < 1e-12);
            assert!(follower.stored_delta().abs() < 1e-12);
        }
    }

    #[test]
    fn test_on_line_converges_to_base() {
        // 从标定初值出发，持续在线上时 stored_delta 指数衰减到 0，
        // 输出收敛到 BASE/BASE
        let mut follower = LineFollower::new(&config());

        let mut out = follower.step(0.3);
        for _ in 0..200 {
            out = follower.step(0.3);
        }

        assert!(follower.stored_delta().abs() < 1e-9);
        assert!((out.left_power - 200.0).abs() < 1e-6);
        assert!((out.right_power - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_off_line_steady_state() {
        // sample = 0.4 恒定时的不动点：stored = 0.1，delta = 0.1，
        // left = 120，right = 280
        let mut follower = LineFollower::new(&config());

        let mut out = follower.step(0.4);
        for _ in 0..200 {
            out = follower.step(0.4);
        }

        assert!((out.delta - 0.1).abs() < 1e-9);
        assert!((out.left_power - 120.0).abs() < 1e-6);
        assert!((out.right_power - 280.0).abs() < 1e-6);
    }

    #[test]
    fn test_sign_symmetric_errors_mirror_powers() {
        let cfg = config();
        let mut bright = LineFollower::with_stored_delta(&cfg, 0.0);
        let mut dark = LineFollower::with_stored_delta(&cfg, 0.0);

        let out_bright = bright.step(0.3 + 0.05);
        let out_dark = dark.step(0.3 - 0.05);

        assert!((out_bright.left_power - out_dark.right_power).abs() < 1e-9);
        assert!((out_bright.right_power - out_dark.left_power).abs() < 1e-9);
    }

    #[test]
    fn test_speed_cast_truncates_toward_zero() {
        let out = ControlOutput {
            delta: 0.0,
            left_power: 280.9,
            right_power: -40.7,
            stored_delta: 0.0,
        };
        assert_eq!(out.left_speed(), 280);
        assert_eq!(out.right_speed(), -40);
    }

    #[test]
    fn test_control_loop_exits_when_idle_and_releases_handles() {
        let cfg = TrackerConfig {
            poll_interval: Duration::from_micros(100),
            ..TrackerConfig::default()
        };
        let run_flag = RunFlag::new();
        run_flag.set_running();

        let left = RecordingMotor::new("left");
        let right = RecordingMotor::new("right");
        let left_events = left.events();
        let right_events = right.events();

        // 读若干采样后翻回 Idle，回路应在下一次标志检查时退出
        let stopper = run_flag.clone();
        let sensor = ScriptedSamples::new([0.4]).on_read(move |reads| {
            if reads >= 5 {
                stopper.set_idle();
            }
        });

        let ctx = Arc::new(TrackerContext::new());
        control_loop(
            sensor,
            left,
            right,
            Arc::new(NullDisplay),
            run_flag,
            ctx.clone(),
            &cfg,
        )
        .unwrap();

        let events = left_events.lock().unwrap();
        // 滑行一次、释放一次，且滑行在释放之前
        let coasts = events.iter().filter(|e| **e == MotorEvent::Coast).count();
        let closes = events.iter().filter(|e| **e == MotorEvent::Close).count();
        assert_eq!(coasts, 1);
        assert_eq!(closes, 1);
        assert_eq!(events.last(), Some(&MotorEvent::Close));

        // 运行期间确实发出过速度指令
        assert!(events.iter().any(|e| matches!(e, MotorEvent::Speed(_))));
        drop(events);

        let events = right_events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| **e == MotorEvent::Close).count(), 1);

        assert!(ctx.control_snapshot().iterations >= 5);
    }

    #[test]
    fn test_control_loop_sensor_failure_is_fatal_but_still_releases() {
        let cfg = config();
        let run_flag = RunFlag::new();
        run_flag.set_running();

        let left = RecordingMotor::new("left");
        let right = RecordingMotor::new("right");
        let left_events = left.events();

        // 两个有效采样之后传感器失效
        let sensor = ScriptedSamples::erroring([0.4, 0.4]);

        let ctx = Arc::new(TrackerContext::new());
        let err = control_loop(
            sensor,
            left,
            right,
            Arc::new(NullDisplay),
            run_flag,
            ctx,
            &cfg,
        )
        .unwrap_err();

        assert!(matches!(err, HardwareError::SensorRead(_)));

        // 出错路径同样滑行并释放恰好一次
        let events = left_events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| **e == MotorEvent::Coast).count(), 1);
        assert_eq!(events.iter().filter(|e| **e == MotorEvent::Close).count(), 1);
    }

    #[test]
    fn test_control_loop_idle_flag_means_no_iterations() {
        let cfg = config();
        let run_flag = RunFlag::new(); // 保持 Idle

        let left = RecordingMotor::new("left");
        let right = RecordingMotor::new("right");
        let left_events = left.events();

        let ctx = Arc::new(TrackerContext::new());
        control_loop(
            ScriptedSamples::new([0.4]),
            left,
            right,
            Arc::new(NullDisplay),
            run_flag,
            ctx.clone(),
            &cfg,
        )
        .unwrap();

        assert_eq!(ctx.control_snapshot().iterations, 0);

        // 没有速度指令，但仍然走了释放路径
        let events = left_events.lock().unwrap();
        assert!(!events.iter().any(|e| matches!(e, MotorEvent::Speed(_))));
        assert_eq!(events.iter().filter(|e| **e == MotorEvent::Close).count(), 1);
    }
}
