//! # linetrack
//!
//! 差速巡线机器人的双线程控制回路。
//!
//! - **运行状态机**：去抖后的按钮手势驱动共享运行标志
//!   （单写多读原子布尔，各回路每次迭代轮询一次）
//! - **遥测采样**：固定周期读取电池电压并输出到显示端，纯观测
//! - **巡线控制**：以传感器 IO 限速的高频率执行 PD/PI 式滤波误差
//!   控制律，差分驱动左右电机
//!
//! 传感器、电机、显示都通过 [`hardware`] 中的 trait 注入；控制算法
//! （[`control::LineFollower`]）是无 IO 的纯状态机，可以脱离硬件测试。
//! [`sim`] 提供脚本化/仿真实现，供 demo 与测试使用。
//!
//! # Example
//!
//! ```no_run
//! use linetrack::{Rig, TrackerConfig, run_tracker};
//! use linetrack::sim::{
//!     ConstantVoltage, SimMotor, SineReflectance, TimedButton, TraceDisplay,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let rig = Rig {
//!     button: TimedButton::new(vec![
//!         (Duration::from_millis(200), Duration::from_millis(400)),
//!         (Duration::from_millis(4000), Duration::from_millis(4200)),
//!     ]),
//!     reflectance: SineReflectance::new(0.3, 0.1, Duration::from_secs(2)),
//!     voltage: ConstantVoltage(7960),
//!     left_motor: SimMotor::new("left"),
//!     right_motor: SimMotor::new("right"),
//!     display: Arc::new(TraceDisplay),
//! };
//!
//! let report = run_tracker(rig, TrackerConfig::default())?;
//! println!("final powers: {} / {}", report.control.left_power, report.control.right_power);
//! # Ok::<(), linetrack::TrackerError>(())
//! ```

pub mod button;
pub mod config;
pub mod control;
pub mod error;
pub mod hardware;
pub mod run_state;
pub mod sim;
pub mod state;
pub mod telemetry;
pub mod tracker;

pub use button::{PRESS_THRESHOLD, wait_for_press_release};
pub use config::TrackerConfig;
pub use control::{ControlOutput, LineFollower, control_loop};
pub use error::{HardwareError, TrackerError};
pub use hardware::{DisplaySink, Motor, SampleSource, VoltageSource};
pub use run_state::{RunFlag, RunState};
pub use state::{ControlSnapshot, TelemetrySnapshot, TrackerContext};
pub use telemetry::telemetry_loop;
pub use tracker::{Rig, TrackerReport, run_tracker};
