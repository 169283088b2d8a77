//! 仿真演示入口
//!
//! 没有命令行参数、环境变量或配置文件；用定时按钮和正弦反射率
//! 跑一个完整的启停周期。第二次“按压-松开”之后自然退出，退出码 0；
//! 致命硬件错误打印追踪信息后以非零退出码终止。

use linetrack::sim::{ConstantVoltage, SimMotor, SineReflectance, TimedButton, TraceDisplay};
use linetrack::{Rig, TrackerConfig, run_tracker};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    // 分时宿主环境：给轮询回路 2ms 间隔，其余保持标定默认值
    let config = TrackerConfig {
        poll_interval: Duration::from_millis(2),
        ..TrackerConfig::default()
    };

    let rig = Rig {
        // 0.2s 处按下启动，4.0s 处按下停止
        button: TimedButton::new(vec![
            (Duration::from_millis(200), Duration::from_millis(400)),
            (Duration::from_millis(4000), Duration::from_millis(4200)),
        ]),
        // 围绕标定点 0.3 摆动的反射率，模拟在线两侧来回穿越
        reflectance: SineReflectance::new(0.3, 0.1, Duration::from_secs(2)),
        voltage: ConstantVoltage(7960),
        left_motor: SimMotor::new("left"),
        right_motor: SimMotor::new("right"),
        display: Arc::new(TraceDisplay),
    };

    match run_tracker(rig, config) {
        Ok(report) => {
            info!(
                "run finished: {} control iterations, {} telemetry samples, \
                 final powers {:.1}/{:.1}, last voltage {}mV",
                report.control.iterations,
                report.telemetry.iterations,
                report.control.left_power,
                report.control.right_power,
                report.telemetry.voltage_mv,
            );
            ExitCode::SUCCESS
        },
        Err(e) => {
            error!("tracker failed: {e}");
            ExitCode::FAILURE
        },
    }
}
