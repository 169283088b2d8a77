//! 仿真与测试用硬件实现
//!
//! 没有真实机器人时，demo 二进制用这里的实现跑完整个启停周期；
//! 单元与集成测试用它们注入脚本化输入、记录电机指令序列。
//! 真实设备驱动只需实现 [`crate::hardware`] 中的同一组 trait。

use crate::error::HardwareError;
use crate::hardware::{DisplaySink, Motor, SampleSource, VoltageSource};
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// ==================== 采样源 ====================

/// 脚本耗尽后的行为
enum Exhausted {
    /// 重复最后一个样本（传感器读数保持不变）
    RepeatLast,
    /// 返回读取错误（传感器失效）
    Fail,
}

/// 脚本化采样源
///
/// 依次返回预置样本；脚本耗尽后按构造方式重复最后一个值或开始报错。
pub struct ScriptedSamples {
    samples: VecDeque<f64>,
    last: f64,
    reads: u64,
    exhausted: Exhausted,
    on_read: Option<Box<dyn FnMut(u64) + Send>>,
}

impl ScriptedSamples {
    /// 耗尽后重复最后一个样本
    pub fn new(samples: impl IntoIterator<Item = f64>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            last: 0.0,
            reads: 0,
            exhausted: Exhausted::RepeatLast,
            on_read: None,
        }
    }

    /// 耗尽后返回 `SensorRead` 错误（模拟传感器中途失效）
    pub fn erroring(samples: impl IntoIterator<Item = f64>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            last: 0.0,
            reads: 0,
            exhausted: Exhausted::Fail,
            on_read: None,
        }
    }

    /// 注册每次读取后的回调（参数为累计读取次数）
    ///
    /// 测试用：比如读满 N 次后从外部翻转运行标志。
    pub fn on_read<F>(mut self, hook: F) -> Self
    where
        F: FnMut(u64) + Send + 'static,
    {
        self.on_read = Some(Box::new(hook));
        self
    }

    /// 累计读取次数
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl SampleSource for ScriptedSamples {
    fn fetch_sample(&mut self) -> Result<f64, HardwareError> {
        self.reads += 1;

        let result = match self.samples.pop_front() {
            Some(sample) => {
                self.last = sample;
                Ok(sample)
            },
            None => match self.exhausted {
                Exhausted::RepeatLast => Ok(self.last),
                Exhausted::Fail => Err(HardwareError::SensorRead(
                    "scripted sensor exhausted".to_string(),
                )),
            },
        };

        if let Some(hook) = self.on_read.as_mut() {
            hook(self.reads);
        }

        result
    }
}

/// 通道采样源
///
/// 每次读取最多消费通道里的一个值，通道为空时重复最后一个值——
/// 行为等价于一个电平型传感器。用于在被测代码于另一个线程阻塞
/// 轮询时，从测试线程注入按钮按压。
pub struct ChannelSamples {
    rx: Receiver<f64>,
    last: f64,
}

impl ChannelSamples {
    /// 创建采样源及其馈送端
    pub fn new(initial: f64) -> (Sender<f64>, Self) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (tx, Self { rx, last: initial })
    }
}

impl SampleSource for ChannelSamples {
    fn fetch_sample(&mut self) -> Result<f64, HardwareError> {
        if let Ok(sample) = self.rx.try_recv() {
            self.last = sample;
        }
        Ok(self.last)
    }
}

/// 定时按钮：在预设时间窗内读作“按下”
///
/// 窗口相对构造时刻计算，demo 用它编排启动/停止手势。
pub struct TimedButton {
    start: Instant,
    press_windows: Vec<(Duration, Duration)>,
}

impl TimedButton {
    /// `press_windows`: (开始, 结束) 时间窗列表，窗内读数为 1.0
    pub fn new(press_windows: Vec<(Duration, Duration)>) -> Self {
        Self {
            start: Instant::now(),
            press_windows,
        }
    }
}

impl SampleSource for TimedButton {
    fn fetch_sample(&mut self) -> Result<f64, HardwareError> {
        let elapsed = self.start.elapsed();
        let pressed = self
            .press_windows
            .iter()
            .any(|(from, to)| elapsed >= *from && elapsed < *to);
        Ok(if pressed { 1.0 } else { 0.0 })
    }
}

/// 正弦反射率：围绕参考值缓慢摆动，模拟机器人在线两侧来回穿越
pub struct SineReflectance {
    start: Instant,
    center: f64,
    amplitude: f64,
    period: Duration,
}

impl SineReflectance {
    pub fn new(center: f64, amplitude: f64, period: Duration) -> Self {
        Self {
            start: Instant::now(),
            center,
            amplitude,
            period,
        }
    }
}

impl SampleSource for SineReflectance {
    fn fetch_sample(&mut self) -> Result<f64, HardwareError> {
        let phase = self.start.elapsed().as_secs_f64() / self.period.as_secs_f64();
        let sample = self.center + self.amplitude * (phase * std::f64::consts::TAU).sin();
        Ok(sample.clamp(0.0, 1.0))
    }
}

// ==================== 电压源 ====================

/// 恒定电压源
pub struct ConstantVoltage(pub i32);

impl VoltageSource for ConstantVoltage {
    fn voltage_millivolts(&mut self) -> Result<i32, HardwareError> {
        Ok(self.0)
    }
}

// ==================== 电机 ====================

/// 电机指令事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorEvent {
    /// 设置速度
    Speed(i32),
    /// 前进
    Forward,
    /// 滑行
    Coast,
    /// 释放句柄
    Close,
}

/// 记录电机：把收到的指令序列追加到共享事件日志
///
/// 事件日志通过 `Arc<Mutex<_>>` 共享，电机本体被移动进巡线线程后
/// 测试仍然可以检查指令序列。
pub struct RecordingMotor {
    name: &'static str,
    events: Arc<Mutex<Vec<MotorEvent>>>,
}

impl RecordingMotor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 事件日志句柄（在电机移交给回路之前克隆保留）
    pub fn events(&self) -> Arc<Mutex<Vec<MotorEvent>>> {
        self.events.clone()
    }

    fn record(&self, event: MotorEvent) {
        trace!("motor {}: {:?}", self.name, event);
        self.events.lock().expect("motor event log poisoned").push(event);
    }
}

impl Motor for RecordingMotor {
    fn set_speed(&mut self, speed: i32) -> Result<(), HardwareError> {
        self.record(MotorEvent::Speed(speed));
        Ok(())
    }

    fn forward(&mut self) -> Result<(), HardwareError> {
        self.record(MotorEvent::Forward);
        Ok(())
    }

    fn coast(&mut self) -> Result<(), HardwareError> {
        self.record(MotorEvent::Coast);
        Ok(())
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        self.record(MotorEvent::Close);
        Ok(())
    }
}

/// 日志电机：把指令写进 tracing，demo 用
pub struct SimMotor {
    name: &'static str,
    speed: i32,
}

impl SimMotor {
    pub fn new(name: &'static str) -> Self {
        Self { name, speed: 0 }
    }
}

impl Motor for SimMotor {
    fn set_speed(&mut self, speed: i32) -> Result<(), HardwareError> {
        self.speed = speed;
        Ok(())
    }

    fn forward(&mut self) -> Result<(), HardwareError> {
        trace!("motor {} forward at speed {}", self.name, self.speed);
        Ok(())
    }

    fn coast(&mut self) -> Result<(), HardwareError> {
        debug!("motor {} coasting", self.name);
        Ok(())
    }

    fn close(&mut self) -> Result<(), HardwareError> {
        debug!("motor {} released", self.name);
        Ok(())
    }
}

// ==================== 显示端 ====================

/// 空显示端：丢弃所有输出
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn clear(&self) {}
    fn draw_line(&self, _text: &str, _row: u8) {}
    fn refresh(&self) {}
}

/// tracing 显示端：把每行状态写成 debug 日志，demo 用
pub struct TraceDisplay;

impl DisplaySink for TraceDisplay {
    fn clear(&self) {}

    fn draw_line(&self, text: &str, row: u8) {
        debug!(row, "{text}");
    }

    fn refresh(&self) {}
}

/// 记录显示端：保留所有 (行号, 文本)，测试用
pub struct RecordingDisplay {
    lines: Mutex<Vec<(u8, String)>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
        }
    }

    /// 目前为止写入的所有行
    pub fn lines(&self) -> Vec<(u8, String)> {
        self.lines.lock().expect("display log poisoned").clone()
    }
}

impl Default for RecordingDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for RecordingDisplay {
    fn clear(&self) {}

    fn draw_line(&self, text: &str, row: u8) {
        self.lines
            .lock()
            .expect("display log poisoned")
            .push((row, text.to_string()));
    }

    fn refresh(&self) {}
}
