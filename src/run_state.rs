//! 运行状态标志
//!
//! 单写多读的原子布尔，是各回路之间唯一的协调原语：
//! 不用消息传递，读者每次迭代轮询一次。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// 空闲（初始状态，以及停止手势之后）
    #[default]
    Idle,
    /// 运行中（启动手势之后）
    Running,
}

/// 共享运行标志
///
/// 编排器是唯一写者，整个进程生命周期内只写两次（Running 再 Idle，
/// 之后不会再回到 Running）。两个回路作为读者在每次迭代开头轮询。
///
/// store 用 `Release`、load 用 `Acquire`，保证 Idle 写入在读者的
/// 一个迭代周期内可见（遥测受其 1s 周期限制，巡线受传感器 IO 延迟限制）。
#[derive(Debug, Clone)]
pub struct RunFlag {
    inner: Arc<AtomicBool>,
}

impl RunFlag {
    /// 创建新标志，初始为 Idle
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 当前状态
    pub fn state(&self) -> RunState {
        if self.is_running() { RunState::Running } else { RunState::Idle }
    }

    /// 是否处于 Running
    pub fn is_running(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// 置为 Running（仅编排器调用）
    pub fn set_running(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// 置为 Idle（仅编排器调用）
    pub fn set_idle(&self) {
        self.inner.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let flag = RunFlag::new();
        assert!(!flag.is_running());
        assert_eq!(flag.state(), RunState::Idle);
    }

    #[test]
    fn test_transitions() {
        let flag = RunFlag::new();
        flag.set_running();
        assert_eq!(flag.state(), RunState::Running);
        flag.set_idle();
        assert_eq!(flag.state(), RunState::Idle);
    }

    #[test]
    fn test_clones_share_state() {
        let writer = RunFlag::new();
        let reader = writer.clone();
        writer.set_running();
        assert!(reader.is_running());
        writer.set_idle();
        assert!(!reader.is_running());
    }

    #[test]
    fn test_visible_across_threads() {
        let writer = RunFlag::new();
        let reader = writer.clone();
        writer.set_running();

        let handle = std::thread::spawn(move || {
            // 轮询直到观察到 Idle，验证跨线程可见性
            while reader.is_running() {
                std::thread::yield_now();
            }
        });

        writer.set_idle();
        handle.join().unwrap();
    }
}
