//! 监控统计
//!
//! 原子计数器，任何线程都可以无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 监控线程计数器
///
/// ```rust
/// use motorbus_driver::MonitorStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = MonitorStats::new();
/// stats.frames_received.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().frames_received, 1);
/// ```
#[derive(Debug, Default)]
pub struct MonitorStats {
    /// 接收到的帧数
    pub frames_received: AtomicU64,
    /// 解码为已知命令的帧数
    pub commands_decoded: AtomicU64,
    /// 接收超时次数（总线空闲时正常增长）
    pub timeouts: AtomicU64,
    /// 接收错误次数
    pub receive_errors: AtomicU64,
    /// 被输出端丢弃的记录数
    pub records_dropped: AtomicU64,
}

impl MonitorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MonitorStatsSnapshot {
        MonitorStatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            commands_decoded: self.commands_decoded.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.frames_received.store(0, Ordering::Relaxed);
        self.commands_decoded.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.receive_errors.store(0, Ordering::Relaxed);
        self.records_dropped.store(0, Ordering::Relaxed);
    }
}

/// 计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStatsSnapshot {
    pub frames_received: u64,
    pub commands_decoded: u64,
    pub timeouts: u64,
    pub receive_errors: u64,
    pub records_dropped: u64,
}

impl MonitorStatsSnapshot {
    /// 已知命令占接收帧的百分比；未收到帧时为 0
    pub fn command_rate(&self) -> f64 {
        if self.frames_received == 0 {
            return 0.0;
        }
        (self.commands_decoded as f64 / self.frames_received as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_stats_concurrent_increment() {
        let stats = Arc::new(MonitorStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.timeouts.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().timeouts, 4000);
    }

    #[test]
    fn test_stats_reset_and_rate() {
        let stats = MonitorStats::new();
        stats.frames_received.fetch_add(4, Ordering::Relaxed);
        stats.commands_decoded.fetch_add(3, Ordering::Relaxed);
        assert_eq!(stats.snapshot().command_rate(), 75.0);

        stats.reset();
        assert_eq!(stats.snapshot(), MonitorStatsSnapshot::default());
        assert_eq!(stats.snapshot().command_rate(), 0.0);
    }
}
