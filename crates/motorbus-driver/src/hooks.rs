//! 监控输出接口
//!
//! 监控线程对每个接收帧调用一次 [`MonitorSink::on_record`]。
//!
//! # 性能要求
//!
//! 回调在监控线程上执行，必须立即返回：禁止阻塞 I/O 和长时间持锁。
//! 需要异步处理时使用 [`ChannelSink`](crate::ChannelSink)。
//!
//! ```rust
//! use motorbus_driver::{MonitorRecord, MonitorSink};
//! use std::sync::Arc;
//!
//! let sink: Arc<dyn MonitorSink> = Arc::new(|record: MonitorRecord| {
//!     println!("{}", record.frame);
//! });
//! ```

use crate::MonitorRecord;

/// 监控记录回调
pub trait MonitorSink: Send + Sync {
    /// 交付一条记录；返回 `false` 表示记录被丢弃（计入统计）
    fn on_record(&self, record: MonitorRecord) -> bool;
}

impl<F> MonitorSink for F
where
    F: Fn(MonitorRecord) + Send + Sync,
{
    fn on_record(&self, record: MonitorRecord) -> bool {
        self(record);
        true
    }
}
