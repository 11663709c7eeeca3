//! 有界队列输出
//!
//! - **Bounded Queue**: `bounded(capacity)`，防止消费端卡顿导致内存无限增长
//! - **非阻塞**: `try_send`，队列满时丢弃记录而不是阻塞监控线程
//! - **丢弃计数**: `dropped_records()` 可跨线程读取
//!
//! ```rust
//! use motorbus_driver::{ChannelSink, MonitorSink};
//! use std::sync::Arc;
//!
//! let (sink, rx) = ChannelSink::new(1024);
//! let dropped = Arc::clone(sink.dropped_records());
//! let sink: Arc<dyn MonitorSink> = Arc::new(sink);
//!
//! std::thread::spawn(move || {
//!     while let Ok(record) = rx.recv() {
//!         println!("{}", record.frame);
//!     }
//! });
//! # let _ = (sink, dropped);
//! ```

use crate::{MonitorRecord, MonitorSink};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 基于 crossbeam 有界通道的输出
pub struct ChannelSink {
    tx: Sender<MonitorRecord>,
    dropped_records: Arc<AtomicU64>,
}

impl ChannelSink {
    /// 创建输出端和接收端（容量至少为 1）
    #[must_use]
    pub fn new(capacity: usize) -> (Self, Receiver<MonitorRecord>) {
        let (tx, rx) = bounded(capacity.max(1));
        let sink = Self {
            tx,
            dropped_records: Arc::new(AtomicU64::new(0)),
        };
        (sink, rx)
    }

    /// 丢弃计数器
    pub fn dropped_records(&self) -> &Arc<AtomicU64> {
        &self.dropped_records
    }
}

impl MonitorSink for ChannelSink {
    fn on_record(&self, record: MonitorRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped_records.fetch_add(1, Ordering::Relaxed);
                false
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motorbus_protocol::{MotorFrame, decode};
    use std::time::Instant;

    fn record(id: u32) -> MonitorRecord {
        let frame = MotorFrame::new_extended(id, &[0; 8]);
        MonitorRecord {
            timestamp: Instant::now(),
            frame,
            decoded: decode(&frame),
        }
    }

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, rx) = ChannelSink::new(4);
        for id in 1..=3 {
            assert!(sink.on_record(record(id)));
        }
        let ids: Vec<u32> = rx.try_iter().map(|r| r.frame.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (sink, rx) = ChannelSink::new(2);
        assert!(sink.on_record(record(1)));
        assert!(sink.on_record(record(2)));
        assert!(!sink.on_record(record(3)));
        assert_eq!(sink.dropped_records().load(Ordering::Relaxed), 1);
        assert_eq!(rx.len(), 2);
    }

    #[test]
    fn test_channel_sink_counts_disconnected() {
        let (sink, rx) = ChannelSink::new(2);
        drop(rx);
        assert!(!sink.on_record(record(1)));
        assert_eq!(sink.dropped_records().load(Ordering::Relaxed), 1);
    }
}
