//! 总线监控命令
//!
//! 后台 `BusMonitor` 把记录写入有界队列，前台线程打印，直到 Ctrl+C 或达到时长。

use crate::oneshot::{OneShot, install_ctrlc};
use anyhow::Result;
use clap::Args;
use crossbeam_channel::RecvTimeoutError;
use motorbus_driver::{ChannelSink, MonitorRecord, MonitorStatsSnapshot};
use motorbus_protocol::DecodedFrame;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// 监控命令参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 监控时长（秒），0 表示直到 Ctrl+C
    #[arg(short, long, default_value_t = 0)]
    pub duration: u64,

    /// 只显示可解码的电机命令
    #[arg(long)]
    pub commands_only: bool,
}

impl MonitorCommand {
    pub fn execute(&self, oneshot: &OneShot) -> Result<()> {
        let running = install_ctrlc()?;
        let bus = oneshot.connect()?;

        let (sink, rx) = ChannelSink::new(bus.config().sink_capacity);
        bus.start_monitor(Arc::new(sink))?;
        println!("👀 监控中，按 Ctrl+C 停止...");

        let start = Instant::now();
        let limit = (self.duration > 0).then(|| Duration::from_secs(self.duration));

        while running.load(Ordering::SeqCst) {
            if limit.is_some_and(|limit| start.elapsed() >= limit) {
                println!("⏱️  达到时长限制");
                break;
            }

            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(record) => {
                    if self.commands_only && !matches!(record.decoded, DecodedFrame::Command(_)) {
                        continue;
                    }
                    println!("{}", format_record(&record, start));
                },
                Err(RecvTimeoutError::Timeout) => {
                    if !bus.monitor().is_running() {
                        println!("⚠️  监控线程已退出");
                        break;
                    }
                },
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        bus.stop_monitor();
        println!("{}", format_stats(&bus.monitor().stats(), start.elapsed()));
        Ok(())
    }
}

/// 单行输出：`[   1.234s] 0x06000001 [8] 23 00 20 01 00 00 13 88 (EXT)  speed left(1) +50 (driver 5000)`
pub fn format_record(record: &MonitorRecord, start: Instant) -> String {
    let elapsed = record.timestamp.saturating_duration_since(start).as_secs_f64();
    match record.decoded {
        DecodedFrame::Command(cmd) => format!("[{:>8.3}s] {}  {}", elapsed, record.frame, cmd),
        DecodedFrame::Raw(_) => format!("[{:>8.3}s] {}", elapsed, record.frame),
    }
}

/// 监控结束时的统计摘要
pub fn format_stats(stats: &MonitorStatsSnapshot, elapsed: Duration) -> String {
    [
        format!("\n📊 监控统计（{:.1}s）", elapsed.as_secs_f64()),
        format!("  接收帧:     {}", stats.frames_received),
        format!(
            "  电机命令:   {} ({:.1}%)",
            stats.commands_decoded,
            stats.command_rate()
        ),
        format!("  接收超时:   {}", stats.timeouts),
        format!("  接收错误:   {}", stats.receive_errors),
        format!("  丢弃记录:   {}", stats.records_dropped),
    ]
    .join("\n")
}
