//! 总线监控
//!
//! 后台线程循环调用 `Transport::recv(poll_timeout)`，把每个接收帧解码后交给
//! [`MonitorSink`]。状态机：`Idle -> Running -> Idle`。
//!
//! 停止是协作式的：`stop()` 清除运行标志，线程在下一次迭代开头退出；
//! `stop()` 的等待时间以 `stop_timeout` 为上限。

use crate::{BusConfig, BusSession, DriverError, MonitorSink, MonitorStats, MonitorStatsSnapshot};
use motorbus_can::{CanError, MotorFrame, Transport};
use motorbus_protocol::{DecodedFrame, decode};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// 带超时的 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 看门狗线程代为 join，超时后留给进程退出时回收
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 一条监控记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorRecord {
    /// 接收时间
    pub timestamp: Instant,
    pub frame: MotorFrame,
    pub decoded: DecodedFrame,
}

impl MonitorRecord {
    fn from_frame(frame: MotorFrame) -> Self {
        Self {
            timestamp: frame.timestamp.unwrap_or_else(Instant::now),
            frame,
            decoded: decode(&frame),
        }
    }
}

/// 一次运行：线程句柄 + 该次运行专属的取消标志
///
/// 每次 `start()` 创建新的标志；`stop()` 只清除当前运行的标志，
/// 停止超时后仍在退出途中的旧线程不会被下一次 `start()` 唤醒。
struct MonitorRun {
    handle: JoinHandle<()>,
    is_running: Arc<AtomicBool>,
}

impl MonitorRun {
    fn is_alive(&self) -> bool {
        self.is_running.load(Ordering::Acquire) && !self.handle.is_finished()
    }
}

/// 总线监控器
pub struct BusMonitor {
    session: Arc<BusSession>,
    config: BusConfig,
    run: Mutex<Option<MonitorRun>>,
    stats: Arc<MonitorStats>,
}

impl BusMonitor {
    pub fn new(session: Arc<BusSession>, config: BusConfig) -> Self {
        Self {
            session,
            config,
            run: Mutex::new(None),
            stats: Arc::new(MonitorStats::new()),
        }
    }

    /// 启动监控线程
    ///
    /// 已在运行时不做任何事；没有会话时返回 `NotConnected`。
    pub fn start(&self, sink: Arc<dyn MonitorSink>) -> Result<(), DriverError> {
        let mut run = self.run.lock();

        if run.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("Monitor already running, start ignored");
            return Ok(());
        }
        // 上一轮线程已自行退出（例如传输被关闭），回收句柄
        if let Some(finished) = run.take() {
            let _ = finished.handle.join();
        }

        let transport = self.session.transport()?;
        let is_running = Arc::new(AtomicBool::new(true));

        let token = Arc::clone(&is_running);
        let stats = Arc::clone(&self.stats);
        let poll_timeout = self.config.poll_timeout();
        let name = transport.name().to_string();

        let handle = std::thread::Builder::new()
            .name("motorbus-monitor".to_string())
            .spawn(move || monitor_loop(transport, sink, poll_timeout, token, stats))
            .map_err(|e| DriverError::MonitorThread(e.to_string()))?;

        *run = Some(MonitorRun { handle, is_running });
        info!("Bus monitor started on {}", name);
        Ok(())
    }

    /// 请求停止并在 `stop_timeout` 内等待线程退出
    ///
    /// 超时只记录日志，线程在当前阻塞调用返回后自行退出；从未启动时立即返回。
    pub fn stop(&self) {
        let Some(run) = self.run.lock().take() else {
            return;
        };
        run.is_running.store(false, Ordering::Release);

        let timeout = self.config.stop_timeout();
        match run.handle.join_timeout(timeout) {
            Ok(()) => info!("Bus monitor stopped"),
            Err(_) => error!(
                "Monitor thread panicked or failed to shut down within {:?}",
                timeout
            ),
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.lock().as_ref().is_some_and(MonitorRun::is_alive)
    }

    pub fn stats(&self) -> MonitorStatsSnapshot {
        self.stats.snapshot()
    }

    /// 计数器的共享引用（监控运行时也可读取）
    pub fn stats_handle(&self) -> &Arc<MonitorStats> {
        &self.stats
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }
}

impl Drop for BusMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 监控循环
///
/// - 帧：解码后交给 sink
/// - 超时：继续下一轮
/// - 传输已关闭：退出
/// - 其他错误：记录、计数，休眠一个轮询周期后继续
pub(crate) fn monitor_loop(
    transport: Arc<Transport>,
    sink: Arc<dyn MonitorSink>,
    poll_timeout: Duration,
    is_running: Arc<AtomicBool>,
    stats: Arc<MonitorStats>,
) {
    loop {
        // Acquire: 看到 false 时也能看到 stop() 之前的写入
        if !is_running.load(Ordering::Acquire) {
            trace!("Monitor thread: is_running flag is false, exiting");
            break;
        }

        match transport.recv(poll_timeout) {
            Ok(Some(frame)) => {
                stats.frames_received.fetch_add(1, Ordering::Relaxed);
                let record = MonitorRecord::from_frame(frame);
                if let DecodedFrame::Command(cmd) = &record.decoded {
                    stats.commands_decoded.fetch_add(1, Ordering::Relaxed);
                    trace!("Decoded {}", cmd);
                }
                if !sink.on_record(record) {
                    stats.records_dropped.fetch_add(1, Ordering::Relaxed);
                }
            },
            Ok(None) => {
                stats.timeouts.fetch_add(1, Ordering::Relaxed);
            },
            Err(CanError::NotStarted) => {
                debug!("Transport '{}' closed, monitor exiting", transport.name());
                break;
            },
            Err(e) => {
                stats.receive_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Monitor receive error on '{}': {}", transport.name(), e);
                if is_running.load(Ordering::Acquire) {
                    std::thread::sleep(poll_timeout);
                }
            },
        }
    }

    is_running.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use motorbus_can::MockCanAdapter;

    fn mock_session(mock: &MockCanAdapter) -> Arc<BusSession> {
        let session = Arc::new(BusSession::new());
        session.attach(Transport::mock(mock.clone()).unwrap());
        session
    }

    #[test]
    fn test_join_timeout_finishes() {
        let handle = spawn(|| std::thread::sleep(Duration::from_millis(10)));
        assert!(handle.join_timeout(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_join_timeout_expires() {
        let handle = spawn(|| std::thread::sleep(Duration::from_millis(500)));
        let start = Instant::now();
        assert!(handle.join_timeout(Duration::from_millis(20)).is_err());
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_start_without_session() {
        let monitor = BusMonitor::new(Arc::new(BusSession::new()), BusConfig::default());
        let sink: Arc<dyn MonitorSink> = Arc::new(|_: MonitorRecord| {});
        assert!(matches!(monitor.start(sink), Err(DriverError::NotConnected)));
        assert!(!monitor.is_running());
    }

    #[test]
    fn test_monitor_exits_when_transport_closed() {
        let mock = MockCanAdapter::new();
        let session = mock_session(&mock);
        let config = BusConfig {
            poll_timeout_ms: 10,
            ..BusConfig::default()
        };
        let monitor = BusMonitor::new(Arc::clone(&session), config);
        monitor.start(Arc::new(|_: MonitorRecord| {})).unwrap();

        session.close();
        let deadline = Instant::now() + Duration::from_secs(1);
        while monitor.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!monitor.is_running());
        monitor.stop();
    }
}
