//! 总线运行参数

use std::time::Duration;

/// 总线运行参数（纯数据）
///
/// # Example
///
/// ```
/// use motorbus_driver::BusConfig;
///
/// let config = BusConfig {
///     poll_timeout_ms: 50,
///     ..BusConfig::default()
/// };
/// assert_eq!(config.stop_timeout_ms, 1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// 监控线程单次接收超时（毫秒），也是停止请求的最大响应延迟
    pub poll_timeout_ms: u64,
    /// 停止监控时等待线程退出的上限（毫秒）
    pub stop_timeout_ms: u64,
    /// 通信自检等待回应的时间（毫秒）
    pub echo_timeout_ms: u64,
    /// `ChannelSink` 队列容量
    pub sink_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 100,
            stop_timeout_ms: 1000,
            echo_timeout_ms: 1000,
            sink_capacity: 1024,
        }
    }
}

impl BusConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }
}
