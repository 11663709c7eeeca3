//! 统一传输层
//!
//! `Transport` 在打开时根据 [`AdapterFamily`] 选定后端，之后只通过枚举分发，
//! 热路径上没有字符串判断。TX 与 RX 半边各自加锁，前台发送不会等待监控线程的接收。

use crate::mock::{MockCanAdapter, MockRxHalf, MockTxHalf};
use crate::slcan::{SlcanAdapter, SlcanRxAdapter, SlcanTxAdapter};
use crate::{
    AdapterFamily, CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, MotorFrame,
    RxAdapter, SplittableAdapter, TransportDescriptor, TxAdapter,
};
use motorbus_protocol::BUS_BITRATE;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[cfg(target_os = "linux")]
use crate::socketcan::{SocketCanAdapter, SocketCanRxAdapter, SocketCanTxAdapter};

enum TxHalf {
    #[cfg(target_os = "linux")]
    SocketCan(SocketCanTxAdapter),
    Slcan(SlcanTxAdapter),
    Mock(MockTxHalf),
}

impl TxHalf {
    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError> {
        match self {
            #[cfg(target_os = "linux")]
            TxHalf::SocketCan(tx) => tx.send(frame),
            TxHalf::Slcan(tx) => tx.send(frame),
            TxHalf::Mock(tx) => tx.send(frame),
        }
    }

    fn close(&mut self) -> Result<(), CanError> {
        match self {
            #[cfg(target_os = "linux")]
            TxHalf::SocketCan(tx) => tx.close(),
            TxHalf::Slcan(tx) => tx.close(),
            TxHalf::Mock(tx) => tx.close(),
        }
    }
}

enum RxHalf {
    #[cfg(target_os = "linux")]
    SocketCan(SocketCanRxAdapter),
    Slcan(SlcanRxAdapter),
    Mock(MockRxHalf),
}

impl RxHalf {
    fn receive_timeout(&mut self, timeout: Duration) -> Result<MotorFrame, CanError> {
        match self {
            #[cfg(target_os = "linux")]
            RxHalf::SocketCan(rx) => rx.receive_timeout(timeout),
            RxHalf::Slcan(rx) => rx.receive_timeout(timeout),
            RxHalf::Mock(rx) => rx.receive_timeout(timeout),
        }
    }

    fn close(&mut self) {
        match self {
            #[cfg(target_os = "linux")]
            RxHalf::SocketCan(rx) => rx.close(),
            RxHalf::Slcan(rx) => rx.close(),
            RxHalf::Mock(rx) => rx.close(),
        }
    }
}

/// 已打开的 CAN 总线句柄
///
/// # 示例
///
/// ```no_run
/// use motorbus_can::Transport;
/// use motorbus_protocol::{MotorChannel, encode_enable};
/// use std::time::Duration;
///
/// let transport = Transport::open(&"socketcan:can0".parse().unwrap()).unwrap();
/// transport.send(encode_enable(MotorChannel::Left)).unwrap();
/// if let Some(frame) = transport.recv(Duration::from_millis(100)).unwrap() {
///     println!("{}", frame);
/// }
/// transport.close();
/// ```
pub struct Transport {
    name: String,
    tx: Mutex<TxHalf>,
    rx: Mutex<RxHalf>,
    closed: AtomicBool,
}

impl Transport {
    /// 打开并配置适配器（250 kbit/s），随后分离为 RX/TX 半边
    ///
    /// 任一步失败都会释放已打开的资源并返回错误。
    pub fn open(descriptor: &TransportDescriptor) -> Result<Self, CanError> {
        let name = descriptor.to_string();
        let (rx, tx) = match descriptor.family {
            AdapterFamily::SocketCan => open_socketcan(&descriptor.channel)?,
            AdapterFamily::Serial | AdapterFamily::Usb2Can => {
                let adapter = SlcanAdapter::open(descriptor.channel.as_str())?;
                let (rx, tx) = configure_and_split(adapter)?;
                (RxHalf::Slcan(rx), TxHalf::Slcan(tx))
            },
            AdapterFamily::Pcan | AdapterFamily::Vector | AdapterFamily::Kvaser => {
                return Err(CanError::Device(CanDeviceError::new(
                    CanDeviceErrorKind::UnsupportedConfig,
                    format!(
                        "Adapter family '{}' needs a vendor SDK that is not linked; on Linux use the kernel driver's netdev instead (e.g. socketcan:can0)",
                        descriptor.family
                    ),
                )));
            },
        };

        info!("Transport '{}' opened at {} bit/s", name, BUS_BITRATE);
        Ok(Self::from_halves(name, rx, tx))
    }

    /// 基于内存 Mock 总线创建（测试用）
    pub fn mock(adapter: MockCanAdapter) -> Result<Self, CanError> {
        let (rx, tx) = configure_and_split(adapter)?;
        debug!("Mock transport opened");
        Ok(Self::from_halves(
            "mock:memory".to_string(),
            RxHalf::Mock(rx),
            TxHalf::Mock(tx),
        ))
    }

    fn from_halves(name: String, rx: RxHalf, tx: TxHalf) -> Self {
        Self {
            name,
            tx: Mutex::new(tx),
            rx: Mutex::new(rx),
            closed: AtomicBool::new(false),
        }
    }

    /// 描述符文本（如 `socketcan:can0`）
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 发送一帧；失败直接返回，不重试
    pub fn send(&self, frame: MotorFrame) -> Result<(), CanError> {
        if self.is_closed() {
            return Err(CanError::NotStarted);
        }
        self.tx.lock().send(frame)
    }

    /// 带超时接收，超时返回 `Ok(None)`
    ///
    /// 返回的帧总是带有接收时间。
    pub fn recv(&self, timeout: Duration) -> Result<Option<MotorFrame>, CanError> {
        if self.is_closed() {
            return Err(CanError::NotStarted);
        }
        let mut rx = self.rx.lock();
        if self.is_closed() {
            rx.close();
            return Err(CanError::NotStarted);
        }
        match rx.receive_timeout(timeout) {
            Ok(frame) if frame.timestamp.is_some() => Ok(Some(frame)),
            Ok(frame) => Ok(Some(frame.with_timestamp(Instant::now()))),
            Err(CanError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 关闭总线，可重复调用
    ///
    /// TX 半边立即释放。RX 半边若正被监控线程占用，则由该线程下一次 `recv` 释放。
    /// 关闭错误只记录日志，不向调用方传播。
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.tx.lock().close() {
            warn!("Error while closing transport '{}': {}", self.name, e);
        }
        if let Some(mut rx) = self.rx.try_lock() {
            rx.close();
        }
        debug!("Transport '{}' closed", self.name);
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn configure_and_split<A: SplittableAdapter>(
    mut adapter: A,
) -> Result<(A::RxAdapter, A::TxAdapter), CanError> {
    adapter.configure(BUS_BITRATE)?;
    adapter.split()
}

#[cfg(target_os = "linux")]
fn open_socketcan(interface: &str) -> Result<(RxHalf, TxHalf), CanError> {
    let (rx, tx) = configure_and_split(SocketCanAdapter::new(interface)?)?;
    Ok((RxHalf::SocketCan(rx), TxHalf::SocketCan(tx)))
}

#[cfg(not(target_os = "linux"))]
fn open_socketcan(interface: &str) -> Result<(RxHalf, TxHalf), CanError> {
    Err(CanError::Device(CanDeviceError::new(
        CanDeviceErrorKind::UnsupportedConfig,
        format!("SocketCAN interface '{}' is only available on Linux", interface),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockRx;
    use motorbus_protocol::{MotorChannel, encode_disable, encode_enable};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_mock_open_configures_bitrate() {
        let mock = MockCanAdapter::new();
        let transport = Transport::mock(mock.clone()).unwrap();
        assert_eq!(mock.configured_bitrate(), Some(250_000));
        assert_eq!(transport.name(), "mock:memory");
        assert!(!transport.is_closed());
    }

    #[test]
    fn test_open_failure_is_reported() {
        let mock = MockCanAdapter::new();
        mock.set_fail_configure(true);
        assert!(Transport::mock(mock).is_err());
    }

    #[test]
    fn test_vendor_families_rejected() {
        for family in [AdapterFamily::Pcan, AdapterFamily::Vector, AdapterFamily::Kvaser] {
            match Transport::open(&TransportDescriptor::new(family, "0")) {
                Err(CanError::Device(e)) => {
                    assert_eq!(e.kind, CanDeviceErrorKind::UnsupportedConfig);
                },
                other => panic!("Expected UnsupportedConfig for {}, got {:?}", family, other),
            }
        }
    }

    #[test]
    fn test_missing_serial_device() {
        let desc = TransportDescriptor::new(AdapterFamily::Serial, "/dev/motorbus-missing");
        assert!(Transport::open(&desc).is_err());
    }

    #[test]
    fn test_recv_timeout_is_none() {
        let mock = MockCanAdapter::new();
        mock.push_rx(MockRx::Timeout);
        let transport = Transport::mock(mock).unwrap();
        assert!(transport.recv(Duration::from_millis(10)).unwrap().is_none());
        assert!(transport.recv(Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn test_recv_stamps_frames() {
        let mock = MockCanAdapter::new();
        mock.push_frame(encode_enable(MotorChannel::Left));
        let transport = Transport::mock(mock).unwrap();
        let frame = transport.recv(Duration::from_millis(10)).unwrap().unwrap();
        assert!(frame.timestamp.is_some());
    }

    #[test]
    fn test_recv_error_propagates() {
        let mock = MockCanAdapter::new();
        mock.push_rx(MockRx::Error(CanError::BusOff));
        let transport = Transport::mock(mock).unwrap();
        assert!(matches!(transport.recv(Duration::ZERO), Err(CanError::BusOff)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mock = MockCanAdapter::new();
        let transport = Transport::mock(mock.clone()).unwrap();
        transport.close();
        transport.close();
        assert!(transport.is_closed());
        assert!(mock.is_closed());
        assert!(matches!(
            transport.send(encode_disable(MotorChannel::Right)),
            Err(CanError::NotStarted)
        ));
        assert!(matches!(transport.recv(Duration::ZERO), Err(CanError::NotStarted)));
    }

    #[test]
    fn test_send_not_blocked_by_pending_receive() {
        let mock = MockCanAdapter::new();
        let transport = Arc::new(Transport::mock(mock.clone()).unwrap());

        let reader = Arc::clone(&transport);
        let handle = thread::spawn(move || reader.recv(Duration::from_millis(500)));
        thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        transport.send(encode_enable(MotorChannel::Left)).unwrap();
        assert!(start.elapsed() < Duration::from_millis(200));
        assert_eq!(mock.sent_frames().len(), 1);

        assert!(handle.join().unwrap().unwrap().is_none());
    }

    #[test]
    fn test_close_not_blocked_by_pending_receive() {
        let mock = MockCanAdapter::new();
        let transport = Arc::new(Transport::mock(mock.clone()).unwrap());

        let reader = Arc::clone(&transport);
        let handle = thread::spawn(move || reader.recv(Duration::from_millis(300)));
        thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        transport.close();
        assert!(start.elapsed() < Duration::from_millis(150));
        assert!(mock.is_closed());

        let _ = handle.join().unwrap();
        assert!(matches!(
            transport.recv(Duration::from_millis(10)),
            Err(CanError::NotStarted)
        ));
    }
}
