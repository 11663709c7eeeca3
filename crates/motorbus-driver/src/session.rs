//! 总线会话：持有至多一个打开的 [`Transport`]

use crate::DriverError;
use motorbus_can::{Transport, TransportDescriptor};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// 总线会话
///
/// `CommandDriver` 与 `BusMonitor` 共享同一个会话；打开新的传输前先关闭旧的。
#[derive(Debug, Default)]
pub struct BusSession {
    transport: RwLock<Option<Arc<Transport>>>,
}

impl BusSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开描述符指定的总线，替换当前会话
    ///
    /// 旧传输先关闭；新传输打开失败时会话保持未连接。
    pub fn open(&self, descriptor: &TransportDescriptor) -> Result<(), DriverError> {
        self.close();
        let transport = Transport::open(descriptor)?;
        info!("Session connected to {}", descriptor);
        *self.transport.write() = Some(Arc::new(transport));
        Ok(())
    }

    /// 接管一个已打开的传输（测试或自定义后端）
    pub fn attach(&self, transport: Transport) {
        self.close();
        debug!("Session attached to {}", transport.name());
        *self.transport.write() = Some(Arc::new(transport));
    }

    /// 关闭当前传输；未连接时什么都不做
    pub fn close(&self) {
        let previous = self.transport.write().take();
        if let Some(transport) = previous {
            transport.close();
            info!("Session disconnected from {}", transport.name());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.read().is_some()
    }

    /// 当前传输的共享句柄
    pub fn transport(&self) -> Result<Arc<Transport>, DriverError> {
        self.transport
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(DriverError::NotConnected)
    }

    /// 当前传输名称（如 `socketcan:can0`）
    pub fn name(&self) -> Option<String> {
        self.transport.read().as_ref().map(|t| t.name().to_string())
    }
}

impl Drop for BusSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motorbus_can::{AdapterFamily, MockCanAdapter};

    #[test]
    fn test_close_never_opened() {
        let session = BusSession::new();
        session.close();
        session.close();
        assert!(!session.is_connected());
        assert!(matches!(session.transport(), Err(DriverError::NotConnected)));
    }

    #[test]
    fn test_attach_replaces_previous() {
        let session = BusSession::new();
        let first = MockCanAdapter::new();
        let second = MockCanAdapter::new();

        session.attach(Transport::mock(first.clone()).unwrap());
        session.attach(Transport::mock(second.clone()).unwrap());

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_eq!(session.name().as_deref(), Some("mock:memory"));
    }

    #[test]
    fn test_failed_open_leaves_session_disconnected() {
        let session = BusSession::new();
        let mock = MockCanAdapter::new();
        session.attach(Transport::mock(mock.clone()).unwrap());

        let desc = TransportDescriptor::new(AdapterFamily::Kvaser, "0");
        assert!(session.open(&desc).is_err());
        assert!(mock.is_closed());
        assert!(!session.is_connected());
    }
}
