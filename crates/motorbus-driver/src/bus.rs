//! `MotorBus`：会话、命令驱动与监控器的组合入口

use crate::{BusConfig, BusMonitor, BusSession, CommandDriver, DriverError, MonitorSink};
use motorbus_can::{Transport, TransportDescriptor};
use std::sync::Arc;
use tracing::debug;

/// 电机总线
///
/// # 示例
///
/// ```no_run
/// use motorbus_driver::{BusConfig, MotorBus};
///
/// let bus = MotorBus::new(BusConfig::default());
/// bus.connect(&"socketcan:can0".parse().unwrap()).unwrap();
/// bus.driver().enable_motor(1).unwrap();
/// bus.drive(30, 30).unwrap();
/// bus.disconnect();
/// ```
pub struct MotorBus {
    session: Arc<BusSession>,
    driver: CommandDriver,
    monitor: BusMonitor,
    config: BusConfig,
}

impl MotorBus {
    pub fn new(config: BusConfig) -> Self {
        let session = Arc::new(BusSession::new());
        Self {
            driver: CommandDriver::new(Arc::clone(&session)),
            monitor: BusMonitor::new(Arc::clone(&session), config),
            session,
            config,
        }
    }

    /// 连接到描述符指定的总线；已有连接时先停止监控并关闭
    pub fn connect(&self, descriptor: &TransportDescriptor) -> Result<(), DriverError> {
        self.monitor.stop();
        self.session.open(descriptor)
    }

    /// 使用已打开的传输（Mock 等）
    pub fn attach(&self, transport: Transport) {
        self.monitor.stop();
        self.session.attach(transport);
    }

    /// 先停止监控再关闭传输，可重复调用
    pub fn disconnect(&self) {
        self.monitor.stop();
        self.session.close();
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn driver(&self) -> &CommandDriver {
        &self.driver
    }

    pub fn monitor(&self) -> &BusMonitor {
        &self.monitor
    }

    pub fn session(&self) -> &Arc<BusSession> {
        &self.session
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// 左右电机同时设速
    pub fn drive(&self, left: i32, right: i32) -> Result<(), DriverError> {
        self.driver.drive(left, right)
    }

    pub fn start_monitor(&self, sink: Arc<dyn MonitorSink>) -> Result<(), DriverError> {
        self.monitor.start(sink)
    }

    pub fn stop_monitor(&self) {
        self.monitor.stop();
    }
}

impl Drop for MotorBus {
    fn drop(&mut self) {
        debug!("[Auto-Drop] MotorBus disconnecting");
        self.disconnect();
    }
}
