//! 驱动层错误类型定义

use motorbus_can::CanError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// CAN 传输错误（打开或发送失败）
    #[error("CAN driver error: {0}")]
    Can(#[from] CanError),

    /// 通道号不是 1（左）或 2（右）
    #[error("Invalid motor channel {0} (expected 1 or 2)")]
    InvalidChannel(u8),

    /// 没有打开的总线会话
    #[error("Not connected to a CAN bus")]
    NotConnected,

    /// 监控线程无法启动
    #[error("Monitor thread error: {0}")]
    MonitorThread(String),
}
