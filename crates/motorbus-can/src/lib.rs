//! # Motorbus CAN Adapter Layer
//!
//! CAN 硬件抽象层，为不同的 CAN 适配器提供统一的收发接口。
//!
//! ## 后端
//!
//! - `socketcan`: Linux SocketCAN（仅 Linux）
//! - `slcan`: 串口 SLCAN/LAWICEL 协议（USB-CAN 串口适配器）
//! - `mock`: 内存总线（测试用）
//!
//! 上层只依赖 [`Transport`]，适配器类型在 `Transport::open` 时根据
//! [`TransportDescriptor`] 选定一次。

use std::time::Duration;
use thiserror::Error;

// 重新导出 motorbus-protocol 中的 MotorFrame
pub use motorbus_protocol::MotorFrame;

mod descriptor;
pub mod mock;
pub mod slcan;
mod transport;

#[cfg(target_os = "linux")]
pub mod socketcan;

pub use descriptor::{AdapterFamily, TransportDescriptor};
pub use mock::{MockCanAdapter, MockRx, MockRxHalf, MockTxHalf};
pub use slcan::SlcanAdapter;
pub use transport::Transport;

#[cfg(target_os = "linux")]
pub use socketcan::SocketCanAdapter;

/// CAN 适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    /// 串口/Socket 底层错误
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 设备相关错误（设备未找到、未启动、配置失败等）
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),

    /// 读取超时（非致命，可以重试）
    #[error("Read timeout")]
    Timeout,

    /// 缓冲区溢出
    #[error("Buffer overflow")]
    BufferOverflow,

    /// 总线关闭
    #[error("Bus off")]
    BusOff,

    /// 设备未启动或已关闭
    #[error("Device not started")]
    NotStarted,
}

/// 设备/后端错误的结构化分类（不绑定具体后端实现）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    Unknown,
    /// 设备/接口不存在
    NotFound,
    /// 设备已断开
    NoDevice,
    /// 权限不足
    AccessDenied,
    /// 资源被占用
    Busy,
    /// 不支持的后端或配置
    UnsupportedConfig,
    /// 设备返回无效响应
    InvalidResponse,
    /// 无效帧（如 ID 越界）
    InvalidFrame,
    /// 其他后端错误
    Backend,
}

/// 结构化设备错误：kind + message
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 致命错误表示设备已不可用，需要重新打开
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            CanDeviceErrorKind::NoDevice
                | CanDeviceErrorKind::AccessDenied
                | CanDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for CanDeviceError {
    fn from(message: String) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for CanDeviceError {
    fn from(message: &str) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

/// CAN 适配器 Trait
///
/// 语义：
/// - `send()`: Fire-and-Forget，写入成功即返回
/// - `receive_timeout()`: 阻塞直到收到有效数据帧或超时（`CanError::Timeout`）
pub trait CanAdapter {
    /// 配置总线波特率
    fn configure(&mut self, bitrate: u32) -> Result<(), CanError>;

    /// 发送一帧
    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError>;

    /// 带超时的接收
    fn receive_timeout(&mut self, timeout: Duration) -> Result<MotorFrame, CanError>;
}

/// 只读半边（监控线程使用）
pub trait RxAdapter {
    fn receive_timeout(&mut self, timeout: Duration) -> Result<MotorFrame, CanError>;

    /// 释放底层句柄，之后的接收返回 [`CanError::NotStarted`]
    fn close(&mut self) {}
}

/// 只写半边（命令发送使用）
pub trait TxAdapter {
    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError>;

    /// 关闭通道（尽力而为）
    fn close(&mut self) -> Result<(), CanError> {
        Ok(())
    }
}

/// 可分离为独立 RX/TX 半边的适配器
///
/// 分离后两个半边可以在不同线程中并发使用，互不阻塞。
pub trait SplittableAdapter: CanAdapter {
    type RxAdapter: RxAdapter;
    type TxAdapter: TxAdapter;
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError>;
}

/// 拒绝发送 ID 越界的帧
pub(crate) fn ensure_valid_id(frame: &MotorFrame) -> Result<(), CanError> {
    if frame.has_valid_id() {
        Ok(())
    } else {
        Err(CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::InvalidFrame,
            format!(
                "CAN ID 0x{:X} out of range for {} frame",
                frame.id,
                if frame.is_extended { "extended" } else { "standard" }
            ),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_fatal() {
        assert!(CanDeviceError::new(CanDeviceErrorKind::NotFound, "x").is_fatal());
        assert!(!CanDeviceError::new(CanDeviceErrorKind::UnsupportedConfig, "x").is_fatal());
    }

    #[test]
    fn test_device_error_display() {
        let err = CanError::Device(CanDeviceError::new(CanDeviceErrorKind::Busy, "port busy"));
        assert_eq!(err.to_string(), "Device Error: Busy: port busy");
        assert_eq!(CanError::Timeout.to_string(), "Read timeout");
    }

    #[test]
    fn test_ensure_valid_id() {
        assert!(ensure_valid_id(&MotorFrame::new_extended(0x0600_0001, &[])).is_ok());
        assert!(ensure_valid_id(&MotorFrame::new_standard(0x7FF, &[])).is_ok());

        let mut frame = MotorFrame::new_standard(0x100, &[]);
        frame.id = 0x800;
        match ensure_valid_id(&frame) {
            Err(CanError::Device(e)) => assert_eq!(e.kind, CanDeviceErrorKind::InvalidFrame),
            other => panic!("Expected InvalidFrame, got {:?}", other),
        }
    }
}
