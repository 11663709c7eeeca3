//! SocketCAN 分离适配器
//!
//! 基于 `CanSocket::try_clone()`（`dup()`）得到独立的 RX/TX 半边。
//!
//! `dup()` 出的 fd 共享同一个打开文件描述，`O_NONBLOCK` 也随之共享。
//! 因此分离后严禁调用 `set_nonblocking()`，RX 超时只依赖 `poll`。
//!
//! `close()` 立即释放本半边的 fd，之后的收发返回 [`CanError::NotStarted`]。

use super::{receive_frame, transmit};
use crate::{CanError, MotorFrame, RxAdapter, TxAdapter};
use socketcan::CanSocket;
use std::os::fd::AsFd;
use std::time::Duration;
use tracing::{debug, trace};

fn clone_socket(socket: &CanSocket, half: &str) -> Result<CanSocket, CanError> {
    socket.as_fd().try_clone_to_owned().map(CanSocket::from).map_err(|e| {
        CanError::Io(std::io::Error::other(format!(
            "Failed to clone SocketCAN socket for {}: {}",
            half, e
        )))
    })
}

/// 只读半边（监控线程使用）
pub struct SocketCanRxAdapter {
    socket: Option<CanSocket>,
    interface: String,
}

impl SocketCanRxAdapter {
    pub(crate) fn new(socket: &CanSocket, interface: &str) -> Result<Self, CanError> {
        Ok(Self {
            socket: Some(clone_socket(socket, "RX")?),
            interface: interface.to_string(),
        })
    }
}

impl RxAdapter for SocketCanRxAdapter {
    fn receive_timeout(&mut self, timeout: Duration) -> Result<MotorFrame, CanError> {
        let socket = self.socket.as_ref().ok_or(CanError::NotStarted)?;
        receive_frame(socket, timeout)
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("SocketCAN RX half '{}' released", self.interface);
        }
    }
}

/// 只写半边（命令发送使用）
pub struct SocketCanTxAdapter {
    socket: Option<CanSocket>,
    interface: String,
}

impl SocketCanTxAdapter {
    pub(crate) fn new(socket: &CanSocket, interface: &str) -> Result<Self, CanError> {
        Ok(Self {
            socket: Some(clone_socket(socket, "TX")?),
            interface: interface.to_string(),
        })
    }
}

impl TxAdapter for SocketCanTxAdapter {
    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError> {
        let socket = self.socket.as_mut().ok_or(CanError::NotStarted)?;
        transmit(socket, &frame)
    }

    fn close(&mut self) -> Result<(), CanError> {
        if self.socket.take().is_some() {
            debug!("SocketCAN TX half '{}' released", self.interface);
        }
        Ok(())
    }
}

impl Drop for SocketCanRxAdapter {
    fn drop(&mut self) {
        trace!("[Auto-Drop] SocketCAN RX half '{}' closed", self.interface);
    }
}

impl Drop for SocketCanTxAdapter {
    fn drop(&mut self) {
        trace!("[Auto-Drop] SocketCAN TX half '{}' closed", self.interface);
    }
}
