//! SocketCAN 适配器
//!
//! 基于 Linux 内核的 SocketCAN 子系统。
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**
//! - **接口配置**：波特率由系统工具配置，不在应用层设置：
//!   `sudo ip link set can0 type can bitrate 250000 && sudo ip link set up can0`
//! - **权限要求**：普通用户即可读写已 UP 的接口

use crate::{CanAdapter, CanError, MotorFrame, SplittableAdapter, ensure_valid_id};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use socketcan::{
    BlockingCan, CanError as SocketCanError, CanErrorFrame, CanFrame, CanSocket, EmbeddedFrame,
    ExtendedId, Frame, Socket, StandardId,
};
use std::convert::TryFrom;
use std::os::fd::BorrowedFd;
use std::os::unix::io::AsRawFd;
use std::time::{Duration, Instant};
use tracing::{error, trace, warn};

mod interface_check;
mod split;

pub use interface_check::check_interface_status;
pub use split::{SocketCanRxAdapter, SocketCanTxAdapter};

/// SocketCAN 适配器
///
/// ```no_run
/// use motorbus_can::{CanAdapter, SocketCanAdapter};
/// use motorbus_protocol::{MotorChannel, encode_enable};
///
/// let mut adapter = SocketCanAdapter::new("can0").unwrap();
/// adapter.send(encode_enable(MotorChannel::Left)).unwrap();
/// ```
#[derive(Debug)]
pub struct SocketCanAdapter {
    socket: CanSocket,
    /// 接口名称（如 "can0"）
    interface: String,
}

impl SocketCanAdapter {
    /// 打开 SocketCAN 接口
    ///
    /// 打开前先检查接口存在且处于 UP 状态，失败时错误信息中包含修复命令。
    pub fn new(interface: impl Into<String>) -> Result<Self, CanError> {
        let interface = interface.into();

        if !check_interface_status(&interface)? {
            return Err(CanError::Device(
                format!(
                    "CAN interface '{}' exists but is not UP. Please start it first:\n  sudo ip link set up {}",
                    interface, interface
                )
                .into(),
            ));
        }

        let socket = CanSocket::open(&interface).map_err(|e| {
            CanError::Device(format!("Failed to open CAN interface '{}': {}", interface, e).into())
        })?;

        trace!("SocketCAN interface '{}' opened", interface);
        Ok(Self { socket, interface })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl CanAdapter for SocketCanAdapter {
    /// SocketCAN 的波特率由 `ip link` 配置，这里只记录期望值
    fn configure(&mut self, bitrate: u32) -> Result<(), CanError> {
        trace!(
            "SocketCAN interface '{}' expects {} bit/s (bitrate set externally)",
            self.interface, bitrate
        );
        Ok(())
    }

    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError> {
        transmit(&mut self.socket, &frame)
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<MotorFrame, CanError> {
        receive_frame(&self.socket, timeout)
    }
}

impl SplittableAdapter for SocketCanAdapter {
    type RxAdapter = SocketCanRxAdapter;
    type TxAdapter = SocketCanTxAdapter;

    /// 分离为 RX/TX 两个半边（`dup()` 出两个 fd）
    ///
    /// 两个 fd 共享同一个打开文件描述，因此分离后禁止 `set_nonblocking()`，
    /// 超时只通过 `poll` 实现。
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        let rx = SocketCanRxAdapter::new(&self.socket, &self.interface)?;
        let tx = SocketCanTxAdapter::new(&self.socket, &self.interface)?;
        trace!(
            "SocketCanAdapter split into RX and TX adapters (interface: {})",
            self.interface
        );
        Ok((rx, tx))
    }
}

/// MotorFrame -> CanFrame
fn to_can_frame(frame: &MotorFrame) -> Result<CanFrame, CanError> {
    ensure_valid_id(frame)?;
    let data = frame.data_slice();
    let can_frame = if frame.is_extended {
        ExtendedId::new(frame.id).and_then(|id| CanFrame::new(id, data))
    } else {
        StandardId::new(frame.id as u16).and_then(|id| CanFrame::new(id, data))
    };
    can_frame.ok_or_else(|| {
        CanError::Device(format!("Failed to create CAN frame with ID 0x{:X}", frame.id).into())
    })
}

/// CanFrame -> MotorFrame（附加接收时间）
fn from_can_frame(can_frame: &CanFrame) -> MotorFrame {
    let frame = if can_frame.is_extended() {
        MotorFrame::new_extended(can_frame.raw_id(), can_frame.data())
    } else {
        MotorFrame::new_standard(can_frame.raw_id() as u16, can_frame.data())
    };
    frame.with_timestamp(Instant::now())
}

pub(crate) fn transmit(socket: &mut CanSocket, frame: &MotorFrame) -> Result<(), CanError> {
    let can_frame = to_can_frame(frame)?;
    socket.transmit(&can_frame).map_err(|e| {
        CanError::Io(std::io::Error::other(format!(
            "SocketCAN transmit error: {}",
            e
        )))
    })?;
    trace!("Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
    Ok(())
}

/// 带超时接收一个数据帧
///
/// 错误帧被过滤：Bus Off 和缓冲区溢出上报为错误，其余记录日志后继续等待，
/// 直到总超时耗尽。
pub(crate) fn receive_frame(socket: &CanSocket, timeout: Duration) -> Result<MotorFrame, CanError> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        // PollTimeout 最大 65535ms
        let timeout_ms = remaining.as_millis().min(65535) as u16;
        let fd = unsafe { BorrowedFd::borrow_raw(socket.as_raw_fd()) };
        let pollfd = PollFd::new(fd, PollFlags::POLLIN);
        match poll(&mut [pollfd], PollTimeout::from(timeout_ms)) {
            Ok(0) => return Err(CanError::Timeout),
            Ok(_) => {},
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => {
                return Err(CanError::Io(std::io::Error::other(format!(
                    "poll failed: {}",
                    e
                ))));
            },
        }

        let can_frame = match socket.read_frame() {
            Ok(frame) => frame,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(CanError::Timeout);
            },
            Err(e) => return Err(CanError::Io(e)),
        };

        if !can_frame.is_error_frame() {
            let frame = from_can_frame(&can_frame);
            trace!("Received CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
            return Ok(frame);
        }

        match CanErrorFrame::try_from(can_frame) {
            Ok(error_frame) => match SocketCanError::from(error_frame) {
                SocketCanError::BusOff => {
                    error!("CAN Bus Off error detected");
                    return Err(CanError::BusOff);
                },
                SocketCanError::ControllerProblem(problem) => {
                    let text = problem.to_string();
                    if text.to_ascii_lowercase().contains("overflow") {
                        error!("CAN Buffer Overflow detected: {}", problem);
                        return Err(CanError::BufferOverflow);
                    }
                    warn!("CAN Controller Problem: {}, ignoring", problem);
                },
                other => warn!("CAN Error Frame received: {}, ignoring", other),
            },
            Err(_) => warn!("Received CAN error frame but failed to parse, ignoring"),
        }

        if Instant::now() >= deadline {
            return Err(CanError::Timeout);
        }
    }
}
