//! SLCAN 串口适配器
//!
//! 支持 LAWICEL 协议的 USB-CAN 串口设备（CANable、USB2CAN 等）。
//! 串口波特率对 USB CDC 设备无意义，CAN 总线波特率通过 `S{n}` 命令设置。

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, MotorFrame};
use crate::{RxAdapter, SplittableAdapter, TxAdapter};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

pub mod codec;

use codec::{CMD_CLOSE, CMD_OPEN, SlcanDecoder, SlcanEvent, bitrate_command, encode_frame};

/// 串口线路速率（USB CDC 设备忽略此值）
const SERIAL_BAUD: u32 = 115_200;

/// 等待命令应答的最长时间
const ACK_TIMEOUT: Duration = Duration::from_millis(500);

/// 单次 read 的最长阻塞时间
const READ_SLICE: Duration = Duration::from_millis(10);

/// SLCAN 适配器
///
/// ```no_run
/// use motorbus_can::{CanAdapter, SlcanAdapter};
///
/// let mut adapter = SlcanAdapter::open("/dev/ttyACM0").unwrap();
/// adapter.configure(250_000).unwrap();
/// ```
pub struct SlcanAdapter {
    port: Box<dyn SerialPort>,
    path: String,
    decoder: SlcanDecoder,
    /// 是否已发送 `O`（打开通道）
    opened: bool,
}

impl SlcanAdapter {
    /// 打开串口设备
    ///
    /// 先发送一次 `C` 关闭可能残留的通道，应答忽略。
    pub fn open(path: impl Into<String>) -> Result<Self, CanError> {
        let path = path.into();
        let port = serialport::new(&path, SERIAL_BAUD)
            .timeout(READ_SLICE)
            .open()
            .map_err(|e| map_serial_error(e, &path))?;

        let mut adapter = Self {
            port,
            path,
            decoder: SlcanDecoder::new(),
            opened: false,
        };
        adapter.write_command(CMD_CLOSE)?;
        adapter.drain(Duration::from_millis(50));
        debug!("SLCAN device '{}' opened", adapter.path);
        Ok(adapter)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn write_command(&mut self, command: &str) -> Result<(), CanError> {
        write_all(self.port.as_mut(), command)
    }

    /// 丢弃在 `window` 内到达的全部输入
    fn drain(&mut self, window: Duration) {
        let deadline = Instant::now() + window;
        let mut buf = [0u8; 64];
        while Instant::now() < deadline {
            match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => {},
                Err(_) => break,
            }
        }
        self.decoder = SlcanDecoder::new();
    }

    /// 等待命令应答
    ///
    /// 部分兼容设备对 `S`/`O` 不回应答，超时只记录警告。
    fn await_ack(&mut self, command: &str) -> Result<(), CanError> {
        let deadline = Instant::now() + ACK_TIMEOUT;
        loop {
            match read_event(self.port.as_mut(), &mut self.decoder, deadline)? {
                Some(SlcanEvent::Ack) => return Ok(()),
                Some(SlcanEvent::Error) => {
                    return Err(CanError::Device(CanDeviceError::new(
                        CanDeviceErrorKind::InvalidResponse,
                        format!(
                            "SLCAN device '{}' rejected command {:?}",
                            self.path,
                            command.trim_end()
                        ),
                    )));
                },
                Some(other) => trace!("Ignoring SLCAN event during handshake: {:?}", other),
                None => {
                    warn!(
                        "SLCAN device '{}' did not acknowledge {:?}, continuing",
                        self.path,
                        command.trim_end()
                    );
                    return Ok(());
                },
            }
        }
    }
}

impl CanAdapter for SlcanAdapter {
    /// 设置总线波特率并打开通道（`S{n}` + `O`）
    fn configure(&mut self, bitrate: u32) -> Result<(), CanError> {
        let setup = bitrate_command(bitrate).ok_or_else(|| {
            CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::UnsupportedConfig,
                format!("SLCAN does not support bitrate {} bit/s", bitrate),
            ))
        })?;

        self.write_command(setup)?;
        self.await_ack(setup)?;
        self.write_command(CMD_OPEN)?;
        self.await_ack(CMD_OPEN)?;
        self.opened = true;
        debug!("SLCAN device '{}' open at {} bit/s", self.path, bitrate);
        Ok(())
    }

    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError> {
        if !self.opened {
            return Err(CanError::NotStarted);
        }
        send_frame(self.port.as_mut(), &frame)
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<MotorFrame, CanError> {
        if !self.opened {
            return Err(CanError::NotStarted);
        }
        receive_frame(self.port.as_mut(), &mut self.decoder, timeout)
    }
}

impl SplittableAdapter for SlcanAdapter {
    type RxAdapter = SlcanRxAdapter;
    type TxAdapter = SlcanTxAdapter;

    /// 通过 `try_clone` 复制串口句柄，RX/TX 各持一份
    fn split(mut self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        if !self.opened {
            return Err(CanError::NotStarted);
        }
        let rx_port = self.port.try_clone().map_err(|e| map_serial_error(e, &self.path))?;
        let tx_port = self.port.try_clone().map_err(|e| map_serial_error(e, &self.path))?;

        // 通道关闭交由 TX 半边负责
        self.opened = false;
        let decoder = std::mem::take(&mut self.decoder);
        let path = self.path.clone();

        trace!("SlcanAdapter split into RX and TX adapters (device: {})", path);
        Ok((
            SlcanRxAdapter {
                port: Some(rx_port),
                decoder,
            },
            SlcanTxAdapter {
                port: Some(tx_port),
                path,
            },
        ))
    }
}

impl Drop for SlcanAdapter {
    fn drop(&mut self) {
        if self.opened {
            if let Err(e) = self.write_command(CMD_CLOSE) {
                warn!("Failed to close SLCAN channel on '{}': {}", self.path, e);
            }
        }
    }
}

/// 只读半边
pub struct SlcanRxAdapter {
    port: Option<Box<dyn SerialPort>>,
    decoder: SlcanDecoder,
}

impl RxAdapter for SlcanRxAdapter {
    fn receive_timeout(&mut self, timeout: Duration) -> Result<MotorFrame, CanError> {
        let port = self.port.as_mut().ok_or(CanError::NotStarted)?;
        receive_frame(port.as_mut(), &mut self.decoder, timeout)
    }

    fn close(&mut self) {
        self.port = None;
        self.decoder = SlcanDecoder::new();
    }
}

/// 只写半边，负责关闭通道
pub struct SlcanTxAdapter {
    port: Option<Box<dyn SerialPort>>,
    path: String,
}

impl TxAdapter for SlcanTxAdapter {
    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError> {
        let port = self.port.as_mut().ok_or(CanError::NotStarted)?;
        send_frame(port.as_mut(), &frame)
    }

    /// 发送 `C` 关闭通道并释放串口，重复调用无副作用
    fn close(&mut self) -> Result<(), CanError> {
        let Some(mut port) = self.port.take() else {
            return Ok(());
        };
        write_all(port.as_mut(), CMD_CLOSE)?;
        debug!("SLCAN channel on '{}' closed", self.path);
        Ok(())
    }
}

impl Drop for SlcanTxAdapter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close SLCAN channel on '{}': {}", self.path, e);
        }
    }
}

fn write_all(port: &mut dyn SerialPort, text: &str) -> Result<(), CanError> {
    port.write_all(text.as_bytes())?;
    port.flush()?;
    Ok(())
}

fn send_frame(port: &mut dyn SerialPort, frame: &MotorFrame) -> Result<(), CanError> {
    let line = encode_frame(frame)?;
    write_all(port, &line)?;
    trace!("Sent SLCAN frame: {}", line.trim_end());
    Ok(())
}

/// 读取下一个上行事件，`deadline` 之前没有完整行则返回 `None`
fn read_event(
    port: &mut dyn SerialPort,
    decoder: &mut SlcanDecoder,
    deadline: Instant,
) -> Result<Option<SlcanEvent>, CanError> {
    let mut buf = [0u8; 64];
    loop {
        if let Some(event) = decoder.next_event() {
            return event.map(Some);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }

        port.set_timeout(remaining.min(READ_SLICE))
            .map_err(|e| CanError::Io(io::Error::other(e.to_string())))?;
        match port.read(&mut buf) {
            Ok(0) => {},
            Ok(n) => decoder.push(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {},
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                return Err(CanError::Device(CanDeviceError::new(
                    CanDeviceErrorKind::NoDevice,
                    format!("Serial device disconnected: {}", e),
                )));
            },
            Err(e) => return Err(CanError::Io(e)),
        }
    }
}

fn receive_frame(
    port: &mut dyn SerialPort,
    decoder: &mut SlcanDecoder,
    timeout: Duration,
) -> Result<MotorFrame, CanError> {
    let deadline = Instant::now() + timeout;
    loop {
        match read_event(port, decoder, deadline) {
            Ok(Some(SlcanEvent::Frame(frame))) => {
                trace!("Received SLCAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
                return Ok(frame);
            },
            Ok(Some(SlcanEvent::Error)) => warn!("SLCAN device reported a command error"),
            Ok(Some(_)) => {},
            Ok(None) => return Err(CanError::Timeout),
            // 单行损坏不影响后续数据
            Err(CanError::Device(e)) if e.kind == CanDeviceErrorKind::InvalidResponse => {
                warn!("{}", e.message);
            },
            Err(e) => return Err(e),
        }
    }
}

fn map_serial_error(e: serialport::Error, path: &str) -> CanError {
    let kind = match e.kind() {
        serialport::ErrorKind::NoDevice => CanDeviceErrorKind::NotFound,
        serialport::ErrorKind::InvalidInput => CanDeviceErrorKind::UnsupportedConfig,
        serialport::ErrorKind::Io(io::ErrorKind::NotFound) => CanDeviceErrorKind::NotFound,
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
            CanDeviceErrorKind::AccessDenied
        },
        serialport::ErrorKind::Io(io::ErrorKind::ResourceBusy) => CanDeviceErrorKind::Busy,
        serialport::ErrorKind::Io(_) => CanDeviceErrorKind::Backend,
        _ => CanDeviceErrorKind::Unknown,
    };
    CanError::Device(CanDeviceError::new(
        kind,
        format!("Serial port '{}': {}", path, e.description),
    ))
}
