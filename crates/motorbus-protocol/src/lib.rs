//! # Motorbus Protocol
//!
//! 双通道电机驱动器 CAN 命令协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: CAN ID 与总线常量
//! - `command`: 使能/失能/速度命令的编码与解码
//!
//! ## 帧格式
//!
//! 所有命令使用同一个扩展帧 ID（`0x06000001`），数据固定 8 字节：
//!
//! ```text
//! Byte 0    Byte 1    Byte 2    Byte 3    Byte 4..8
//! 0x23      opcode    0x20      channel   i32 (大端)
//! ```
//!
//! ## 字节序
//!
//! 速度值使用 Motorola (MSB) 高位在前（大端字节序）。

pub mod command;
pub mod ids;

pub use command::*;
pub use ids::*;

use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// 标准帧 ID 最大值（11-bit）
pub const STANDARD_ID_MAX: u32 = 0x7FF;

/// 扩展帧 ID 最大值（29-bit）
pub const EXTENDED_ID_MAX: u32 = 0x1FFF_FFFF;

/// CAN 2.0 帧的统一抽象
///
/// 协议层和硬件层之间的中间类型：
///
/// ```text
/// Protocol Layer (motorbus-protocol)
///     ↓ encode_* 构建 / decode 解析
/// MotorFrame (此类型)
///     ↓ 转换逻辑在 CAN 层实现
/// CAN Layer (motorbus-can)
///     ↓ SocketCAN / SLCAN 适配器
/// Hardware
/// ```
///
/// - **Copy**：固定 8 字节数据，无堆分配
/// - **时间戳**：`timestamp` 仅在接收时由传输层填写，发送帧构造时为 `None`
///
/// ```rust
/// use motorbus_protocol::MotorFrame;
///
/// let frame = MotorFrame::new_extended(0x0600_0001, &[0x23, 0x0D, 0x20, 0x01]);
/// assert_eq!(frame.id(), 0x0600_0001);
/// assert_eq!(frame.data_slice(), &[0x23, 0x0D, 0x20, 0x01]);
/// assert!(frame.timestamp.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorFrame {
    /// CAN ID（标准帧或扩展帧）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 是否为扩展帧（29-bit ID）
    pub is_extended: bool,

    /// 接收时间（单调时钟），发送帧为 `None`
    pub timestamp: Option<Instant>,
}

impl MotorFrame {
    /// 创建标准帧
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new(id as u32, data, false)
    }

    /// 创建扩展帧
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new(id, data, true)
    }

    /// 通用构造器（超过 8 字节的数据会被截断）
    fn new(id: u32, data: &[u8], is_extended: bool) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            is_extended,
            timestamp: None,
        }
    }

    /// 附加接收时间
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len.min(8) as usize]
    }

    /// 获取 CAN ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// ID 是否落在帧类型允许的范围内（扩展帧 29 位，标准帧 11 位）
    pub fn has_valid_id(&self) -> bool {
        if self.is_extended {
            self.id <= EXTENDED_ID_MAX
        } else {
            self.id <= STANDARD_ID_MAX
        }
    }
}

impl fmt::Display for MotorFrame {
    /// 监控输出格式：`0x06000001 [8] 23 0D 20 01 00 00 13 88 (EXT)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_extended {
            write!(f, "0x{:08X}", self.id)?;
        } else {
            write!(f, "0x{:03X}", self.id)?;
        }
        write!(f, " [{}]", self.len)?;
        for byte in self.data_slice() {
            write!(f, " {:02X}", byte)?;
        }
        write!(f, " ({})", if self.is_extended { "EXT" } else { "STD" })
    }
}

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid header: {0:02X?}")]
    InvalidHeader([u8; 3]),

    #[error("Unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: i64 },
}

/// 大端字节序转 i32
pub fn bytes_to_i32_be(bytes: [u8; 4]) -> i32 {
    i32::from_be_bytes(bytes)
}

/// i32 转大端字节序
pub fn i32_to_bytes_be(value: i32) -> [u8; 4] {
    value.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_i32_be_negative() {
        assert_eq!(bytes_to_i32_be([0xFF, 0xFF, 0xD8, 0xF0]), -10_000);
    }

    #[test]
    fn test_i32_to_bytes_be() {
        assert_eq!(i32_to_bytes_be(5000), [0x00, 0x00, 0x13, 0x88]);
        assert_eq!(i32_to_bytes_be(-1), [0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_frame_truncates_long_data() {
        let frame = MotorFrame::new_standard(0x123, &[0u8; 12]);
        assert_eq!(frame.len, 8);
        assert!(!frame.is_extended);
    }

    #[test]
    fn test_frame_id_range() {
        assert!(MotorFrame::new_extended(EXTENDED_ID_MAX, &[]).has_valid_id());
        assert!(!MotorFrame::new_extended(EXTENDED_ID_MAX + 1, &[]).has_valid_id());
        assert!(MotorFrame::new_standard(0x7FF, &[]).has_valid_id());
        assert!(!MotorFrame::new_standard(0x800, &[]).has_valid_id());
    }

    #[test]
    fn test_frame_display() {
        let frame =
            MotorFrame::new_extended(0x0600_0001, &[0x23, 0x00, 0x20, 0x01, 0, 0, 0x13, 0x88]);
        assert_eq!(
            frame.to_string(),
            "0x06000001 [8] 23 00 20 01 00 00 13 88 (EXT)"
        );

        let frame = MotorFrame::new_standard(0x123, &[0x01, 0x02]);
        assert_eq!(frame.to_string(), "0x123 [2] 01 02 (STD)");
    }

    #[test]
    fn test_with_timestamp() {
        let now = Instant::now();
        let frame = MotorFrame::new_standard(0x1, &[]).with_timestamp(now);
        assert_eq!(frame.timestamp, Some(now));
    }
}
