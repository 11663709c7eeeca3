//! 电机命令帧的构建与解析
//!
//! 三种命令共用同一个帧布局，仅 opcode 与尾部 4 字节不同：
//!
//! | 命令   | opcode | Byte 4..8                     |
//! |--------|--------|-------------------------------|
//! | 使能   | `0x0D` | `00 00 00 00`                 |
//! | 失能   | `0x0C` | `00 00 00 00`                 |
//! | 速度   | `0x00` | `speed * 100`，i32 大端补码   |
//!
//! 编码函数是纯函数，不做限幅；速度限幅由驱动层负责。

use crate::ids::*;
use crate::{MotorFrame, ProtocolError, bytes_to_i32_be, i32_to_bytes_be};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 命令操作码（Byte 1）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Opcode {
    /// 设置速度
    Speed = 0x00,
    /// 失能电机
    Disable = 0x0C,
    /// 使能电机
    Enable = 0x0D,
}

/// 电机通道（Byte 3）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MotorChannel {
    /// 左电机
    Left = 1,
    /// 右电机
    Right = 2,
}

impl MotorChannel {
    /// 两个通道，按左、右顺序
    pub const ALL: [MotorChannel; 2] = [MotorChannel::Left, MotorChannel::Right];

    pub fn as_u8(self) -> u8 {
        self.into()
    }
}

impl fmt::Display for MotorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorChannel::Left => write!(f, "left(1)"),
            MotorChannel::Right => write!(f, "right(2)"),
        }
    }
}

/// 电机命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorCommand {
    Enable { channel: MotorChannel },
    Disable { channel: MotorChannel },
    /// `speed` 为逻辑速度百分比，取值 [-100, 100]
    SetSpeed { channel: MotorChannel, speed: i8 },
}

impl MotorCommand {
    pub fn channel(&self) -> MotorChannel {
        match *self {
            MotorCommand::Enable { channel }
            | MotorCommand::Disable { channel }
            | MotorCommand::SetSpeed { channel, .. } => channel,
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            MotorCommand::Enable { .. } => Opcode::Enable,
            MotorCommand::Disable { .. } => Opcode::Disable,
            MotorCommand::SetSpeed { .. } => Opcode::Speed,
        }
    }

    /// 转换为 CAN 帧
    pub fn to_frame(self) -> MotorFrame {
        match self {
            MotorCommand::Enable { channel } => encode_enable(channel),
            MotorCommand::Disable { channel } => encode_disable(channel),
            MotorCommand::SetSpeed { channel, speed } => encode_speed(channel, speed),
        }
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorCommand::Enable { channel } => write!(f, "enable {}", channel),
            MotorCommand::Disable { channel } => write!(f, "disable {}", channel),
            MotorCommand::SetSpeed { channel, speed } => write!(
                f,
                "speed {} {:+} (driver {})",
                channel,
                speed,
                driver_speed_value(*speed)
            ),
        }
    }
}

impl TryFrom<MotorFrame> for MotorCommand {
    type Error = ProtocolError;

    fn try_from(frame: MotorFrame) -> Result<Self, Self::Error> {
        // 验证数据长度
        if frame.len != 8 {
            return Err(ProtocolError::InvalidLength {
                expected: 8,
                actual: frame.len as usize,
            });
        }

        let data = frame.data;
        if data[0] != SDO_WRITE_4 || data[2] != OBJECT_INDEX_HIGH {
            return Err(ProtocolError::InvalidHeader([data[0], data[1], data[2]]));
        }

        let opcode =
            Opcode::try_from(data[1]).map_err(|_| ProtocolError::UnknownOpcode(data[1]))?;
        let channel = MotorChannel::try_from(data[3]).map_err(|_| ProtocolError::InvalidValue {
            field: "channel",
            value: data[3] as i64,
        })?;
        let value = bytes_to_i32_be([data[4], data[5], data[6], data[7]]);

        match opcode {
            Opcode::Enable | Opcode::Disable if value != 0 => Err(ProtocolError::InvalidValue {
                field: "payload",
                value: value as i64,
            }),
            Opcode::Enable => Ok(MotorCommand::Enable { channel }),
            Opcode::Disable => Ok(MotorCommand::Disable { channel }),
            Opcode::Speed => {
                let speed = logical_speed(value).ok_or(ProtocolError::InvalidValue {
                    field: "speed",
                    value: value as i64,
                })?;
                Ok(MotorCommand::SetSpeed { channel, speed })
            },
        }
    }
}

/// 解码结果：已知命令，或原样透传的未知帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedFrame {
    Command(MotorCommand),
    Raw(MotorFrame),
}

impl DecodedFrame {
    pub fn command(&self) -> Option<&MotorCommand> {
        match self {
            DecodedFrame::Command(cmd) => Some(cmd),
            DecodedFrame::Raw(_) => None,
        }
    }
}

/// 逻辑速度 -> 驱动器速度值
pub fn driver_speed_value(speed: i8) -> i32 {
    speed as i32 * DRIVER_SPEED_SCALE
}

/// 驱动器速度值 -> 逻辑速度；非 100 的整数倍或超出 [-100, 100] 时返回 `None`
pub fn logical_speed(driver_value: i32) -> Option<i8> {
    if driver_value % DRIVER_SPEED_SCALE != 0 {
        return None;
    }
    let speed = driver_value / DRIVER_SPEED_SCALE;
    if (SPEED_MIN as i32..=SPEED_MAX as i32).contains(&speed) {
        Some(speed as i8)
    } else {
        None
    }
}

fn command_frame(opcode: Opcode, channel: MotorChannel, payload: [u8; 4]) -> MotorFrame {
    let [p0, p1, p2, p3] = payload;
    let data = [
        SDO_WRITE_4,
        opcode.into(),
        OBJECT_INDEX_HIGH,
        channel.into(),
        p0,
        p1,
        p2,
        p3,
    ];
    MotorFrame::new_extended(ID_MOTOR_COMMAND, &data)
}

/// 构建使能命令帧
pub fn encode_enable(channel: MotorChannel) -> MotorFrame {
    command_frame(Opcode::Enable, channel, [0; 4])
}

/// 构建失能命令帧
pub fn encode_disable(channel: MotorChannel) -> MotorFrame {
    command_frame(Opcode::Disable, channel, [0; 4])
}

/// 构建速度命令帧
///
/// 调用方负责把 `speed` 限制在 [-100, 100]，这里只做 `speed * 100` 的大端编码。
pub fn encode_speed(channel: MotorChannel, speed: i8) -> MotorFrame {
    command_frame(
        Opcode::Speed,
        channel,
        i32_to_bytes_be(driver_speed_value(speed)),
    )
}

/// 解析帧；无法识别的帧原样返回，不报错
pub fn decode(frame: &MotorFrame) -> DecodedFrame {
    match MotorCommand::try_from(*frame) {
        Ok(cmd) => DecodedFrame::Command(cmd),
        Err(_) => DecodedFrame::Raw(*frame),
    }
}
