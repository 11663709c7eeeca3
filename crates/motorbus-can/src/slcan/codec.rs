//! SLCAN (LAWICEL) ASCII 编解码
//!
//! 命令与帧都以 `\r` 结尾：
//! - `S5\r` 设置 250 kbit/s，`O\r` 打开通道，`C\r` 关闭通道
//! - `t{iii}{L}{dd..}\r` 标准帧，`T{iiiiiiii}{L}{dd..}\r` 扩展帧
//! - 设备以 `\r` 应答成功，`\x07`（BEL）应答失败；`z`/`Z` 是发送确认

use crate::{CanDeviceError, CanDeviceErrorKind, CanError, MotorFrame, ensure_valid_id};
use std::time::Instant;

pub const CMD_OPEN: &str = "O\r";
pub const CMD_CLOSE: &str = "C\r";

const TERMINATOR: u8 = b'\r';
const BELL: u8 = 0x07;

/// 单行最长：`T` + 8 位 ID + DLC + 16 位数据 + 4 位时间戳
const MAX_LINE_LEN: usize = 30;

/// 波特率 -> `S{n}\r` 命令
pub fn bitrate_command(bitrate: u32) -> Option<&'static str> {
    Some(match bitrate {
        10_000 => "S0\r",
        20_000 => "S1\r",
        50_000 => "S2\r",
        100_000 => "S3\r",
        125_000 => "S4\r",
        250_000 => "S5\r",
        500_000 => "S6\r",
        800_000 => "S7\r",
        1_000_000 => "S8\r",
        _ => return None,
    })
}

/// 把帧编码为 SLCAN 发送命令
pub fn encode_frame(frame: &MotorFrame) -> Result<String, CanError> {
    ensure_valid_id(frame)?;
    let data = hex::encode_upper(frame.data_slice());
    Ok(if frame.is_extended {
        format!("T{:08X}{}{}\r", frame.id, frame.len, data)
    } else {
        format!("t{:03X}{}{}\r", frame.id, frame.len, data)
    })
}

/// 设备上行事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlcanEvent {
    /// 收到的数据帧
    Frame(MotorFrame),
    /// 命令成功应答（空行、`z`、`Z`）
    Ack,
    /// 命令失败应答（BEL）
    Error,
    /// 无法识别的行（状态查询应答、远程帧等）
    Other(String),
}

/// 解析一行（不含结尾 `\r`）
pub fn parse_line(line: &[u8]) -> Result<SlcanEvent, CanError> {
    let Some((&kind, rest)) = line.split_first() else {
        return Ok(SlcanEvent::Ack);
    };

    let id_len = match kind {
        b't' => 3,
        b'T' => 8,
        b'z' | b'Z' if rest.is_empty() => return Ok(SlcanEvent::Ack),
        _ => return Ok(SlcanEvent::Other(String::from_utf8_lossy(line).into_owned())),
    };

    let text = std::str::from_utf8(rest).map_err(|_| invalid_line(line))?;
    if !text.is_ascii() || text.len() < id_len + 1 {
        return Err(invalid_line(line));
    }

    let id = u32::from_str_radix(&text[..id_len], 16).map_err(|_| invalid_line(line))?;
    let dlc = text[id_len..id_len + 1]
        .parse::<usize>()
        .map_err(|_| invalid_line(line))?;
    if dlc > 8 {
        return Err(invalid_line(line));
    }

    let data_start = id_len + 1;
    let data_end = data_start + dlc * 2;
    // 数据后允许跟 4 位时间戳（`Z1` 模式）
    if text.len() != data_end && text.len() != data_end + 4 {
        return Err(invalid_line(line));
    }
    let data = hex::decode(&text[data_start..data_end]).map_err(|_| invalid_line(line))?;

    let frame = if kind == b'T' {
        MotorFrame::new_extended(id, &data)
    } else {
        MotorFrame::new_standard(id as u16, &data)
    };
    if !frame.has_valid_id() {
        return Err(invalid_line(line));
    }
    Ok(SlcanEvent::Frame(frame.with_timestamp(Instant::now())))
}

fn invalid_line(line: &[u8]) -> CanError {
    CanError::Device(CanDeviceError::new(
        CanDeviceErrorKind::InvalidResponse,
        format!("Malformed SLCAN line: {:?}", String::from_utf8_lossy(line)),
    ))
}

/// 流式行缓冲
///
/// 串口读取可能在任意字节处截断，`push` 累积字节，`next_event` 逐行取出。
#[derive(Debug, Default)]
pub struct SlcanDecoder {
    buf: Vec<u8>,
}

impl SlcanDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        // 噪声保护：长时间没有结束符时丢弃
        if self.buf.len() > MAX_LINE_LEN * 8
            && !self.buf.iter().any(|&b| b == TERMINATOR || b == BELL)
        {
            self.buf.clear();
        }
    }

    /// 取出下一个完整事件；数据不足一行时返回 `None`
    pub fn next_event(&mut self) -> Option<Result<SlcanEvent, CanError>> {
        let pos = self.buf.iter().position(|&b| b == TERMINATOR || b == BELL)?;
        let line: Vec<u8> = self.buf.drain(..=pos).collect();
        let (body, end) = line.split_at(pos);
        if end[0] == BELL {
            return Some(Ok(SlcanEvent::Error));
        }
        Some(parse_line(body))
    }
}
