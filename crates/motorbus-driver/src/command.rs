//! 电机命令发送
//!
//! 负责输入校验（通道号、速度限幅），编码后通过会话中的传输发送。

use crate::{BusSession, DriverError};
use motorbus_protocol::{
    MotorChannel, MotorCommand, MotorFrame, SPEED_MAX, SPEED_MIN, encode_disable, encode_enable,
    encode_speed,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// 速度限幅到 [-100, 100]
pub fn clamp_speed(speed: i32) -> i8 {
    speed.clamp(SPEED_MIN as i32, SPEED_MAX as i32) as i8
}

/// 通道号校验，在任何 I/O 之前进行
pub fn parse_channel(channel: u8) -> Result<MotorChannel, DriverError> {
    MotorChannel::try_from(channel).map_err(|_| DriverError::InvalidChannel(channel))
}

/// 命令驱动
///
/// 除共享的会话句柄外不持有状态。
#[derive(Debug, Clone)]
pub struct CommandDriver {
    session: Arc<BusSession>,
}

impl CommandDriver {
    pub fn new(session: Arc<BusSession>) -> Self {
        Self { session }
    }

    /// 使能电机
    pub fn enable_motor(&self, channel: u8) -> Result<(), DriverError> {
        let channel = parse_channel(channel)?;
        self.send_frame(encode_enable(channel))?;
        info!("Motor {} enabled", channel);
        Ok(())
    }

    /// 失能电机
    pub fn disable_motor(&self, channel: u8) -> Result<(), DriverError> {
        let channel = parse_channel(channel)?;
        self.send_frame(encode_disable(channel))?;
        info!("Motor {} disabled", channel);
        Ok(())
    }

    /// 设置速度，超出 [-100, 100] 的值静默限幅
    pub fn set_speed(&self, channel: u8, speed: i32) -> Result<(), DriverError> {
        let channel = parse_channel(channel)?;
        let clamped = clamp_speed(speed);
        if clamped as i32 != speed {
            debug!("Speed {} clamped to {}", speed, clamped);
        }
        self.send_frame(encode_speed(channel, clamped))?;
        info!("Motor {} speed set to {}", channel, clamped);
        Ok(())
    }

    /// 左右电机同时设速（先左后右）
    pub fn drive(&self, left: i32, right: i32) -> Result<(), DriverError> {
        self.set_speed(MotorChannel::Left.as_u8(), left)?;
        self.set_speed(MotorChannel::Right.as_u8(), right)
    }

    /// 发送已类型化的命令
    pub fn send_command(&self, command: MotorCommand) -> Result<(), DriverError> {
        debug!("Sending {}", command);
        self.send_frame(command.to_frame())
    }

    /// 发送一帧后做一次有界接收；无回应返回 `Ok(None)`
    ///
    /// 与监控线程共用 RX 半边，自检时应先停止监控。
    pub fn send_and_await_echo(
        &self,
        frame: MotorFrame,
        timeout: Duration,
    ) -> Result<Option<MotorFrame>, DriverError> {
        let transport = self.session.transport()?;
        transport.send(frame)?;
        Ok(transport.recv(timeout)?)
    }

    fn send_frame(&self, frame: MotorFrame) -> Result<(), DriverError> {
        self.session.transport()?.send(frame)?;
        Ok(())
    }
}
