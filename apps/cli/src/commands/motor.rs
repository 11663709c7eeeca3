//! 单条电机命令：使能、失能、设速
//!
//! 通道在连接总线之前校验，无效通道不会打开任何设备。

use crate::oneshot::OneShot;
use anyhow::{Context, Result};
use clap::Args;
use motorbus_driver::{clamp_speed, parse_channel};

/// 通道参数
#[derive(Args, Debug)]
pub struct ChannelCommand {
    /// 电机通道（1 = 左，2 = 右）
    #[arg(short, long)]
    pub channel: u8,
}

impl ChannelCommand {
    pub fn enable(&self, oneshot: &OneShot) -> Result<()> {
        let channel = parse_channel(self.channel)?;
        let bus = oneshot.connect()?;

        bus.driver().enable_motor(self.channel).context("发送使能命令失败")?;
        println!("✅ 已使能电机 {}", channel);
        Ok(())
    }

    pub fn disable(&self, oneshot: &OneShot) -> Result<()> {
        let channel = parse_channel(self.channel)?;
        let bus = oneshot.connect()?;

        bus.driver().disable_motor(self.channel).context("发送失能命令失败")?;
        println!("✅ 已失能电机 {}", channel);
        Ok(())
    }
}

/// 设速参数
#[derive(Args, Debug)]
pub struct SpeedCommand {
    /// 电机通道（1 = 左，2 = 右）
    #[arg(short, long)]
    pub channel: u8,

    /// 速度（-100..=100，超出范围会被截断）
    #[arg(short, long, allow_hyphen_values = true)]
    pub speed: i32,
}

impl SpeedCommand {
    pub fn execute(&self, oneshot: &OneShot) -> Result<()> {
        let channel = parse_channel(self.channel)?;
        let effective = clamp_speed(self.speed);
        if i32::from(effective) != self.speed {
            println!("⚠️  速度 {} 超出范围，截断为 {}", self.speed, effective);
        }

        let bus = oneshot.connect()?;
        bus.driver().set_speed(self.channel, self.speed).context("发送速度命令失败")?;
        println!("✅ 电机 {} 速度: {}", channel, effective);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::config::CliConfig;

    fn offline() -> OneShot {
        OneShot::from_parts(None, CliConfig::default())
    }

    #[test]
    fn test_invalid_channel_fails_before_connect() {
        let cmd = ChannelCommand { channel: 3 };
        let err = cmd.enable(&offline()).unwrap_err();
        assert!(err.to_string().contains("Invalid motor channel 3"));

        let cmd = SpeedCommand {
            channel: 0,
            speed: 10,
        };
        let err = cmd.execute(&offline()).unwrap_err();
        assert!(err.to_string().contains("Invalid motor channel 0"));
    }

    #[test]
    fn test_valid_channel_needs_interface() {
        let cmd = ChannelCommand { channel: 1 };
        let err = cmd.disable(&offline()).unwrap_err();
        assert!(err.to_string().contains("--interface"));
    }
}
