//! 通信自检
//!
//! 发送一条左电机使能命令，在 `echo_timeout` 内等待总线上的任意帧。
//! 控制器不回显命令，没有回应也属正常；能发送成功就说明适配器和总线可用。

use crate::oneshot::OneShot;
use anyhow::{Context, Result};
use motorbus_protocol::{DecodedFrame, MotorChannel, decode, encode_enable};

pub fn execute(oneshot: &OneShot) -> Result<()> {
    let bus = oneshot.connect()?;
    let frame = encode_enable(MotorChannel::Left);
    let timeout = bus.config().echo_timeout();

    println!("📤 发送: {}", frame);
    let reply = bus
        .driver()
        .send_and_await_echo(frame, timeout)
        .context("通信自检发送失败")?;

    match reply {
        Some(reply) => {
            println!("📥 收到: {}", reply);
            if let DecodedFrame::Command(cmd) = decode(&reply) {
                println!("   解码: {}", cmd);
            }
        },
        None => println!("ℹ️  {:?} 内未收到回应（控制器不回显命令，属正常现象）", timeout),
    }

    println!("✅ 通信自检完成");
    Ok(())
}
