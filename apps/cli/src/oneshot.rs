//! One-shot 模式
//!
//! 每个命令独立执行：
//! 1. 读取配置
//! 2. 连接总线
//! 3. 执行操作
//! 4. 断开连接（`MotorBus` 的 Drop）

use crate::commands::config::CliConfig;
use anyhow::{Context, Result, bail};
use motorbus_can::TransportDescriptor;
use motorbus_driver::{BusConfig, MotorBus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// One-shot 模式配置
#[derive(Debug, Clone)]
pub struct OneShot {
    /// 命令行或配置文件中的描述符
    pub interface: Option<String>,

    /// 总线参数
    pub bus: BusConfig,
}

impl OneShot {
    /// 加载配置文件，命令行 `--interface` 优先
    pub fn load(interface: Option<String>) -> Result<Self> {
        let config = CliConfig::load()?;
        Ok(Self::from_parts(interface, config))
    }

    pub fn from_parts(interface: Option<String>, config: CliConfig) -> Self {
        Self {
            bus: config.bus_config(),
            interface: interface.or(config.interface),
        }
    }

    /// 解析描述符
    pub fn descriptor(&self) -> Result<TransportDescriptor> {
        let Some(iface) = self.interface.as_deref() else {
            bail!(
                "未指定总线接口：使用 --interface（如 socketcan:can0），\
                 或先执行 `motorbus-cli config set --interface ...`；\
                 `motorbus-cli detect` 可列出可用适配器"
            );
        };
        iface.parse().with_context(|| format!("无效的总线描述符: {}", iface))
    }

    /// 连接总线
    pub fn connect(&self) -> Result<MotorBus> {
        let descriptor = self.descriptor()?;

        println!("⏳ 连接到 {} ...", descriptor);
        let bus = MotorBus::new(self.bus);
        bus.connect(&descriptor).with_context(|| format!("连接 {} 失败", descriptor))?;
        println!("✅ 已连接");

        Ok(bus)
    }
}

/// 注册 Ctrl+C 处理器，返回运行标志（收到信号后变为 false）
pub fn install_ctrlc() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("注册 Ctrl+C 处理器失败")?;
    Ok(running)
}

/// 可中断的等待
///
/// 以小片段休眠，`running` 变为 false 时立即返回 `false`。
pub fn interruptible_sleep(duration: Duration, running: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(20);

    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(SLICE.min(deadline - now));
    }
}
