//! 配置管理命令
//!
//! 配置文件位于 `<config_dir>/motorbus/config.toml`：
//!
//! ```toml
//! interface = "socketcan:can0"
//!
//! [bus]
//! poll_timeout_ms = 100
//! echo_timeout_ms = 2000
//! ```

use anyhow::{Context, Result};
use clap::Subcommand;
use motorbus_can::TransportDescriptor;
use motorbus_driver::BusConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 配置目录
fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("motorbus");
    Ok(path)
}

/// 配置文件路径（不创建目录）
pub fn config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    path.push("config.toml");
    Ok(path)
}

/// `[bus]` 段，未设置的项使用 `BusConfig` 默认值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_capacity: Option<usize>,
}

impl BusOverrides {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 叠加到默认参数上
    pub fn apply(&self, mut config: BusConfig) -> BusConfig {
        if let Some(ms) = self.poll_timeout_ms {
            config.poll_timeout_ms = ms;
        }
        if let Some(ms) = self.stop_timeout_ms {
            config.stop_timeout_ms = ms;
        }
        if let Some(ms) = self.echo_timeout_ms {
            config.echo_timeout_ms = ms;
        }
        if let Some(capacity) = self.sink_capacity {
            config.sink_capacity = capacity;
        }
        config
    }
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// 默认总线描述符
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,

    #[serde(skip_serializing_if = "BusOverrides::is_empty")]
    pub bus: BusOverrides,
}

impl CliConfig {
    /// 从默认位置加载，文件不存在时返回默认配置
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    /// 保存到默认位置
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_file()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("创建配置目录失败")?;
        }

        let body = toml::to_string_pretty(self).context("序列化配置失败")?;
        let content = format!("# Motorbus CLI Configuration\n\n{}", body);
        fs::write(path, content).context("写入配置文件失败")?;
        Ok(())
    }

    /// 生效的总线参数
    pub fn bus_config(&self) -> BusConfig {
        self.bus.apply(BusConfig::default())
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 默认总线描述符（如 socketcan:can0、serial:/dev/ttyACM0）
        #[arg(short, long)]
        interface: Option<String>,

        /// 监控接收超时（毫秒）
        #[arg(long)]
        poll_timeout_ms: Option<u64>,

        /// 停止监控的等待上限（毫秒）
        #[arg(long)]
        stop_timeout_ms: Option<u64>,

        /// 通信自检等待时间（毫秒）
        #[arg(long)]
        echo_timeout_ms: Option<u64>,

        /// 监控输出队列容量
        #[arg(long)]
        sink_capacity: Option<usize>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（interface、bus 或 all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Set {
                interface,
                poll_timeout_ms,
                stop_timeout_ms,
                echo_timeout_ms,
                sink_capacity,
            } => {
                let overrides = BusOverrides {
                    poll_timeout_ms,
                    stop_timeout_ms,
                    echo_timeout_ms,
                    sink_capacity,
                };
                Self::set_(interface, overrides)
            },

            ConfigCommand::Get { key } => Self::get_(&key),

            ConfigCommand::Check => Self::check_(),
        }
    }

    fn set_(interface: Option<String>, overrides: BusOverrides) -> Result<()> {
        let mut config = CliConfig::load()?;

        if let Some(iface) = interface {
            let descriptor: TransportDescriptor =
                iface.parse().with_context(|| format!("无效的总线描述符: {}", iface))?;
            println!("✅ 设置默认接口: {}", descriptor);
            config.interface = Some(descriptor.to_string());
        }

        if !overrides.is_empty() {
            config.bus = BusOverrides {
                poll_timeout_ms: overrides.poll_timeout_ms.or(config.bus.poll_timeout_ms),
                stop_timeout_ms: overrides.stop_timeout_ms.or(config.bus.stop_timeout_ms),
                echo_timeout_ms: overrides.echo_timeout_ms.or(config.bus.echo_timeout_ms),
                sink_capacity: overrides.sink_capacity.or(config.bus.sink_capacity),
            };
            println!("✅ 更新总线参数: {:?}", config.bus_config());
        }

        let path = config.save()?;
        println!("💾 已保存: {}", path.display());
        Ok(())
    }

    fn get_(key: &str) -> Result<()> {
        let config = CliConfig::load()?;

        match key {
            "interface" => match config.interface {
                Some(ref iface) => println!("{}", iface),
                None => println!("(未设置)"),
            },

            "bus" => print_bus_config(&config.bus_config()),

            _ => {
                println!("Motorbus CLI 配置:");
                println!("  接口: {}", config.interface.as_deref().unwrap_or("(未设置)"));
                print_bus_config(&config.bus_config());
            },
        }

        Ok(())
    }

    fn check_() -> Result<()> {
        let path = config_file()?;
        println!("配置文件: {}", path.display());

        let config = CliConfig::load()?;
        match config.interface {
            Some(ref iface) => match iface.parse::<TransportDescriptor>() {
                Ok(descriptor) => println!("  ✅ 接口: {}", descriptor),
                Err(e) => println!("  ❌ 接口 {}: {}", iface, e),
            },
            None => println!("  ⚠️  未设置接口（使用 --interface 或 config set --interface）"),
        }
        print_bus_config(&config.bus_config());

        Ok(())
    }
}

fn print_bus_config(config: &BusConfig) {
    println!("  poll_timeout_ms = {}", config.poll_timeout_ms);
    println!("  stop_timeout_ms = {}", config.stop_timeout_ms);
    println!("  echo_timeout_ms = {}", config.echo_timeout_ms);
    println!("  sink_capacity = {}", config.sink_capacity);
}
