//! 适配器发现
//!
//! - SocketCAN：`/sys/class/net/*/type` 为 280（`ARPHRD_CAN`）的网络设备
//! - 串口：USB 产品/厂商描述含 `CAN`、`SLCAN`、`LAWICEL` 的记为 `serial:`，
//!   含 `USB2CAN` 的记为 `usb2can:`

use anyhow::Result;
use motorbus_can::{AdapterFamily, TransportDescriptor};
use serialport::SerialPortType;
use std::fs;
use std::path::Path;
use tracing::debug;

/// `ARPHRD_CAN`
const ARPHRD_CAN: &str = "280";

pub fn execute() -> Result<()> {
    let found = discover();

    if found.is_empty() {
        println!("未发现 CAN 适配器");
        println!("  SocketCAN: sudo ip link set can0 up type can bitrate 250000");
        println!("  SLCAN:     插入 USB-CAN 适配器后重试");
        return Ok(());
    }

    println!("发现 {} 个适配器:", found.len());
    for descriptor in &found {
        println!("  {}", descriptor);
    }
    Ok(())
}

/// 列出所有可用的描述符（去重、排序）
pub fn discover() -> Vec<TransportDescriptor> {
    let mut found: Vec<TransportDescriptor> = socketcan_interfaces(Path::new("/sys/class/net"))
        .into_iter()
        .map(|name| TransportDescriptor::new(AdapterFamily::SocketCan, name))
        .collect();
    found.extend(serial_adapters());

    found.sort();
    found.dedup();
    found
}

/// 扫描 sysfs 网络设备目录
pub fn socketcan_interfaces(sys_class_net: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(sys_class_net) else {
        return Vec::new();
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            fs::read_to_string(entry.path().join("type"))
                .is_ok_and(|kind| kind.trim() == ARPHRD_CAN)
        })
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect()
}

fn serial_adapters() -> Vec<TransportDescriptor> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            debug!("Serial port enumeration failed: {}", e);
            return Vec::new();
        },
    };

    ports
        .into_iter()
        .filter_map(|port| match port.port_type {
            SerialPortType::UsbPort(info) => {
                classify_usb(info.product.as_deref(), info.manufacturer.as_deref())
                    .map(|family| TransportDescriptor::new(family, port.port_name))
            },
            _ => None,
        })
        .collect()
}

/// 根据 USB 描述判断适配器类型
pub fn classify_usb(product: Option<&str>, manufacturer: Option<&str>) -> Option<AdapterFamily> {
    let text = format!(
        "{} {}",
        product.unwrap_or_default(),
        manufacturer.unwrap_or_default()
    )
    .to_uppercase();

    if text.contains("USB2CAN") {
        Some(AdapterFamily::Usb2Can)
    } else if ["CAN", "SLCAN", "LAWICEL"].iter().any(|key| text.contains(key)) {
        Some(AdapterFamily::Serial)
    } else {
        None
    }
}
