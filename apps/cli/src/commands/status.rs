//! 当前状态概览
//!
//! 列出可用适配器数量，并尝试连接已配置的接口以报告连接与总线状态。
//! 连接失败只作为状态输出，命令本身仍然成功。

use super::detect::discover;
use crate::oneshot::OneShot;
use anyhow::Result;
use motorbus_can::TransportDescriptor;
use motorbus_driver::MotorBus;
use motorbus_protocol::{BUS_BITRATE, ID_MOTOR_COMMAND};
use tracing::debug;

/// 连接尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// 未配置接口
    Unconfigured,
    Connected,
    Failed(String),
}

/// 一次状态查询的汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub available: usize,
    pub interface: Option<String>,
    pub connection: Connection,
    pub monitoring: bool,
    /// 总线状态；仅 SocketCAN 可查询
    pub bus_state: Option<String>,
}

pub fn execute(oneshot: &OneShot) -> Result<()> {
    let report = collect(oneshot);
    println!("{}", render(&report));
    Ok(())
}

fn collect(oneshot: &OneShot) -> StatusReport {
    let mut report = StatusReport {
        available: discover().len(),
        interface: oneshot.interface.clone(),
        connection: Connection::Unconfigured,
        monitoring: false,
        bus_state: None,
    };

    if oneshot.interface.is_none() {
        return report;
    }
    let descriptor = match oneshot.descriptor() {
        Ok(descriptor) => descriptor,
        Err(e) => {
            report.connection = Connection::Failed(format!("{:#}", e));
            return report;
        },
    };

    let bus = MotorBus::new(oneshot.bus);
    match bus.connect(&descriptor) {
        Ok(()) => {
            report.connection = Connection::Connected;
            report.monitoring = bus.monitor().is_running();
            report.bus_state = bus_state(&descriptor);
        },
        Err(e) => {
            debug!("Status connect to {} failed: {}", descriptor, e);
            report.connection = Connection::Failed(e.to_string());
        },
    }
    report
}

#[cfg(target_os = "linux")]
fn bus_state(descriptor: &TransportDescriptor) -> Option<String> {
    if descriptor.family != motorbus_can::AdapterFamily::SocketCan {
        return None;
    }
    let state = match motorbus_can::socketcan::check_interface_status(&descriptor.channel) {
        Ok(true) => "UP".to_string(),
        Ok(false) => "DOWN".to_string(),
        Err(e) => format!("查询失败 ({})", e),
    };
    Some(state)
}

#[cfg(not(target_os = "linux"))]
fn bus_state(_descriptor: &TransportDescriptor) -> Option<String> {
    None
}

/// 渲染为多行文本
pub fn render(report: &StatusReport) -> String {
    let mut lines = vec![
        "📊 当前状态:".to_string(),
        format!("   可用接口数量: {}", report.available),
        format!(
            "   总线接口:     {}",
            report.interface.as_deref().unwrap_or("(未设置)")
        ),
    ];

    lines.push(match &report.connection {
        Connection::Connected => "   连接状态:     已连接".to_string(),
        Connection::Unconfigured => "   连接状态:     未连接".to_string(),
        Connection::Failed(reason) => format!("   连接状态:     未连接 ({})", reason),
    });
    lines.push(format!(
        "   监控状态:     {}",
        if report.monitoring { "运行中" } else { "已停止" }
    ));
    lines.push(format!("   配置波特率:   {} bps", BUS_BITRATE));
    lines.push(format!("   CAN ID:       0x{:08X}", ID_MOTOR_COMMAND));

    if report.connection == Connection::Connected {
        lines.push(format!(
            "   总线状态:     {}",
            report.bus_state.as_deref().unwrap_or("未知")
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(connection: Connection) -> StatusReport {
        StatusReport {
            available: 2,
            interface: Some("socketcan:can0".to_string()),
            connection,
            monitoring: false,
            bus_state: None,
        }
    }

    #[test]
    fn test_render_unconfigured() {
        let text = render(&StatusReport {
            interface: None,
            ..report(Connection::Unconfigured)
        });
        assert!(text.contains("可用接口数量: 2"));
        assert!(text.contains("总线接口:     (未设置)"));
        assert!(text.contains("连接状态:     未连接"));
        assert!(text.contains("监控状态:     已停止"));
        assert!(text.contains("配置波特率:   250000 bps"));
        assert!(text.contains("CAN ID:       0x06000001"));
        assert!(!text.contains("总线状态"));
    }

    #[test]
    fn test_render_connected_with_bus_state() {
        let text = render(&StatusReport {
            bus_state: Some("UP".to_string()),
            ..report(Connection::Connected)
        });
        assert!(text.contains("连接状态:     已连接"));
        assert!(text.contains("总线状态:     UP"));
    }

    #[test]
    fn test_render_connected_unknown_bus_state() {
        let text = render(&report(Connection::Connected));
        assert!(text.contains("总线状态:     未知"));
    }

    #[test]
    fn test_render_failed_connection_reason() {
        let text = render(&report(Connection::Failed("no such device".to_string())));
        assert!(text.contains("未连接 (no such device)"));
        assert!(!text.contains("总线状态"));
    }
}
