//! # Motorbus Driver
//!
//! 建立在 [`motorbus_can::Transport`] 之上的驱动层：
//! - 会话管理（[`BusSession`]）
//! - 电机命令发送与输入校验（[`CommandDriver`]）
//! - 后台总线监控（[`BusMonitor`]）及其输出（[`MonitorSink`]、[`ChannelSink`]）
//! - 驱动测试序列（[`drive`]）
//!
//! 大多数场景直接使用 [`MotorBus`]。

mod bus;
pub mod command;
mod config;
pub mod drive;
mod error;
pub mod hooks;
mod metrics;
pub mod monitor;
pub mod recording;
mod session;

pub use bus::MotorBus;
pub use command::{CommandDriver, clamp_speed, parse_channel};
pub use config::BusConfig;
pub use drive::{DIFFERENTIAL_DEMO, DriveStep, MOTOR_TEST};
pub use error::DriverError;
pub use hooks::MonitorSink;
pub use metrics::{MonitorStats, MonitorStatsSnapshot};
pub use monitor::{BusMonitor, MonitorRecord};
pub use recording::ChannelSink;
pub use session::BusSession;
