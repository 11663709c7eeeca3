//! 命令定义和实现

pub mod config;
pub mod detect;
pub mod drive_test;
pub mod echo;
pub mod monitor;
pub mod motor;
pub mod status;

pub use config::ConfigCommand;
pub use drive_test::DriveTestCommand;
pub use monitor::MonitorCommand;
pub use motor::{ChannelCommand, SpeedCommand};
