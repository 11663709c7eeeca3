//! # Motorbus CLI
//!
//! 双通道电机控制器的 CAN 诊断工具。
//!
//! 每个命令独立执行：读取配置 -> 连接总线 -> 执行操作 -> 断开连接。
//!
//! ```bash
//! # 查找可用的 CAN 适配器
//! motorbus-cli detect
//! motorbus-cli status
//!
//! # 配置默认接口
//! motorbus-cli config set --interface socketcan:can0
//!
//! # 单条命令
//! motorbus-cli enable -c 1
//! motorbus-cli speed -c 1 -s 50
//!
//! # 监控总线 / 驱动测试
//! motorbus-cli monitor
//! motorbus-cli drive-test
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod oneshot;

use commands::{
    ChannelCommand, ConfigCommand, DriveTestCommand, MonitorCommand, SpeedCommand, detect,
};
use oneshot::OneShot;

/// Motorbus CLI - 电机 CAN 总线诊断工具
#[derive(Parser, Debug)]
#[command(name = "motorbus-cli")]
#[command(about = "CAN diagnostics for the dual-channel motor controller", long_about = None)]
#[command(version)]
struct Cli {
    /// 总线描述符（如 socketcan:can0、serial:/dev/ttyACM0），覆盖配置文件
    #[arg(short, long, global = true)]
    interface: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 列出可用的 CAN 适配器
    Detect,

    /// 使能电机
    Enable {
        #[command(flatten)]
        args: ChannelCommand,
    },

    /// 失能电机
    Disable {
        #[command(flatten)]
        args: ChannelCommand,
    },

    /// 设置电机速度
    Speed {
        #[command(flatten)]
        args: SpeedCommand,
    },

    /// 通信自检（发送使能命令并等待任意回应）
    Echo,

    /// 监控总线上的帧
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 差速驱动测试序列
    DriveTest {
        #[command(flatten)]
        args: DriveTestCommand,
    },

    /// 显示当前状态（适配器数量、连接与总线状态）
    Status,

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("motorbus_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect => detect::execute(),

        Commands::Enable { args } => args.enable(&OneShot::load(cli.interface)?),

        Commands::Disable { args } => args.disable(&OneShot::load(cli.interface)?),

        Commands::Speed { args } => args.execute(&OneShot::load(cli.interface)?),

        Commands::Echo => commands::echo::execute(&OneShot::load(cli.interface)?),

        Commands::Monitor { args } => args.execute(&OneShot::load(cli.interface)?),

        Commands::DriveTest { args } => args.execute(&OneShot::load(cli.interface)?),

        Commands::Status => commands::status::execute(&OneShot::load(cli.interface)?),

        Commands::Config(cmd) => cmd.execute(),
    }
}
