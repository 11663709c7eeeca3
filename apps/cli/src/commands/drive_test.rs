//! 差速驱动测试
//!
//! 使能两侧电机后执行固定序列，结束或 Ctrl+C 中止时两侧速度都会归零。

use crate::oneshot::{OneShot, install_ctrlc, interruptible_sleep};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use motorbus_driver::{DIFFERENTIAL_DEMO, DriveStep, MOTOR_TEST, drive};
use std::time::Duration;

/// 测试序列
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// 前进、停、后退、停、左转、右转、停
    MotorTest,
    /// 交互式差速演示（速度更高，每步 2 秒）
    Differential,
}

impl Pattern {
    pub fn steps(self) -> &'static [DriveStep] {
        match self {
            Pattern::MotorTest => MOTOR_TEST,
            Pattern::Differential => DIFFERENTIAL_DEMO,
        }
    }
}

/// 驱动测试参数
#[derive(Args, Debug)]
pub struct DriveTestCommand {
    /// 跳过使能步骤（电机已使能时）
    #[arg(long)]
    pub no_enable: bool,

    /// 测试序列
    #[arg(short, long, value_enum, default_value_t = Pattern::MotorTest)]
    pub pattern: Pattern,
}

impl DriveTestCommand {
    pub fn execute(&self, oneshot: &OneShot) -> Result<()> {
        let running = install_ctrlc()?;
        let bus = oneshot.connect()?;
        let steps = self.pattern.steps();
        let wait = |duration: Duration| interruptible_sleep(duration, &running);

        if !self.no_enable {
            println!("⚡ 使能左右电机...");
            if !drive::enable_both(bus.driver(), wait).context("使能电机失败")? {
                println!("🛑 已中止：未执行驱动序列");
                return Ok(());
            }
        }

        println!(
            "🚗 开始 {:?} 序列：{} 步，约 {:.1}s（Ctrl+C 中止）",
            self.pattern,
            steps.len(),
            total_duration(steps).as_secs_f64()
        );
        let completed =
            drive::run_sequence(bus.driver(), steps, wait).context("驱动测试序列失败")?;

        if completed == steps.len() {
            println!("✅ 驱动测试完成");
        } else {
            println!("🛑 已中止：完成 {}/{} 步，电机已停止", completed, steps.len());
        }
        Ok(())
    }
}

/// 序列的总时长（含左右间隔）
pub fn total_duration(steps: &[DriveStep]) -> Duration {
    steps.iter().map(|step| step.hold + drive::SIDE_GAP).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: DriveTestCommand,
    }

    #[test]
    fn test_default_pattern() {
        let cli = TestCli::try_parse_from(["drive-test"]).unwrap();
        assert_eq!(cli.args.pattern, Pattern::MotorTest);
        assert!(!cli.args.no_enable);
    }

    #[test]
    fn test_parse_differential_no_enable() {
        let cli =
            TestCli::try_parse_from(["drive-test", "--no-enable", "--pattern", "differential"])
                .unwrap();
        assert_eq!(cli.args.pattern, Pattern::Differential);
        assert!(cli.args.no_enable);
    }

    #[test]
    fn test_total_duration() {
        assert_eq!(
            total_duration(Pattern::MotorTest.steps()),
            Duration::from_millis(13_700)
        );
        assert_eq!(
            total_duration(Pattern::Differential.steps()),
            Duration::from_millis(12_600)
        );
    }
}
