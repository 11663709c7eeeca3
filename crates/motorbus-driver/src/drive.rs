//! 差速驱动测试序列
//!
//! 每一步先发左电机速度，间隔 100ms 再发右电机速度，然后保持 `hold`。
//! 序列无论正常结束还是被中止，最后都会把两侧速度置 0。

use crate::{CommandDriver, DriverError};
use motorbus_protocol::MotorChannel;
use std::time::Duration;
use tracing::{info, warn};

/// 左右两次发送之间的间隔
pub const SIDE_GAP: Duration = Duration::from_millis(100);

/// 使能两个通道时的间隔
pub const ENABLE_GAP: Duration = Duration::from_millis(100);

/// 序列中的一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveStep {
    pub action: &'static str,
    pub left: i32,
    pub right: i32,
    pub hold: Duration,
}

const fn step(action: &'static str, left: i32, right: i32, hold_ms: u64) -> DriveStep {
    DriveStep {
        action,
        left,
        right,
        hold: Duration::from_millis(hold_ms),
    }
}

/// 电机测试：前进、后退、原地左转、原地右转
pub const MOTOR_TEST: &[DriveStep] = &[
    step("forward", 30, 30, 3000),
    step("stop", 0, 0, 1000),
    step("reverse", -30, -30, 3000),
    step("stop", 0, 0, 1000),
    step("turn left", -20, 20, 2000),
    step("turn right", 20, -20, 2000),
    step("stop", 0, 0, 1000),
];

/// 差速演示：每个动作 2 秒，速度更高
pub const DIFFERENTIAL_DEMO: &[DriveStep] = &[
    step("stop", 0, 0, 2000),
    step("forward", 50, 50, 2000),
    step("reverse", -50, -50, 2000),
    step("turn left", -30, 30, 2000),
    step("turn right", 30, -30, 2000),
    step("stop", 0, 0, 2000),
];

/// 依次使能左右电机
///
/// 每次发送前先检查 `wait`；返回 `false` 表示被中止，此时不应继续执行序列。
pub fn enable_both(
    driver: &CommandDriver,
    mut wait: impl FnMut(Duration) -> bool,
) -> Result<bool, DriverError> {
    let mut gap = Duration::ZERO;
    for channel in MotorChannel::ALL {
        if !wait(gap) {
            info!("Enable aborted before motor {}", channel);
            return Ok(false);
        }
        driver.enable_motor(channel.as_u8())?;
        gap = ENABLE_GAP;
    }
    Ok(wait(gap))
}

/// 执行序列
///
/// `wait` 负责等待给定时长，返回 `false` 表示中止（如收到 Ctrl+C）。
/// 每次发送速度之前都会先经过一次 `wait`，中止后不会再发出非零速度。
/// 返回实际完成的步数。
pub fn run_sequence(
    driver: &CommandDriver,
    steps: &[DriveStep],
    mut wait: impl FnMut(Duration) -> bool,
) -> Result<usize, DriverError> {
    let result = run_steps(driver, steps, &mut wait);

    let stopped = driver.drive(0, 0);
    if let Err(e) = &stopped {
        warn!("Failed to stop motors after drive sequence: {}", e);
    }
    let completed = result?;
    stopped?;
    Ok(completed)
}

fn run_steps(
    driver: &CommandDriver,
    steps: &[DriveStep],
    wait: &mut impl FnMut(Duration) -> bool,
) -> Result<usize, DriverError> {
    if !wait(Duration::ZERO) {
        return Ok(0);
    }
    for (index, step) in steps.iter().enumerate() {
        info!(
            "Step {}/{}: {} (left {}, right {}, {:?})",
            index + 1,
            steps.len(),
            step.action,
            step.left,
            step.right,
            step.hold
        );
        driver.set_speed(MotorChannel::Left.as_u8(), step.left)?;
        if !wait(SIDE_GAP) {
            return Ok(index);
        }
        driver.set_speed(MotorChannel::Right.as_u8(), step.right)?;
        if !wait(step.hold) {
            return Ok(index + 1);
        }
    }
    Ok(steps.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_test_ends_stopped() {
        let last = MOTOR_TEST.last().unwrap();
        assert_eq!((last.left, last.right), (0, 0));
        let total: Duration = MOTOR_TEST.iter().map(|s| s.hold).sum();
        assert_eq!(total, Duration::from_secs(13));
    }

    #[test]
    fn test_sequences_within_speed_range() {
        for step in MOTOR_TEST.iter().chain(DIFFERENTIAL_DEMO) {
            assert!((-100..=100).contains(&step.left));
            assert!((-100..=100).contains(&step.right));
        }
    }
}
