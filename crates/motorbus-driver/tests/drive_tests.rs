//! 驱动测试序列（Mock 总线）

use motorbus_can::{MockCanAdapter, Transport};
use motorbus_driver::{BusConfig, MotorBus, drive};
use motorbus_protocol::{MotorFrame, bytes_to_i32_be};
use std::time::Duration;

fn connected_bus() -> (MotorBus, MockCanAdapter) {
    let mock = MockCanAdapter::new();
    let bus = MotorBus::new(BusConfig::default());
    bus.attach(Transport::mock(mock.clone()).unwrap());
    (bus, mock)
}

fn is_speed(frame: &MotorFrame) -> bool {
    frame.data[1] == 0x00
}

fn wire_speed(frame: &MotorFrame) -> i32 {
    bytes_to_i32_be([frame.data[4], frame.data[5], frame.data[6], frame.data[7]])
}

#[test]
fn motor_test_sequence_ends_with_zero_speeds() {
    let (bus, mock) = connected_bus();
    assert!(drive::enable_both(bus.driver(), |_| true).unwrap());

    let mut waited = Duration::ZERO;
    let completed = drive::run_sequence(bus.driver(), drive::MOTOR_TEST, |d| {
        waited += d;
        true
    })
    .unwrap();

    assert_eq!(completed, drive::MOTOR_TEST.len());
    // 两个使能 + 每步两帧 + 结尾归零两帧
    let sent = mock.sent_frames();
    assert_eq!(sent.len(), 2 + drive::MOTOR_TEST.len() * 2 + 2);
    assert_eq!(sent[0].data[1], 0x0D);
    assert_eq!(sent[1].data[1], 0x0D);
    let tail = &sent[sent.len() - 2..];
    assert!(tail.iter().all(|f| wire_speed(f) == 0));
    assert_eq!(
        waited,
        Duration::from_secs(13) + drive::SIDE_GAP * drive::MOTOR_TEST.len() as u32
    );
}

#[test]
fn enable_waits_between_channels() {
    let (bus, mock) = connected_bus();
    let mut waits = Vec::new();
    assert!(
        drive::enable_both(bus.driver(), |d| {
            waits.push(d);
            true
        })
        .unwrap()
    );

    assert_eq!(waits, vec![Duration::ZERO, drive::ENABLE_GAP, drive::ENABLE_GAP]);
    let channels: Vec<u8> = mock.sent_frames().iter().map(|f| f.data[3]).collect();
    assert_eq!(channels, vec![1, 2]);
}

#[test]
fn aborted_sequence_still_stops_motors() {
    let (bus, mock) = connected_bus();
    let mut calls = 0;
    let completed = drive::run_sequence(bus.driver(), drive::MOTOR_TEST, |_| {
        calls += 1;
        calls < 4
    })
    .unwrap();

    assert_eq!(completed, 1);
    let sent = mock.sent_frames();
    // 第一步两帧 + 第二步左侧一帧 + 归零两帧
    assert_eq!(sent.len(), 5);
    assert!(sent[3..].iter().all(|f| wire_speed(f) == 0));
}

#[test]
fn pre_aborted_run_sends_no_motion() {
    let (bus, mock) = connected_bus();

    assert!(!drive::enable_both(bus.driver(), |_| false).unwrap());
    assert!(mock.sent_frames().is_empty());

    let completed = drive::run_sequence(bus.driver(), drive::MOTOR_TEST, |_| false).unwrap();
    assert_eq!(completed, 0);

    let sent = mock.sent_frames();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(is_speed));
    assert!(sent.iter().all(|f| wire_speed(f) == 0));
}

#[test]
fn abort_during_enable_stops_before_second_channel() {
    let (bus, mock) = connected_bus();
    let mut calls = 0;
    let completed = drive::enable_both(bus.driver(), |_| {
        calls += 1;
        calls < 2
    })
    .unwrap();

    assert!(!completed);
    let sent = mock.sent_frames();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].data[1], 0x0D);
    assert_eq!(sent[0].data[3], 1);
}

#[test]
fn abort_after_enable_gap_reports_abort() {
    let (bus, mock) = connected_bus();
    let mut calls = 0;
    let completed = drive::enable_both(bus.driver(), |_| {
        calls += 1;
        calls < 3
    })
    .unwrap();

    assert!(!completed);
    assert_eq!(mock.sent_frames().len(), 2);
    assert!(!mock.sent_frames().iter().any(is_speed));
}
