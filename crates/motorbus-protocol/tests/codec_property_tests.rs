//! 命令编解码的属性测试
//!
//! 使用 proptest 验证编码/解码的数学属性。

use motorbus_protocol::{
    DecodedFrame, ID_MOTOR_COMMAND, MotorChannel, MotorCommand, MotorFrame, bytes_to_i32_be,
    decode, encode_speed,
};
use proptest::prelude::*;

fn channel_strategy() -> impl Strategy<Value = MotorChannel> {
    prop_oneof![Just(MotorChannel::Left), Just(MotorChannel::Right)]
}

proptest! {
    /// 速度命令可以无损还原通道和速度
    #[test]
    fn speed_roundtrip(channel in channel_strategy(), speed in -100i8..=100) {
        let frame = encode_speed(channel, speed);
        prop_assert_eq!(
            decode(&frame),
            DecodedFrame::Command(MotorCommand::SetSpeed { channel, speed })
        );
    }

    /// 线上速度值恒为 speed * 100
    #[test]
    fn speed_wire_value(channel in channel_strategy(), speed in -100i8..=100) {
        let frame = encode_speed(channel, speed);
        let wire = bytes_to_i32_be([frame.data[4], frame.data[5], frame.data[6], frame.data[7]]);
        prop_assert_eq!(wire, speed as i32 * 100);
        prop_assert!((-10_000..=10_000).contains(&wire));
    }

    /// 解码对任意帧都不会失败，非命令帧原样返回
    #[test]
    fn decode_never_fails(
        id in 0u32..=0x1FFF_FFFF,
        data in proptest::collection::vec(any::<u8>(), 0..=8),
    ) {
        let frame = MotorFrame::new_extended(id, &data);
        match decode(&frame) {
            DecodedFrame::Command(cmd) => prop_assert_eq!(cmd.to_frame().data, frame.data),
            DecodedFrame::Raw(raw) => prop_assert_eq!(raw, frame),
        }
    }
}

#[test]
fn all_commands_share_the_motor_id() {
    for channel in MotorChannel::ALL {
        for cmd in [
            MotorCommand::Enable { channel },
            MotorCommand::Disable { channel },
            MotorCommand::SetSpeed { channel, speed: 0 },
        ] {
            let frame = cmd.to_frame();
            assert_eq!(frame.id, ID_MOTOR_COMMAND);
            assert!(frame.is_extended);
            assert!(frame.has_valid_id());
        }
    }
}
