//! CAN ID 与总线常量定义
//!
//! 集中定义协议相关的常量，避免在代码中散落"魔法数"。

/// 电机命令帧 ID（扩展帧，29-bit）
///
/// 与 ESP32 控制板 TWAI 配置一致，所有命令都发往此 ID。
pub const ID_MOTOR_COMMAND: u32 = 0x0600_0001;

/// 总线波特率（bit/s），由控制器固定为 250 kbit/s
pub const BUS_BITRATE: u32 = 250_000;

/// Byte 0：SDO 写 4 字节命令字
pub const SDO_WRITE_4: u8 = 0x23;

/// Byte 2：对象索引高字节
pub const OBJECT_INDEX_HIGH: u8 = 0x20;

/// 逻辑速度下限（百分比）
pub const SPEED_MIN: i8 = -100;

/// 逻辑速度上限（百分比）
pub const SPEED_MAX: i8 = 100;

/// 逻辑速度到驱动器速度值的比例（driver = speed * 100）
pub const DRIVER_SPEED_SCALE: i32 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_id_constants() {
        assert_eq!(ID_MOTOR_COMMAND, 0x06000001);
        assert!(ID_MOTOR_COMMAND <= crate::EXTENDED_ID_MAX);
        assert!(ID_MOTOR_COMMAND > crate::STANDARD_ID_MAX);
        assert_eq!(BUS_BITRATE, 250_000);
    }
}
