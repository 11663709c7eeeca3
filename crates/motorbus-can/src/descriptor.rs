//! 传输描述符
//!
//! `family:channel` 形式的文本描述，例如 `socketcan:can0`、`serial:/dev/ttyACM0`。

use crate::{CanDeviceError, CanDeviceErrorKind, CanError};
use std::fmt;
use std::str::FromStr;

/// 适配器类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdapterFamily {
    /// Linux SocketCAN 网络接口
    SocketCan,
    /// PEAK PCAN（厂商 SDK）
    Pcan,
    /// Vector XL（厂商 SDK）
    Vector,
    /// Kvaser CANlib（厂商 SDK）
    Kvaser,
    /// USB2CAN 串口适配器（SLCAN 协议）
    Usb2Can,
    /// 通用串口 CAN（SLCAN/LAWICEL 协议）
    Serial,
}

impl AdapterFamily {
    pub const ALL: [AdapterFamily; 6] = [
        AdapterFamily::SocketCan,
        AdapterFamily::Pcan,
        AdapterFamily::Vector,
        AdapterFamily::Kvaser,
        AdapterFamily::Usb2Can,
        AdapterFamily::Serial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterFamily::SocketCan => "socketcan",
            AdapterFamily::Pcan => "pcan",
            AdapterFamily::Vector => "vector",
            AdapterFamily::Kvaser => "kvaser",
            AdapterFamily::Usb2Can => "usb2can",
            AdapterFamily::Serial => "serial",
        }
    }
}

impl fmt::Display for AdapterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterFamily {
    type Err = CanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        AdapterFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == lower)
            .ok_or_else(|| {
                CanError::Device(CanDeviceError::new(
                    CanDeviceErrorKind::UnsupportedConfig,
                    format!(
                        "Unknown adapter family '{}' (expected one of: socketcan, pcan, vector, kvaser, usb2can, serial)",
                        s
                    ),
                ))
            })
    }
}

/// 传输描述符：适配器类别 + 通道名
///
/// ```rust
/// use motorbus_can::{AdapterFamily, TransportDescriptor};
///
/// let desc: TransportDescriptor = "serial:/dev/ttyACM0".parse().unwrap();
/// assert_eq!(desc.family, AdapterFamily::Serial);
/// assert_eq!(desc.channel, "/dev/ttyACM0");
/// assert_eq!(desc.to_string(), "serial:/dev/ttyACM0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportDescriptor {
    pub family: AdapterFamily,
    pub channel: String,
}

impl TransportDescriptor {
    pub fn new(family: AdapterFamily, channel: impl Into<String>) -> Self {
        Self {
            family,
            channel: channel.into(),
        }
    }
}

impl fmt::Display for TransportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.channel)
    }
}

impl FromStr for TransportDescriptor {
    type Err = CanError;

    /// 只在第一个 `:` 处分割，通道名本身可以包含 `:`（如 `kvaser:kvaser:0`）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (family, channel) = s.split_once(':').ok_or_else(|| {
            CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::UnsupportedConfig,
                format!("Invalid descriptor '{}', expected 'family:channel'", s),
            ))
        })?;

        let channel = channel.trim();
        if channel.is_empty() {
            return Err(CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::UnsupportedConfig,
                format!("Descriptor '{}' has an empty channel", s),
            )));
        }

        Ok(Self::new(family.parse()?, channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_socketcan() {
        let desc: TransportDescriptor = "socketcan:can0".parse().unwrap();
        assert_eq!(desc, TransportDescriptor::new(AdapterFamily::SocketCan, "can0"));
    }

    #[test]
    fn test_parse_keeps_colons_in_channel() {
        let desc: TransportDescriptor = "kvaser:kvaser:0".parse().unwrap();
        assert_eq!(desc.family, AdapterFamily::Kvaser);
        assert_eq!(desc.channel, "kvaser:0");
    }

    #[test]
    fn test_parse_family_case_insensitive() {
        let desc: TransportDescriptor = "USB2CAN:COM4".parse().unwrap();
        assert_eq!(desc.family, AdapterFamily::Usb2Can);
        assert_eq!(desc.channel, "COM4");
    }

    #[test]
    fn test_parse_errors() {
        assert!("can0".parse::<TransportDescriptor>().is_err());
        assert!("socketcan:".parse::<TransportDescriptor>().is_err());
        assert!("ixxat:0".parse::<TransportDescriptor>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for family in AdapterFamily::ALL {
            let desc = TransportDescriptor::new(family, "ch0");
            let parsed: TransportDescriptor = desc.to_string().parse().unwrap();
            assert_eq!(parsed, desc);
        }
    }
}
