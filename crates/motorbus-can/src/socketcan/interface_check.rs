//! CAN 接口状态检查
//!
//! 通过 `if_nametoindex()` 和 `ioctl(SIOCGIFFLAGS)` 检查网络接口是否存在且处于 UP 状态。
//! 只读操作，普通用户即可执行。

use crate::{CanDeviceError, CanDeviceErrorKind, CanError};
use libc::{AF_INET, IFF_UP, SIOCGIFFLAGS, SOCK_DGRAM, if_nametoindex, ifreq};
use std::ffi::CString;
use std::io;
use tracing::trace;

/// IFNAMSIZ - 1
const MAX_IFACE_NAME_LEN: usize = 15;

/// 检查接口是否存在且管理态为 UP
///
/// # 返回值
/// - `Ok(true)`: 接口存在且 IFF_UP
/// - `Ok(false)`: 接口存在但处于 DOWN 状态
/// - `Err(CanError::Device)`: 接口不存在或接口名无效
/// - `Err(CanError::Io)`: socket/ioctl 调用失败
pub fn check_interface_status(interface: &str) -> Result<bool, CanError> {
    if interface.is_empty() || interface.len() > MAX_IFACE_NAME_LEN {
        return Err(CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::UnsupportedConfig,
            format!(
                "Interface name '{}' must be 1..={} characters",
                interface, MAX_IFACE_NAME_LEN
            ),
        )));
    }

    let c_iface = CString::new(interface).map_err(|e| {
        CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::UnsupportedConfig,
            format!("Invalid interface name: {}", e),
        ))
    })?;

    let ifindex = unsafe { if_nametoindex(c_iface.as_ptr()) };
    if ifindex == 0 {
        let errno = io::Error::last_os_error();
        return Err(CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::NotFound,
            format!(
                "CAN interface '{}' does not exist ({}). Please create it first:\n  sudo ip link add dev {} type can",
                interface, errno, interface
            ),
        )));
    }

    let mut ifr: ifreq = unsafe { std::mem::zeroed() };
    let name_bytes = interface.as_bytes();
    unsafe {
        std::ptr::copy_nonoverlapping(
            name_bytes.as_ptr(),
            ifr.ifr_name.as_mut_ptr() as *mut u8,
            name_bytes.len(),
        );
    }
    ifr.ifr_name[name_bytes.len()] = 0;

    // ioctl 用的临时 socket，离开作用域自动关闭
    struct FdGuard(libc::c_int);
    impl Drop for FdGuard {
        fn drop(&mut self) {
            if self.0 >= 0 {
                unsafe { libc::close(self.0) };
            }
        }
    }

    let sockfd = unsafe { libc::socket(AF_INET, SOCK_DGRAM, 0) };
    if sockfd < 0 {
        return Err(CanError::Io(io::Error::last_os_error()));
    }
    let _guard = FdGuard(sockfd);

    let result = unsafe {
        libc::ioctl(
            sockfd,
            SIOCGIFFLAGS,
            &mut ifr as *mut _ as *mut libc::c_void,
        )
    };
    if result < 0 {
        return Err(CanError::Io(io::Error::last_os_error()));
    }

    // ifru_flags 是 ifr_ifru union 的第一个字段（c_short）
    let flags = unsafe { *(std::ptr::addr_of!(ifr.ifr_ifru) as *const libc::c_short) };
    let is_up = (flags as i32 & IFF_UP) != 0;

    trace!(
        "Interface '{}' status: {}",
        interface,
        if is_up { "UP" } else { "DOWN" }
    );
    Ok(is_up)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_interface_is_not_found() {
        match check_interface_status("motorbus_nx9") {
            Err(CanError::Device(e)) => {
                assert_eq!(e.kind, CanDeviceErrorKind::NotFound);
                assert!(e.message.contains("motorbus_nx9"));
            },
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_name_too_long() {
        let result = check_interface_status("this_name_is_way_too_long");
        assert!(matches!(result, Err(CanError::Device(_))));
    }

    #[test]
    fn test_name_with_nul() {
        let result = check_interface_status("can\0x");
        assert!(matches!(result, Err(CanError::Device(_))));
    }

    #[test]
    fn test_loopback_is_up() {
        // lo 几乎总是存在且 UP；容器里没有 lo 时跳过
        match check_interface_status("lo") {
            Ok(up) => assert!(up),
            Err(e) => eprintln!("Skipping: lo not available ({})", e),
        }
    }
}
