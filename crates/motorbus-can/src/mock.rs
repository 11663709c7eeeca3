//! 内存 Mock 适配器
//!
//! 不需要硬件即可驱动整条链路：接收队列可脚本化（帧、超时、错误），
//! 发送的帧被记录下来供断言。`MockCanAdapter` 可以克隆，所有克隆共享同一状态，
//! 测试代码保留一份克隆用于注入和检查。

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, MotorFrame};
use crate::{RxAdapter, SplittableAdapter, TxAdapter, ensure_valid_id};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 脚本化的接收事件
#[derive(Debug)]
pub enum MockRx {
    Frame(MotorFrame),
    /// 本次接收立即超时
    Timeout,
    /// 本次接收返回错误
    Error(CanError),
}

#[derive(Debug, Default)]
struct MockState {
    rx_queue: VecDeque<MockRx>,
    sent: Vec<MotorFrame>,
    fail_sends: bool,
    fail_configure: bool,
    /// 发送的帧同时进入接收队列
    loopback: bool,
    configured_bitrate: Option<u32>,
    receive_calls: u64,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockState>,
    rx_ready: Condvar,
}

/// 内存总线
#[derive(Debug, Clone, Default)]
pub struct MockCanAdapter {
    shared: Arc<Shared>,
}

impl MockCanAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 排入一个接收帧
    pub fn push_frame(&self, frame: MotorFrame) {
        self.push_rx(MockRx::Frame(frame));
    }

    pub fn push_rx(&self, event: MockRx) {
        self.shared.state.lock().rx_queue.push_back(event);
        self.shared.rx_ready.notify_all();
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.shared.state.lock().fail_sends = fail;
    }

    pub fn set_fail_configure(&self, fail: bool) {
        self.shared.state.lock().fail_configure = fail;
    }

    pub fn set_loopback(&self, loopback: bool) {
        self.shared.state.lock().loopback = loopback;
    }

    /// 已发送帧的快照（按发送顺序）
    pub fn sent_frames(&self) -> Vec<MotorFrame> {
        self.shared.state.lock().sent.clone()
    }

    pub fn take_sent_frames(&self) -> Vec<MotorFrame> {
        std::mem::take(&mut self.shared.state.lock().sent)
    }

    pub fn pending_rx(&self) -> usize {
        self.shared.state.lock().rx_queue.len()
    }

    /// 接收调用次数（含超时）
    pub fn receive_calls(&self) -> u64 {
        self.shared.state.lock().receive_calls
    }

    pub fn configured_bitrate(&self) -> Option<u32> {
        self.shared.state.lock().configured_bitrate
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    fn send_frame(&self, frame: MotorFrame) -> Result<(), CanError> {
        ensure_valid_id(&frame)?;
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(CanError::NotStarted);
        }
        if state.fail_sends {
            return Err(CanError::Io(std::io::Error::other("mock send failure")));
        }
        state.sent.push(frame);
        if state.loopback {
            state.rx_queue.push_back(MockRx::Frame(frame));
            drop(state);
            self.shared.rx_ready.notify_all();
        }
        Ok(())
    }

    /// 队列为空时等待注入，最长 `timeout`
    fn receive_frame(&self, timeout: Duration) -> Result<MotorFrame, CanError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        state.receive_calls += 1;

        loop {
            if state.closed {
                return Err(CanError::NotStarted);
            }
            match state.rx_queue.pop_front() {
                Some(MockRx::Frame(frame)) => {
                    return Ok(match frame.timestamp {
                        Some(_) => frame,
                        None => frame.with_timestamp(Instant::now()),
                    });
                },
                Some(MockRx::Timeout) => return Err(CanError::Timeout),
                Some(MockRx::Error(e)) => return Err(e),
                None => {
                    if self.shared.rx_ready.wait_until(&mut state, deadline).timed_out()
                        && state.rx_queue.is_empty()
                    {
                        return Err(CanError::Timeout);
                    }
                },
            }
        }
    }

    fn close(&self) {
        self.shared.state.lock().closed = true;
        self.shared.rx_ready.notify_all();
    }
}

impl CanAdapter for MockCanAdapter {
    fn configure(&mut self, bitrate: u32) -> Result<(), CanError> {
        let mut state = self.shared.state.lock();
        if state.fail_configure {
            return Err(CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::UnsupportedConfig,
                format!("mock rejected bitrate {}", bitrate),
            )));
        }
        state.configured_bitrate = Some(bitrate);
        Ok(())
    }

    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError> {
        self.send_frame(frame)
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<MotorFrame, CanError> {
        self.receive_frame(timeout)
    }
}

/// Mock 只读半边
#[derive(Debug)]
pub struct MockRxHalf(MockCanAdapter);

/// Mock 只写半边
#[derive(Debug)]
pub struct MockTxHalf(MockCanAdapter);

impl RxAdapter for MockRxHalf {
    fn receive_timeout(&mut self, timeout: Duration) -> Result<MotorFrame, CanError> {
        self.0.receive_frame(timeout)
    }
}

impl TxAdapter for MockTxHalf {
    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError> {
        self.0.send_frame(frame)
    }

    fn close(&mut self) -> Result<(), CanError> {
        self.0.close();
        Ok(())
    }
}

impl SplittableAdapter for MockCanAdapter {
    type RxAdapter = MockRxHalf;
    type TxAdapter = MockTxHalf;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        Ok((MockRxHalf(self.clone()), MockTxHalf(self)))
    }
}
