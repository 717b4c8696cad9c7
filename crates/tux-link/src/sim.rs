//! 进程内模拟链路
//!
//! `SimulatedLink` 模拟 dongle 与机器人：收到动作指令后回报对应的状态通道，
//! 握手成功后上报电量、无线状态等初始值。测试通过 [`SimHandle`]
//! 注入状态、制造握手失败或发送超时，并检查下行帧。

use crate::{LinkAdapter, LinkError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use tux_protocol::ids::*;
use tux_protocol::instruction::{Leds, LedAction, MotorAction, SpinAction};
use tux_protocol::{Instruction, LinkEvent, StatusFrame, TuxFrame};

#[derive(Debug, Default)]
struct SimState {
    pending: VecDeque<LinkEvent>,
    sent: Vec<TuxFrame>,
    handshake_delay: Duration,
    handshake_fails: bool,
    send_times_out: bool,
    unplugged: bool,
    handshakes: usize,
    resets: usize,
}

/// 模拟器的共享控制句柄
#[derive(Debug, Clone, Default)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// 注入一条上行事件
    pub fn inject(&self, event: LinkEvent) {
        self.state.lock().pending.push_back(event);
    }

    /// 注入一条状态上报
    pub fn inject_status(&self, id: StatusId, raw: &str) {
        self.inject(LinkEvent::Status(StatusFrame::new(id, raw)));
    }

    /// 已发送的下行帧（按发送顺序）
    pub fn sent(&self) -> Vec<TuxFrame> {
        self.state.lock().sent.clone()
    }

    /// 握手耗时，超过调用方给出的超时即失败
    pub fn set_handshake_delay(&self, delay: Duration) {
        self.state.lock().handshake_delay = delay;
    }

    pub fn set_handshake_fails(&self, fails: bool) {
        self.state.lock().handshake_fails = fails;
    }

    /// 之后的发送都不再应答
    pub fn set_send_times_out(&self, times_out: bool) {
        self.state.lock().send_times_out = times_out;
    }

    /// 模拟拔出 dongle
    pub fn unplug(&self) {
        let mut state = self.state.lock();
        state.unplugged = true;
        state.pending.push_back(LinkEvent::DongleUnplugged);
    }

    pub fn handshake_count(&self) -> usize {
        self.state.lock().handshakes
    }

    pub fn reset_count(&self) -> usize {
        self.state.lock().resets
    }
}

/// 模拟 dongle 链路
#[derive(Debug, Default)]
pub struct SimulatedLink {
    handle: SimHandle,
}

impl SimulatedLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取控制句柄（可在任意线程使用）
    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }

    fn status(id: StatusId, raw: impl Into<String>) -> LinkEvent {
        LinkEvent::Status(StatusFrame::new(id, raw))
    }

    /// 指令在机器人上产生的状态变化
    fn effects(instruction: &Instruction) -> Vec<LinkEvent> {
        let position = |action: &MotorAction| match action {
            MotorAction::Open => Some("OPEN"),
            MotorAction::Close => Some("CLOSE"),
            MotorAction::Up => Some("UP"),
            MotorAction::Down => Some("DOWN"),
            _ => None,
        };
        let led = |leds: Leds, value: &str| {
            let mut events = Vec::new();
            if matches!(leds, Leds::Left | Leds::Both) {
                events.push(Self::status(LEFT_LED_STATE, value));
            }
            if matches!(leds, Leds::Right | Leds::Both) {
                events.push(Self::status(RIGHT_LED_STATE, value));
            }
            events
        };

        match instruction {
            Instruction::Eyes(action) => position(action)
                .map(|p| vec![Self::status(EYES_POSITION, p)])
                .unwrap_or_default(),
            Instruction::Mouth(action) => position(action)
                .map(|p| vec![Self::status(MOUTH_POSITION, p)])
                .unwrap_or_default(),
            Instruction::Flippers(action) => position(action)
                .map(|p| vec![Self::status(FLIPPERS_POSITION, p)])
                .unwrap_or_default(),
            Instruction::Spinning(action) => {
                let direction = match action {
                    SpinAction::LeftOn(_) | SpinAction::LeftOnDuring(_) => "LEFT",
                    SpinAction::RightOn(_) | SpinAction::RightOnDuring(_) => "RIGHT",
                    SpinAction::Off => "NONE",
                    SpinAction::Speed(_) => return Vec::new(),
                };
                vec![Self::status(SPINNING_DIRECTION, direction)]
            },
            Instruction::Led(LedAction::On { leds, .. }) => led(*leds, "ON"),
            Instruction::Led(LedAction::Off { leds }) => led(*leds, "OFF"),
            Instruction::Led(_) => Vec::new(),
            Instruction::SoundFlashPlay { track, .. } => vec![
                Self::status(AUDIO_FLASH_PLAY, format!("TRACK_{track}")),
                Self::status(AUDIO_FLASH_PLAY, "STOP"),
            ],
            Instruction::Audio(_) | Instruction::Ir(_) | Instruction::Raw(_) => Vec::new(),
        }
    }
}

impl LinkAdapter for SimulatedLink {
    fn handshake(&mut self, timeout: Duration) -> Result<(), LinkError> {
        let (delay, fails) = {
            let state = self.handle.state.lock();
            (state.handshake_delay, state.handshake_fails)
        };
        if !delay.is_zero() {
            std::thread::sleep(delay.min(timeout));
            if delay > timeout {
                return Err(LinkError::Timeout);
            }
        }
        if fails {
            return Err(LinkError::Handshake("dongle refused".to_string()));
        }

        let mut state = self.handle.state.lock();
        state.handshakes += 1;
        state.unplugged = false;
        debug!("simulated dongle handshake #{}", state.handshakes);
        state.pending.extend([
            Self::status(RF_STATE, "True"),
            Self::status(CONNECTION_QUALITY, "100"),
            Self::status(BATTERY_LEVEL, "5200"),
            Self::status(BATTERY_STATE, "HIGH"),
            Self::status(LIGHT_LEVEL, "42.0"),
            Self::status(TUXCORE_SYMBOLIC_VERSION, "tuxcore_0.4.2-r1130"),
        ]);
        Ok(())
    }

    fn send(&mut self, frame: TuxFrame) -> Result<(), LinkError> {
        let mut state = self.handle.state.lock();
        if state.unplugged {
            return Err(LinkError::Disconnected);
        }
        if state.send_times_out {
            return Err(LinkError::Timeout);
        }
        trace!("simulated dongle <- {:?}", frame);
        let effects = match &frame {
            TuxFrame::Command(instruction) => Self::effects(instruction),
            TuxFrame::SoundReflash(plan) => vec![
                Self::status(
                    SOUND_REFLASH_BEGIN,
                    format!("{:.1}", plan.estimated_duration_secs()),
                ),
                Self::status(SOUND_REFLASH_END, "NO_ERROR"),
                Self::status(FLASH_SOUND_COUNT, plan.tracks.len().to_string()),
            ],
        };
        state.sent.push(frame);
        state.pending.extend(effects);
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<LinkEvent>, LinkError> {
        Ok(self.handle.state.lock().pending.pop_front())
    }

    fn reset(&mut self, timeout: Duration) -> Result<(), LinkError> {
        {
            let mut state = self.handle.state.lock();
            state.resets += 1;
            state.pending.clear();
        }
        self.handshake(timeout)
    }
}
