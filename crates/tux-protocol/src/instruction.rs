//! 指令词汇表
//!
//! 支持三种写法：
//!
//! - `TUX_CMD:<GROUP>:<ACTION>[:p1,p2,...]`，GROUP 为 AUDIO / EYES / MOUTH /
//!   FLIPPERS / SPINNING / LED / IR / SOUND_FLASH
//! - `RAW_CMD:b0:b1:b2:b3:b4`，五个十六进制字节
//! - 无参数动作的简写动词，例如 `open_mouth`、`flippers_down`
//!
//! token 以 `:` 和 `,` 分隔。解析结果的 `Display` 输出规范的 `TUX_CMD` 文本，
//! 可以再次解析得到相同的指令。

use crate::ProtocolError;
use crate::constants::{MAX_TOKENS, RAW_COMMAND_LEN};
use smallvec::SmallVec;
use std::fmt;

/// 运动结束时的目标状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Movement {
    Ndef,
    Undefined,
    Open,
    Up,
    Close,
    Down,
    Stop,
}

impl Movement {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "NDEF" => Movement::Ndef,
            "UNDEFINED" => Movement::Undefined,
            "OPEN" => Movement::Open,
            "UP" => Movement::Up,
            "CLOSE" => Movement::Close,
            "DOWN" => Movement::Down,
            "STOP" => Movement::Stop,
            _ => return None,
        })
    }

    const fn as_str(self) -> &'static str {
        match self {
            Movement::Ndef => "NDEF",
            Movement::Undefined => "UNDEFINED",
            Movement::Open => "OPEN",
            Movement::Up => "UP",
            Movement::Close => "CLOSE",
            Movement::Down => "DOWN",
            Movement::Stop => "STOP",
        }
    }
}

/// LED 选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leds {
    None,
    Left,
    Right,
    Both,
}

impl Leds {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "LED_NONE" => Leds::None,
            "LED_LEFT" => Leds::Left,
            "LED_RIGHT" => Leds::Right,
            "LED_BOTH" => Leds::Both,
            _ => return None,
        })
    }

    const fn as_str(self) -> &'static str {
        match self {
            Leds::None => "LED_NONE",
            Leds::Left => "LED_LEFT",
            Leds::Right => "LED_RIGHT",
            Leds::Both => "LED_BOTH",
        }
    }
}

/// LED 渐变效果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    Unaffected,
    Last,
    None,
    Default,
    FadeDuration,
    FadeRate,
    GradientNbr,
    GradientDelta,
}

impl Effect {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "UNAFFECTED" => Effect::Unaffected,
            "LAST" => Effect::Last,
            "NONE" => Effect::None,
            "DEFAULT" => Effect::Default,
            "FADE_DURATION" => Effect::FadeDuration,
            "FADE_RATE" => Effect::FadeRate,
            "GRADIENT_NBR" => Effect::GradientNbr,
            "GRADIENT_DELTA" => Effect::GradientDelta,
            _ => return None,
        })
    }

    const fn as_str(self) -> &'static str {
        match self {
            Effect::Unaffected => "UNAFFECTED",
            Effect::Last => "LAST",
            Effect::None => "NONE",
            Effect::Default => "DEFAULT",
            Effect::FadeDuration => "FADE_DURATION",
            Effect::FadeRate => "FADE_RATE",
            Effect::GradientNbr => "GRADIENT_NBR",
            Effect::GradientDelta => "GRADIENT_DELTA",
        }
    }
}

/// 音频通道动作
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioAction {
    ChannelGeneral,
    ChannelTts,
    Mute(bool),
}

/// 眼睛 / 嘴巴 / 鳍的电机动作
///
/// 眼睛和嘴巴使用 `Open`/`Close`，鳍使用 `Up`/`Down`/`Speed`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorAction {
    Open,
    Close,
    Up,
    Down,
    Off,
    On { movements: u8, state: Movement },
    OnDuring { duration: f32, state: Movement },
    Speed(u8),
}

/// 旋转动作（单位：四分之一圈 / 秒）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinAction {
    LeftOn(u8),
    RightOn(u8),
    LeftOnDuring(f32),
    RightOnDuring(f32),
    Off,
    Speed(u8),
}

/// LED 动作
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedAction {
    On {
        leds: Leds,
        intensity: f32,
    },
    Off {
        leds: Leds,
    },
    Blink {
        leds: Leds,
        count: u8,
        period: f32,
    },
    Pulse {
        leds: Leds,
        min_intensity: f32,
        max_intensity: f32,
        count: u8,
        period: f32,
        effect: Effect,
        effect_speed: f32,
        effect_step: u8,
    },
    Set {
        leds: Leds,
        intensity: f32,
        effect: Effect,
        effect_speed: f32,
        effect_step: u8,
    },
}

/// 红外动作
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IrAction {
    On,
    Off,
    Send { address: u8, command: u8 },
}

/// 需要独占的硬件资源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// 声音播放通道（闪存曲目播放）
    SoundChannel,
    /// 声音闪存编程
    FlashProgramming,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::SoundChannel => f.write_str("sound channel"),
            Resource::FlashProgramming => f.write_str("sound flash programming"),
        }
    }
}

/// 一条硬件指令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    Audio(AudioAction),
    Eyes(MotorAction),
    Mouth(MotorAction),
    Flippers(MotorAction),
    Spinning(SpinAction),
    Led(LedAction),
    Ir(IrAction),
    SoundFlashPlay { track: u8, volume: f32 },
    Raw([u8; RAW_COMMAND_LEN]),
}

/// 简写动词 → 指令
const ALIASES: &[(&str, Instruction)] = &[
    ("open_eyes", Instruction::Eyes(MotorAction::Open)),
    ("close_eyes", Instruction::Eyes(MotorAction::Close)),
    ("stop_eyes", Instruction::Eyes(MotorAction::Off)),
    ("open_mouth", Instruction::Mouth(MotorAction::Open)),
    ("close_mouth", Instruction::Mouth(MotorAction::Close)),
    ("stop_mouth", Instruction::Mouth(MotorAction::Off)),
    ("flippers_up", Instruction::Flippers(MotorAction::Up)),
    ("flippers_down", Instruction::Flippers(MotorAction::Down)),
    ("stop_flippers", Instruction::Flippers(MotorAction::Off)),
    ("stop_spinning", Instruction::Spinning(SpinAction::Off)),
    ("leds_on", Instruction::Led(LedAction::On { leds: Leds::Both, intensity: 1.0 })),
    ("leds_off", Instruction::Led(LedAction::Off { leds: Leds::Both })),
    ("ir_on", Instruction::Ir(IrAction::On)),
    ("ir_off", Instruction::Ir(IrAction::Off)),
    ("mute", Instruction::Audio(AudioAction::Mute(true))),
    ("unmute", Instruction::Audio(AudioAction::Mute(false))),
    ("audio_general", Instruction::Audio(AudioAction::ChannelGeneral)),
    ("audio_tts", Instruction::Audio(AudioAction::ChannelTts)),
];

type Tokens<'a> = SmallVec<[&'a str; MAX_TOKENS]>;

/// 参数读取器，负责把第 `index` 个参数转成目标类型并生成带位置的错误
struct Params<'a> {
    command: &'a str,
    params: &'a [&'a str],
}

impl<'a> Params<'a> {
    fn expect(&self, count: usize) -> Result<(), ProtocolError> {
        if self.params.len() == count {
            Ok(())
        } else {
            Err(ProtocolError::InvalidParameter {
                command: self.command.to_string(),
                index: self.params.len().min(count),
                raw: format!("expected {count} parameters, got {}", self.params.len()),
            })
        }
    }

    fn get<T>(&self, index: usize, convert: impl Fn(&str) -> Option<T>) -> Result<T, ProtocolError> {
        let raw = self.params.get(index).copied().unwrap_or_default();
        convert(raw).ok_or_else(|| ProtocolError::InvalidParameter {
            command: self.command.to_string(),
            index,
            raw: raw.to_string(),
        })
    }

    fn u8(&self, index: usize) -> Result<u8, ProtocolError> {
        self.get(index, |s| s.parse().ok())
    }

    fn f32(&self, index: usize) -> Result<f32, ProtocolError> {
        self.get(index, |s| s.parse::<f32>().ok().filter(|v| v.is_finite()))
    }

    fn flag(&self, index: usize) -> Result<bool, ProtocolError> {
        self.get(index, |s| {
            if s.eq_ignore_ascii_case("true") || s == "1" {
                Some(true)
            } else if s.eq_ignore_ascii_case("false") || s == "0" {
                Some(false)
            } else {
                None
            }
        })
    }

    fn movement(&self, index: usize) -> Result<Movement, ProtocolError> {
        self.get(index, Movement::parse)
    }

    fn leds(&self, index: usize) -> Result<Leds, ProtocolError> {
        self.get(index, Leds::parse)
    }

    fn effect(&self, index: usize) -> Result<Effect, ProtocolError> {
        self.get(index, Effect::parse)
    }

    fn hex(&self, index: usize) -> Result<u8, ProtocolError> {
        self.get(index, |s| {
            let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
            u8::from_str_radix(digits, 16).ok()
        })
    }
}

impl Instruction {
    /// 解析一条指令文本
    ///
    /// # 错误
    ///
    /// - 未知的前缀 / 组 / 动作：`ProtocolError::InvalidCommand`
    /// - 参数个数或取值不合法：`ProtocolError::InvalidParameter`
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let text = text.trim();
        if let Some((_, instruction)) = ALIASES.iter().find(|(alias, _)| *alias == text) {
            return Ok(*instruction);
        }

        let tokens: Tokens<'_> = text.split([':', ',']).map(str::trim).collect();
        if tokens.len() > MAX_TOKENS {
            return Err(ProtocolError::InvalidCommand(text.to_string()));
        }
        match tokens.as_slice() {
            ["TUX_CMD", group, action, params @ ..] => {
                let params = Params {
                    command: text,
                    params,
                };
                Self::parse_tux(text, group, action, &params)
            },
            ["RAW_CMD", params @ ..] => {
                let params = Params {
                    command: text,
                    params,
                };
                params.expect(RAW_COMMAND_LEN)?;
                let mut raw = [0u8; RAW_COMMAND_LEN];
                for (i, byte) in raw.iter_mut().enumerate() {
                    *byte = params.hex(i)?;
                }
                Ok(Instruction::Raw(raw))
            },
            _ => Err(ProtocolError::InvalidCommand(text.to_string())),
        }
    }

    fn parse_tux(
        text: &str,
        group: &str,
        action: &str,
        p: &Params<'_>,
    ) -> Result<Self, ProtocolError> {
        let unknown = || ProtocolError::InvalidCommand(text.to_string());
        let instruction = match group {
            "AUDIO" => Instruction::Audio(match action {
                "CHANNEL_GENERAL" => {
                    p.expect(0)?;
                    AudioAction::ChannelGeneral
                },
                "CHANNEL_TTS" => {
                    p.expect(0)?;
                    AudioAction::ChannelTts
                },
                "MUTE" => {
                    p.expect(1)?;
                    AudioAction::Mute(p.flag(0)?)
                },
                _ => return Err(unknown()),
            }),
            "EYES" | "MOUTH" => {
                let motor = match action {
                    "OPEN" => MotorAction::Open,
                    "CLOSE" => MotorAction::Close,
                    "OFF" => MotorAction::Off,
                    "ON" => {
                        p.expect(2)?;
                        MotorAction::On {
                            movements: p.u8(0)?,
                            state: p.movement(1)?,
                        }
                    },
                    "ON_DURING" => {
                        p.expect(2)?;
                        MotorAction::OnDuring {
                            duration: p.f32(0)?,
                            state: p.movement(1)?,
                        }
                    },
                    _ => return Err(unknown()),
                };
                if matches!(motor, MotorAction::Open | MotorAction::Close | MotorAction::Off) {
                    p.expect(0)?;
                }
                if group == "EYES" {
                    Instruction::Eyes(motor)
                } else {
                    Instruction::Mouth(motor)
                }
            },
            "FLIPPERS" => Instruction::Flippers(match action {
                "UP" | "DOWN" | "OFF" => {
                    p.expect(0)?;
                    match action {
                        "UP" => MotorAction::Up,
                        "DOWN" => MotorAction::Down,
                        _ => MotorAction::Off,
                    }
                },
                "ON" => {
                    p.expect(2)?;
                    MotorAction::On {
                        movements: p.u8(0)?,
                        state: p.movement(1)?,
                    }
                },
                "ON_DURING" => {
                    p.expect(2)?;
                    MotorAction::OnDuring {
                        duration: p.f32(0)?,
                        state: p.movement(1)?,
                    }
                },
                "SPEED" => {
                    p.expect(1)?;
                    MotorAction::Speed(p.u8(0)?)
                },
                _ => return Err(unknown()),
            }),
            "SPINNING" => Instruction::Spinning(match action {
                "LEFT_ON" => {
                    p.expect(1)?;
                    SpinAction::LeftOn(p.u8(0)?)
                },
                "RIGHT_ON" => {
                    p.expect(1)?;
                    SpinAction::RightOn(p.u8(0)?)
                },
                "LEFT_ON_DURING" => {
                    p.expect(1)?;
                    SpinAction::LeftOnDuring(p.f32(0)?)
                },
                "RIGHT_ON_DURING" => {
                    p.expect(1)?;
                    SpinAction::RightOnDuring(p.f32(0)?)
                },
                "OFF" => {
                    p.expect(0)?;
                    SpinAction::Off
                },
                "SPEED" => {
                    p.expect(1)?;
                    SpinAction::Speed(p.u8(0)?)
                },
                _ => return Err(unknown()),
            }),
            "LED" => Instruction::Led(match action {
                "ON" => {
                    p.expect(2)?;
                    LedAction::On {
                        leds: p.leds(0)?,
                        intensity: p.f32(1)?,
                    }
                },
                "OFF" => {
                    p.expect(1)?;
                    LedAction::Off { leds: p.leds(0)? }
                },
                "BLINK" => {
                    p.expect(3)?;
                    LedAction::Blink {
                        leds: p.leds(0)?,
                        count: p.u8(1)?,
                        period: p.f32(2)?,
                    }
                },
                "PULSE" => {
                    p.expect(8)?;
                    LedAction::Pulse {
                        leds: p.leds(0)?,
                        min_intensity: p.f32(1)?,
                        max_intensity: p.f32(2)?,
                        count: p.u8(3)?,
                        period: p.f32(4)?,
                        effect: p.effect(5)?,
                        effect_speed: p.f32(6)?,
                        effect_step: p.u8(7)?,
                    }
                },
                "SET" => {
                    p.expect(5)?;
                    LedAction::Set {
                        leds: p.leds(0)?,
                        intensity: p.f32(1)?,
                        effect: p.effect(2)?,
                        effect_speed: p.f32(3)?,
                        effect_step: p.u8(4)?,
                    }
                },
                _ => return Err(unknown()),
            }),
            "IR" => Instruction::Ir(match action {
                "ON" => {
                    p.expect(0)?;
                    IrAction::On
                },
                "OFF" => {
                    p.expect(0)?;
                    IrAction::Off
                },
                "SEND" => {
                    p.expect(2)?;
                    IrAction::Send {
                        address: p.u8(0)?,
                        command: p.u8(1)?,
                    }
                },
                _ => return Err(unknown()),
            }),
            "SOUND_FLASH" => match action {
                "PLAY" => {
                    p.expect(2)?;
                    Instruction::SoundFlashPlay {
                        track: p.u8(0)?,
                        volume: p.f32(1)?,
                    }
                },
                _ => return Err(unknown()),
            },
            _ => return Err(unknown()),
        };
        Ok(instruction)
    }

    /// 执行该指令需要独占的资源
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Instruction::SoundFlashPlay { .. } => Some(Resource::SoundChannel),
            _ => None,
        }
    }
}

impl std::str::FromStr for Instruction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn write_motor(f: &mut fmt::Formatter<'_>, group: &str, action: &MotorAction) -> fmt::Result {
    match action {
        MotorAction::Open => write!(f, "TUX_CMD:{group}:OPEN"),
        MotorAction::Close => write!(f, "TUX_CMD:{group}:CLOSE"),
        MotorAction::Up => write!(f, "TUX_CMD:{group}:UP"),
        MotorAction::Down => write!(f, "TUX_CMD:{group}:DOWN"),
        MotorAction::Off => write!(f, "TUX_CMD:{group}:OFF"),
        MotorAction::On { movements, state } => {
            write!(f, "TUX_CMD:{group}:ON:{movements},{}", state.as_str())
        },
        MotorAction::OnDuring { duration, state } => {
            write!(f, "TUX_CMD:{group}:ON_DURING:{duration},{}", state.as_str())
        },
        MotorAction::Speed(speed) => write!(f, "TUX_CMD:{group}:SPEED:{speed}"),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Audio(AudioAction::ChannelGeneral) => {
                f.write_str("TUX_CMD:AUDIO:CHANNEL_GENERAL")
            },
            Instruction::Audio(AudioAction::ChannelTts) => f.write_str("TUX_CMD:AUDIO:CHANNEL_TTS"),
            Instruction::Audio(AudioAction::Mute(flag)) => {
                write!(f, "TUX_CMD:AUDIO:MUTE:{}", if *flag { "True" } else { "False" })
            },
            Instruction::Eyes(action) => write_motor(f, "EYES", action),
            Instruction::Mouth(action) => write_motor(f, "MOUTH", action),
            Instruction::Flippers(action) => write_motor(f, "FLIPPERS", action),
            Instruction::Spinning(action) => match action {
                SpinAction::LeftOn(n) => write!(f, "TUX_CMD:SPINNING:LEFT_ON:{n}"),
                SpinAction::RightOn(n) => write!(f, "TUX_CMD:SPINNING:RIGHT_ON:{n}"),
                SpinAction::LeftOnDuring(s) => write!(f, "TUX_CMD:SPINNING:LEFT_ON_DURING:{s}"),
                SpinAction::RightOnDuring(s) => write!(f, "TUX_CMD:SPINNING:RIGHT_ON_DURING:{s}"),
                SpinAction::Off => f.write_str("TUX_CMD:SPINNING:OFF"),
                SpinAction::Speed(n) => write!(f, "TUX_CMD:SPINNING:SPEED:{n}"),
            },
            Instruction::Led(action) => match action {
                LedAction::On { leds, intensity } => {
                    write!(f, "TUX_CMD:LED:ON:{},{intensity}", leds.as_str())
                },
                LedAction::Off { leds } => write!(f, "TUX_CMD:LED:OFF:{}", leds.as_str()),
                LedAction::Blink {
                    leds,
                    count,
                    period,
                } => write!(f, "TUX_CMD:LED:BLINK:{},{count},{period}", leds.as_str()),
                LedAction::Pulse {
                    leds,
                    min_intensity,
                    max_intensity,
                    count,
                    period,
                    effect,
                    effect_speed,
                    effect_step,
                } => write!(
                    f,
                    "TUX_CMD:LED:PULSE:{},{min_intensity},{max_intensity},{count},{period},{},{effect_speed},{effect_step}",
                    leds.as_str(),
                    effect.as_str()
                ),
                LedAction::Set {
                    leds,
                    intensity,
                    effect,
                    effect_speed,
                    effect_step,
                } => write!(
                    f,
                    "TUX_CMD:LED:SET:{},{intensity},{},{effect_speed},{effect_step}",
                    leds.as_str(),
                    effect.as_str()
                ),
            },
            Instruction::Ir(IrAction::On) => f.write_str("TUX_CMD:IR:ON"),
            Instruction::Ir(IrAction::Off) => f.write_str("TUX_CMD:IR:OFF"),
            Instruction::Ir(IrAction::Send { address, command }) => {
                write!(f, "TUX_CMD:IR:SEND:{address},{command}")
            },
            Instruction::SoundFlashPlay { track, volume } => {
                write!(f, "TUX_CMD:SOUND_FLASH:PLAY:{track},{volume}")
            },
            Instruction::Raw(bytes) => {
                f.write_str("RAW_CMD")?;
                for b in bytes {
                    write!(f, ":{b:02X}")?;
                }
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        assert_eq!(
            Instruction::parse("open_mouth"),
            Ok(Instruction::Mouth(MotorAction::Open))
        );
        assert_eq!(
            Instruction::parse(" close_mouth "),
            Ok(Instruction::Mouth(MotorAction::Close))
        );
        assert!(Instruction::parse("Open_Mouth").is_err());
    }

    #[test]
    fn test_parse_tux_cmd() {
        assert_eq!(
            Instruction::parse("TUX_CMD:EYES:ON:3,OPEN"),
            Ok(Instruction::Eyes(MotorAction::On {
                movements: 3,
                state: Movement::Open
            }))
        );
        assert_eq!(
            Instruction::parse("TUX_CMD:LED:ON:LED_BOTH,1.0"),
            Ok(Instruction::Led(LedAction::On {
                leds: Leds::Both,
                intensity: 1.0
            }))
        );
        assert_eq!(
            Instruction::parse("TUX_CMD:SPINNING:LEFT_ON_DURING:2.5"),
            Ok(Instruction::Spinning(SpinAction::LeftOnDuring(2.5)))
        );
        assert_eq!(
            Instruction::parse("TUX_CMD:AUDIO:MUTE:True"),
            Ok(Instruction::Audio(AudioAction::Mute(true)))
        );
    }

    #[test]
    fn test_parse_raw_cmd() {
        assert_eq!(
            Instruction::parse("RAW_CMD:0x01:02:ff:00:A0"),
            Ok(Instruction::Raw([0x01, 0x02, 0xFF, 0x00, 0xA0]))
        );
        assert!(matches!(
            Instruction::parse("RAW_CMD:01:02:03:04"),
            Err(ProtocolError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Instruction::parse("RAW_CMD:01:02:03:04:GG"),
            Err(ProtocolError::InvalidParameter { index: 4, .. })
        ));
    }

    #[test]
    fn test_unknown_commands() {
        for text in [
            "",
            "dance",
            "TUX_CMD",
            "TUX_CMD:EYES",
            "TUX_CMD:EARS:OPEN",
            "TUX_CMD:EYES:UP",
            "TUX_CMD:SOUND_FLASH:STOP",
        ] {
            assert!(
                matches!(Instruction::parse(text), Err(ProtocolError::InvalidCommand(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            Instruction::parse("TUX_CMD:EYES:ON:300,OPEN"),
            Err(ProtocolError::InvalidParameter { index: 0, .. })
        ));
        assert!(matches!(
            Instruction::parse("TUX_CMD:LED:ON:LED_TOP,1.0"),
            Err(ProtocolError::InvalidParameter { index: 0, .. })
        ));
        assert!(matches!(
            Instruction::parse("TUX_CMD:MOUTH:OPEN:1"),
            Err(ProtocolError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Instruction::parse("TUX_CMD:SOUND_FLASH:PLAY:1"),
            Err(ProtocolError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_display_reparses() {
        let samples = [
            "TUX_CMD:EYES:ON_DURING:1.5,CLOSE",
            "TUX_CMD:FLIPPERS:SPEED:4",
            "TUX_CMD:LED:PULSE:LED_LEFT,0,1,4,0.5,FADE_RATE,2,3",
            "TUX_CMD:LED:SET:LED_RIGHT,0.5,DEFAULT,1,1",
            "TUX_CMD:IR:SEND:12,34",
            "TUX_CMD:SOUND_FLASH:PLAY:3,80",
            "RAW_CMD:01:02:03:04:05",
            "leds_on",
        ];
        for text in samples {
            let instruction = Instruction::parse(text).unwrap();
            let canonical = instruction.to_string();
            assert_eq!(Instruction::parse(&canonical), Ok(instruction), "{canonical}");
        }
    }

    #[test]
    fn test_resource() {
        let play = Instruction::parse("TUX_CMD:SOUND_FLASH:PLAY:1,100").unwrap();
        assert_eq!(play.resource(), Some(Resource::SoundChannel));
        assert_eq!(Instruction::parse("open_eyes").unwrap().resource(), None);
    }
}
