//! Host commands.
//!
//! Byte 0 of every write transaction is the opcode; the remaining bytes
//! are the opcode-specific payload. Opcodes 0x00-0x02 are shared with the
//! bootloader so a host can identify either firmware the same way.
//! Trailing bytes beyond the payload are ignored.

use crate::error::{Error, ProtocolError};
use crate::indicator::Color;
use crate::persist::PersistentState;
use crate::time::{Alarm, DateTime};

// Opcodes
pub mod opcode {
    pub const NOP: u8 = 0x00;
    pub const RESET: u8 = 0x01;
    pub const INFO: u8 = 0x02;
    pub const START_AUDIO_RECORDING: u8 = 0x03;
    pub const STOP_AUDIO_RECORDING: u8 = 0x04;
    pub const SET_BRIGHTNESS: u8 = 0x05;
    pub const SET_TIME: u8 = 0x06;
    pub const GET_PERSISTENT_STATE: u8 = 0x07;
    pub const SET_PERSISTENT_STATE: u8 = 0x08;
    pub const RUMBLER_OK: u8 = 0x09;
    pub const RUMBLER_FAIL: u8 = 0x0a;
    pub const RUMBLER: u8 = 0x0b;
    pub const RGB_ON: u8 = 0x0c;
    pub const RGB_OFF: u8 = 0x0d;
    pub const RGB_COLOR: u8 = 0x0e;
    pub const POWER_ON: u8 = 0x0f;
    pub const POWER_DOWN: u8 = 0x10;
    pub const CLEAR_ERROR: u8 = 0x11;
    pub const SET_ALARM: u8 = 0x12;
}

/// A decoded host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Nop,
    Reset,
    Info,
    StartAudioRecording,
    StopAudioRecording,
    SetBrightness(u8),
    SetTime(DateTime),
    GetPersistentState,
    SetPersistentState(PersistentState),
    RumblerOk,
    RumblerFail,
    /// Custom effect; `duration` is in 10 ms units.
    Rumbler { intensity: u8, duration: u8 },
    RgbOn,
    RgbOff,
    RgbColor(Color),
    PowerOn,
    PowerDown,
    ClearError,
    SetAlarm(Alarm),
}

impl Command {
    /// Decode a completed write transaction.
    pub fn decode(buf: &[u8]) -> Result<Command, Error> {
        let (&op, payload) = buf.split_first().ok_or(ProtocolError::Empty)?;
        let need = payload_len(op).ok_or(ProtocolError::UnknownOpcode(op))?;
        if payload.len() < need {
            return Err(ProtocolError::Truncated {
                opcode: op,
                expected: need as u8,
                got: payload.len() as u8,
            }
            .into());
        }

        let cmd = match op {
            opcode::NOP => Command::Nop,
            opcode::RESET => Command::Reset,
            opcode::INFO => Command::Info,
            opcode::START_AUDIO_RECORDING => Command::StartAudioRecording,
            opcode::STOP_AUDIO_RECORDING => Command::StopAudioRecording,
            opcode::SET_BRIGHTNESS => Command::SetBrightness(payload[0]),
            opcode::SET_TIME => {
                let mut b = [0u8; DateTime::WIRE_SIZE];
                b.copy_from_slice(&payload[..DateTime::WIRE_SIZE]);
                Command::SetTime(DateTime::from_bytes(&b)?)
            }
            opcode::GET_PERSISTENT_STATE => Command::GetPersistentState,
            opcode::SET_PERSISTENT_STATE => Command::SetPersistentState(
                PersistentState::from_bytes(payload)
                    .map_err(|_| ProtocolError::InvalidPayload(op))?,
            ),
            opcode::RUMBLER_OK => Command::RumblerOk,
            opcode::RUMBLER_FAIL => Command::RumblerFail,
            opcode::RUMBLER => Command::Rumbler {
                intensity: payload[0],
                duration: payload[1],
            },
            opcode::RGB_ON => Command::RgbOn,
            opcode::RGB_OFF => Command::RgbOff,
            opcode::RGB_COLOR => Command::RgbColor(Color::rgb(payload[0], payload[1], payload[2])),
            opcode::POWER_ON => Command::PowerOn,
            opcode::POWER_DOWN => Command::PowerDown,
            opcode::CLEAR_ERROR => Command::ClearError,
            opcode::SET_ALARM => {
                let b = [payload[0], payload[1], payload[2]];
                Command::SetAlarm(Alarm::from_bytes(&b)?)
            }
            _ => return Err(ProtocolError::UnknownOpcode(op).into()),
        };
        Ok(cmd)
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Command::Nop => opcode::NOP,
            Command::Reset => opcode::RESET,
            Command::Info => opcode::INFO,
            Command::StartAudioRecording => opcode::START_AUDIO_RECORDING,
            Command::StopAudioRecording => opcode::STOP_AUDIO_RECORDING,
            Command::SetBrightness(_) => opcode::SET_BRIGHTNESS,
            Command::SetTime(_) => opcode::SET_TIME,
            Command::GetPersistentState => opcode::GET_PERSISTENT_STATE,
            Command::SetPersistentState(_) => opcode::SET_PERSISTENT_STATE,
            Command::RumblerOk => opcode::RUMBLER_OK,
            Command::RumblerFail => opcode::RUMBLER_FAIL,
            Command::Rumbler { .. } => opcode::RUMBLER,
            Command::RgbOn => opcode::RGB_ON,
            Command::RgbOff => opcode::RGB_OFF,
            Command::RgbColor(_) => opcode::RGB_COLOR,
            Command::PowerOn => opcode::POWER_ON,
            Command::PowerDown => opcode::POWER_DOWN,
            Command::ClearError => opcode::CLEAR_ERROR,
            Command::SetAlarm(_) => opcode::SET_ALARM,
        }
    }

    /// Serialize as a bus master would send it. Returns bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut payload = [0u8; PersistentState::SIZE + 1];
        let n = match self {
            Command::SetBrightness(v) => {
                payload[0] = *v;
                1
            }
            Command::SetTime(t) => {
                payload[..DateTime::WIRE_SIZE].copy_from_slice(&t.to_bytes());
                DateTime::WIRE_SIZE
            }
            Command::SetPersistentState(p) => {
                payload[..PersistentState::SIZE].copy_from_slice(&p.to_bytes());
                PersistentState::SIZE
            }
            Command::Rumbler { intensity, duration } => {
                payload[0] = *intensity;
                payload[1] = *duration;
                2
            }
            Command::RgbColor(c) => {
                payload[..3].copy_from_slice(&[c.r, c.g, c.b]);
                3
            }
            Command::SetAlarm(a) => {
                payload[..Alarm::WIRE_SIZE].copy_from_slice(&a.to_bytes());
                Alarm::WIRE_SIZE
            }
            _ => 0,
        };
        if buf.len() < n + 1 {
            return Err(Error::BufferOverflow);
        }
        buf[0] = self.opcode();
        buf[1..=n].copy_from_slice(&payload[..n]);
        Ok(n + 1)
    }
}

/// Payload bytes required after the opcode, `None` for unknown opcodes.
fn payload_len(op: u8) -> Option<usize> {
    match op {
        opcode::NOP
        | opcode::RESET
        | opcode::INFO
        | opcode::START_AUDIO_RECORDING
        | opcode::STOP_AUDIO_RECORDING
        | opcode::GET_PERSISTENT_STATE
        | opcode::RUMBLER_OK
        | opcode::RUMBLER_FAIL
        | opcode::RGB_ON
        | opcode::RGB_OFF
        | opcode::POWER_ON
        | opcode::POWER_DOWN
        | opcode::CLEAR_ERROR => Some(0),
        opcode::SET_BRIGHTNESS => Some(1),
        opcode::RUMBLER => Some(2),
        opcode::RGB_COLOR | opcode::SET_ALARM => Some(3),
        opcode::SET_PERSISTENT_STATE => Some(PersistentState::SIZE),
        opcode::SET_TIME => Some(DateTime::WIRE_SIZE),
        _ => None,
    }
}
