//! The device state reported to the host, and its wire layout.
//!
//! `DeviceState` is the single source of truth the host reads over the
//! bus. It is owned by the controller; the bus engine only ever serves a
//! snapshot taken at the start of a read transaction, so a read never
//! observes a half-updated multi-byte field.
//!
//! Wire layout (25 bytes, little endian):
//!
//! ```text
//! [0]      status
//! [1]      buttons
//! [2..4]   joystick H, V
//! [4..6]   battery mV
//! [6..8]   supply mV
//! [8..10]  temperature, 0.1 °C (i16)
//! [10]     brightness
//! [11]     error code
//! [12..16] uptime seconds
//! [16..22] time (sec, min, hour, day, month, year - 2000)
//! [22..25] alarm (hour, minute, enabled)
//! ```

use crate::error::ErrorCode;
use crate::time::{Alarm, DateTime};

/// Size of the serialized device state.
pub const STATE_SIZE: usize = 25;

/// Top-level power mode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Host running, commands accepted. Zero so it doubles as batch 0.
    On = 0,
    /// Everything off, waiting for home or the second tick.
    Sleep = 1,
    /// Home pressed, waiting to see if it is held long enough.
    WakeUp = 2,
    /// Host powered, waiting for it to confirm boot.
    PowerUp = 3,
    /// Host powered, waiting for it to halt.
    PowerDown = 4,
    /// Owned by the bootloader; never entered by this firmware.
    Bootloader = 7,
}

impl Mode {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x07 {
            0 => Some(Mode::On),
            1 => Some(Mode::Sleep),
            2 => Some(Mode::WakeUp),
            3 => Some(Mode::PowerUp),
            4 => Some(Mode::PowerDown),
            7 => Some(Mode::Bootloader),
            _ => None,
        }
    }

    /// The closed transition graph.
    pub fn can_transition_to(self, next: Mode) -> bool {
        matches!(
            (self, next),
            (Mode::WakeUp, Mode::PowerUp)
                | (Mode::WakeUp, Mode::Sleep)
                | (Mode::PowerUp, Mode::On)
                | (Mode::PowerUp, Mode::Sleep)
                | (Mode::On, Mode::PowerDown)
                | (Mode::PowerDown, Mode::Sleep)
                | (Mode::Sleep, Mode::WakeUp)
        )
    }

    /// Whether the host rail is up in this mode.
    pub fn host_powered(self) -> bool {
        matches!(self, Mode::PowerUp | Mode::On | Mode::PowerDown)
    }
}

/// Power source summary in the top two status bits.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerStatus {
    #[default]
    Battery = 0,
    LowBattery = 1,
    Charging = 2,
    Usb = 3,
}

impl PowerStatus {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => PowerStatus::Battery,
            1 => PowerStatus::LowBattery,
            2 => PowerStatus::Charging,
            _ => PowerStatus::Usb,
        }
    }
}

/// The status byte served first on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub mode: Mode,
    /// Audio streaming active; the low bits then carry `batch_index`.
    pub recording: bool,
    pub batch_index: u8,
    /// The batch being served was not fully written when the read began.
    pub batch_incomplete: bool,
    pub alarm: bool,
    pub power: PowerStatus,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            mode: Mode::Sleep,
            recording: false,
            batch_index: 0,
            batch_incomplete: false,
            alarm: false,
            power: PowerStatus::Battery,
        }
    }
}

impl Status {
    pub const ALARM: u8 = 1 << 3;
    pub const RECORDING: u8 = 1 << 4;
    pub const BATCH_INCOMPLETE: u8 = 1 << 5;

    pub fn to_byte(&self) -> u8 {
        let low = if self.recording {
            self.batch_index & 0x07
        } else {
            self.mode as u8
        };
        let mut b = low | ((self.power as u8) << 6);
        if self.alarm {
            b |= Self::ALARM;
        }
        if self.recording {
            b |= Self::RECORDING;
        }
        if self.batch_incomplete {
            b |= Self::BATCH_INCOMPLETE;
        }
        b
    }

    /// Host-side decode. `None` if the mode bits are not a known mode.
    pub fn from_byte(b: u8) -> Option<Self> {
        let recording = b & Self::RECORDING != 0;
        let (mode, batch_index) = if recording {
            (Mode::On, b & 0x07)
        } else {
            (Mode::from_bits(b)?, 0)
        };
        Some(Self {
            mode,
            recording,
            batch_index,
            batch_incomplete: b & Self::BATCH_INCOMPLETE != 0,
            alarm: b & Self::ALARM != 0,
            power: PowerStatus::from_bits(b >> 6),
        })
    }
}

/// Buttons and joystick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Controls {
    pub buttons: u8,
    pub joy_h: u8,
    pub joy_v: u8,
}

impl Controls {
    pub const BTN_LEFT: u8 = 1 << 0;
    pub const BTN_UP: u8 = 1 << 1;
    pub const BTN_DOWN: u8 = 1 << 2;
    pub const BTN_RIGHT: u8 = 1 << 3;
    pub const BTN_SELECT: u8 = 1 << 4;
    pub const BTN_START: u8 = 1 << 5;
    pub const BTN_HOME: u8 = 1 << 6;

    /// Replace the three buttons of ladder `index` (0 or 1) with `combo`.
    pub fn set_ladder(&mut self, index: usize, combo: u8) {
        let shift = index * 3;
        self.buttons = (self.buttons & !(0b111 << shift)) | ((combo & 0b111) << shift);
    }

    pub fn set_home(&mut self, pressed: bool) {
        if pressed {
            self.buttons |= Self::BTN_HOME;
        } else {
            self.buttons &= !Self::BTN_HOME;
        }
    }

    pub fn home(&self) -> bool {
        self.buttons & Self::BTN_HOME != 0
    }
}

/// Telemetry and host-settable values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtendedInfo {
    pub battery_mv: u16,
    pub supply_mv: u16,
    /// Tenths of a degree Celsius.
    pub temperature: i16,
    pub brightness: u8,
    pub error: ErrorCode,
    pub uptime: u32,
    pub time: DateTime,
    pub alarm: Alarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    pub status: Status,
    pub controls: Controls,
    pub info: ExtendedInfo,
}

impl DeviceState {
    pub fn to_bytes(&self) -> [u8; STATE_SIZE] {
        let mut b = [0u8; STATE_SIZE];
        b[0] = self.status.to_byte();
        b[1] = self.controls.buttons;
        b[2] = self.controls.joy_h;
        b[3] = self.controls.joy_v;
        b[4..6].copy_from_slice(&self.info.battery_mv.to_le_bytes());
        b[6..8].copy_from_slice(&self.info.supply_mv.to_le_bytes());
        b[8..10].copy_from_slice(&self.info.temperature.to_le_bytes());
        b[10] = self.info.brightness;
        b[11] = self.info.error as u8;
        b[12..16].copy_from_slice(&self.info.uptime.to_le_bytes());
        b[16..22].copy_from_slice(&self.info.time.to_bytes());
        b[22..25].copy_from_slice(&self.info.alarm.to_bytes());
        b
    }

    /// Host-side decode of a full state read.
    pub fn from_bytes(b: &[u8; STATE_SIZE]) -> Option<Self> {
        let mut time = [0u8; DateTime::WIRE_SIZE];
        time.copy_from_slice(&b[16..22]);
        let mut alarm = [0u8; Alarm::WIRE_SIZE];
        alarm.copy_from_slice(&b[22..25]);
        Some(Self {
            status: Status::from_byte(b[0])?,
            controls: Controls {
                buttons: b[1],
                joy_h: b[2],
                joy_v: b[3],
            },
            info: ExtendedInfo {
                battery_mv: u16::from_le_bytes([b[4], b[5]]),
                supply_mv: u16::from_le_bytes([b[6], b[7]]),
                temperature: i16::from_le_bytes([b[8], b[9]]),
                brightness: b[10],
                error: ErrorCode::from_u8(b[11])?,
                uptime: u32::from_le_bytes([b[12], b[13], b[14], b[15]]),
                time: DateTime::from_bytes(&time).ok()?,
                alarm: Alarm::from_bytes(&alarm).ok()?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_byte_layout() {
        let s = Status {
            mode: Mode::PowerDown,
            alarm: true,
            power: PowerStatus::Usb,
            ..Status::default()
        };
        assert_eq!(s.to_byte(), 0b1100_1100);
        assert_eq!(Status::from_byte(s.to_byte()), Some(s));
    }

    #[test]
    fn recording_status_carries_batch_index() {
        let s = Status {
            mode: Mode::On,
            recording: true,
            batch_index: 5,
            batch_incomplete: true,
            ..Status::default()
        };
        assert_eq!(s.to_byte(), 0b0011_0101);
        let back = Status::from_byte(s.to_byte()).unwrap();
        assert_eq!(back.batch_index, 5);
        assert!(back.batch_incomplete);
    }

    #[test]
    fn unknown_mode_bits_do_not_decode() {
        assert_eq!(Status::from_byte(0x05), None);
        assert_eq!(Status::from_byte(0x06), None);
    }

    #[test]
    fn ladder_bits_do_not_clobber_each_other() {
        let mut c = Controls::default();
        c.set_ladder(0, 0b101);
        c.set_ladder(1, 0b010);
        c.set_home(true);
        assert_eq!(c.buttons, Controls::BTN_HOME | Controls::BTN_SELECT | 0b101);
        c.set_ladder(0, 0);
        assert_eq!(c.buttons, Controls::BTN_HOME | Controls::BTN_SELECT);
    }

    #[test]
    fn transition_graph_is_closed() {
        let all = [
            Mode::On,
            Mode::Sleep,
            Mode::WakeUp,
            Mode::PowerUp,
            Mode::PowerDown,
            Mode::Bootloader,
        ];
        let edges = all
            .iter()
            .flat_map(|a| all.iter().map(move |b| (*a, *b)))
            .filter(|(a, b)| a.can_transition_to(*b))
            .count();
        assert_eq!(edges, 7);
        assert!(!Mode::On.can_transition_to(Mode::Sleep));
        assert!(!Mode::Bootloader.can_transition_to(Mode::On));
    }

    #[test]
    fn state_layout_offsets() {
        let mut s = DeviceState::default();
        s.info.battery_mv = 0x0e10;
        s.info.temperature = -15;
        s.info.brightness = 170;
        s.info.error = ErrorCode::RPiBootTimeout;
        s.info.uptime = 0x0102_0304;
        let b = s.to_bytes();
        assert_eq!(&b[4..6], &[0x10, 0x0e]);
        assert_eq!(i16::from_le_bytes([b[8], b[9]]), -15);
        assert_eq!(b[10], 170);
        assert_eq!(b[11], 3);
        assert_eq!(&b[12..16], &[4, 3, 2, 1]);
        assert_eq!(DeviceState::from_bytes(&b), Some(s));
    }
}
