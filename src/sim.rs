//! Simulated board for host tests.
//!
//! [`SimBoard`] implements every hardware trait by recording what the
//! controller asked for. The free functions play the other side of the
//! wires: an I2C master, the ADC and the analog inputs behind it.

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::analog::{Channel, TempCalibration};
use crate::command::Command;
use crate::config::BANDGAP_MV_X1024;
use crate::controller::Controller;
use crate::hal::{
    Ack, AudioFrontEnd, Backlight, Board, ChipInfo, Haptics, HostLink, Indicator, PowerRails,
    ResetReason, SlaveEvents, Supervisor,
};
use crate::indicator::Color;

/// Raw supply-channel reading that converts back to roughly `mv`.
pub fn supply_raw_for(mv: u16) -> u16 {
    (BANDGAP_MV_X1024 / mv.max(1) as u32).clamp(1, 1023) as u16
}

pub struct SimBoard {
    pub host_power: bool,
    pub backlight: u8,
    pub rumbler: u8,
    pub rgb: Option<Color>,
    pub irq: bool,
    pub audio_running: bool,
    pub shutdown_level: u8,
    pub reset_reason: ResetReason,
    pub supply_raw: u16,
    pub watchdog_pets: u32,
    pub resets: u32,
    pub delayed_ns: u64,
    pub chip: ChipInfo,
    pub calibration: TempCalibration,
    /// Every value written to the RGB LED, oldest first.
    pub rgb_history: Vec<Option<Color>, 128>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self {
            host_power: false,
            backlight: 0,
            rumbler: 0,
            rgb: None,
            irq: false,
            audio_running: false,
            shutdown_level: 0,
            reset_reason: ResetReason::Software,
            supply_raw: supply_raw_for(3900),
            watchdog_pets: 0,
            resets: 0,
            delayed_ns: 0,
            chip: ChipInfo {
                signature: [0x1e, 0x94, 0x22],
                fuses: [0x00, 0x00, 0x02, 0xff, 0x00, 0xf6, 0x07, 0x00, 0x02, 0x00, 0xff],
                clock: [0x00, 0x00, 0x00, 0x00],
                page_size: 64,
            },
            calibration: TempCalibration::default(),
            rgb_history: Vec::new(),
        }
    }

    pub fn set_supply_millivolts(&mut self, mv: u16) {
        self.supply_raw = supply_raw_for(mv);
    }

    /// How many times the LED was switched to `color`.
    pub fn flashes(&self, color: Color) -> usize {
        self.rgb_history
            .iter()
            .filter(|c| **c == Some(color))
            .count()
    }
}

impl Default for SimBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerRails for SimBoard {
    fn set_host_power(&mut self, on: bool) {
        self.host_power = on;
    }
}

impl Backlight for SimBoard {
    fn set_backlight(&mut self, duty: u8) {
        self.backlight = duty;
    }
}

impl Haptics for SimBoard {
    fn set_rumbler(&mut self, duty: u8) {
        self.rumbler = duty;
    }
}

impl Indicator for SimBoard {
    fn set_rgb(&mut self, color: Option<Color>) {
        self.rgb = color;
        let _ = self.rgb_history.push(color);
    }
}

impl HostLink for SimBoard {
    fn set_irq(&mut self, asserted: bool) {
        self.irq = asserted;
    }

    fn shutdown_level(&mut self) -> u8 {
        self.shutdown_level
    }
}

impl AudioFrontEnd for SimBoard {
    fn start_audio(&mut self) {
        self.audio_running = true;
    }

    fn stop_audio(&mut self) {
        self.audio_running = false;
    }
}

impl DelayNs for SimBoard {
    fn delay_ns(&mut self, ns: u32) {
        self.delayed_ns += ns as u64;
    }
}

impl Supervisor for SimBoard {
    fn pet_watchdog(&mut self) {
        self.watchdog_pets += 1;
    }

    fn reset_reason(&mut self) -> ResetReason {
        self.reset_reason
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.reset_reason = ResetReason::Software;
    }

    fn sample_supply(&mut self) -> u16 {
        self.supply_raw
    }

    fn chip_info(&self) -> ChipInfo {
        self.chip
    }

    fn temp_calibration(&self) -> TempCalibration {
        self.calibration
    }
}

/// Voltages and positions behind the analog channels.
#[derive(Debug, Clone, Copy)]
pub struct SimInputs {
    pub supply_mv: u16,
    pub battery_mv: u16,
    /// Half-kelvin with the default calibration.
    pub temperature_raw: u16,
    pub charge: u8,
    /// 8-bit ladder readings, ladder 1 first.
    pub ladders: [u8; 2],
    pub joy_h: u8,
    pub joy_v: u8,
}

impl Default for SimInputs {
    fn default() -> Self {
        Self {
            supply_mv: 3900,
            battery_mv: 3700,
            temperature_raw: 596,
            charge: 128,
            ladders: [255, 255],
            joy_h: 128,
            joy_v: 128,
        }
    }
}

impl SimInputs {
    /// 10-bit conversion result for `channel`.
    pub fn raw(&self, channel: Channel) -> u16 {
        let widen = |b: u8| (b as u16) << 2;
        match channel {
            Channel::Supply => supply_raw_for(self.supply_mv),
            Channel::Temperature => self.temperature_raw,
            Channel::Battery => {
                (self.battery_mv as u32 * 1024 / self.supply_mv.max(1) as u32).min(1023) as u16
            }
            Channel::Charger => widen(self.charge),
            Channel::Ladder1 => widen(self.ladders[0]),
            Channel::Ladder2 => widen(self.ladders[1]),
            Channel::JoystickH => widen(self.joy_h),
            Channel::JoystickV => widen(self.joy_v),
        }
    }
}

/// Feed `ticks` full sampler cycles.
pub fn run_ticks<B: Board>(ctl: &mut Controller<'_, B>, inputs: &SimInputs, ticks: u32) {
    for _ in 0..ticks {
        for _ in 0..Channel::COUNT {
            let raw = inputs.raw(ctl.sampler_channel());
            ctl.adc_result(raw);
        }
    }
}

/// One master-write transaction. Returns `Nack` if the address was refused.
pub fn host_write<B: Board>(ctl: &mut Controller<'_, B>, bytes: &[u8]) -> Ack {
    if ctl.start_receive() == Ack::Nack {
        ctl.stop_receive();
        return Ack::Nack;
    }
    for &b in bytes {
        if ctl.receive(b) == Ack::Nack {
            break;
        }
    }
    ctl.stop_receive();
    Ack::Ack
}

pub fn host_command<B: Board>(ctl: &mut Controller<'_, B>, cmd: Command) -> Ack {
    let mut buf = [0u8; 8];
    match cmd.encode(&mut buf) {
        Ok(n) => host_write(ctl, &buf[..n]),
        Err(_) => Ack::Nack,
    }
}

/// One master-read transaction of `N` bytes.
pub fn host_read<B: Board, const N: usize>(ctl: &mut Controller<'_, B>) -> [u8; N] {
    ctl.start_transmit();
    let out = core::array::from_fn(|_| ctl.transmit());
    ctl.stop_transmit();
    out
}
