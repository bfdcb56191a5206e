//! Round-robin analog sampler.
//!
//! A single ADC cycles through eight logical channels. Each conversion
//! result is stored and the sampler moves to the next channel; after the
//! last one the raw readings are converted into reported units and handed
//! back as one [`Readings`] tick (about 200 Hz).
//!
//! Raw readings are 10-bit. The supply channel converts the internal
//! 1.1 V bandgap against the supply rail; every other channel is
//! referenced to the supply rail.

use crate::config::{
    BANDGAP_MV_X1024, BATTERY_LOW_MV, CHARGE_ACTIVE_BELOW, CHARGE_DONE_ABOVE, DEBOUNCE_TICKS,
    LADDER_BREAKPOINTS, VUSB_MV,
};
use crate::state::PowerStatus;

/// Logical channels, in conversion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Supply,
    Temperature,
    Battery,
    Charger,
    Ladder2,
    Ladder1,
    JoystickH,
    JoystickV,
}

impl Channel {
    pub const COUNT: usize = 8;

    pub fn index(self) -> usize {
        self as usize
    }

    /// Next channel in the cycle; wraps after `JoystickV`.
    pub fn next(self) -> Channel {
        match self {
            Channel::Supply => Channel::Temperature,
            Channel::Temperature => Channel::Battery,
            Channel::Battery => Channel::Charger,
            Channel::Charger => Channel::Ladder2,
            Channel::Ladder2 => Channel::Ladder1,
            Channel::Ladder1 => Channel::JoystickH,
            Channel::JoystickH => Channel::JoystickV,
            Channel::JoystickV => Channel::Supply,
        }
    }
}

/// Charger status pin, only meaningful while USB power is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeState {
    NotCharging,
    Charging,
    Done,
}

/// Factory calibration of the die temperature sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TempCalibration {
    pub offset: i8,
    pub gain: u8,
}

impl Default for TempCalibration {
    /// Identity calibration: raw readings are half-kelvin.
    fn default() -> Self {
        Self { offset: 0, gain: 128 }
    }
}

pub fn supply_millivolts(raw: u16) -> u16 {
    (BANDGAP_MV_X1024 / raw.max(1) as u32).min(u16::MAX as u32) as u16
}

pub fn battery_millivolts(raw: u16, supply_mv: u16) -> u16 {
    (supply_mv as u32 * raw as u32 / 1024) as u16
}

/// Die temperature in tenths of a degree Celsius (0.5 °C resolution).
pub fn temperature_tenths(raw: u16, cal: TempCalibration) -> i16 {
    let mut t = raw as i32 - cal.offset as i32;
    t *= cal.gain as i32;
    // kelvin × 256 to celsius × 256
    t -= 69926;
    ((t >> 7) * 5) as i16
}

pub fn charge_state(raw: u8) -> ChargeState {
    if raw < CHARGE_ACTIVE_BELOW {
        ChargeState::Charging
    } else if raw > CHARGE_DONE_ABOVE {
        ChargeState::Done
    } else {
        ChargeState::NotCharging
    }
}

/// Decode a resistor-ladder reading into the pressed state of its three
/// buttons (LSB first). Total over all inputs.
pub fn decode_ladder(raw: u8) -> u8 {
    LADDER_BREAKPOINTS
        .iter()
        .find(|(limit, _)| raw <= *limit)
        .map_or(0, |(_, combo)| *combo)
}

/// USB charging > USB > low battery > battery.
pub fn power_status(supply_mv: u16, charge: ChargeState) -> PowerStatus {
    if supply_mv >= VUSB_MV {
        match charge {
            ChargeState::Charging => PowerStatus::Charging,
            _ => PowerStatus::Usb,
        }
    } else if supply_mv <= BATTERY_LOW_MV {
        PowerStatus::LowBattery
    } else {
        PowerStatus::Battery
    }
}

/// Accepts a new value only after it was seen on consecutive ticks.
#[derive(Debug, Default, Clone, Copy)]
struct Debouncer {
    stable: u8,
    candidate: u8,
    seen: u8,
}

impl Debouncer {
    fn update(&mut self, value: u8) -> u8 {
        if value == self.candidate {
            self.seen = self.seen.saturating_add(1);
        } else {
            self.candidate = value;
            self.seen = 1;
        }
        if self.seen >= DEBOUNCE_TICKS {
            self.stable = self.candidate;
        }
        self.stable
    }
}

/// One fully refreshed set of converted readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readings {
    pub supply_mv: u16,
    pub battery_mv: u16,
    pub temperature: i16,
    pub charge: ChargeState,
    /// Debounced ladder combinations, ladder 1 first.
    pub ladders: [u8; 2],
    pub joy_h: u8,
    pub joy_v: u8,
}

impl Readings {
    pub fn power_status(&self) -> PowerStatus {
        power_status(self.supply_mv, self.charge)
    }
}

pub struct AnalogSampler {
    channel: Channel,
    raw: [u16; Channel::COUNT],
    calibration: TempCalibration,
    debounce: [Debouncer; 2],
}

impl AnalogSampler {
    pub fn new(calibration: TempCalibration) -> Self {
        Self {
            channel: Channel::Supply,
            raw: [0; Channel::COUNT],
            calibration,
            debounce: [Debouncer::default(); 2],
        }
    }

    /// Channel the next conversion must be taken from.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Start the cycle over from the supply channel.
    pub fn restart(&mut self) {
        self.channel = Channel::Supply;
    }

    /// Store a conversion for the current channel and move on. Returns the
    /// converted readings when this completed a full cycle.
    pub fn record(&mut self, raw: u16) -> Option<Readings> {
        let channel = self.channel;
        self.raw[channel.index()] = raw & 0x03ff;
        self.channel = channel.next();
        if channel != Channel::JoystickV {
            return None;
        }
        Some(self.convert())
    }

    fn convert(&mut self) -> Readings {
        let byte = |ch: Channel| (self.raw[ch.index()] >> 2) as u8;
        let supply_mv = supply_millivolts(self.raw[Channel::Supply.index()]);
        let ladder1 = decode_ladder(byte(Channel::Ladder1));
        let ladder2 = decode_ladder(byte(Channel::Ladder2));
        let charge = charge_state(byte(Channel::Charger));
        let (joy_h, joy_v) = (byte(Channel::JoystickH), byte(Channel::JoystickV));
        Readings {
            supply_mv,
            battery_mv: battery_millivolts(self.raw[Channel::Battery.index()], supply_mv),
            temperature: temperature_tenths(self.raw[Channel::Temperature.index()], self.calibration),
            charge,
            ladders: [self.debounce[0].update(ladder1), self.debounce[1].update(ladder2)],
            joy_h,
            joy_v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_breakpoints() {
        assert_eq!(decode_ladder(0), 0b111);
        assert_eq!(decode_ladder(94), 0b111);
        assert_eq!(decode_ladder(95), 0b110);
        assert_eq!(decode_ladder(150), 0b011);
        assert_eq!(decode_ladder(225), 0b001);
        assert_eq!(decode_ladder(226), 0);
        assert_eq!(decode_ladder(255), 0);
    }

    #[test]
    fn conversions() {
        assert_eq!(supply_millivolts(341), 3303);
        assert_eq!(supply_millivolts(0), u16::MAX);
        assert_eq!(battery_millivolts(512, 4000), 2000);
        // 25 °C is 596 half-kelvin with the identity calibration
        assert_eq!(temperature_tenths(596, TempCalibration::default()), 245);
        assert_eq!(charge_state(10), ChargeState::Charging);
        assert_eq!(charge_state(128), ChargeState::NotCharging);
        assert_eq!(charge_state(240), ChargeState::Done);
    }

    #[test]
    fn power_status_precedence() {
        assert_eq!(power_status(4800, ChargeState::Charging), PowerStatus::Charging);
        assert_eq!(power_status(4800, ChargeState::Done), PowerStatus::Usb);
        // charger pin ignored on battery
        assert_eq!(power_status(3350, ChargeState::Charging), PowerStatus::LowBattery);
        assert_eq!(power_status(3900, ChargeState::NotCharging), PowerStatus::Battery);
    }

    #[test]
    fn full_cycle_produces_one_tick() {
        let mut s = AnalogSampler::new(TempCalibration::default());
        let mut ticks = 0;
        for _ in 0..3 {
            for _ in 0..Channel::COUNT - 1 {
                assert!(s.record(400).is_none());
            }
            assert_eq!(s.channel(), Channel::JoystickV);
            if s.record(400).is_some() {
                ticks += 1;
            }
            assert_eq!(s.channel(), Channel::Supply);
        }
        assert_eq!(ticks, 3);
    }

    #[test]
    fn ladder_changes_are_debounced() {
        let mut s = AnalogSampler::new(TempCalibration::default());
        let mut cycle = |ladder1: u16| {
            let mut out = None;
            for ch in 0..Channel::COUNT {
                let raw = if ch == Channel::Ladder1.index() { ladder1 } else { 1023 };
                out = s.record(raw);
            }
            out.map(|r| r.ladders[0])
        };
        assert_eq!(cycle(1023), Some(0));
        // 0 raw is all three pressed, accepted on the second tick
        assert_eq!(cycle(0), Some(0));
        assert_eq!(cycle(0), Some(0b111));
        // a single-tick glitch is ignored
        assert_eq!(cycle(1023), Some(0b111));
        assert_eq!(cycle(0), Some(0b111));
    }
}
