//! Haptic effects, stepped once per sampler tick.

use crate::config::{RUMBLER_DEFAULT_INTENSITY, RUMBLER_PULSE_TICKS, RUMBLER_TICKS_PER_UNIT};

#[derive(Debug, Default)]
pub struct Rumbler {
    intensity: u8,
    on_ticks: u16,
    off_ticks: u16,
    pulses_left: u8,
    remaining: u16,
    on: bool,
}

impl Rumbler {
    pub const fn new() -> Self {
        Self {
            intensity: 0,
            on_ticks: 0,
            off_ticks: 0,
            pulses_left: 0,
            remaining: 0,
            on: false,
        }
    }

    /// One short pulse. Returns the duty to apply now.
    pub fn ok(&mut self) -> u8 {
        self.start(RUMBLER_DEFAULT_INTENSITY, RUMBLER_PULSE_TICKS, 1)
    }

    /// Three short pulses.
    pub fn fail(&mut self) -> u8 {
        self.start(RUMBLER_DEFAULT_INTENSITY, RUMBLER_PULSE_TICKS, 3)
    }

    /// Single pulse of `duration` × 10 ms.
    pub fn custom(&mut self, intensity: u8, duration: u8) -> u8 {
        if intensity == 0 || duration == 0 {
            return self.stop();
        }
        self.start(intensity, duration as u16 * RUMBLER_TICKS_PER_UNIT, 1)
    }

    pub fn stop(&mut self) -> u8 {
        *self = Self::new();
        0
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    fn start(&mut self, intensity: u8, ticks: u16, pulses: u8) -> u8 {
        self.intensity = intensity;
        self.on_ticks = ticks;
        self.off_ticks = RUMBLER_PULSE_TICKS;
        self.pulses_left = pulses;
        self.remaining = ticks;
        self.on = true;
        intensity
    }

    /// Advance one tick. Returns a new duty when the motor output changes.
    pub fn tick(&mut self) -> Option<u8> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        if self.on {
            self.on = false;
            self.pulses_left -= 1;
            if self.pulses_left > 0 {
                self.remaining = self.off_ticks;
            }
            Some(0)
        } else {
            self.on = true;
            self.remaining = self.on_ticks;
            Some(self.intensity)
        }
    }
}
