//! Power mode state machine.
//!
//! Owns the current [`Mode`] and its armed timeout. The machine only
//! decides; the controller applies the side effects of a transition
//! (rails, backlight, indicator) when it calls [`PowerMachine::enter`].
//!
//! ```text
//! Sleep -> WakeUp -> PowerUp -> On -> PowerDown -> Sleep
//!            \          \
//!             -> Sleep   -> Sleep (boot timeout)
//! ```

use crate::config::{
    BTN_HOME_POWEROFF_PRESS, BTN_HOME_POWERON_PRESS, RPI_POWERDOWN_TIMEOUT, RPI_POWERUP_TIMEOUT,
};
use crate::error::ErrorCode;
use crate::state::Mode;

/// A requested mode change, optionally recording an error first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub to: Mode,
    pub error: Option<ErrorCode>,
}

impl Transition {
    pub const fn to(mode: Mode) -> Self {
        Self {
            to: mode,
            error: None,
        }
    }

    pub const fn failed(mode: Mode, error: ErrorCode) -> Self {
        Self {
            to: mode,
            error: Some(error),
        }
    }
}

pub struct PowerMachine {
    mode: Mode,
    countdown: Option<u16>,
    home_held: u16,
}

impl PowerMachine {
    pub const fn new() -> Self {
        Self {
            mode: Mode::Sleep,
            countdown: None,
            home_held: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Ticks left before the armed timeout fires, `None` if disarmed.
    pub fn countdown(&self) -> Option<u16> {
        self.countdown
    }

    /// Switch to `mode` and arm its timeout. The caller checks the edge.
    pub fn enter(&mut self, mode: Mode) {
        self.mode = mode;
        self.home_held = 0;
        self.countdown = match mode {
            Mode::WakeUp => Some(BTN_HOME_POWERON_PRESS),
            Mode::PowerUp => Some(RPI_POWERUP_TIMEOUT),
            Mode::PowerDown => Some(RPI_POWERDOWN_TIMEOUT),
            Mode::On | Mode::Sleep | Mode::Bootloader => None,
        };
    }

    /// Sampler tick. `home` is the current home button level, `host_halted`
    /// whether the shutdown watch crossed its threshold.
    pub fn tick(&mut self, home: bool, host_halted: bool) -> Option<Transition> {
        match self.mode {
            Mode::WakeUp if !home => return Some(Transition::to(Mode::Sleep)),
            Mode::On => {
                if !home {
                    self.home_held = 0;
                    return None;
                }
                self.home_held = self.home_held.saturating_add(1);
                return (self.home_held >= BTN_HOME_POWEROFF_PRESS)
                    .then_some(Transition::to(Mode::PowerDown));
            }
            Mode::PowerDown if host_halted => return Some(Transition::to(Mode::Sleep)),
            _ => {}
        }

        let remaining = self.countdown?.saturating_sub(1);
        if remaining > 0 {
            self.countdown = Some(remaining);
            return None;
        }
        self.countdown = None;
        match self.mode {
            Mode::WakeUp => Some(Transition::to(Mode::PowerUp)),
            Mode::PowerUp => Some(Transition::failed(Mode::Sleep, ErrorCode::RPiBootTimeout)),
            Mode::PowerDown => Some(Transition::failed(Mode::Sleep, ErrorCode::RPiPowerDownTimeout)),
            _ => None,
        }
    }

    /// Host finished booting.
    pub fn power_on_requested(&self) -> Option<Transition> {
        (self.mode == Mode::PowerUp).then_some(Transition::to(Mode::On))
    }

    /// Host asked to be shut down.
    pub fn power_down_requested(&self) -> Option<Transition> {
        (self.mode == Mode::On).then_some(Transition::to(Mode::PowerDown))
    }

    /// Supply fell below the critical floor.
    pub fn battery_critical(&self) -> Option<Transition> {
        self.power_down_requested()
    }
}

impl Default for PowerMachine {
    fn default() -> Self {
        Self::new()
    }
}
