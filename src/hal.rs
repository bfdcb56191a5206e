//! Hardware seams.
//!
//! One small trait per peripheral the controller drives. The firmware
//! implements them on top of `embassy-nrf`; [`crate::sim::SimBoard`]
//! implements them for host tests.

use embedded_hal::delay::DelayNs;

use crate::analog::TempCalibration;
use crate::indicator::Color;

/// Switched supply rails.
pub trait PowerRails {
    /// The host computer's 5 V rail.
    fn set_host_power(&mut self, on: bool);
}

/// Display backlight PWM.
pub trait Backlight {
    fn set_backlight(&mut self, duty: u8);
}

/// Rumble motor PWM.
pub trait Haptics {
    fn set_rumbler(&mut self, duty: u8);
}

/// RGB status LED. `None` powers the LED down.
pub trait Indicator {
    fn set_rgb(&mut self, color: Option<Color>);
}

/// Side-channel signals shared with the host.
pub trait HostLink {
    /// Drive the open-drain "read me" line low (`true`) or release it.
    fn set_irq(&mut self, asserted: bool);

    /// Analog level of the host's "safe to cut power" output.
    fn shutdown_level(&mut self) -> u8;
}

/// Microphone amplifier, free-running ADC and 8 kHz sample timer.
pub trait AudioFrontEnd {
    fn start_audio(&mut self);
    fn stop_audio(&mut self);
}

/// Why the chip last came out of reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetReason {
    PowerOn,
    Watchdog,
    Software,
    Other,
}

/// Identification block served by the `Info` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipInfo {
    pub signature: [u8; 3],
    pub fuses: [u8; 11],
    pub clock: [u8; 4],
    pub page_size: u16,
}

/// Watchdog, reset control and the battery probe.
pub trait Supervisor: DelayNs {
    fn pet_watchdog(&mut self);

    fn reset_reason(&mut self) -> ResetReason;

    /// Software reset. On hardware this does not return.
    fn reset(&mut self);

    /// One raw supply conversion, same scale as the sampler's supply channel.
    fn sample_supply(&mut self) -> u16;

    fn chip_info(&self) -> ChipInfo;

    fn temp_calibration(&self) -> TempCalibration;
}

/// Everything the controller needs from the board.
pub trait Board: PowerRails + Backlight + Haptics + Indicator + HostLink + AudioFrontEnd + Supervisor {}

impl<T> Board for T where
    T: PowerRails + Backlight + Haptics + Indicator + HostLink + AudioFrontEnd + Supervisor
{
}

/// Whether the slave accepts the next byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    Ack,
    Nack,
}

/// Byte-level I2C slave events, as delivered by the bus interrupt.
pub trait SlaveEvents {
    /// Address matched with the master writing.
    fn start_receive(&mut self) -> Ack;
    fn receive(&mut self, byte: u8) -> Ack;
    fn stop_receive(&mut self);
    /// Address matched with the master reading.
    fn start_transmit(&mut self);
    fn transmit(&mut self) -> u8;
    fn stop_transmit(&mut self);
}
