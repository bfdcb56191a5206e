//! RGB status indicator colours.
//!
//! A recorded [`ErrorCode`] is shown as a fixed colour whenever a mode is
//! entered; the host may also drive the LED directly while `On`.

use crate::error::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Colour shown for a recorded error, `None` when there is nothing to show.
    pub fn for_error(code: ErrorCode) -> Option<Color> {
        match code {
            ErrorCode::NoError => None,
            ErrorCode::RPiBootTimeout => Some(Color::BLUE),
            ErrorCode::RPiPowerDownTimeout => Some(Color::YELLOW),
            ErrorCode::WatchdogTimeout => Some(Color::MAGENTA),
            ErrorCode::InitialPowerOn => Some(Color::WHITE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_has_a_distinct_colour() {
        let colours = [
            Color::for_error(ErrorCode::InitialPowerOn),
            Color::for_error(ErrorCode::WatchdogTimeout),
            Color::for_error(ErrorCode::RPiBootTimeout),
            Color::for_error(ErrorCode::RPiPowerDownTimeout),
        ];
        for (i, a) in colours.iter().enumerate() {
            assert!(a.is_some());
            for b in &colours[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(Color::for_error(ErrorCode::NoError), None);
        assert_eq!(Color::for_error(ErrorCode::RPiBootTimeout), Some(Color::BLUE));
    }
}
