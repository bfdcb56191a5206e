//! Wall clock and alarm, advanced by the one-second supervisor tick.

use crate::error::ProtocolError;

/// Calendar date and time of day. The year is stored in full but travels
/// over the bus as an offset from 2000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl Default for DateTime {
    fn default() -> Self {
        Self {
            second: 0,
            minute: 0,
            hour: 0,
            day: 1,
            month: 1,
            year: 2000,
        }
    }
}

impl DateTime {
    pub const WIRE_SIZE: usize = 6;

    /// Advance by one second, rolling over minutes, hours, days, months and years.
    pub fn tick_second(&mut self) {
        self.second += 1;
        if self.second < 60 {
            return;
        }
        self.second = 0;
        self.minute += 1;
        if self.minute < 60 {
            return;
        }
        self.minute = 0;
        self.hour += 1;
        if self.hour < 24 {
            return;
        }
        self.hour = 0;
        self.day += 1;
        if self.day <= days_in_month(self.month, self.year) {
            return;
        }
        self.day = 1;
        self.month += 1;
        if self.month <= 12 {
            return;
        }
        self.month = 1;
        self.year += 1;
    }

    /// Wire layout: sec, min, hour, day, month, year - 2000.
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        [
            self.second,
            self.minute,
            self.hour,
            self.day,
            self.month,
            self.year.saturating_sub(2000) as u8,
        ]
    }

    /// Parse and validate the wire layout.
    pub fn from_bytes(b: &[u8; Self::WIRE_SIZE]) -> Result<Self, ProtocolError> {
        let year = 2000 + b[5] as u16;
        let valid = b[0] < 60
            && b[1] < 60
            && b[2] < 24
            && (1..=12).contains(&b[4])
            && b[3] >= 1
            && b[3] <= days_in_month(b[4], year);
        if !valid {
            return Err(ProtocolError::InvalidPayload(crate::command::opcode::SET_TIME));
        }
        Ok(Self {
            second: b[0],
            minute: b[1],
            hour: b[2],
            day: b[3],
            month: b[4],
            year,
        })
    }
}

fn is_leap(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(month: u8, year: u16) -> u8 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Daily alarm. Fires once when the clock reaches `hour:minute:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Alarm {
    pub hour: u8,
    pub minute: u8,
    pub enabled: bool,
}

impl Alarm {
    pub const WIRE_SIZE: usize = 3;

    pub fn matches(&self, now: &DateTime) -> bool {
        self.enabled && now.second == 0 && now.minute == self.minute && now.hour == self.hour
    }

    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        [self.hour, self.minute, self.enabled as u8]
    }

    pub fn from_bytes(b: &[u8; Self::WIRE_SIZE]) -> Result<Self, ProtocolError> {
        if b[0] >= 24 || b[1] >= 60 {
            return Err(ProtocolError::InvalidPayload(crate::command::opcode::SET_ALARM));
        }
        Ok(Self {
            hour: b[0],
            minute: b[1],
            enabled: b[2] != 0,
        })
    }
}
