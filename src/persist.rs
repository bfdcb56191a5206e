//! Host-owned state that survives a reset.
//!
//! The host reads it with `GetPersistentState` and writes it back with
//! `SetPersistentState`; the firmware stores it in flash.

use crate::config::{DEFAULT_BRIGHTNESS, DEFAULT_VOLUME};
use crate::error::Error;
use crate::time::Alarm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PersistentState {
    pub alarm: Alarm,
    pub brightness: u8,
    pub volume: u8,
}

impl Default for PersistentState {
    fn default() -> Self {
        Self {
            alarm: Alarm::default(),
            brightness: DEFAULT_BRIGHTNESS,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl PersistentState {
    /// Layout: alarm (hour, minute, enabled), brightness, volume.
    pub const SIZE: usize = Alarm::WIRE_SIZE + 2;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let a = self.alarm.to_bytes();
        [a[0], a[1], a[2], self.brightness, self.volume]
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() < Self::SIZE {
            return Err(Error::BadPersistentImage);
        }
        let alarm = Alarm::from_bytes(&[data[0], data[1], data[2]])
            .map_err(|_| Error::BadPersistentImage)?;
        Ok(Self {
            alarm,
            brightness: data[3],
            volume: data[4],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let p = PersistentState {
            alarm: Alarm {
                hour: 6,
                minute: 45,
                enabled: true,
            },
            brightness: 200,
            volume: 3,
        };
        assert_eq!(p.to_bytes(), [6, 45, 1, 200, 3]);
        assert_eq!(PersistentState::from_bytes(&p.to_bytes()), Ok(p));
    }

    #[test]
    fn rejects_short_or_invalid_images() {
        assert_eq!(
            PersistentState::from_bytes(&[6, 45, 1, 200]),
            Err(Error::BadPersistentImage)
        );
        assert_eq!(
            PersistentState::from_bytes(&[25, 0, 1, 200, 3]),
            Err(Error::BadPersistentImage)
        );
    }
}
