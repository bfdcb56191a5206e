//! Battery safety and the one-second supervisor duties.

use crate::config::{BATTERY_CRITICAL_MV, BATTERY_LOW_MV};
use crate::state::ExtendedInfo;

/// Critical-battery detector with hysteresis: set at or below the
/// critical floor, cleared only once the supply rises above the low floor.
#[derive(Debug, Default)]
pub struct BatteryGuard {
    critical: bool,
}

impl BatteryGuard {
    pub const fn new() -> Self {
        Self { critical: false }
    }

    /// Feed a supply reading, returns whether the battery is critical.
    pub fn update(&mut self, supply_mv: u16) -> bool {
        if supply_mv <= BATTERY_CRITICAL_MV {
            self.critical = true;
        } else if supply_mv > BATTERY_LOW_MV {
            self.critical = false;
        }
        self.critical
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }
}

/// Mean of the boot / wake supply samples.
pub fn average_millivolts(samples: &[u16]) -> u16 {
    if samples.is_empty() {
        return 0;
    }
    let sum: u32 = samples.iter().map(|&s| s as u32).sum();
    (sum / samples.len() as u32) as u16
}

/// Advance uptime and the wall clock. Returns true when the alarm fires.
pub fn second_tick(info: &mut ExtendedInfo) -> bool {
    info.uptime = info.uptime.wrapping_add(1);
    info.time.tick_second();
    info.alarm.matches(&info.time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Alarm;

    #[test]
    fn hysteresis_band() {
        let mut g = BatteryGuard::new();
        assert!(!g.update(3700));
        assert!(g.update(3300));
        // inside the band the flag sticks
        assert!(g.update(3350));
        assert!(g.update(3400));
        assert!(!g.update(3401));
        assert!(!g.update(3350));
    }

    #[test]
    fn averages() {
        assert_eq!(average_millivolts(&[]), 0);
        assert_eq!(average_millivolts(&[3000, 3100, 3200]), 3100);
    }

    #[test]
    fn alarm_fires_from_second_tick() {
        let mut info = ExtendedInfo::default();
        info.alarm = Alarm {
            hour: 0,
            minute: 1,
            enabled: true,
        };
        let fired = (0..120).filter(|_| second_tick(&mut info)).count();
        assert_eq!(fired, 1);
        assert_eq!(info.uptime, 120);
        assert_eq!((info.time.minute, info.time.second), (2, 0));
    }
}
