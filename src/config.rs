//! Application-wide constants and compile-time configuration.
//!
//! Bus parameters, the sampler timebase, mode timeouts and battery
//! thresholds live here so they can be tuned in one place.  Timeouts are
//! expressed in sampler ticks (one tick = one full pass over the eight
//! analog channels, roughly 200 Hz).

// I2C

/// 7-bit slave address the host talks to.
pub const I2C_ADDRESS: u8 = 0x43;

/// Size of the command buffer. Also bounds a single host write.
pub const I2C_BUFFER_SIZE: usize = 32;

// Timebase

/// Nominal sampler ticks per second.
pub const TICKS_PER_SECOND: u16 = 200;

/// Period of a single analog conversion slot (µs). Eight slots make a tick.
pub const ADC_SLOT_PERIOD_US: u64 = 1_000_000 / (TICKS_PER_SECOND as u64 * 8);

// Mode timeouts (ticks)

/// Home must be held this long in `WakeUp` before the host is powered.
pub const BTN_HOME_POWERON_PRESS: u16 = 250;

/// Holding home this long while `On` forces a power down.
pub const BTN_HOME_POWEROFF_PRESS: u16 = 500;

/// Settling time after a home-button edge before the level is read (ms).
pub const HOME_DEBOUNCE_MS: u64 = 10;

/// Host has this long after power-up to send `PowerOn`.
pub const RPI_POWERUP_TIMEOUT: u16 = 1000;

/// Host has this long to signal it halted before power is cut anyway.
pub const RPI_POWERDOWN_TIMEOUT: u16 = 10000;

/// Shutdown-watch level at or above which the host is considered halted.
pub const RPI_POWERDOWN_THRESHOLD: u8 = 128;

// Battery

/// At or below this supply voltage the device refuses to wake (mV).
pub const BATTERY_CRITICAL_MV: u16 = 3300;

/// Low-battery status threshold, also the level that clears the critical
/// flag once recharged (mV).
pub const BATTERY_LOW_MV: u16 = 3400;

/// Supply voltage above which USB power is assumed present (mV).
pub const VUSB_MV: u16 = 4400;

/// Samples averaged by the boot / wake battery check.
pub const BATTERY_CHECK_SAMPLES: usize = 10;

/// Red flashes shown when the battery check fails.
pub const CRITICAL_FLASH_COUNT: u8 = 5;

/// On and off time of a single critical-battery flash (ms).
pub const CRITICAL_FLASH_MS: u32 = 100;

// Analog conversions

/// Internal bandgap reference scaled for a 10-bit conversion (mV × 1024).
pub const BANDGAP_MV_X1024: u32 = 1100 * 1024;

/// Charge-pin reading below which the charger reports charging.
pub const CHARGE_ACTIVE_BELOW: u8 = 32;

/// Charge-pin reading above which the charger reports charge complete.
pub const CHARGE_DONE_ABOVE: u8 = 224;

/// Button-ladder breakpoints: a raw reading at or below the threshold maps
/// to the given 3-button combination. Anything above the last entry means
/// nothing is pressed.
pub const LADDER_BREAKPOINTS: [(u8, u8); 7] = [
    (94, 0b111),
    (105, 0b110),
    (118, 0b101),
    (132, 0b100),
    (150, 0b011),
    (179, 0b010),
    (225, 0b001),
];

/// Consecutive identical ladder decodes required before a change is accepted.
pub const DEBOUNCE_TICKS: u8 = 2;

// Audio

/// Microphone sample rate (Hz).
pub const AUDIO_SAMPLE_RATE_HZ: u32 = 8000;

/// Bytes per audio batch, the unit of transfer over the bus.
pub const AUDIO_BATCH_SIZE: usize = 32;

/// Batches in the ring.
pub const AUDIO_BATCHES: usize = 8;

/// Total ring size (bytes).
pub const AUDIO_RING_SIZE: usize = AUDIO_BATCH_SIZE * AUDIO_BATCHES;

// Rumbler

/// Intensity of the built-in confirmation / failure effects.
pub const RUMBLER_DEFAULT_INTENSITY: u8 = 192;

/// Length of a single built-in rumble pulse and of the gap between pulses (ticks).
pub const RUMBLER_PULSE_TICKS: u16 = 20;

/// Custom rumble durations arrive in 10 ms units; ticks per unit.
pub const RUMBLER_TICKS_PER_UNIT: u16 = 2;

// Watchdog

/// Hardware watchdog period (seconds). Petted once a second.
pub const WATCHDOG_TIMEOUT_SECS: u32 = 2;

// Persistent state

/// Flash page index where the persistent state starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for the persistent state.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 2;

/// Quiet period after the last change before the state is written (ms).
pub const PERSIST_DELAY_MS: u64 = 2000;

/// Default display brightness before the host sets one.
pub const DEFAULT_BRIGHTNESS: u8 = 128;

/// Default audio volume before the host sets one.
pub const DEFAULT_VOLUME: u8 = 8;
