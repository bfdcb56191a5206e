//! Transient conditions shared between interrupt and main contexts.
//!
//! Every bit is set on one side and cleared on the other:
//!
//! | bit                 | set by            | cleared by        |
//! |---------------------|-------------------|-------------------|
//! | `COMMAND_READY`     | bus (stop write)  | main loop         |
//! | `BATTERY_CRITICAL`  | sampler tick      | main loop         |
//! | `IRQ_PENDING`       | sampler tick      | main loop         |
//! | `HOME_CHANGED`      | GPIO edge         | main loop         |
//! | `AUDIO_BATCH_VALID` | audio timer       | main loop         |
//! | `SECOND_TICK`       | RTC tick          | main loop         |
//! | `PERSIST_DIRTY`     | main loop         | storage task      |
//!
//! The main loop raises the host IRQ line for `IRQ_PENDING` and
//! `AUDIO_BATCH_VALID`; the bus releases it when a read starts.

use core::sync::atomic::{AtomicU8, Ordering};

/// Single-byte atomic bitset.
pub struct Flags(AtomicU8);

impl Flags {
    pub const COMMAND_READY: u8 = 1 << 0;
    pub const BATTERY_CRITICAL: u8 = 1 << 1;
    pub const IRQ_PENDING: u8 = 1 << 2;
    pub const HOME_CHANGED: u8 = 1 << 3;
    pub const AUDIO_BATCH_VALID: u8 = 1 << 4;
    pub const SECOND_TICK: u8 = 1 << 5;
    pub const PERSIST_DIRTY: u8 = 1 << 6;

    /// All flags cleared, usable in a `static`.
    pub const fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    pub fn set(&self, bits: u8) {
        self.0.fetch_or(bits, Ordering::AcqRel);
    }

    pub fn clear(&self, bits: u8) {
        self.0.fetch_and(!bits, Ordering::AcqRel);
    }

    /// True if any of `bits` is set.
    pub fn any(&self, bits: u8) -> bool {
        self.0.load(Ordering::Acquire) & bits != 0
    }

    /// Clear `bits` and report whether any of them was set.
    pub fn take(&self, bits: u8) -> bool {
        self.0.fetch_and(!bits, Ordering::AcqRel) & bits != 0
    }

    pub fn bits(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::new()
    }
}
