//! nRF52840 board support for the firmware binary.
//!
//! The controller lives in a blocking mutex; every task reaches it through
//! [`with_controller`], so each hardware event is applied atomically.
//! Signals wake the tasks that have work pending.

pub mod analog;
pub mod board;
pub mod bus;
pub mod storage;

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use rckid_ctl::{Controller, Flags};

use board::NrfBoard;

pub type Ctl = Controller<'static, NrfBoard>;

/// Flags shared by every task and the controller.
pub static FLAGS: Flags = Flags::new();

static CONTROLLER: Mutex<CriticalSectionRawMutex, RefCell<Option<Ctl>>> =
    Mutex::new(RefCell::new(None));

/// Main loop has deferred work (command, second tick, home edge).
pub static POLL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Device left `Sleep`; the analog task resumes sampling.
pub static WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Persistent state changed and should be written to flash.
pub static PERSIST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Hand the booted controller over to the tasks.
pub fn install(ctl: Ctl) {
    CONTROLLER.lock(|c| c.replace(Some(ctl)));
}

/// Run `f` on the controller inside the critical section. `None` until
/// [`install`] was called.
pub fn with_controller<R>(f: impl FnOnce(&mut Ctl) -> R) -> Option<R> {
    CONTROLLER.lock(|c| c.borrow_mut().as_mut().map(f))
}
