//! Controller logic for the RCKid power/controls/audio co-processor.
//!
//! The co-processor sits between the battery, the buttons, the microphone
//! and the host computer, and talks to the host as an I2C slave. This
//! library holds all of that logic; it never touches registers. Hardware
//! is reached through the traits in [`hal`], implemented by the firmware
//! binary for the nRF52840 and by [`sim::SimBoard`] for host tests.
//!
//! Usage: `cargo test` runs everything on the host.
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and is built with `--features embedded`.

#![cfg_attr(not(test), no_std)]

// must come first so the logging macros are visible below
mod fmt;

pub mod analog;
pub mod audio;
pub mod bus;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod flags;
pub mod hal;
pub mod indicator;
pub mod persist;
pub mod power;
pub mod rumbler;
pub mod safety;
pub mod sim;
pub mod state;
pub mod time;

pub use command::Command;
pub use controller::Controller;
pub use error::{Error, ErrorCode};
pub use flags::Flags;
pub use state::{DeviceState, Mode};
