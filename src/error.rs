//! Error types for rckid-ctl.
//!
//! Two families live here.  [`ErrorCode`] is the wire-visible record of a
//! failed mode transition, reported to the host inside the device state
//! and rendered on the status indicator.  [`Error`] covers the fallible
//! operations inside the controller (decoding a host command, decoding a
//! persisted image); it never crosses the bus.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.

/// Internal error type used across the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Protocol
    /// The host sent a malformed command.
    Protocol(ProtocolError),

    /// The command is valid but not accepted in the current mode.
    NotAllowed,

    // Persistence
    /// A persisted image was too short or carried invalid fields.
    BadPersistentImage,

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

/// Subset of protocol errors we distinguish (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Write transaction carried no opcode.
    Empty,
    /// Opcode is not part of the command set.
    UnknownOpcode(u8),
    /// Payload shorter than the opcode requires.
    Truncated { opcode: u8, expected: u8, got: u8 },
    /// Payload present but out of range (e.g. month 13).
    InvalidPayload(u8),
}

// Convenience conversions

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

/// Recorded mode-transition error, visible to the host.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    #[default]
    NoError = 0,
    /// First boot after the battery was connected.
    InitialPowerOn = 1,
    /// The previous run was ended by the hardware watchdog.
    WatchdogTimeout = 2,
    /// The host never confirmed it booted.
    RPiBootTimeout = 3,
    /// The host never signalled it halted.
    RPiPowerDownTimeout = 4,
}

impl ErrorCode {
    /// Decode the wire byte. Unknown values map to `None`.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ErrorCode::NoError),
            1 => Some(ErrorCode::InitialPowerOn),
            2 => Some(ErrorCode::WatchdogTimeout),
            3 => Some(ErrorCode::RPiBootTimeout),
            4 => Some(ErrorCode::RPiPowerDownTimeout),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_converts() {
        let e: Error = ProtocolError::UnknownOpcode(0x7f).into();
        assert_eq!(e, Error::Protocol(ProtocolError::UnknownOpcode(0x7f)));
    }

    #[test]
    fn error_code_wire_values() {
        for code in [
            ErrorCode::NoError,
            ErrorCode::InitialPowerOn,
            ErrorCode::WatchdogTimeout,
            ErrorCode::RPiBootTimeout,
            ErrorCode::RPiPowerDownTimeout,
        ] {
            assert_eq!(ErrorCode::from_u8(code as u8), Some(code));
        }
        assert_eq!(ErrorCode::from_u8(5), None);
    }
}
