//! Closed error taxonomy shared by the bus and its clients.
use thiserror::Error;

/// Result of a bus operation
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric sentinel returned for successful operations
pub const NONE: u32 = 0x2000_0000;

/// Every fallible lifecycle, transfer and notification operation returns one
/// of these errors. Each variant carries a stable numeric code (see
/// [Error::code]) so callers on the other side of a process boundary can
/// branch on it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    #[error("bus device not found")]
    BusNotFound,
    #[error("no free slot available on the bus")]
    NoFreeSlot,
    #[error("invalid target")]
    InvalidTarget,
    #[error("the bus failed to remove the target")]
    RemovalFailed,
    #[error("target is already connected to the bus")]
    AlreadyConnected,
    #[error("target is uninitialized")]
    TargetUninitialized,
    #[error("target is not plugged in")]
    TargetNotPluggedIn,
    #[error("bus version does not meet the minimum supported version")]
    BusVersionMismatch,
    #[error("failed to access the bus")]
    BusAccessFailed,
    #[error("a notification callback is already registered")]
    CallbackAlreadyRegistered,
    #[error("no notification callback is registered")]
    CallbackNotFound,
    #[error("client is already connected to a bus")]
    BusAlreadyConnected,
}

impl Error {
    /// Returns the numeric code of the error
    pub fn code(&self) -> u32 {
        match self {
            Error::BusNotFound => 0xE000_0001,
            Error::NoFreeSlot => 0xE000_0002,
            Error::InvalidTarget => 0xE000_0003,
            Error::RemovalFailed => 0xE000_0004,
            Error::AlreadyConnected => 0xE000_0005,
            Error::TargetUninitialized => 0xE000_0006,
            Error::TargetNotPluggedIn => 0xE000_0007,
            Error::BusVersionMismatch => 0xE000_0008,
            Error::BusAccessFailed => 0xE000_0009,
            Error::CallbackAlreadyRegistered => 0xE000_0010,
            Error::CallbackNotFound => 0xE000_0011,
            Error::BusAlreadyConnected => 0xE000_0012,
        }
    }

    /// Decode a numeric code. Returns `None` for unknown codes, `Some(Ok(()))`
    /// for [NONE] and `Some(Err(..))` for every known error code.
    pub fn from_code(code: u32) -> Option<Result<()>> {
        let err = match code {
            NONE => return Some(Ok(())),
            0xE000_0001 => Error::BusNotFound,
            0xE000_0002 => Error::NoFreeSlot,
            0xE000_0003 => Error::InvalidTarget,
            0xE000_0004 => Error::RemovalFailed,
            0xE000_0005 => Error::AlreadyConnected,
            0xE000_0006 => Error::TargetUninitialized,
            0xE000_0007 => Error::TargetNotPluggedIn,
            0xE000_0008 => Error::BusVersionMismatch,
            0xE000_0009 => Error::BusAccessFailed,
            0xE000_0010 => Error::CallbackAlreadyRegistered,
            0xE000_0011 => Error::CallbackNotFound,
            0xE000_0012 => Error::BusAlreadyConnected,
            _ => return None,
        };
        Some(Err(err))
    }
}

/// Returns the numeric code for the given result
pub fn result_code(result: &Result<()>) -> u32 {
    match result {
        Ok(_) => NONE,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_back_to_errors() {
        let errors = [
            Error::BusNotFound,
            Error::NoFreeSlot,
            Error::InvalidTarget,
            Error::RemovalFailed,
            Error::AlreadyConnected,
            Error::TargetUninitialized,
            Error::TargetNotPluggedIn,
            Error::BusVersionMismatch,
            Error::BusAccessFailed,
            Error::CallbackAlreadyRegistered,
            Error::CallbackNotFound,
            Error::BusAlreadyConnected,
        ];
        for err in errors {
            assert_eq!(Error::from_code(err.code()), Some(Err(err)));
        }
        assert_eq!(Error::from_code(NONE), Some(Ok(())));
        assert_eq!(Error::from_code(0xE000_0013), None);
        assert_eq!(result_code(&Err(Error::NoFreeSlot)), 0xE000_0002);
        assert_eq!(result_code(&Ok(())), NONE);
    }
}
