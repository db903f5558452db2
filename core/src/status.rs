//! Status enumerations reported by the reader driver.
//!
//! Two distinct enumerations exist in the driver contract: [`Status`] is
//! returned by every transceive call, while [`SessionStatus`] arrives through
//! the session error callback. Both keep their raw driver codes so unknown
//! values survive a round trip.

use std::fmt::{Display, Formatter};

/// Result of a single transceive call, as reported by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Status {
    Ok,
    CommunicationError,
    ChecksumError,
    ReadingError,
    WritingError,
    BufferOverflow,
    MaxAddressExceeded,
    MaxKeyIndexExceeded,
    NoCard,
    CommandNotSupported,
    Unknown(u32),
}

impl Status {
    /// Maps a raw driver code to the enumeration.
    pub fn from_raw(code: u32) -> Self {
        match code {
            0x00 => Self::Ok,
            0x01 => Self::CommunicationError,
            0x02 => Self::ChecksumError,
            0x03 => Self::ReadingError,
            0x04 => Self::WritingError,
            0x05 => Self::BufferOverflow,
            0x06 => Self::MaxAddressExceeded,
            0x07 => Self::MaxKeyIndexExceeded,
            0x08 => Self::NoCard,
            0x09 => Self::CommandNotSupported,
            _ => Self::Unknown(code),
        }
    }

    /// The raw driver code.
    pub fn raw(&self) -> u32 {
        match self {
            Self::Ok => 0x00,
            Self::CommunicationError => 0x01,
            Self::ChecksumError => 0x02,
            Self::ReadingError => 0x03,
            Self::WritingError => 0x04,
            Self::BufferOverflow => 0x05,
            Self::MaxAddressExceeded => 0x06,
            Self::MaxKeyIndexExceeded => 0x07,
            Self::NoCard => 0x08,
            Self::CommandNotSupported => 0x09,
            Self::Unknown(code) => *code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::CommunicationError => write!(f, "communication error"),
            Self::ChecksumError => write!(f, "checksum error"),
            Self::ReadingError => write!(f, "reading error"),
            Self::WritingError => write!(f, "writing error"),
            Self::BufferOverflow => write!(f, "buffer overflow"),
            Self::MaxAddressExceeded => write!(f, "maximum address exceeded"),
            Self::MaxKeyIndexExceeded => write!(f, "maximum key index exceeded"),
            Self::NoCard => write!(f, "no card"),
            Self::CommandNotSupported => write!(f, "command not supported"),
            Self::Unknown(code) => write!(f, "unknown status ({code:#04X})"),
        }
    }
}

/// Session-level status delivered through the error callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SessionStatus {
    Closed,
    OpenFailed,
    ConnectionLost,
    Timeout,
    BondingFailed,
    Unknown(u32),
}

impl SessionStatus {
    /// Maps a raw driver code to the enumeration.
    pub fn from_raw(code: u32) -> Self {
        match code {
            0x00 => Self::Closed,
            0x01 => Self::OpenFailed,
            0x02 => Self::ConnectionLost,
            0x03 => Self::Timeout,
            0x04 => Self::BondingFailed,
            _ => Self::Unknown(code),
        }
    }

    /// The raw driver code.
    pub fn raw(&self) -> u32 {
        match self {
            Self::Closed => 0x00,
            Self::OpenFailed => 0x01,
            Self::ConnectionLost => 0x02,
            Self::Timeout => 0x03,
            Self::BondingFailed => 0x04,
            Self::Unknown(code) => *code,
        }
    }

    /// Codes in the low range end the session; the connectivity flag must be
    /// cleared when one arrives.
    pub fn is_terminal(&self) -> bool {
        self.raw() <= 0x04
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "session closed"),
            Self::OpenFailed => write!(f, "session open failed"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::Timeout => write!(f, "session timed out"),
            Self::BondingFailed => write!(f, "bonding failed"),
            Self::Unknown(code) => write!(f, "unknown session status ({code:#04X})"),
        }
    }
}
