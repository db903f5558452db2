//! Card applications driven by ordered APDU command sequences.
//!
//! Opening an AP selects it on the card; every other operation is a dependent
//! chain that stops at the first step the reader rejects.

pub mod piv;

pub use self::piv::{Pin, PivAp};

use crate::status::Status;

/// Failures of a command sequence. A failure is terminal for the current
/// operation; nothing in this layer retries.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("application selection was rejected by the reader ({0})")]
    SelectFailed(Status),

    #[error("PIN verification was rejected by the reader ({0})")]
    PinVerificationFailed(Status),

    #[error("the command was rejected by the reader ({0})")]
    CommandFailed(Status),

    #[error("the response did not match the expected shape")]
    MalformedResponse,

    #[error("a PIN must be 1 to 8 ASCII digits")]
    InvalidPin,
}
