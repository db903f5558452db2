//! A crate to exchange APDU command sequences with a smart card through a
//! reader session.
//!
//! The reader itself is driven by an external driver implementing
//! [`reader::Driver`]; this crate models the session, builds the command
//! sequences, and interprets the responses.

#[cfg(feature = "pcsc")]
pub mod pcsc;

pub mod ap;
pub mod apdu;
pub mod card;
pub mod reader;
pub mod status;
pub mod transcript;

pub use card::Card;

#[cfg(test)]
pub(crate) mod testing;
