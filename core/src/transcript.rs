//! Human-readable log of the exchanges performed on a card.

use std::fmt::{Display, Formatter};

use crate::status::Status;

/// A single transceive exchange: the octets sent, the octets received, and
/// the driver status reported for the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exchange {
    pub command: Vec<u8>,
    pub response: Vec<u8>,
    pub status: Status,
}

/// Accumulated exchanges, rendered as the diagnostic log shown to the user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<Exchange>,
}

impl Transcript {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record(&mut self, command: &[u8], response: &[u8], status: Status) {
        self.entries.push(Exchange {
            command: command.to_vec(),
            response: response.to_vec(),
            status,
        });
    }

    pub fn entries(&self) -> &[Exchange] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Display for Transcript {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for exchange in &self.entries {
            writeln!(f, "Sent: {}", to_hex(&exchange.command))?;

            match exchange.response.is_empty() {
                true => writeln!(f, "Received: (none) [{}]", exchange.status)?,
                _ => writeln!(
                    f,
                    "Received: {} [{}]",
                    to_hex(&exchange.response),
                    exchange.status
                )?,
            }
        }

        Ok(())
    }
}

/// Formats octets as uppercase hex, colon-separated.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|octet| format!("{octet:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Decodes a hex string, ignoring any separators or other non-hex characters.
/// An odd number of hex digits is an error.
pub fn from_hex(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits: String = input.chars().filter(char::is_ascii_hexdigit).collect();

    hex::decode(digits)
}
