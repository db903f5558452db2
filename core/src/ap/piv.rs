//! PIV AP: the card application addressed by the fixed AID, extended by the
//! vendor with serial-number and firmware-version commands.

use std::rc::Rc;

use crate::ap::ProtocolError;
use crate::apdu::{self, Command, Response};
use crate::card::Card;
use crate::reader::Transceive;

const AID: [u8; 9] = [0xA0, 0x00, 0x00, 0x03, 0x08, 0x00, 0x00, 0x10, 0x00];

const VERIFY_P2_APPLICATION: u8 = 0x80;

const INS_GET_SERIAL: u8 = 0xF8;
const INS_GET_FIRMWARE: u8 = 0xFD;

const PIN_PADDED_LEN: usize = 8;
const PIN_PAD: u8 = 0xFF;

/// An application PIN: 1 to 8 ASCII digits, padded for the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pin(Vec<u8>);

impl Pin {
    /// Validates the digits. PIN "123456" encodes on the wire as
    /// `31 32 33 34 35 36 FF FF`.
    pub fn digits(pin: &str) -> Result<Self, ProtocolError> {
        if pin.is_empty()
            || pin.len() > PIN_PADDED_LEN
            || !pin.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ProtocolError::InvalidPin);
        }

        Ok(Self(pin.as_bytes().to_vec()))
    }

    fn padded(&self) -> Vec<u8> {
        let mut payload = self.0.clone();
        payload.resize(PIN_PADDED_LEN, PIN_PAD);
        payload
    }
}

/// The sequencer for the PIV AP. Constructing it selects the application;
/// a failed step aborts the whole chain before the next command is sent.
pub struct PivAp<T: Transceive> {
    card: Rc<Card<T>>,
}

impl<T: Transceive> PivAp<T> {
    /// Opens the AP on the card by selecting its AID.
    pub fn open(card: Rc<Card<T>>) -> Result<Self, ProtocolError> {
        let ap = Self { card };

        ap.card
            .transmit(Command::select_application(AID.into()))
            .map_err(ProtocolError::SelectFailed)
            .map(|_| ap)
    }

    /// Reads the card serial number as a decimal value.
    pub fn serial_number(&self) -> Result<u64, ProtocolError> {
        self.card
            .transmit(Command::new(apdu::CLA_DEFAULT, INS_GET_SERIAL, 0x00, 0x00))
            .map_err(ProtocolError::CommandFailed)
            .and_then(decimal_serial)
    }

    /// Reads the firmware version, verifying the PIN first.
    pub fn firmware_version(&self, pin: &Pin) -> Result<String, ProtocolError> {
        self.card
            .transmit(Command::verify(VERIFY_P2_APPLICATION, pin.padded()))
            .map_err(ProtocolError::PinVerificationFailed)?;

        self.card
            .transmit(Command::new(apdu::CLA_DEFAULT, INS_GET_FIRMWARE, 0x00, 0x00))
            .map_err(ProtocolError::CommandFailed)
            .and_then(firmware_string)
    }
}

/// Interprets the payload before the status word as a big-endian integer and
/// returns it in decimal.
fn decimal_serial(raw: Vec<u8>) -> Result<u64, ProtocolError> {
    let response = Response::from_bytes(raw).ok_or(ProtocolError::MalformedResponse)?;
    let payload = response.payload();

    // More than 8 octets would overflow the serial; nothing at all is not a serial.
    if payload.is_empty() || payload.len() > 8 {
        return Err(ProtocolError::MalformedResponse);
    }

    Ok(payload
        .iter()
        .fold(0u64, |serial, octet| (serial << 8) | u64::from(*octet)))
}

/// Renders the payload before the status word as a dotted version string:
/// each `0` hex digit is a delimiter, and a leading delimiter is dropped.
fn firmware_string(raw: Vec<u8>) -> Result<String, ProtocolError> {
    let response = Response::from_bytes(raw).ok_or(ProtocolError::MalformedResponse)?;
    if response.payload().is_empty() {
        return Err(ProtocolError::MalformedResponse);
    }

    let mut version = hex::encode_upper(response.payload()).replace('0', ".");
    if version.starts_with('.') {
        version.remove(0);
    }

    Ok(version)
}
