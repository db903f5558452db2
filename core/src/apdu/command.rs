use crate::apdu;
use crate::apdu::ins;

const SELECT_P1_APPLICATION: u8 = 0x04;
const SELECT_P2_FIRST: u8 = 0x00;

/// An APDU command to be transmitted. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    le: Option<u8>,
    payload: Option<Vec<u8>>,
}

impl Command {
    /// Constructs a command with CLA, INS, P1, and P2.
    /// No payloads will be transmitted or received.
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            le: None,
            payload: None,
        }
    }

    /// Constructs a command with CLA, INS, P1, P2, and Le.
    /// A payload will be received.
    pub fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            le: Some(le),
            payload: None,
        }
    }

    /// Constructs a command with CLA, INS, P1, P2, and a payload.
    /// No payload will be received.
    pub fn new_with_payload(cla: u8, ins: u8, p1: u8, p2: u8, payload: Vec<u8>) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            le: None,
            payload: Some(payload),
        }
    }

    /// Constructs a `SELECT` command addressing an application by its AID.
    pub fn select_application(aid: Vec<u8>) -> Self {
        Self::new_with_payload(
            apdu::CLA_DEFAULT,
            ins::SELECT_FILE,
            SELECT_P1_APPLICATION,
            SELECT_P2_FIRST,
            aid,
        )
    }

    /// Constructs a `VERIFY` command.
    pub fn verify(p2: u8, payload: Vec<u8>) -> Self {
        match payload.len() {
            0 => Self::new(apdu::CLA_DEFAULT, ins::VERIFY, 0x00, p2),
            _ => Self::new_with_payload(apdu::CLA_DEFAULT, ins::VERIFY, 0x00, p2, payload),
        }
    }

    /// Converts the command into octets.
    pub fn into_bytes(self) -> Vec<u8> {
        let Self {
            cla,
            ins,
            p1,
            p2,
            le,
            payload,
        } = self;

        let mut buffer: Vec<u8> = vec![cla, ins, p1, p2];
        if let Some(mut p) = payload {
            buffer.push(p.len() as u8);
            buffer.append(&mut p);
        }

        if let Some(l) = le {
            buffer.push(l);
        }

        buffer
    }
}

impl From<Command> for Vec<u8> {
    fn from(command: Command) -> Self {
        command.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::Command;

    #[test]
    fn header_only_command_is_four_octets() {
        assert_eq!(
            Command::new(0x00, 0xF8, 0x00, 0x00).into_bytes(),
            vec![0x00, 0xF8, 0x00, 0x00],
        );
    }

    #[test]
    fn le_is_appended_after_the_header() {
        assert_eq!(
            Command::new_with_le(0x00, 0xB0, 0x00, 0x00, 0x10).into_bytes(),
            vec![0x00, 0xB0, 0x00, 0x00, 0x10],
        );
    }

    #[test]
    fn select_application_prefixes_the_aid_with_its_length() {
        let aid = vec![0xA0, 0x00, 0x00, 0x03, 0x08, 0x00, 0x00, 0x10, 0x00];

        assert_eq!(
            Command::select_application(aid).into_bytes(),
            vec![
                0x00, 0xA4, 0x04, 0x00, 0x09, 0xA0, 0x00, 0x00, 0x03, 0x08, 0x00, 0x00, 0x10,
                0x00,
            ],
        );
    }

    #[test]
    fn verify_encodes_the_padded_pin() {
        let pin = vec![0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0xFF, 0xFF];

        assert_eq!(
            Command::verify(0x80, pin).into_bytes(),
            vec![0x00, 0x20, 0x00, 0x80, 0x08, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0xFF, 0xFF],
        );
    }
}
