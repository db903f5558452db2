/// A response that was received from the card.
///
/// Raw transceive responses carry a two-byte status word at the end;
/// [`Response::from_bytes`] splits it off so parsing never has to see it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    payload: Vec<u8>,
    trailer: (u8, u8),
}

impl Response {
    /// Parses a response from the octets.
    /// Returns `None` when there are not enough octets to hold a status word.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Option<Self> {
        if bytes.len() < 2 {
            return None;
        }

        let sw2 = bytes.pop()?;
        let sw1 = bytes.pop()?;

        Some(Self {
            payload: bytes,
            trailer: (sw1, sw2),
        })
    }

    /// The octets preceding the status word.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The status word as `(SW1, SW2)`.
    pub fn trailer(&self) -> (u8, u8) {
        self.trailer
    }

    /// Determines whether the status word indicates success or not.
    pub fn is_ok(&self) -> bool {
        matches!(self.trailer, (0x90, 0x00) | (0x91, 0x00))
    }
}

#[cfg(test)]
mod tests {
    use super::Response;

    #[test]
    fn trailing_two_octets_become_the_status_word() {
        let response = Response::from_bytes(vec![0x12, 0x34, 0x90, 0x00]).unwrap();

        assert_eq!(response.payload(), &[0x12, 0x34]);
        assert_eq!(response.trailer(), (0x90, 0x00));
        assert!(response.is_ok());
    }

    #[test]
    fn a_bare_status_word_has_an_empty_payload() {
        let response = Response::from_bytes(vec![0x63, 0xC0]).unwrap();

        assert!(response.payload().is_empty());
        assert!(!response.is_ok());
    }

    #[test]
    fn short_responses_are_rejected() {
        assert_eq!(Response::from_bytes(vec![0x90]), None);
        assert_eq!(Response::from_bytes(Vec::new()), None);
    }
}
