use std::cell::RefCell;

use crate::apdu::{Command, MAX_RESPONSE_LEN};
use crate::reader::Transceive;
use crate::status::Status;
use crate::transcript::Transcript;

/// An adapter to communicate with the card through the delegate.
///
/// Every exchange is recorded into a [`Transcript`] so callers can show the
/// raw traffic alongside whatever value a sequence derives.
pub struct Card<T: Transceive> {
    delegate: T,
    max_response_len: usize,
    transcript: RefCell<Transcript>,
}

impl<T: Transceive> Card<T> {
    /// Initiates an adapter with the delegate.
    pub fn new(delegate: T) -> Self {
        Self {
            delegate,
            max_response_len: MAX_RESPONSE_LEN,
            transcript: RefCell::new(Transcript::new()),
        }
    }

    /// Transmits a command to the card, returning the raw response octets
    /// when the driver reports success.
    pub fn transmit(&self, command: Command) -> Result<Vec<u8>, Status> {
        self.transmit_raw(command.into_bytes())
    }

    /// Transmits pre-encoded command octets to the card.
    pub fn transmit_raw(&self, command: Vec<u8>) -> Result<Vec<u8>, Status> {
        let (response, status) = self.delegate.transceive(&command, self.max_response_len);
        self.transcript
            .borrow_mut()
            .record(&command, &response, status);

        match status.is_ok() {
            true => Ok(response),
            _ => Err(status),
        }
    }

    /// Takes the accumulated transcript, leaving an empty one behind.
    pub fn take_transcript(&self) -> Transcript {
        self.transcript.take()
    }
}

#[cfg(test)]
mod tests {
    use super::Card;
    use crate::apdu::Command;
    use crate::status::Status;
    use crate::testing::ScriptedChannel;

    #[test]
    fn successful_exchanges_return_the_octets() {
        let channel = ScriptedChannel::new();
        channel.reply(vec![0x12, 0x34, 0x90, 0x00], Status::Ok);
        let card = Card::new(channel);

        let response = card.transmit(Command::new(0x00, 0xF8, 0x00, 0x00)).unwrap();

        assert_eq!(response, vec![0x12, 0x34, 0x90, 0x00]);
    }

    #[test]
    fn failed_exchanges_surface_the_driver_status() {
        let channel = ScriptedChannel::new();
        channel.reply(Vec::new(), Status::NoCard);
        let card = Card::new(channel);

        assert_eq!(
            card.transmit(Command::new(0x00, 0xF8, 0x00, 0x00)),
            Err(Status::NoCard),
        );
    }

    #[test]
    fn every_exchange_lands_in_the_transcript() {
        let channel = ScriptedChannel::new();
        channel.reply(vec![0x90, 0x00], Status::Ok);
        channel.reply(Vec::new(), Status::CommandNotSupported);
        let card = Card::new(channel);

        let _ = card.transmit(Command::new(0x00, 0xA4, 0x04, 0x00));
        let _ = card.transmit(Command::new(0x00, 0xFD, 0x00, 0x00));

        let transcript = card.take_transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.entries()[1].status, Status::CommandNotSupported);
        assert!(card.take_transcript().is_empty());
    }
}
