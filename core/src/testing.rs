//! Scripted doubles for the driver contract, shared by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::reader::{Driver, EventSender, SessionError, SessionOptions, Transceive};
use crate::status::Status;

/// A transceiver that replays canned `(response, status)` pairs and captures
/// every command sent, so tests can assert on call order and counts.
pub(crate) struct ScriptedChannel {
    replies: RefCell<VecDeque<(Vec<u8>, Status)>>,
    sent: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self {
            replies: RefCell::new(VecDeque::new()),
            sent: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Queues the reply for the next unanswered command.
    pub fn reply(&self, response: Vec<u8>, status: Status) {
        self.replies.borrow_mut().push_back((response, status));
    }

    /// A handle onto the captured commands, valid after the channel moves.
    pub fn sent_log(&self) -> Rc<RefCell<Vec<Vec<u8>>>> {
        Rc::clone(&self.sent)
    }
}

impl Transceive for ScriptedChannel {
    fn transceive(&self, command: &[u8], _max_response_len: usize) -> (Vec<u8>, Status) {
        self.sent.borrow_mut().push(command.to_vec());

        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or((Vec::new(), Status::CommandNotSupported))
    }
}

/// A driver that hands out one prepared channel and exposes the event sender
/// given to it, letting tests inject reader events.
pub(crate) struct ScriptedDriver {
    channel: RefCell<Option<ScriptedChannel>>,
    events: RefCell<Option<EventSender>>,
}

impl ScriptedDriver {
    pub fn new(channel: ScriptedChannel) -> Self {
        Self {
            channel: RefCell::new(Some(channel)),
            events: RefCell::new(None),
        }
    }

    /// The sender captured at open time.
    pub fn events(&self) -> EventSender {
        self.events
            .borrow()
            .clone()
            .expect("session was not opened")
    }
}

impl Driver for ScriptedDriver {
    type Channel = ScriptedChannel;

    fn open(
        &self,
        _serial_number: &str,
        _options: SessionOptions,
        events: EventSender,
    ) -> Result<Self::Channel, SessionError> {
        *self.events.borrow_mut() = Some(events);

        Ok(self
            .channel
            .borrow_mut()
            .take()
            .expect("the scripted channel was already taken"))
    }
}
