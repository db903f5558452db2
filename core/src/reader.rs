//! The reader-session contract and its session state.
//!
//! A concrete driver (PC/SC behind the `pcsc` feature, or any external
//! reader SDK wrapped by the caller) implements [`Driver`] and [`Transceive`].
//! Card presence and session failures arrive asynchronously from the driver's
//! notification thread; they are delivered through a channel and folded into
//! the [`Session`] flags on the thread that owns it, never from the callback
//! thread itself.

use std::cell::{Cell, RefCell};
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::status::{SessionStatus, Status};
use crate::transcript::to_hex;

/// A delegate performing one synchronous command/response exchange.
///
/// Calls are blocking and must not overlap on the same session; the caller
/// serializes them. A failed exchange is reported through the returned
/// [`Status`], with the octets left empty.
pub trait Transceive {
    fn transceive(&self, command: &[u8], max_response_len: usize) -> (Vec<u8>, Status);
}

impl<T: Transceive + ?Sized> Transceive for &T {
    fn transceive(&self, command: &[u8], max_response_len: usize) -> (Vec<u8>, Status) {
        (**self).transceive(command, max_response_len)
    }
}

impl<T: Transceive + ?Sized> Transceive for Rc<T> {
    fn transceive(&self, command: &[u8], max_response_len: usize) -> (Vec<u8>, Status) {
        (**self).transceive(command, max_response_len)
    }
}

/// What the driver knows about a detected card.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CardInfo {
    pub uid: Vec<u8>,
    pub card_type: u8,
    pub manufacturer: String,
}

/// Notifications pushed by the driver while a session is open.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ReaderEvent {
    CardDetected(CardInfo),
    CardRemoved,
    SessionError {
        status: SessionStatus,
        message: String,
    },
}

impl Display for ReaderEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CardDetected(info) if info.uid.is_empty() => write!(f, "card detected"),
            Self::CardDetected(info) => write!(f, "card detected (uid {})", to_hex(&info.uid)),
            Self::CardRemoved => write!(f, "card removed"),
            Self::SessionError { status, message } => {
                write!(f, "session error ({status}): {message}")
            }
        }
    }
}

/// Sending half of the event channel, handed to the driver at open time.
pub type EventSender = Sender<ReaderEvent>;

/// Options passed through to the driver when opening a session.
/// Their meaning is driver-defined.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionOptions {
    pub flags: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no reader matching serial number {0:?} was found")]
    ReaderNotFound(String),

    #[error("failed to open the reader session ({status}): {message}")]
    OpenFailed {
        status: SessionStatus,
        message: String,
    },

    #[error("the reader session was lost ({status}): {message}")]
    Lost {
        status: SessionStatus,
        message: String,
    },

    #[error("no card was detected within {0:?}")]
    NoCard(Duration),
}

/// A reader driver able to open sessions.
pub trait Driver {
    type Channel: Transceive;

    /// Opens a session to the reader identified by the serial number.
    /// Presence and error notifications must be sent through `events`.
    fn open(
        &self,
        serial_number: &str,
        options: SessionOptions,
        events: EventSender,
    ) -> Result<Self::Channel, SessionError>;
}

/// An open reader session.
///
/// Connectivity and card presence are plain flags fed by driver events; they
/// change only when the owning thread drains the channel, so reading them
/// never races with the driver.
pub struct Session<D: Driver> {
    serial_number: String,
    channel: D::Channel,
    events: Receiver<ReaderEvent>,
    connected: Cell<bool>,
    card_present: Cell<bool>,
    last_error: RefCell<Option<(SessionStatus, String)>>,
}

impl<D: Driver> Session<D> {
    /// Opens a session through the driver.
    pub fn open(
        driver: &D,
        serial_number: impl Into<String>,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let serial_number = serial_number.into();
        let (sender, receiver) = channel();
        let channel = driver.open(&serial_number, options, sender)?;

        Ok(Self {
            serial_number,
            channel,
            events: receiver,
            connected: Cell::new(true),
            card_present: Cell::new(false),
            last_error: RefCell::new(None),
        })
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn is_card_present(&self) -> bool {
        self.card_present.get()
    }

    /// Applies all pending driver events to the session flags and returns
    /// them for presentation.
    pub fn drain_events(&self) -> Vec<ReaderEvent> {
        let events: Vec<ReaderEvent> = self.events.try_iter().collect();
        for event in &events {
            self.apply(event);
        }

        events
    }

    /// Waits up to `timeout` for the next driver event, applying it to the
    /// session flags.
    pub fn next_event(&self, timeout: Duration) -> Option<ReaderEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => {
                self.apply(&event);
                Some(event)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.connected.set(false);
                self.card_present.set(false);
                None
            }
        }
    }

    /// Blocks until a card is present, the session is lost, or `timeout`
    /// elapses.
    pub fn wait_for_card(&self, timeout: Duration) -> Result<(), SessionError> {
        let deadline = Instant::now() + timeout;
        self.drain_events();

        loop {
            if self.card_present.get() {
                return Ok(());
            }

            if !self.connected.get() {
                return Err(self.lost());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::NoCard(timeout));
            }

            match self.events.recv_timeout(deadline - now) {
                Ok(event) => self.apply(&event),
                Err(RecvTimeoutError::Timeout) => return Err(SessionError::NoCard(timeout)),
                Err(RecvTimeoutError::Disconnected) => {
                    self.connected.set(false);
                    return Err(self.lost());
                }
            }
        }
    }

    /// Closes the session, releasing the driver channel.
    pub fn close(self) {}

    fn apply(&self, event: &ReaderEvent) {
        match event {
            ReaderEvent::CardDetected(_) => self.card_present.set(true),
            ReaderEvent::CardRemoved => self.card_present.set(false),
            ReaderEvent::SessionError { status, message } => {
                if status.is_terminal() {
                    self.connected.set(false);
                    self.card_present.set(false);
                    *self.last_error.borrow_mut() = Some((*status, message.clone()));
                }
            }
        }
    }

    fn lost(&self) -> SessionError {
        let (status, message) = self
            .last_error
            .borrow()
            .clone()
            .unwrap_or((SessionStatus::ConnectionLost, "event channel closed".into()));

        SessionError::Lost { status, message }
    }
}

impl<D: Driver> Transceive for Session<D> {
    /// Delegates to the driver channel, refusing to transmit when the session
    /// is gone or no card is in the field.
    fn transceive(&self, command: &[u8], max_response_len: usize) -> (Vec<u8>, Status) {
        self.drain_events();

        if !self.connected.get() {
            return (Vec::new(), Status::CommunicationError);
        }

        if !self.card_present.get() {
            return (Vec::new(), Status::NoCard);
        }

        self.channel.transceive(command, max_response_len)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{CardInfo, ReaderEvent, Session, SessionError, SessionOptions, Transceive};
    use crate::status::{SessionStatus, Status};
    use crate::testing::{ScriptedChannel, ScriptedDriver};

    fn open_session(driver: &ScriptedDriver) -> Session<ScriptedDriver> {
        Session::open(driver, "ON105733", SessionOptions::default()).unwrap()
    }

    #[test]
    fn events_drive_the_presence_flag() {
        let driver = ScriptedDriver::new(ScriptedChannel::new());
        let session = open_session(&driver);
        let events = driver.events();

        assert!(!session.is_card_present());

        events
            .send(ReaderEvent::CardDetected(CardInfo::default()))
            .unwrap();
        session.drain_events();
        assert!(session.is_card_present());

        events.send(ReaderEvent::CardRemoved).unwrap();
        session.drain_events();
        assert!(!session.is_card_present());
    }

    #[test]
    fn terminal_session_errors_clear_connectivity() {
        let driver = ScriptedDriver::new(ScriptedChannel::new());
        let session = open_session(&driver);

        driver
            .events()
            .send(ReaderEvent::SessionError {
                status: SessionStatus::ConnectionLost,
                message: "link dropped".into(),
            })
            .unwrap();
        session.drain_events();

        assert!(!session.is_connected());
        assert!(matches!(
            session.wait_for_card(Duration::from_millis(1)),
            Err(SessionError::Lost {
                status: SessionStatus::ConnectionLost,
                ..
            }),
        ));
    }

    #[test]
    fn non_terminal_session_errors_keep_the_session() {
        let driver = ScriptedDriver::new(ScriptedChannel::new());
        let session = open_session(&driver);

        driver
            .events()
            .send(ReaderEvent::SessionError {
                status: SessionStatus::Unknown(0x20),
                message: "weak signal".into(),
            })
            .unwrap();
        session.drain_events();

        assert!(session.is_connected());
    }

    #[test]
    fn transmitting_without_a_card_reports_no_card() {
        let channel = ScriptedChannel::new();
        let sent = channel.sent_log();
        let driver = ScriptedDriver::new(channel);
        let session = open_session(&driver);

        let (response, status) = session.transceive(&[0x00, 0xF8, 0x00, 0x00], 256);

        assert!(response.is_empty());
        assert_eq!(status, Status::NoCard);
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn transmitting_passes_through_once_a_card_is_present() {
        let channel = ScriptedChannel::new();
        channel.reply(vec![0x90, 0x00], Status::Ok);
        let sent = channel.sent_log();
        let driver = ScriptedDriver::new(channel);
        let session = open_session(&driver);

        driver
            .events()
            .send(ReaderEvent::CardDetected(CardInfo::default()))
            .unwrap();

        let (response, status) = session.transceive(&[0x00, 0xF8, 0x00, 0x00], 256);

        assert_eq!(response, vec![0x90, 0x00]);
        assert_eq!(status, Status::Ok);
        assert_eq!(sent.borrow().len(), 1);
    }

    #[test]
    fn wait_for_card_times_out() {
        let driver = ScriptedDriver::new(ScriptedChannel::new());
        let session = open_session(&driver);

        assert!(matches!(
            session.wait_for_card(Duration::from_millis(10)),
            Err(SessionError::NoCard(_)),
        ));
    }
}
