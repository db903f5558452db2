//! PC/SC driver for the reader-session contract.
//! Can be enabled by turning the `pcsc` feature on.
//!
//! PC/SC (Personal Computer/Smart Card) is the abstraction layer desktop
//! platforms provide for talking to card readers without depending on a
//! vendor driver. Windows and macOS ship it; Linux supports it through the
//! pcsc-lite library. The backend here is pcsc-rust:
//! <https://github.com/bluetech/pcsc-rust>
//!
//! The serial number passed to [`crate::reader::Session::open`] is matched
//! against the PC/SC reader name, since PC/SC identifies readers by name
//! only. Card presence is watched on a dedicated thread and reported through
//! the session's event channel.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pcsc::{Protocols, ReaderState, Scope, ShareMode, State};

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

use crate::reader::{CardInfo, Driver, EventSender, ReaderEvent, SessionError, SessionOptions, Transceive};
use crate::status::{SessionStatus, Status};

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($t: tt)*) => {
        let _ = format_args!($($t)*);
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! info {
    ($($t: tt)*) => {
        let _ = format_args!($($t)*);
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn {
    ($($t: tt)*) => {
        let _ = format_args!($($t)*);
    };
}

const PRESENCE_POLL: Duration = Duration::from_millis(500);

/// PC/SC implementation of the reader [`Driver`].
#[derive(Debug, Default)]
pub struct PcscDriver;

impl Driver for PcscDriver {
    type Channel = PcscChannel;

    fn open(
        &self,
        serial_number: &str,
        _options: SessionOptions,
        events: EventSender,
    ) -> Result<Self::Channel, SessionError> {
        let ctx = pcsc::Context::establish(Scope::User).map_err(open_failed)?;
        let reader = find_reader(&ctx, serial_number)?;

        info!("using reader {}", reader.to_string_lossy());

        let stop = Arc::new(AtomicBool::new(false));
        let monitor_ctx = ctx.clone();
        let monitor_reader = reader.clone();
        let monitor_stop = Arc::clone(&stop);

        thread::spawn(move || watch_presence(monitor_ctx, monitor_reader, events, monitor_stop));

        Ok(PcscChannel {
            ctx,
            reader,
            card: RefCell::new(None),
            stop,
        })
    }
}

/// An open channel to a card in a PC/SC reader.
///
/// The card connection is established lazily on the first transceive, since
/// the session opens before a card is necessarily in the field.
pub struct PcscChannel {
    ctx: pcsc::Context,
    reader: CString,
    card: RefCell<Option<pcsc::Card>>,
    stop: Arc<AtomicBool>,
}

impl Transceive for PcscChannel {
    fn transceive(&self, command: &[u8], max_response_len: usize) -> (Vec<u8>, Status) {
        let mut slot = self.card.borrow_mut();

        if slot.is_none() {
            match self.ctx.connect(&self.reader, ShareMode::Shared, Protocols::ANY) {
                Ok(card) => *slot = Some(card),
                Err(pcsc::Error::NoSmartcard) => return (Vec::new(), Status::NoCard),
                Err(err) => {
                    warn!("failed to connect to the card: {err}");
                    return (Vec::new(), Status::CommunicationError);
                }
            }
        }

        let Some(card) = slot.as_ref() else {
            return (Vec::new(), Status::CommunicationError);
        };

        debug!("TX: {}", hex::encode(command));

        let mut buffer = vec![0u8; max_response_len];
        let outcome = card
            .transmit(command, &mut buffer)
            .map(|received| received.to_vec());

        match outcome {
            Ok(received) => {
                debug!("RX: {}", hex::encode(&received));

                (received, Status::Ok)
            }
            Err(pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard) => {
                *slot = None;
                (Vec::new(), Status::NoCard)
            }
            Err(err) => {
                warn!("transmit failed: {err}");
                *slot = None;
                (Vec::new(), Status::CommunicationError)
            }
        }
    }
}

impl Drop for PcscChannel {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn open_failed(err: pcsc::Error) -> SessionError {
    SessionError::OpenFailed {
        status: SessionStatus::OpenFailed,
        message: err.to_string(),
    }
}

fn find_reader(ctx: &pcsc::Context, serial_number: &str) -> Result<CString, SessionError> {
    let mut buf = [0u8; 2048];

    ctx.list_readers(&mut buf)
        .map_err(open_failed)?
        .find(|name| name.to_string_lossy().contains(serial_number))
        .map(CStr::to_owned)
        .ok_or_else(|| SessionError::ReaderNotFound(serial_number.to_string()))
}

/// Watches the reader for card insertions and removals, pushing events into
/// the session channel until the session closes or the reader goes away.
fn watch_presence(
    ctx: pcsc::Context,
    reader: CString,
    events: EventSender,
    stop: Arc<AtomicBool>,
) {
    let mut states = [ReaderState::new(reader, State::UNAWARE)];
    let mut present = false;

    while !stop.load(Ordering::Relaxed) {
        match ctx.get_status_change(PRESENCE_POLL, &mut states) {
            Ok(()) => {}
            Err(pcsc::Error::Timeout) => continue,
            Err(err) => {
                let _ = events.send(ReaderEvent::SessionError {
                    status: SessionStatus::ConnectionLost,
                    message: err.to_string(),
                });
                return;
            }
        }

        let state = states[0].event_state();
        if state.intersects(State::UNKNOWN | State::IGNORE) {
            let _ = events.send(ReaderEvent::SessionError {
                status: SessionStatus::ConnectionLost,
                message: "the reader disappeared".into(),
            });
            return;
        }

        let now_present = state.contains(State::PRESENT);
        if now_present != present {
            present = now_present;

            let event = match present {
                // PC/SC exposes no card UID; the ATR stands in for it.
                true => ReaderEvent::CardDetected(CardInfo {
                    uid: states[0].atr().to_vec(),
                    ..Default::default()
                }),
                _ => ReaderEvent::CardRemoved,
            };

            if events.send(event).is_err() {
                return;
            }
        }

        for reader_state in &mut states {
            reader_state.sync_current_state();
        }
    }
}
