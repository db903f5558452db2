use std::rc::Rc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ufr_apdu::ap::{Pin, PivAp, ProtocolError};
use ufr_apdu::apdu::Response;
use ufr_apdu::pcsc::PcscDriver;
use ufr_apdu::reader::{Session, SessionError, SessionOptions};
use ufr_apdu::status::Status;
use ufr_apdu::transcript::from_hex;
use ufr_apdu::Card;

const CARD_WAIT: Duration = Duration::from_secs(10);
const EVENT_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("the card sequence failed: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("the reader rejected the command ({0})")]
    Command(Status),

    #[error("invalid APDU hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Parser)]
#[command(
    name = "ufr-apdu",
    version,
    about = "Exchange APDU command sequences with a smart card through a reader session"
)]
struct Cli {
    /// Serial number of the reader to open (e.g. ON105733)
    #[arg(short, long)]
    reader: String,

    /// Print derived values as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Read the card serial number as a decimal value
    SerialNumber,

    /// Read the firmware version, verifying the PIN first
    FirmwareVersion {
        /// PIN digits; prompted for interactively when omitted
        #[arg(short, long)]
        pin: Option<String>,
    },

    /// Transmit a raw APDU command and print the response
    Send {
        /// Command octets as hex; separators are ignored (e.g. "00 A4 04 00")
        apdu: String,
    },

    /// Watch card presence and session events until interrupted
    Watch,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let driver = PcscDriver::default();
    let session = Rc::new(Session::open(
        &driver,
        cli.reader.as_str(),
        SessionOptions::default(),
    )?);

    info!("session opened to reader {}", session.serial_number());

    match cli.command {
        Cmd::SerialNumber => {
            session.wait_for_card(CARD_WAIT)?;

            let card = Rc::new(Card::new(Rc::clone(&session)));
            let result = PivAp::open(Rc::clone(&card)).and_then(|ap| ap.serial_number());

            print!("{}", card.take_transcript());
            let serial = result?;

            match cli.json {
                true => println!("{}", serde_json::json!({ "serial_number": serial })),
                _ => println!("Serial #: {serial}"),
            }
        }

        Cmd::FirmwareVersion { pin } => {
            let pin = Pin::digits(&match pin {
                Some(pin) => pin,
                None => dialoguer::Password::new().with_prompt("PIN").interact()?,
            })?;

            session.wait_for_card(CARD_WAIT)?;

            let card = Rc::new(Card::new(Rc::clone(&session)));
            let result = PivAp::open(Rc::clone(&card)).and_then(|ap| ap.firmware_version(&pin));

            print!("{}", card.take_transcript());
            let version = result?;

            match cli.json {
                true => println!("{}", serde_json::json!({ "firmware_version": version })),
                _ => println!("Firmware version: {version}"),
            }
        }

        Cmd::Send { apdu } => {
            let command = from_hex(&apdu)?;

            session.wait_for_card(CARD_WAIT)?;

            let card = Card::new(Rc::clone(&session));
            let result = card.transmit_raw(command);

            print!("{}", card.take_transcript());
            let response = result.map_err(Error::Command)?;

            if let Some(response) = Response::from_bytes(response) {
                let (sw1, sw2) = response.trailer();
                let verdict = match response.is_ok() {
                    true => " (success)",
                    _ => "",
                };

                println!("Status word: {sw1:02X} {sw2:02X}{verdict}");
            }
        }

        Cmd::Watch => {
            println!("Watching reader events; interrupt to stop.");

            while session.is_connected() {
                if let Some(event) = session.next_event(EVENT_POLL) {
                    println!("{event}");
                }
            }
        }
    }

    Ok(())
}
