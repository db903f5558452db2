//! APDU command and response data model

mod command;
mod response;

pub use command::Command;
pub use response::Response;

pub const CLA_DEFAULT: u8 = 0x00;

/// Capacity of the response buffer handed to the driver on each transceive.
pub const MAX_RESPONSE_LEN: usize = 256;

/// Instruction bytes shared by every card application.
pub mod ins {
    pub const SELECT_FILE: u8 = 0xA4;
    pub const VERIFY: u8 = 0x20;
}
