use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by the setup utility.
///
/// Every variant maps to a stable negative status code via [`Error::code`];
/// the binary uses that code as its process exit status so scripts driving
/// the tool can distinguish failure causes.
#[derive(Error, Debug)]
pub enum Error {
    #[error("could not open {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("serial port setup failed: {0}")]
    SerialSetup(#[from] serialport::Error),

    /// The BDI answered the link reset but rejected the baudrate change.
    #[error("baudrate negotiation failed")]
    BaudNegotiation,

    #[error("serial transmit failed: {0}")]
    Transmit(io::Error),

    #[error("timeout waiting for a frame")]
    RxTimeout,

    #[error("malformed serial frame")]
    RxFormat,

    #[error("frame block check mismatch")]
    RxBcc,

    #[error("received frame exceeds the frame buffer")]
    RxOverflow,

    #[error("socket error: {0}")]
    Socket(io::Error),

    #[error("timeout waiting for a datagram")]
    SocketTimeout,

    /// All send attempts of a command were exhausted without a valid answer.
    ///
    /// When this happens on a standard frame the channel latches the error
    /// and refuses further transactions until it is reopened.
    #[error("no response from the BDI")]
    NoResponse,

    #[error("unexpected response from the BDI loader")]
    InvalidResponse,

    #[error("cannot access {}: {source}", path.display())]
    FileAccess { path: PathBuf, source: io::Error },

    #[error("invalid firmware file")]
    FirmwareFile,

    #[error("invalid JEDEC file")]
    LogicFile,

    #[error("flash erase failed")]
    FlashErase,

    #[error("flash program failed at {0:#010x}")]
    FlashProgram(u32),

    #[error("flash verify failed")]
    FlashVerify,

    #[error("CPLD verify failed")]
    LogicVerify,

    #[error("unexpected CPLD device id {0:#04x}")]
    LogicDevice(u8),

    #[error("unknown BDI type")]
    UnknownBdi,

    #[error("invalid parameter")]
    InvalidParameter,

    #[error("answer exceeds the caller's buffer")]
    AnswerTooBig,

    #[error("flash content verify failed")]
    Verify,
}

impl Error {
    /// The stable status code for this error kind.
    pub fn code(&self) -> i32 {
        match self {
            Error::SerialSetup(_) | Error::BaudNegotiation => -1,
            Error::Transmit(_) => -2,
            Error::RxTimeout => -3,
            Error::RxFormat => -4,
            Error::RxBcc => -5,
            Error::RxOverflow => -6,
            Error::Socket(_) => -7,
            Error::SocketTimeout => -8,
            Error::Open { .. } => -9,
            Error::NoResponse => -10,
            Error::InvalidResponse => -11,
            Error::FileAccess { .. } => -12,
            Error::FirmwareFile => -13,
            Error::LogicFile => -14,
            Error::FlashErase => -15,
            Error::FlashProgram(_) => -16,
            Error::FlashVerify => -17,
            Error::LogicVerify => -18,
            Error::LogicDevice(_) => -19,
            Error::UnknownBdi => -20,
            Error::InvalidParameter => -21,
            Error::AnswerTooBig => -22,
            Error::Verify => -24,
        }
    }
}
