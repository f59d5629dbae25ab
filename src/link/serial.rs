//! Serial transport for the BDI link.
//!
//! The probe boots at an unknown baudrate, so opening the link runs a search
//! over all supported rates before switching the probe to the requested one.

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use log::debug;
use serialport::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortSettings, StopBits,
};

use super::frame::{self, Destuffer, FRAME_LNK_TYPE, LNK_RESET, LNK_SET_BAUDRATE};
use crate::Error;

/// Baudrates supported by the probe, slowest first.
const RATE_TABLE: [u32; 5] = [9600, 19_200, 38_400, 57_600, 115_200];

/// Wait for the probe to settle after a baudrate change.
const BAUD_SETTLE: Duration = Duration::from_millis(300);

/// Answer timeout while probing for the link, in milliseconds.
const RESET_TIMEOUT: u64 = 200;

/// Two bytes that push the probe out of any stale SLIP framing state before
/// a reset frame is sent.
const SLIP_NUDGE: [u8; 2] = [0xC0, 0xC0];

pub struct SerialLink {
    port: Box<dyn SerialPort>,
    baudrate: u32,
    timeout: Duration,
}

impl SerialLink {
    /// Opens the serial device with 8N1, no flow control and the lowest
    /// supported baudrate.
    pub fn open(path: &str) -> Result<SerialLink, Error> {
        let settings = SerialPortSettings {
            baud_rate: RATE_TABLE[0],
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: Duration::from_millis(100),
        };

        debug!("opening serial device {}", path);
        let port = serialport::open_with_settings(path, &settings).map_err(|err| Error::Open {
            port: path.to_string(),
            reason: err.to_string(),
        })?;

        Ok(SerialLink {
            port,
            baudrate: RATE_TABLE[0],
            timeout: Duration::from_millis(100),
        })
    }

    pub fn baudrate(&self) -> u32 {
        self.baudrate
    }

    fn set_baudrate(&mut self, baudrate: u32) -> Result<(), Error> {
        self.port.set_baud_rate(baudrate)?;
        self.baudrate = baudrate;
        Ok(())
    }

    fn read_byte(&mut self, timeout_ms: u64) -> Result<u8, Error> {
        let timeout = Duration::from_millis(timeout_ms.max(1));
        if self.timeout != timeout {
            self.port.set_timeout(timeout)?;
            self.timeout = timeout;
        }

        let mut byte = [0u8; 1];
        match self.port.read_exact(&mut byte) {
            Ok(()) => Ok(byte[0]),
            Err(ref err) if err.kind() == io::ErrorKind::TimedOut => Err(Error::RxTimeout),
            // A transient read failure is indistinguishable from silence on
            // the wire; report it as a timeout.
            Err(err) => {
                debug!("serial read failed: {}", err);
                Err(Error::RxTimeout)
            }
        }
    }

    fn write_block(&mut self, mut data: &[u8]) -> Result<(), Error> {
        while !data.is_empty() {
            match self.port.write(data) {
                Ok(0) => {
                    return Err(Error::Transmit(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "serial port accepted no data",
                    )))
                }
                Ok(written) => data = &data[written..],
                Err(ref err)
                    if err.kind() == io::ErrorKind::WouldBlock
                        || err.kind() == io::ErrorKind::Interrupted =>
                {
                    continue
                }
                Err(err) => return Err(Error::Transmit(err)),
            }
        }
        Ok(())
    }

    /// Sends one frame wrapped in the serial envelope.
    pub fn send_frame(&mut self, body: &[u8]) -> Result<(), Error> {
        self.write_block(&frame::stuff(body))
    }

    /// Receives one frame, applying `timeout_ms` to every byte.
    pub fn wait_frame(&mut self, timeout_ms: u64) -> Result<Vec<u8>, Error> {
        let mut destuffer = Destuffer::new();
        loop {
            let byte = self.read_byte(timeout_ms)?;
            if let Some(body) = destuffer.push(byte)? {
                return Ok(body);
            }
        }
    }

    /// Searches for the probe's current baudrate, resets the link and moves
    /// the probe to the requested rate.
    pub fn reset_link(&mut self, baudrate: u32) -> Result<(), Error> {
        // 115200 support is host dependent; fall back to 57600 as top rate.
        let mut top = RATE_TABLE.len() - 1;
        if self.set_baudrate(RATE_TABLE[top]).is_err() {
            top -= 1;
        }
        let baudrate = baudrate.min(RATE_TABLE[top]);

        // First shot: the probe may already listen at the requested rate.
        let mut found = self.set_baudrate(baudrate).is_ok() && self.try_reset();

        if !found {
            for &rate in &RATE_TABLE[..=top] {
                debug!("probing for BDI at {} baud", rate);
                self.set_baudrate(rate)?;
                let _ = self.write_block(&SLIP_NUDGE);
                thread::sleep(BAUD_SETTLE);
                if self.try_reset() {
                    found = true;
                    break;
                }
            }
        }
        if !found {
            return Err(Error::NoResponse);
        }

        // Ask the probe to switch, then follow it to the confirmed rate.
        let mut request = vec![FRAME_LNK_TYPE, 5, LNK_SET_BAUDRATE];
        request.extend_from_slice(&baudrate.to_be_bytes());
        self.send_frame(&request)?;
        let answer = match self.wait_frame(RESET_TIMEOUT) {
            Ok(answer) if answer.len() == request.len() => answer,
            _ => return Err(Error::BaudNegotiation),
        };
        thread::sleep(BAUD_SETTLE);

        let confirmed = BigEndian::read_u32(&answer[3..7]);
        debug!("BDI confirmed {} baud", confirmed);
        self.set_baudrate(confirmed)?;

        if self.try_reset() {
            Ok(())
        } else {
            Err(Error::NoResponse)
        }
    }

    /// Sends a link reset and reports whether the probe echoed it.
    fn try_reset(&mut self) -> bool {
        let reset = [FRAME_LNK_TYPE, 1, LNK_RESET];
        let _ = self.port.clear(ClearBuffer::Input);
        if self.send_frame(&reset).is_err() {
            return false;
        }
        match self.wait_frame(RESET_TIMEOUT) {
            Ok(echo) => echo.len() == reset.len(),
            Err(_) => false,
        }
    }
}
