//! UDP transport for the BDI link.
//!
//! Frames travel verbatim in datagrams; the datagram boundary replaces the
//! serial envelope and the probe firmware checks integrity itself.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use log::debug;

use super::frame::{FRAME_LNK_TYPE, LNK_RESET, MAX_FRAME_SIZE};
use crate::Error;

/// The UDP port the BDI loader listens on.
const BDI_PORT: u16 = 2001;

/// Answer timeout for a link reset, in milliseconds.
const RESET_TIMEOUT: u64 = 500;

const RESET_ATTEMPTS: u32 = 6;

pub struct NetLink {
    socket: UdpSocket,
}

impl NetLink {
    /// Resolves `host` (dotted quad or hostname) and connects a datagram
    /// socket to the probe.
    pub fn open(host: &str) -> Result<NetLink, Error> {
        let address = (host, BDI_PORT)
            .to_socket_addrs()
            .map_err(|_| Error::InvalidParameter)?
            .find(SocketAddr::is_ipv4)
            .ok_or(Error::InvalidParameter)?;

        debug!("connecting datagram socket to {}", address);
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(Error::Socket)?;
        socket.connect(address).map_err(Error::Socket)?;

        Ok(NetLink { socket })
    }

    #[cfg(test)]
    pub(crate) fn from_socket(socket: UdpSocket) -> NetLink {
        NetLink { socket }
    }

    pub fn send_frame(&self, body: &[u8]) -> Result<(), Error> {
        let sent = self.socket.send(body).map_err(Error::Socket)?;
        if sent != body.len() {
            return Err(Error::Socket(io::Error::new(
                io::ErrorKind::WriteZero,
                "short datagram send",
            )));
        }
        Ok(())
    }

    pub fn wait_frame(&self, timeout_ms: u64) -> Result<Vec<u8>, Error> {
        let timeout = Duration::from_millis(timeout_ms.max(1));
        self.socket
            .set_read_timeout(Some(timeout))
            .map_err(Error::Socket)?;

        let mut body = vec![0u8; MAX_FRAME_SIZE];
        match self.socket.recv(&mut body) {
            Ok(received) => {
                body.truncate(received);
                Ok(body)
            }
            Err(ref err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::TimedOut =>
            {
                Err(Error::SocketTimeout)
            }
            Err(err) => Err(Error::Socket(err)),
        }
    }

    /// Resets the link, retrying a few times since datagrams may be lost.
    pub fn reset_link(&self) -> Result<(), Error> {
        let reset = [FRAME_LNK_TYPE, 1, LNK_RESET];
        for attempt in 0..RESET_ATTEMPTS {
            if self.send_frame(&reset).is_ok() {
                match self.wait_frame(RESET_TIMEOUT) {
                    Ok(echo) if echo.len() == reset.len() => return Ok(()),
                    Ok(_) | Err(_) => debug!("link reset attempt {} failed", attempt + 1),
                }
            }
        }
        Err(Error::NoResponse)
    }
}
