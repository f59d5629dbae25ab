//! Data link to the BDI: transports, framing and the command/answer
//! transaction engine.
//!
//! A [`Channel`] is opened over either a serial device or a UDP socket and
//! presents a single `transaction` primitive to the loader command layer.
//! Exactly one command is outstanding at a time; the 2-bit frame sequence
//! counter and the latched error state rely on that.

pub mod frame;
mod net;
mod serial;

use log::debug;

use crate::Error;
use frame::{
    control_byte, declared_len, FRAME_ATT_TYPE, FRAME_COUNT_FIELD, FRAME_STD_TYPE, MAX_FRAME_SIZE,
};
use net::NetLink;
use serial::SerialLink;

/// Base answer timeout on the datagram transport, in milliseconds.
const NET_TRANSFER_TIMEOUT: u64 = 100;

/// How often a command frame is sent before giving up.
const MAX_SEND_ATTEMPTS: u32 = 5;

enum Link {
    Serial(SerialLink),
    Net(NetLink),
}

/// An open connection to the BDI loader.
pub struct Channel {
    link: Link,
    frame_count: u8,
    frame_type: u8,
    repeat_count: u32,
    sticky_error: bool,
}

impl Channel {
    /// Opens the channel and resets the link.
    ///
    /// A port starting with `/dev` selects the serial transport; anything
    /// else is treated as a host name or IP address of a networked probe.
    pub fn open(port: &str, baudrate: u32) -> Result<Channel, Error> {
        let link = if port.starts_with("/dev") {
            let mut serial = SerialLink::open(port)?;
            serial.reset_link(baudrate)?;
            Link::Serial(serial)
        } else {
            let net = NetLink::open(port)?;
            net.reset_link()?;
            Link::Net(net)
        };

        Ok(Channel {
            link,
            frame_count: 0,
            frame_type: FRAME_STD_TYPE,
            repeat_count: 0,
            sticky_error: false,
        })
    }

    /// Executes one command/answer transaction.
    ///
    /// `command_time` is the time in milliseconds the command itself needs on
    /// the probe (transfer time is added on top). The answer payload is
    /// returned; it is an error if it exceeds `answer_size`.
    ///
    /// Lost frames are retried silently. If all attempts are exhausted on a
    /// standard frame the channel latches the failure and every following
    /// transaction fails immediately until the channel is reopened.
    pub fn transaction(
        &mut self,
        command: &[u8],
        answer_size: usize,
        mut command_time: u64,
    ) -> Result<Vec<u8>, Error> {
        if self.sticky_error {
            return Err(Error::NoResponse);
        }
        if command.len() > MAX_FRAME_SIZE - 2 {
            return Err(Error::InvalidParameter);
        }

        let control = control_byte(self.frame_count, self.frame_type, command.len());
        self.frame_count = (self.frame_count + 1) & 3;

        let mut tx = Vec::with_capacity(command.len() + 2);
        tx.push(control);
        tx.push(command.len() as u8);
        tx.extend_from_slice(command);

        let mut send_frame = true;
        let mut send_count = 0;
        loop {
            let mut sent = true;
            if send_frame {
                send_count += 1;
                if let Err(err) = self.send(&tx) {
                    debug!("send attempt {} failed: {}", send_count, err);
                    sent = false;
                }
            }

            if sent {
                let timeout = self.answer_timeout(tx.len(), command_time);
                match self.wait(timeout) {
                    // A 3-byte attention frame: the probe missed our command
                    // frame (or saw it twice); alternate between resending
                    // and listening until the answer arrives.
                    Ok(ref rx) if rx.len() == 3 && rx[0] == FRAME_ATT_TYPE && rx[1] == 1 => {
                        send_frame = !send_frame;
                    }
                    Ok(ref rx)
                        if rx.len() > 2
                            && (control & FRAME_COUNT_FIELD) == (rx[0] & FRAME_COUNT_FIELD) =>
                    {
                        let payload = &rx[2..];
                        if declared_len(rx[0], rx[1]) == payload.len() {
                            if payload.len() > answer_size {
                                return Err(Error::AnswerTooBig);
                            }
                            return Ok(payload.to_vec());
                        }
                        self.repeat_count += 1;
                        debug!("truncated answer frame, repeat {}", self.repeat_count);
                        send_frame = true;
                    }
                    // A frame from an earlier exchange; discard and listen on.
                    Ok(_) => {
                        send_frame = false;
                    }
                    Err(err) => {
                        self.repeat_count += 1;
                        command_time += 500;
                        debug!("no answer ({}), repeat {}", err, self.repeat_count);
                        send_frame = true;
                    }
                }
            } else {
                send_frame = true;
            }

            if send_count >= MAX_SEND_ATTEMPTS {
                break;
            }
        }

        if self.frame_type == FRAME_STD_TYPE {
            self.sticky_error = true;
        }
        Err(Error::NoResponse)
    }

    fn answer_timeout(&self, tx_len: usize, command_time: u64) -> u64 {
        match &self.link {
            // Character transfer time for command and answer plus command
            // execution time and a base margin.
            Link::Serial(serial) => {
                (tx_len as u64 + 1500) * 10_000 / u64::from(serial.baudrate()) + command_time + 200
            }
            Link::Net(_) => NET_TRANSFER_TIMEOUT + command_time,
        }
    }

    fn send(&mut self, body: &[u8]) -> Result<(), Error> {
        match &mut self.link {
            Link::Serial(serial) => serial.send_frame(body),
            Link::Net(net) => net.send_frame(body),
        }
    }

    fn wait(&mut self, timeout_ms: u64) -> Result<Vec<u8>, Error> {
        match &mut self.link {
            Link::Serial(serial) => serial.wait_frame(timeout_ms),
            Link::Net(net) => net.wait_frame(timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;

    use super::frame::{control_byte, FRAME_ATT_TYPE, FRAME_STD_TYPE};
    use super::*;

    /// A channel talking UDP to a socket owned by the test, standing in for
    /// the probe. Answers are staged by sending datagrams before the
    /// transaction runs; the socket buffers them.
    fn loopback_channel() -> (Channel, UdpSocket) {
        let probe = UdpSocket::bind("127.0.0.1:0").unwrap();
        let host = UdpSocket::bind("127.0.0.1:0").unwrap();
        probe.connect(host.local_addr().unwrap()).unwrap();
        host.connect(probe.local_addr().unwrap()).unwrap();

        let channel = Channel {
            link: Link::Net(NetLink::from_socket(host)),
            frame_count: 0,
            frame_type: FRAME_STD_TYPE,
            repeat_count: 0,
            sticky_error: false,
        };
        (channel, probe)
    }

    fn stage_answer(probe: &UdpSocket, count: u8, payload: &[u8]) {
        let mut datagram = vec![
            control_byte(count, FRAME_STD_TYPE, payload.len()),
            payload.len() as u8,
        ];
        datagram.extend_from_slice(payload);
        probe.send(&datagram).unwrap();
    }

    #[test]
    fn returns_the_answer_payload() {
        let (mut channel, probe) = loopback_channel();
        stage_answer(&probe, 0, &[0x03, 0x01, 0x02]);

        let answer = channel.transaction(&[0x03], 64, 0).unwrap();
        assert_eq!(answer, &[0x03, 0x01, 0x02]);
    }

    #[test]
    fn increments_the_sequence_counter_once_per_transaction() {
        let (mut channel, probe) = loopback_channel();

        // Answers for counts 0, 1 and 2; a stale count is never accepted.
        for count in 0..3 {
            stage_answer(&probe, count, &[count]);
            let answer = channel.transaction(&[0x03], 64, 0).unwrap();
            assert_eq!(answer, &[count]);
        }
        assert_eq!(channel.frame_count, 3);
    }

    #[test]
    fn attention_frames_do_not_consume_the_counter() {
        let (mut channel, probe) = loopback_channel();

        // The probe first signals a missed frame, then answers.
        probe.send(&[FRAME_ATT_TYPE, 1, 0]).unwrap();
        stage_answer(&probe, 0, &[0xAA]);

        let answer = channel.transaction(&[0x03], 64, 0).unwrap();
        assert_eq!(answer, &[0xAA]);
        assert_eq!(channel.frame_count, 1);
    }

    #[test]
    fn ignores_frames_with_a_stale_sequence_count() {
        let (mut channel, probe) = loopback_channel();

        stage_answer(&probe, 3, &[0x55]);
        stage_answer(&probe, 0, &[0x66]);

        let answer = channel.transaction(&[0x03], 64, 0).unwrap();
        assert_eq!(answer, &[0x66]);
    }

    #[test]
    fn rejects_answers_larger_than_the_caller_allows() {
        let (mut channel, probe) = loopback_channel();
        stage_answer(&probe, 0, &[0u8; 16]);

        let result = channel.transaction(&[0x03], 8, 0);
        assert!(matches!(result, Err(Error::AnswerTooBig)));
    }

    #[test]
    fn latches_the_error_after_exhausting_all_attempts() {
        let (mut channel, _probe) = loopback_channel();

        let result = channel.transaction(&[0x03], 64, 0);
        assert!(matches!(result, Err(Error::NoResponse)));
        assert!(channel.sticky_error);

        // All further transactions fail fast without touching the socket.
        let result = channel.transaction(&[0x03], 64, 0);
        assert!(matches!(result, Err(Error::NoResponse)));
    }
}
