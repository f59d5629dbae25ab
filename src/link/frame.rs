//! On-wire frame format shared by both transports.
//!
//! A frame is `<control> <length-low> <payload...>`. The control byte packs a
//! 2-bit sequence counter, a 3-bit frame type and the upper 3 bits of the
//! 11-bit payload length. On the serial line the frame is additionally
//! wrapped in a `DLE STX ... DLE ETX <bcc>` envelope with DLE doubling; UDP
//! datagrams carry the frame verbatim.

use crate::Error;

pub const DLE: u8 = 16;
pub const STX: u8 = 2;
pub const ETX: u8 = 3;

/// Upper bound for a whole frame in either direction.
pub const MAX_FRAME_SIZE: usize = 2048;

pub const FRAME_COUNT_FIELD: u8 = 3 << 6;
pub const FRAME_LENGTH_MASK: u8 = 7;
pub const FRAME_LNK_TYPE: u8 = 0 << 3;
pub const FRAME_ATT_TYPE: u8 = 1 << 3;
pub const FRAME_STD_TYPE: u8 = 2 << 3;

/// Link management commands carried in LNK frames.
pub const LNK_RESET: u8 = 1;
pub const LNK_SET_BAUDRATE: u8 = 3;

/// Builds the control byte for a frame with the given 2-bit sequence count,
/// frame type and payload length.
pub fn control_byte(count: u8, frame_type: u8, payload_len: usize) -> u8 {
    (count << 6) | frame_type | ((payload_len >> 8) as u8 & FRAME_LENGTH_MASK)
}

/// The payload length declared by a frame header.
pub fn declared_len(control: u8, length_low: u8) -> usize {
    256 * (control & FRAME_LENGTH_MASK) as usize + length_low as usize
}

/// Wraps a raw frame in the serial envelope: `DLE STX` prefix, every DLE in
/// the body doubled, then `DLE ETX <bcc>` where the block check character is
/// the XOR over all body bytes (doubled as well if it equals DLE).
pub fn stuff(frame: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.len() + 6);
    out.push(DLE);
    out.push(STX);

    let mut bcc = 0u8;
    for &byte in frame {
        out.push(byte);
        bcc ^= byte;
        if byte == DLE {
            out.push(DLE);
        }
    }

    out.push(DLE);
    out.push(ETX);
    out.push(bcc);
    if bcc == DLE {
        out.push(DLE);
    }
    out
}

enum State {
    /// Scanning for the DLE of the start sequence.
    Idle,
    /// DLE seen, expecting STX.
    Start,
    Body,
    /// DLE seen inside the body.
    BodyEscape,
    Check,
    /// The check character itself was DLE and must be doubled.
    CheckEscape,
}

/// Incremental decoder for the serial envelope.
///
/// Bytes are pushed one at a time; once a complete frame has been collected
/// `push` returns its unstuffed body with the check character validated and
/// stripped.
pub struct Destuffer {
    state: State,
    bcc: u8,
    body: Vec<u8>,
}

impl Destuffer {
    pub fn new() -> Destuffer {
        Destuffer {
            state: State::Idle,
            bcc: 0,
            body: Vec::new(),
        }
    }

    pub fn push(&mut self, byte: u8) -> Result<Option<Vec<u8>>, Error> {
        match self.state {
            State::Idle => {
                if byte == DLE {
                    self.state = State::Start;
                }
            }
            State::Start => {
                if byte == STX {
                    self.body.clear();
                    self.bcc = 0;
                    self.state = State::Body;
                } else if byte != DLE {
                    self.state = State::Idle;
                }
            }
            State::Body => {
                if byte == DLE {
                    self.state = State::BodyEscape;
                } else {
                    self.collect(byte)?;
                }
            }
            State::BodyEscape => {
                if byte == DLE {
                    self.collect(DLE)?;
                    self.state = State::Body;
                } else if byte == ETX {
                    self.state = State::Check;
                } else {
                    self.state = State::Idle;
                    return Err(Error::RxFormat);
                }
            }
            State::Check => {
                if byte == DLE {
                    self.state = State::CheckEscape;
                } else {
                    self.state = State::Idle;
                    if byte != self.bcc {
                        return Err(Error::RxBcc);
                    }
                    return Ok(Some(std::mem::replace(&mut self.body, Vec::new())));
                }
            }
            State::CheckEscape => {
                self.state = State::Idle;
                if byte != DLE {
                    return Err(Error::RxFormat);
                }
                if self.bcc != DLE {
                    return Err(Error::RxBcc);
                }
                return Ok(Some(std::mem::replace(&mut self.body, Vec::new())));
            }
        }
        Ok(None)
    }

    fn collect(&mut self, byte: u8) -> Result<(), Error> {
        if self.body.len() >= MAX_FRAME_SIZE {
            self.state = State::Idle;
            return Err(Error::RxOverflow);
        }
        self.bcc ^= byte;
        self.body.push(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(encoded: &[u8]) -> Result<Vec<u8>, Error> {
        let mut destuffer = Destuffer::new();
        for &byte in encoded {
            if let Some(frame) = destuffer.push(byte)? {
                return Ok(frame);
            }
        }
        panic!("no complete frame in {:x?}", encoded);
    }

    #[test]
    fn roundtrips_arbitrary_bodies() {
        let bodies: &[&[u8]] = &[
            &[],
            &[0x00],
            &[0x42, 0x01, 0x03],
            &[DLE],
            &[DLE, DLE, DLE],
            &[STX, ETX, DLE, 0xFF, 0x00],
        ];
        for body in bodies {
            let encoded = stuff(body);
            assert_eq!(decode(&encoded).unwrap(), *body);
        }
    }

    #[test]
    fn roundtrips_every_single_byte_value() {
        for value in 0..=255u8 {
            let body = [value, value, value];
            assert_eq!(decode(&stuff(&body)).unwrap(), body);
        }
    }

    #[test]
    fn doubles_every_dle_in_the_envelope() {
        let encoded = stuff(&[1, DLE, 2]);
        // Skip the start sequence, stop before the end sequence.
        let inner = &encoded[2..encoded.len() - 3];
        let mut i = 0;
        while i < inner.len() {
            if inner[i] == DLE {
                assert_eq!(inner[i + 1], DLE, "raw DLE at {} in {:x?}", i, inner);
                i += 2;
            } else {
                i += 1;
            }
        }
    }

    #[test]
    fn doubles_a_dle_check_character() {
        // XOR of the body equals DLE, so the trailing check char is doubled.
        let body = [DLE, 0x05, 0x05];
        let encoded = stuff(&body);
        assert_eq!(&encoded[encoded.len() - 2..], &[DLE, DLE]);
        assert_eq!(decode(&encoded).unwrap(), body);
    }

    #[test]
    fn rejects_a_corrupted_check_character() {
        let mut encoded = stuff(&[0x10, 0x20, 0x30]);
        let last = encoded.len() - 1;
        encoded[last] ^= 0x01;
        assert!(matches!(decode(&encoded), Err(Error::RxBcc)));
    }

    #[test]
    fn rejects_an_unknown_escape() {
        // DLE followed by neither DLE nor ETX inside the body.
        let encoded = [DLE, STX, 0x01, DLE, 0x7F];
        let mut destuffer = Destuffer::new();
        let mut result = Ok(None);
        for &byte in &encoded {
            result = destuffer.push(byte);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(Error::RxFormat)));
    }

    #[test]
    fn control_byte_reconstructs_all_lengths() {
        for len in 0..=2047usize {
            let control = control_byte(2, FRAME_STD_TYPE, len);
            assert_eq!(declared_len(control, len as u8), len);
            assert_eq!(control & FRAME_COUNT_FIELD, 2 << 6);
        }
    }
}
