//! Motorola S-record decoding for firmware files.

use crate::Error;

/// One decoded S-record line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// An S1/S2/S3 data record.
    Data { address: u32, data: Vec<u8> },
    /// A header, count or termination record; carries no flash data.
    Other,
}

/// Decodes one line of an S-record file.
///
/// Data records yield address and payload with the checksum validated; the
/// remaining record types are skipped silently. Anything else is an invalid
/// firmware file.
pub fn decode_line(line: &str) -> Result<Record, Error> {
    let bytes = line.as_bytes();
    if bytes.first() != Some(&b'S') {
        return Err(Error::FirmwareFile);
    }

    let address_len = match bytes.get(1) {
        Some(b'1') => 2,
        Some(b'2') => 3,
        Some(b'3') => 4,
        Some(_) => return Ok(Record::Other),
        None => return Err(Error::FirmwareFile),
    };

    let mut reader = HexReader {
        bytes,
        position: 2,
        checksum: 0,
    };

    let record_len = reader.next()? as usize;
    if record_len < address_len + 1 {
        return Err(Error::FirmwareFile);
    }

    let mut address = 0u32;
    for _ in 0..address_len {
        address = (address << 8) + u32::from(reader.next()?);
    }

    let mut data = Vec::with_capacity(record_len - address_len - 1);
    for _ in 0..record_len - address_len - 1 {
        data.push(reader.next()?);
    }

    // The sum over length, address, data and checksum must come out at 0xFF.
    reader.next()?;
    if reader.checksum != 0xFF {
        return Err(Error::FirmwareFile);
    }

    Ok(Record::Data { address, data })
}

struct HexReader<'a> {
    bytes: &'a [u8],
    position: usize,
    checksum: u8,
}

impl HexReader<'_> {
    fn next(&mut self) -> Result<u8, Error> {
        let high = self.digit(self.position)?;
        let low = self.digit(self.position + 1)?;
        self.position += 2;
        let value = (high << 4) + low;
        self.checksum = self.checksum.wrapping_add(value);
        Ok(value)
    }

    fn digit(&self, position: usize) -> Result<u8, Error> {
        match self.bytes.get(position) {
            Some(c @ b'0'..=b'9') => Ok(c - b'0'),
            Some(b'A'..=b'F') => Ok(self.bytes[position] - b'A' + 10),
            // The characters between '9' and 'A' decode as zero.
            Some(b':'..=b'@') => Ok(0),
            _ => Err(Error::FirmwareFile),
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    const S1_LINE: &str = "S11300007C6F1B787C6E1B787C6D1B787C6C1B7850";

    #[test]
    fn decodes_an_s1_record() {
        let record = decode_line(S1_LINE).unwrap();
        assert_eq!(
            record,
            Record::Data {
                address: 0x0000,
                data: hex!("7C6F1B78 7C6E1B78 7C6D1B78 7C6C1B78").to_vec(),
            }
        );
    }

    #[test]
    fn decodes_an_s3_record_with_a_wide_address() {
        // 4-byte address 0x01040000, payload DE AD BE EF.
        let record = decode_line("S30901040000DEADBEEFB9").unwrap();
        assert_eq!(
            record,
            Record::Data {
                address: 0x0104_0000,
                data: hex!("DEADBEEF").to_vec(),
            }
        );
    }

    #[test]
    fn skips_non_data_records() {
        assert_eq!(decode_line("S00600004844521B").unwrap(), Record::Other);
        assert_eq!(decode_line("S70500000000FA").unwrap(), Record::Other);
        assert_eq!(decode_line("S9030000FC").unwrap(), Record::Other);
    }

    #[test]
    fn rejects_a_corrupted_checksum() {
        let mut corrupt = S1_LINE.to_string();
        corrupt.replace_range(40..42, "51");
        assert!(decode_line(&corrupt).is_err());
    }

    #[test]
    fn rejects_corruption_anywhere_in_the_record() {
        // Flip one hex digit at every position; the running sum must catch it.
        for position in 2..S1_LINE.len() {
            let mut corrupt = S1_LINE.to_string();
            let original = corrupt.as_bytes()[position];
            let flipped = if original == b'0' { b'1' } else { b'0' };
            corrupt.replace_range(position..position + 1, &(flipped as char).to_string());
            assert!(
                decode_line(&corrupt).is_err(),
                "corruption at {} went undetected",
                position
            );
        }
    }

    #[test]
    fn rejects_a_truncated_record() {
        assert!(decode_line("S113007C").is_err());
        assert!(decode_line("S").is_err());
        assert!(decode_line("").is_err());
    }
}
