//! CPLD programming over the loader's in-system-programming commands.
//!
//! The probe generations carry different ispLSI devices; each has its own
//! fuse array geometry and User Electronic Signature width. The UES encodes
//! the installed logic version so the version read-out can report it.

use std::io::{self, Write};
use std::path::Path;

use log::debug;
use num_enum::IntoPrimitive;

use crate::jedec;
use crate::loader::{BdiFamily, Loader};
use crate::Error;

/// ispLSI device identifiers reported by ISP_READ_ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
enum IspDeviceId {
    Lsi2064 = 0x12,
    Lsi2096 = 0x13,
    Lsi2032 = 0x15,
}

/// Fuse array geometry of one device generation.
struct IspGeometry {
    rows: usize,
    row_bits: usize,
    /// Text lines per row in the JEDEC file.
    parts: usize,
    ues_bits: usize,
    device_id: IspDeviceId,
}

static ISP_HS: IspGeometry = IspGeometry {
    rows: 102,
    row_bits: 80,
    parts: 2,
    ues_bits: 40,
    device_id: IspDeviceId::Lsi2032,
};

static ISP_B10: IspGeometry = IspGeometry {
    rows: 118,
    row_bits: 160,
    parts: 4,
    ues_bits: 80,
    device_id: IspDeviceId::Lsi2064,
};

static ISP_B20: IspGeometry = IspGeometry {
    rows: 134,
    row_bits: 240,
    parts: 4,
    ues_bits: 120,
    device_id: IspDeviceId::Lsi2096,
};

fn geometry(family: BdiFamily) -> Option<&'static IspGeometry> {
    match family {
        BdiFamily::Hs => Some(&ISP_HS),
        BdiFamily::Bdi1000 => Some(&ISP_B10),
        BdiFamily::Bdi2000 | BdiFamily::Bdi2000RevC => Some(&ISP_B20),
        BdiFamily::Bdi3000 => None,
    }
}

/// Expands hex digits to their 4-bit binary form; anything else reads as
/// `0000`.
fn hex_to_ues(text: &str) -> String {
    let mut ues = String::with_capacity(text.len() * 4);
    for c in text.chars() {
        let value = c.to_ascii_uppercase().to_digit(16).unwrap_or(0) as u8;
        for bit in (0..4).rev() {
            ues.push(if value & (1 << bit) != 0 { '1' } else { '0' });
        }
    }
    ues
}

/// Expands `chars` characters of ASCII to their 8-bit binary form, zero
/// padded past the end of the text.
fn ascii_to_ues(text: &str, chars: usize) -> String {
    let bytes = text.as_bytes();
    let mut ues = String::with_capacity(chars * 8);
    for i in 0..chars {
        let value = bytes.get(i).copied().unwrap_or(0);
        for bit in (0..8).rev() {
            ues.push(if value & (1 << bit) != 0 { '1' } else { '0' });
        }
    }
    ues
}

/// The version split into a single thousands character and the three-digit
/// remainder, e.g. 14023 reads as `>023`.
fn version_suffix(version: u16) -> String {
    let mut suffix = String::with_capacity(4);
    suffix.push((b'0' + (version / 1000) as u8) as char);
    suffix.push_str(&format!("{:03}", version % 1000));
    suffix
}

/// Builds the UES bit string recording `version` for the given family.
fn version_ues(family: BdiFamily, version: u16) -> Option<String> {
    match family {
        BdiFamily::Hs => Some(hex_to_ues(&format!("B3201E{:04}", version))),
        BdiFamily::Bdi1000 => Some(ascii_to_ues(&format!("B1001E{}", version_suffix(version)), 10)),
        BdiFamily::Bdi2000 | BdiFamily::Bdi2000RevC => {
            Some(ascii_to_ues(&format!("B6001E{}", version_suffix(version)), 15))
        }
        BdiFamily::Bdi3000 => None,
    }
}

/// Erases the CPLD and verifies that the expected device generation is
/// fitted.
pub fn erase_cpld(loader: &mut Loader, family: BdiFamily) -> Result<(), Error> {
    let geometry = geometry(family).ok_or(Error::InvalidParameter)?;

    loader.isp_enable(true)?;
    let device_id = loader.isp_device_id()?;
    loader.isp_erase()?;
    loader.isp_enable(false)?;

    if device_id != u8::from(geometry.device_id) {
        return Err(Error::LogicDevice(device_id));
    }
    Ok(())
}

/// Programs the JEDEC fuse map at `path` and a UES recording `version`,
/// then verifies every row and the UES against the file.
pub fn update_logic(
    loader: &mut Loader,
    family: BdiFamily,
    version: u16,
    path: &Path,
) -> Result<(), Error> {
    let geometry = geometry(family).ok_or(Error::InvalidParameter)?;
    let ues = version_ues(family, version).ok_or(Error::InvalidParameter)?;
    debug_assert_eq!(ues.len(), geometry.ues_bits);

    let fuse_map = jedec::load_fuse_map(path, geometry.rows, geometry.row_bits, geometry.parts)?;

    loader.isp_enable(true)?;
    let result = program_and_verify(loader, &fuse_map, &ues);

    // Leave ISP mode on the failure path as well.
    match result {
        Ok(()) => loader.isp_enable(false)?,
        Err(err) => {
            let _ = loader.isp_enable(false);
            println!("\nProgramming CPLD failed");
            return Err(err);
        }
    }
    println!("\nProgramming CPLD passed");
    Ok(())
}

fn program_and_verify(loader: &mut Loader, fuse_map: &[String], ues: &str) -> Result<(), Error> {
    for (row, bits) in fuse_map.iter().enumerate() {
        loader.isp_program_line(row, bits)?;
        progress_dot();
    }
    loader.isp_program_ues(ues)?;

    for (row, bits) in fuse_map.iter().enumerate() {
        let (programmed, erased) = loader.isp_read_line(row)?;
        if programmed != *bits || erased != *bits {
            debug!("fuse row {} mismatch", row);
            return Err(Error::LogicVerify);
        }
        progress_dot();
    }

    let device_ues = loader.isp_read_ues()?;
    if device_ues != ues {
        debug!("UES mismatch: {} != {}", device_ues, ues);
        return Err(Error::LogicVerify);
    }
    Ok(())
}

fn progress_dot() {
    print!(".");
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_hex_digits_to_bits() {
        assert_eq!(hex_to_ues("0"), "0000");
        assert_eq!(hex_to_ues("B3"), "10110011");
        assert_eq!(hex_to_ues("f"), "1111");
        // Non-hex characters read as zero.
        assert_eq!(hex_to_ues("G"), "0000");
    }

    #[test]
    fn expands_ascii_to_bits_with_zero_padding() {
        assert_eq!(ascii_to_ues("A", 1), "01000001");
        assert_eq!(ascii_to_ues("A", 2), "0100000100000000");
    }

    #[test]
    fn the_hs_ues_is_40_bits_of_the_hex_version() {
        let ues = version_ues(BdiFamily::Hs, 123).unwrap();
        assert_eq!(ues.len(), 40);
        // "B3201E0123": B = 1011, 3 = 0011.
        assert!(ues.starts_with("10110011"));
    }

    #[test]
    fn the_bdi2000_ues_encodes_the_version_in_ascii() {
        // The thousands of the version are one character: 14023 reads >023.
        let ues = version_ues(BdiFamily::Bdi2000, 14_023).unwrap();
        assert_eq!(ues.len(), 120);
        assert_eq!(ues, ascii_to_ues("B6001E>023", 15));

        let ues = version_ues(BdiFamily::Bdi1000, 1_023).unwrap();
        assert_eq!(ues.len(), 80);
        assert_eq!(ues, ascii_to_ues("B1001E1023", 10));
    }

    #[test]
    fn the_bdi3000_has_no_programmable_logic() {
        assert!(version_ues(BdiFamily::Bdi3000, 0).is_none());
        assert!(geometry(BdiFamily::Bdi3000).is_none());
    }
}
