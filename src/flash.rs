//! Flash update engine: sector erasing, S-record streaming and the firmware
//! commit trigger.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use log::debug;

use crate::loader::{BdiFamily, Loader, MAX_BLOCK_SIZE};
use crate::srec::{self, Record};
use crate::Error;

/// Programming this marker at the firmware base address commits the image;
/// the loader refuses to start firmware without it.
const FIRMWARE_TRIGGER: [u8; 4] = [0xAA, 0x55, 0x55, 0xAA];

/// Base address of the firmware image per family.
pub fn firmware_addr(family: BdiFamily) -> u32 {
    match family {
        BdiFamily::Hs | BdiFamily::Bdi1000 => 0x000A_0000,
        BdiFamily::Bdi2000 | BdiFamily::Bdi2000RevC => 0x0104_0000,
        BdiFamily::Bdi3000 => 0x0010_0000,
    }
}

/// Sectors erased before a firmware update, in order.
fn update_erase_list(family: BdiFamily) -> Vec<u32> {
    match family {
        BdiFamily::Hs => vec![0x0008_4000, 0x000A_0000, 0x000C_0000, 0x000E_0000],
        BdiFamily::Bdi1000 => vec![0x0008_6000, 0x000A_0000, 0x000C_0000, 0x000E_0000],
        BdiFamily::Bdi2000 | BdiFamily::Bdi2000RevC => {
            vec![0x0104_0000, 0x0108_0000, 0x010C_0000]
        }
        BdiFamily::Bdi3000 => (0..16).map(|sector| 0x0010_0000 + sector * 0x1_0000).collect(),
    }
}

/// Groups consecutive S-record data into block-sized runs.
///
/// A run is flushed when the incoming data is not contiguous with the
/// running tail, when it would exceed [`MAX_BLOCK_SIZE`], or at the end of
/// the file. Every flushed run is 0xFF-padded to a multiple of four bytes.
struct BlockAssembler {
    base: u32,
    next: u32,
    data: Vec<u8>,
}

impl BlockAssembler {
    fn new() -> BlockAssembler {
        BlockAssembler {
            base: 0,
            next: 0,
            data: Vec::with_capacity(MAX_BLOCK_SIZE),
        }
    }

    fn push<F>(&mut self, address: u32, data: &[u8], flush: &mut F) -> Result<(), Error>
    where
        F: FnMut(u32, &[u8]) -> Result<(), Error>,
    {
        if self.data.is_empty() {
            self.base = address;
            self.next = address;
        } else if self.next != address || self.data.len() + data.len() > MAX_BLOCK_SIZE {
            self.flush(flush)?;
            self.base = address;
            self.next = address;
        }
        self.data.extend_from_slice(data);
        self.next += data.len() as u32;
        Ok(())
    }

    fn finish<F>(mut self, flush: &mut F) -> Result<(), Error>
    where
        F: FnMut(u32, &[u8]) -> Result<(), Error>,
    {
        if !self.data.is_empty() {
            self.flush(flush)?;
        }
        Ok(())
    }

    fn flush<F>(&mut self, flush: &mut F) -> Result<(), Error>
    where
        F: FnMut(u32, &[u8]) -> Result<(), Error>,
    {
        while self.data.len() % 4 != 0 {
            self.data.push(0xFF);
        }
        flush(self.base, &self.data)?;
        self.data.clear();
        Ok(())
    }
}

/// Erases the firmware sectors and programs the S-record file at `path`,
/// committing it with the firmware trigger.
pub fn update_firmware(
    loader: &mut Loader,
    family: BdiFamily,
    path: &Path,
) -> Result<(), Error> {
    let file = File::open(path).map_err(|_| Error::FirmwareFile)?;
    let reader = BufReader::new(file);

    println!("Erasing firmware flash ....");
    for address in update_erase_list(family) {
        loader.erase_sector(address)?;
    }
    println!("Erasing firmware flash passed");

    println!("Programming firmware flash ....");
    let result = program_srec_file(loader, family, reader);
    match &result {
        Ok(()) => println!("\nProgramming firmware flash passed"),
        Err(_) => println!("\nProgramming firmware flash failed"),
    }
    result
}

fn program_srec_file(
    loader: &mut Loader,
    family: BdiFamily,
    reader: BufReader<File>,
) -> Result<(), Error> {
    let mut assembler = BlockAssembler::new();
    for line in reader.lines() {
        let line = line.map_err(|_| Error::FirmwareFile)?;
        if line.is_empty() {
            continue;
        }
        let (address, data) = match srec::decode_line(&line)? {
            Record::Data { address, data } => (address, data),
            Record::Other => continue,
        };

        // The BDI-HS loader programs each record on its own, with a word
        // count; the later devices take coalesced blocks with byte counts.
        if family == BdiFamily::Hs {
            loader.program_flash_words(address, &data)?;
        } else {
            assembler.push(address, &data, &mut |base, block| {
                debug!("programming {} bytes at {:#010x}", block.len(), base);
                print!(".");
                let _ = io::stdout().flush();
                loader.program_flash(base, block)
            })?;
        }
    }
    if family != BdiFamily::Hs {
        assembler.finish(&mut |base, block| loader.program_flash(base, block))?;
    }

    if family == BdiFamily::Bdi3000 {
        let mut header = [0u8; 32];
        loader.read_memory(firmware_addr(family), &mut header)?;
        if let Err(err) = check_firmware_header(&header) {
            println!("\nInvalid Firmware File!");
            return Err(err);
        }
    }

    if family == BdiFamily::Hs {
        loader.program_flash_words(firmware_addr(family), &FIRMWARE_TRIGGER)
    } else {
        loader.program_flash(firmware_addr(family), &FIRMWARE_TRIGGER)
    }
}

/// Plausibility check of the BDI3000 firmware header before the image is
/// committed: the boot copy loop must move flash content into SDRAM.
fn check_firmware_header(header: &[u8; 32]) -> Result<(), Error> {
    let copy_src = BigEndian::read_u32(&header[4..8]);
    let copy_dest = BigEndian::read_u32(&header[8..12]);
    let copy_count = BigEndian::read_u32(&header[12..16]).wrapping_mul(4);
    let copy_type = BigEndian::read_u32(&header[24..28]);

    let src_ok = copy_src >= 0x0010_0000
        && copy_src.wrapping_add(copy_count) <= 0x0040_0000
        && copy_src.wrapping_add(copy_count) >= copy_src;
    let dest_ok = copy_dest >= 0x4000_0000
        && copy_dest.wrapping_add(copy_count) <= 0x4100_0000
        && copy_dest.wrapping_add(copy_count) >= copy_dest;

    if !src_ok || !dest_ok || copy_type & 0xFFFF != 1 {
        return Err(Error::FirmwareFile);
    }
    Ok(())
}

/// Erases every erasable flash sector of the probe (the `erase` command).
pub fn erase_all(loader: &mut Loader, family: BdiFamily) -> Result<(), Error> {
    match family {
        BdiFamily::Hs => loader.erase_sector(0x000A_0000),
        BdiFamily::Bdi2000 | BdiFamily::Bdi2000RevC => {
            for &address in &[
                0x0100_8000,
                0x0100_C000,
                0x0101_0000,
                0x0104_0000,
                0x0108_0000,
                0x010C_0000,
            ] {
                loader.erase_sector(address)?;
            }
            Ok(())
        }
        BdiFamily::Bdi1000 => {
            for &address in &[
                0x0008_4000,
                0x0008_6000,
                0x0008_8000,
                0x000A_0000,
                0x000C_0000,
                0x000E_0000,
            ] {
                loader.erase_sector(address)?;
            }
            Ok(())
        }
        BdiFamily::Bdi3000 => {
            // Configuration sectors.
            let mut address = 0x2000;
            for _ in 1..8 {
                loader.erase_sector(address)?;
                address += 0x2000;
                progress_dot();
            }
            // Loader sectors not holding the installed loader.
            let mut address = 0x3_0000;
            for _ in 3..16 {
                loader.erase_sector(address)?;
                address += 0x1_0000;
                progress_dot();
            }
            // All firmware sectors.
            let mut address = firmware_addr(family);
            for _ in 0..48 {
                loader.erase_sector(address)?;
                address += 0x1_0000;
                progress_dot();
            }
            println!();

            println!("Checking for illegal data in boot/loader sectors");
            let result = verify_loader_code(loader);
            if result.is_err() {
                println!("Illegal data in boot/loader sectors detected!");
            }
            result
        }
    }
}

fn progress_dot() {
    print!(".");
    let _ = io::stdout().flush();
}

/// Checks that nothing but the installed boot and loader code is left in
/// the BDI3000 boot/loader sectors, and reports a checksum over them.
fn verify_loader_code(loader: &mut Loader) -> Result<(), Error> {
    let mut block = [0u8; MAX_BLOCK_SIZE];

    // Unused part of the boot sector.
    let mut address = 0x510;
    while address < 0x2000 {
        loader.read_memory(address, &mut block)?;
        if !all_erased(&block) {
            return Err(Error::Verify);
        }
        address += MAX_BLOCK_SIZE as u32;
    }

    // Unused part of the loader sector; the loader length in words sits at
    // offset 12 of its header.
    loader.read_memory(0x1_0000, &mut block)?;
    let code_words = BigEndian::read_u32(&block[12..16]);
    let mut address = 0x1_0040u32.wrapping_add(code_words.wrapping_mul(4));
    while address < 0x3_0000 {
        loader.read_memory(address, &mut block)?;
        if !all_erased(&block) {
            return Err(Error::Verify);
        }
        address += MAX_BLOCK_SIZE as u32;
    }

    // Checksum over boot and loader sectors with the serial number blanked.
    let mut crc = 0u16;
    let mut address = 0;
    while address < 0x3_0000 {
        loader.read_memory(address, &mut block)?;
        if address == 0 {
            block[0x20..0x28].iter_mut().for_each(|byte| *byte = 0);
        }
        crc = crc16(crc, &block);
        address += MAX_BLOCK_SIZE as u32;
    }
    println!("CRC over boot/loader sectors is {}", crc);

    Ok(())
}

fn all_erased(block: &[u8]) -> bool {
    block.iter().all(|&byte| byte == 0xFF)
}

/// CRC-16/ARC, bit by bit (reflected polynomial 0xA001).
pub(crate) fn crc16(crc: u16, data: &[u8]) -> u16 {
    let mut crc = crc;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_flushes(records: &[(u32, usize)]) -> Vec<(u32, usize)> {
        let mut flushed = Vec::new();
        let mut assembler = BlockAssembler::new();
        let mut sink = |base: u32, block: &[u8]| {
            flushed.push((base, block.len()));
            Ok(())
        };
        for &(address, len) in records {
            assembler.push(address, &vec![0x42u8; len], &mut sink).unwrap();
        }
        assembler.finish(&mut sink).unwrap();
        flushed
    }

    #[test]
    fn coalesces_contiguous_records_into_one_block() {
        // 0x1000 + 200 bytes runs straight into 0x10C8; the jump to 0x2000
        // flushes the 400-byte run first.
        let flushed = collect_flushes(&[(0x1000, 200), (0x10C8, 200), (0x2000, 16)]);
        assert_eq!(flushed, vec![(0x1000, 400), (0x2000, 16)]);
    }

    #[test]
    fn flushes_when_a_block_would_overflow() {
        let flushed = collect_flushes(&[
            (0x1000, 600),
            (0x1000 + 600, 600),
            (0x1000 + 1200, 100),
        ]);
        assert_eq!(flushed, vec![(0x1000, 600), (0x1000 + 600, 700)]);
    }

    #[test]
    fn pads_flushed_blocks_to_a_multiple_of_four() {
        let flushed = collect_flushes(&[(0x1000, 13)]);
        assert_eq!(flushed, vec![(0x1000, 16)]);
    }

    #[test]
    fn padding_bytes_are_erased_flash_values() {
        let mut padded = Vec::new();
        let mut assembler = BlockAssembler::new();
        let mut sink = |_: u32, block: &[u8]| {
            padded = block.to_vec();
            Ok(())
        };
        assembler.push(0x1000, &[1, 2, 3], &mut sink).unwrap();
        assembler.finish(&mut sink).unwrap();
        assert_eq!(padded, vec![1, 2, 3, 0xFF]);
    }

    fn header(src: u32, dest: u32, count: u32, kind: u32) -> [u8; 32] {
        let mut header = [0u8; 32];
        BigEndian::write_u32(&mut header[4..8], src);
        BigEndian::write_u32(&mut header[8..12], dest);
        BigEndian::write_u32(&mut header[12..16], count / 4);
        BigEndian::write_u32(&mut header[24..28], kind);
        header
    }

    #[test]
    fn accepts_a_plausible_firmware_header() {
        let header = header(0x0011_0000, 0x4000_1000, 0x2000, 1);
        assert!(check_firmware_header(&header).is_ok());
    }

    #[test]
    fn rejects_a_wrong_copy_type() {
        let header = header(0x0011_0000, 0x4000_1000, 0x2000, 2);
        assert!(matches!(
            check_firmware_header(&header),
            Err(Error::FirmwareFile)
        ));
    }

    #[test]
    fn rejects_out_of_range_copy_addresses() {
        assert!(check_firmware_header(&header(0x0000_1000, 0x4000_1000, 0x2000, 1)).is_err());
        assert!(check_firmware_header(&header(0x0011_0000, 0x2000_0000, 0x2000, 1)).is_err());
        assert!(check_firmware_header(&header(0x003F_F000, 0x4000_1000, 0x2000, 1)).is_err());
    }

    #[test]
    fn checksums_match_the_reference_polynomial() {
        // CRC-16/ARC of the standard check string.
        assert_eq!(crc16(0, b"123456789"), 0xBB3D);
        assert_eq!(crc16(0, &[]), 0);
    }
}
