//! Typed commands understood by the resident BDI loader.
//!
//! Every command serializes an opcode plus big-endian arguments, runs one
//! [`Channel`] transaction with a command-specific execution time and checks
//! the echoed opcode in the answer.

use std::thread;
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};
use log::debug;
use num_enum::IntoPrimitive;

use crate::link::frame::MAX_FRAME_SIZE;
use crate::link::Channel;
use crate::Error;

/// Largest data block carried by a single read or program command.
pub const MAX_BLOCK_SIZE: usize = 1024;

/// Loader command opcodes; the probe echoes the opcode in its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum Opcode {
    StartLoader = 0x01,
    ExitLoader = 0x02,
    ReadVersion = 0x03,
    ReadMemory = 0x04,
    EraseFlash = 0x05,
    ProgramFlash = 0x06,
    IspEnable = 0x10,
    IspReadId = 0x11,
    IspReadLine = 0x12,
    IspProgramLine = 0x13,
    IspReadUes = 0x14,
    IspProgramUes = 0x15,
    IspErase = 0x16,
}

/// The BDI hardware generation, derived from the version answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BdiFamily {
    Hs,
    Bdi1000,
    Bdi2000,
    Bdi2000RevC,
    Bdi3000,
}

impl BdiFamily {
    pub fn name(self) -> &'static str {
        match self {
            BdiFamily::Hs => "BDI-HS",
            BdiFamily::Bdi1000 => "BDI1000",
            BdiFamily::Bdi2000 => "BDI2000",
            BdiFamily::Bdi2000RevC => "BDI2000 Rev.C",
            BdiFamily::Bdi3000 => "BDI3000",
        }
    }

    /// The BDI3000 carries its logic in a non-reprogrammable device.
    pub fn has_cpld(self) -> bool {
        !matches!(self, BdiFamily::Bdi3000)
    }
}

/// Versions and identity reported by the loader.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub family: BdiFamily,
    pub loader: u16,
    pub firmware: u16,
    pub logic: u16,
    /// Eight ASCII digits; empty on a BDI-HS.
    pub serial: String,
}

impl VersionInfo {
    /// Classifies the probe from a READ_VERSION answer.
    ///
    /// The answer length identifies the hardware generation; a BDI2000
    /// answer additionally carries a `-C` suffix marking the Rev.C board.
    pub fn parse(answer: &[u8]) -> Result<VersionInfo, Error> {
        let mut family = match answer.len() {
            7 => BdiFamily::Hs,
            15 | 17 => BdiFamily::Bdi2000,
            23 => BdiFamily::Bdi1000,
            21 => BdiFamily::Bdi3000,
            _ => return Err(Error::UnknownBdi),
        };
        if answer[0] != u8::from(Opcode::ReadVersion) {
            return Err(Error::InvalidResponse);
        }

        let loader = BigEndian::read_u16(&answer[1..3]);
        let firmware = BigEndian::read_u16(&answer[3..5]);

        // The BDI3000 answer carries a 4-byte CPLD signature where the older
        // devices report their logic version.
        let (logic, serial_offset) = match family {
            BdiFamily::Bdi3000 => (0, 9),
            _ => (BigEndian::read_u16(&answer[5..7]), 7),
        };

        let serial = if family == BdiFamily::Hs {
            String::new()
        } else {
            answer[serial_offset..serial_offset + 8]
                .iter()
                .map(|&byte| byte as char)
                .collect()
        };

        if answer.len() == 17 && answer[16] == b'C' {
            family = BdiFamily::Bdi2000RevC;
        }

        Ok(VersionInfo {
            family,
            loader,
            firmware,
            logic,
            serial,
        })
    }

    /// The firmware-type index encoded in the firmware version word.
    pub fn firmware_type(&self) -> u16 {
        if self.family == BdiFamily::Bdi3000 {
            self.firmware >> 8
        } else if self.firmware < 0xC000 {
            self.firmware >> 12
        } else {
            (self.firmware - 0xC000) >> 8
        }
    }
}

/// Renders a version word such as `101` as `1.01`; `0` and out-of-range
/// values read as `unknown`.
pub fn version_string(version: u16) -> String {
    if version == 0 || version > 255 {
        "unknown".to_string()
    } else {
        format!("{}.{:02}", version / 100, version % 100)
    }
}

/// A connection to the running loader.
pub struct Loader {
    channel: Channel,
}

impl Loader {
    /// Connects to the probe, starts the loader if the firmware is still
    /// running and reads the version block.
    pub fn connect(port: &str, baudrate: u32) -> Result<(Loader, VersionInfo), Error> {
        let mut loader = Loader {
            channel: open_with_retry(port, baudrate)?,
        };

        // A loader that is already active answers with something other than
        // the echoed opcode. If the firmware was running instead, the loader
        // acknowledges the start command and reboots; release the port and
        // reconnect once it is up.
        let answer = loader.command_unchecked(Opcode::StartLoader, &[], 500)?;
        if answer.first() == Some(&u8::from(Opcode::StartLoader)) {
            debug!("loader started, reconnecting");
            drop(loader);
            thread::sleep(Duration::from_millis(1000));
            loader = Loader {
                channel: Channel::open(port, baudrate)?,
            };
        }

        let version = loader.read_version()?;
        Ok((loader, version))
    }

    pub fn read_version(&mut self) -> Result<VersionInfo, Error> {
        let answer = self.command(Opcode::ReadVersion, &[], 1000)?;
        VersionInfo::parse(&answer)
    }

    /// Leaves the loader and starts the installed firmware.
    pub fn exit(&mut self) -> Result<(), Error> {
        self.command(Opcode::ExitLoader, &[], 200)?;
        Ok(())
    }

    /// Reads one block of up to [`MAX_BLOCK_SIZE`] bytes of BDI memory.
    pub fn read_memory(&mut self, address: u32, block: &mut [u8]) -> Result<(), Error> {
        debug_assert!(block.len() <= MAX_BLOCK_SIZE);

        let mut args = [0u8; 6];
        BigEndian::write_u32(&mut args[0..4], address);
        BigEndian::write_u16(&mut args[4..6], block.len() as u16);

        let answer = self.command_unchecked(Opcode::ReadMemory, &args, 1000)?;
        if answer.len() != block.len() + 7 || answer[0] != u8::from(Opcode::ReadMemory) {
            return Err(Error::InvalidResponse);
        }

        // The answer echoes address and count before the data.
        block.copy_from_slice(&answer[7..]);
        Ok(())
    }

    /// Erases the flash sector containing `address`.
    pub fn erase_sector(&mut self, address: u32) -> Result<(), Error> {
        let mut args = [0u8; 4];
        BigEndian::write_u32(&mut args, address);

        let answer = self.command_unchecked(Opcode::EraseFlash, &args, 10_000)?;
        if answer.len() != 2 || answer[0] != u8::from(Opcode::EraseFlash) {
            return Err(Error::InvalidResponse);
        }
        if answer[1] != 0 {
            return Err(Error::FlashErase);
        }
        Ok(())
    }

    /// Programs a block to flash with a byte count (BDI1000/2000/3000).
    pub fn program_flash(&mut self, address: u32, block: &[u8]) -> Result<(), Error> {
        self.program(address, block.len() as u16, block)
    }

    /// Programs a block to flash with a word count (BDI-HS).
    pub fn program_flash_words(&mut self, address: u32, block: &[u8]) -> Result<(), Error> {
        self.program(address, (block.len() / 2) as u16, block)
    }

    fn program(&mut self, address: u32, count: u16, block: &[u8]) -> Result<(), Error> {
        let mut cmd = Vec::with_capacity(block.len() + 7);
        cmd.push(Opcode::ProgramFlash.into());
        cmd.extend_from_slice(&address.to_be_bytes());
        cmd.extend_from_slice(&count.to_be_bytes());
        cmd.extend_from_slice(block);

        let answer = self
            .channel
            .transaction(&cmd, MAX_FRAME_SIZE, 1000)?;
        if answer.len() != 6 || answer[0] != u8::from(Opcode::ProgramFlash) {
            return Err(Error::InvalidResponse);
        }
        if answer[1] != 0 {
            return Err(Error::FlashProgram(BigEndian::read_u32(&answer[2..6])));
        }
        Ok(())
    }

    /// Enters or leaves in-system-programming mode on the CPLD.
    pub fn isp_enable(&mut self, enable: bool) -> Result<(), Error> {
        self.command_unchecked(Opcode::IspEnable, &[enable as u8], 100)?;
        Ok(())
    }

    pub fn isp_device_id(&mut self) -> Result<u8, Error> {
        let answer = self.command_unchecked(Opcode::IspReadId, &[], 100)?;
        if answer.len() < 2 {
            return Err(Error::InvalidResponse);
        }
        Ok(answer[1])
    }

    pub fn isp_erase(&mut self) -> Result<(), Error> {
        self.command_unchecked(Opcode::IspErase, &[], 600)?;
        Ok(())
    }

    /// Reads one fuse array row at both sense levels as ASCII bit strings.
    pub fn isp_read_line(&mut self, line: usize) -> Result<(String, String), Error> {
        let answer = self.command(Opcode::IspReadLine, &[line as u8], 100)?;
        let line_length = (answer.len() - 1) / 2;
        let programmed = bits_to_string(&answer[1..1 + line_length]);
        let erased = bits_to_string(&answer[1 + line_length..1 + 2 * line_length]);
        Ok((programmed, erased))
    }

    pub fn isp_program_line(&mut self, line: usize, bits: &str) -> Result<(), Error> {
        let mut args = vec![line as u8];
        args.extend_from_slice(bits.as_bytes());
        self.command_unchecked(Opcode::IspProgramLine, &args, 300)?;
        Ok(())
    }

    pub fn isp_read_ues(&mut self) -> Result<String, Error> {
        let answer = self.command(Opcode::IspReadUes, &[], 100)?;
        Ok(bits_to_string(&answer[1..]))
    }

    pub fn isp_program_ues(&mut self, bits: &str) -> Result<(), Error> {
        self.command_unchecked(Opcode::IspProgramUes, bits.as_bytes(), 300)?;
        Ok(())
    }

    /// Runs a command and validates the echoed opcode.
    fn command(
        &mut self,
        opcode: Opcode,
        args: &[u8],
        command_time: u64,
    ) -> Result<Vec<u8>, Error> {
        let answer = self.command_unchecked(opcode, args, command_time)?;
        if answer.first() != Some(&u8::from(opcode)) {
            return Err(Error::InvalidResponse);
        }
        Ok(answer)
    }

    fn command_unchecked(
        &mut self,
        opcode: Opcode,
        args: &[u8],
        command_time: u64,
    ) -> Result<Vec<u8>, Error> {
        let mut cmd = Vec::with_capacity(args.len() + 1);
        cmd.push(opcode.into());
        cmd.extend_from_slice(args);
        self.channel.transaction(&cmd, MAX_FRAME_SIZE, command_time)
    }
}

fn open_with_retry(port: &str, baudrate: u32) -> Result<Channel, Error> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match Channel::open(port, baudrate) {
            Ok(channel) => return Ok(channel),
            // Setup failures will not go away by retrying.
            Err(err @ Error::SerialSetup(_))
            | Err(err @ Error::BaudNegotiation)
            | Err(err @ Error::Open { .. }) => return Err(err),
            Err(err) if attempts >= 3 => return Err(err),
            Err(err) => debug!("connect attempt {} failed: {}", attempts, err),
        }
    }
}

fn bits_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| byte as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version_answer(len: usize) -> Vec<u8> {
        let mut answer = vec![0u8; len];
        answer[0] = Opcode::ReadVersion.into();
        BigEndian::write_u16(&mut answer[1..3], 127); // loader V1.27
        BigEndian::write_u16(&mut answer[3..5], 0xCD14); // bdiGDB for MPC8xx
        if len != 7 && len != 21 {
            BigEndian::write_u16(&mut answer[5..7], 1023);
        }
        let serial_offset = if len == 21 { 9 } else { 7 };
        if len >= serial_offset + 8 {
            answer[serial_offset..serial_offset + 8].copy_from_slice(b"12345678");
        }
        answer
    }

    #[test]
    fn classifies_the_family_from_the_answer_length() {
        assert_eq!(
            VersionInfo::parse(&version_answer(7)).unwrap().family,
            BdiFamily::Hs
        );
        assert_eq!(
            VersionInfo::parse(&version_answer(15)).unwrap().family,
            BdiFamily::Bdi2000
        );
        assert_eq!(
            VersionInfo::parse(&version_answer(23)).unwrap().family,
            BdiFamily::Bdi1000
        );
        assert_eq!(
            VersionInfo::parse(&version_answer(21)).unwrap().family,
            BdiFamily::Bdi3000
        );
        assert!(matches!(
            VersionInfo::parse(&version_answer(11)),
            Err(Error::UnknownBdi)
        ));
    }

    #[test]
    fn detects_a_rev_c_marker() {
        let mut answer = version_answer(17);
        answer[15] = b'-';
        answer[16] = b'C';
        assert_eq!(
            VersionInfo::parse(&answer).unwrap().family,
            BdiFamily::Bdi2000RevC
        );

        // Without the marker the answer still reads as a plain BDI2000.
        let mut answer = version_answer(17);
        answer[16] = 0;
        assert_eq!(
            VersionInfo::parse(&answer).unwrap().family,
            BdiFamily::Bdi2000
        );
    }

    #[test]
    fn extracts_versions_and_serial_number() {
        let version = VersionInfo::parse(&version_answer(15)).unwrap();
        assert_eq!(version.loader, 127);
        assert_eq!(version.firmware, 0xCD14);
        assert_eq!(version.logic, 1023);
        assert_eq!(version.serial, "12345678");
    }

    #[test]
    fn the_hs_answer_has_no_serial_number() {
        let version = VersionInfo::parse(&version_answer(7)).unwrap();
        assert_eq!(version.serial, "");
    }

    #[test]
    fn the_bdi3000_answer_has_no_logic_version() {
        let version = VersionInfo::parse(&version_answer(21)).unwrap();
        assert_eq!(version.logic, 0);
        assert_eq!(version.serial, "12345678");
    }

    #[test]
    fn decodes_the_firmware_type_per_family() {
        let mut version = VersionInfo::parse(&version_answer(21)).unwrap();
        version.firmware = 0x1307;
        assert_eq!(version.firmware_type(), 0x13);

        let mut version = VersionInfo::parse(&version_answer(15)).unwrap();
        version.firmware = 0x5014; // below the extended range
        assert_eq!(version.firmware_type(), 5);
        version.firmware = 0xCD14; // extended range starts at 0xC000
        assert_eq!(version.firmware_type(), 13);
    }

    #[test]
    fn renders_version_words() {
        assert_eq!(version_string(101), "1.01");
        assert_eq!(version_string(127), "1.27");
        assert_eq!(version_string(0), "unknown");
        assert_eq!(version_string(999), "unknown");
    }
}
