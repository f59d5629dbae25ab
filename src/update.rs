//! The update and erase workflows: connect, classify the probe, decide what
//! is out of date and drive the flash and CPLD engines.

use std::path::Path;

use log::debug;

use crate::catalog;
use crate::cpld;
use crate::flash;
use crate::loader::{BdiFamily, Loader, VersionInfo};
use crate::Error;

/// The highest three-digit logic revision.
const MAX_LOGIC_VERSION: u16 = 999;

/// The highest firmware patch level.
const MAX_FIRMWARE_VERSION: u16 = 255;

/// What the update command is asked to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Update firmware and logic only when out of date.
    Auto,
    Firmware,
    Logic,
    All,
}

/// Connects to the probe and reports the loader versions.
pub fn connect(port: &str, baudrate: u32) -> Result<(Loader, VersionInfo), Error> {
    println!("Connecting to BDI loader");
    match Loader::connect(port, baudrate) {
        Ok(connection) => Ok(connection),
        Err(err) => {
            println!("Connecting to BDI loader failed ({})", err.code());
            Err(err)
        }
    }
}

/// The update command: bring firmware and CPLD up to the newest artifacts
/// in `directory` for the given target.
pub fn update_firmware_logic(
    port: &str,
    baudrate: u32,
    directory: &str,
    target_index: usize,
    mode: UpdateMode,
) -> Result<(), Error> {
    let (mut loader, version) = connect(port, baudrate)?;

    let entry = catalog::setup_info(version.family)
        .get(target_index)
        .ok_or(Error::InvalidParameter)?;
    if !entry.is_supported() {
        println!(
            "The connected {} does not support the selected target",
            version.family.name()
        );
        return Err(Error::InvalidParameter);
    }

    // A BDI3000 firmware file may be named directly instead of a directory.
    let mut mode = mode;
    let direct_file = bdi3000_firmware_file(version.family, directory);
    if direct_file.is_some() {
        mode = UpdateMode::Firmware;
    }

    let (newest_firmware, firmware_path) = match direct_file {
        Some(path) => (0, path),
        None => match catalog::find_newest(Path::new(directory), entry.firmware_name) {
            Some((newest, path)) => (newest, path),
            None => {
                println!("No valid firmware file found in {}", directory);
                return Err(Error::FirmwareFile);
            }
        },
    };

    let logic = if version.family.has_cpld() {
        match catalog::find_newest(Path::new(directory), entry.logic_name) {
            Some((newest, path)) => Some((newest, path)),
            None => {
                println!("No valid JEDEC file found in {}", directory);
                return Err(Error::LogicFile);
            }
        }
    } else {
        None
    };

    let update_firmware = match mode {
        UpdateMode::All | UpdateMode::Firmware => true,
        _ => {
            let needed = firmware_outdated(version.firmware, entry.firmware_type, newest_firmware);
            if !needed {
                println!("Firmware is already up to date");
            }
            needed
        }
    };

    let update_logic = match &logic {
        None => false,
        Some((newest_logic, _)) => match mode {
            UpdateMode::All | UpdateMode::Logic => true,
            _ => {
                let needed = logic_outdated(version.logic, entry.logic_type, *newest_logic);
                if !needed {
                    println!("CPLD is already up to date");
                }
                needed
            }
        },
    };

    // Erase the logic before touching the firmware.
    if update_logic {
        println!("Erasing CPLD");
        if let Err(err) = cpld::erase_cpld(&mut loader, version.family) {
            println!("Erasing CPLD failed ({})", err.code());
            return Err(err);
        }
    }

    if update_firmware {
        println!("Programming firmware with {}", firmware_path.display());
        if let Err(err) = flash::update_firmware(&mut loader, version.family, &firmware_path) {
            println!("Programming firmware failed ({})", err.code());
            return Err(err);
        }
    }

    if update_logic {
        if let Some((newest_logic, logic_path)) = logic {
            println!("Programming CPLD with {}", logic_path.display());
            let logic_version = newest_logic + entry.logic_type;
            if let Err(err) =
                cpld::update_logic(&mut loader, version.family, logic_version, &logic_path)
            {
                println!("Programming CPLD failed ({})", err.code());
                return Err(err);
            }
        }
    }

    println!("Programming passed");
    Ok(())
}

/// The erase command: wipe the CPLD and all firmware flash sectors.
pub fn erase_firmware_logic(port: &str, baudrate: u32) -> Result<(), Error> {
    let (mut loader, version) = connect(port, baudrate)?;

    if version.family.has_cpld() {
        println!("Erasing CPLD");
        if let Err(err) = cpld::erase_cpld(&mut loader, version.family) {
            println!("Erasing CPLD failed ({})", err.code());
            return Err(err);
        }
    }

    println!("Erasing all flash sectors");
    if let Err(err) = flash::erase_all(&mut loader, version.family) {
        println!("Erasing firmware failed ({})", err.code());
        return Err(err);
    }

    println!("Erasing passed");
    Ok(())
}

/// Reports whether the installed firmware is older than the newest artifact.
///
/// The installed version word combines the type and the patch level; the
/// wrapping difference exceeding the patch range means a different firmware
/// type is installed.
fn firmware_outdated(installed: u16, expected_type: u16, newest: u16) -> bool {
    let patch = installed.wrapping_sub(expected_type);
    patch > MAX_FIRMWARE_VERSION || patch < newest
}

fn logic_outdated(installed: u16, expected_type: u16, newest: u16) -> bool {
    let revision = installed.wrapping_sub(expected_type);
    revision > MAX_LOGIC_VERSION || revision < newest
}

/// Detects a directly named BDI3000 firmware file (`b30xxxxx.yyy`).
fn bdi3000_firmware_file(family: BdiFamily, directory: &str) -> Option<std::path::PathBuf> {
    if family != BdiFamily::Bdi3000 {
        return None;
    }
    let bytes = directory.as_bytes();
    if bytes.len() < 12 {
        return None;
    }
    let name = &bytes[bytes.len() - 12..];
    if &name[..3] == b"b30" && name[8] == b'.' {
        debug!("treating {} as a firmware file", directory);
        Some(std::path::PathBuf::from(directory))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firmware_is_outdated_when_the_type_differs() {
        // Installed bdiGDB for ARM (0xCE00 + patch) on a probe expected to
        // run bdiGDB for MPC8xx (0xCD00).
        assert!(firmware_outdated(0xCE14, 0xCD00, 110));
        // Same type, older patch level.
        assert!(firmware_outdated(0xCD14, 0xCD00, 121));
        // Same type, current patch level.
        assert!(!firmware_outdated(0xCD79, 0xCD00, 121));
        // Wrap-around stays within the word.
        assert!(firmware_outdated(0x0014, 0xCD00, 110));
    }

    #[test]
    fn logic_is_outdated_when_type_or_revision_differ() {
        assert!(logic_outdated(8014, 1000, 120));
        assert!(logic_outdated(1014, 1000, 120));
        assert!(!logic_outdated(1120, 1000, 120));
        assert!(!logic_outdated(1121, 1000, 120));
    }

    #[test]
    fn recognizes_directly_named_bdi3000_firmware() {
        assert!(bdi3000_firmware_file(BdiFamily::Bdi3000, "fw/b30ppcgd.120").is_some());
        assert!(bdi3000_firmware_file(BdiFamily::Bdi3000, "fw/b30ppcgd").is_none());
        assert!(bdi3000_firmware_file(BdiFamily::Bdi2000, "fw/b30ppcgd.120").is_none());
        assert!(bdi3000_firmware_file(BdiFamily::Bdi3000, ".").is_none());
    }
}
