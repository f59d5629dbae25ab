//! Static artifact catalog: which firmware and logic images belong to which
//! probe generation and target, plus the directory scan for the newest
//! artifact revision.
//!
//! Artifact files are named `<basename>.NNN` where the three-digit extension
//! is the version (`.120` is V1.20); the newest revision wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::loader::BdiFamily;
use crate::Error;

/// Placeholder name for probe/target combinations without artifacts.
pub const NOT_SUPP: &str = "NOT_SUPP";

/// Expected image identities and artifact base names for one (family,
/// target) combination.
pub struct ArtifactEntry {
    pub firmware_type: u16,
    pub logic_type: u16,
    pub firmware_name: &'static str,
    pub logic_name: &'static str,
}

impl ArtifactEntry {
    pub fn is_supported(&self) -> bool {
        self.firmware_name != NOT_SUPP
    }
}

const fn entry(
    firmware_type: u16,
    logic_type: u16,
    firmware_name: &'static str,
    logic_name: &'static str,
) -> ArtifactEntry {
    ArtifactEntry {
        firmware_type,
        logic_type,
        firmware_name,
        logic_name,
    }
}

/// Artifact table rows per family, indexed by the target index derived from
/// the application/CPU pair.
pub fn setup_info(family: BdiFamily) -> &'static [ArtifactEntry; 51] {
    match family {
        BdiFamily::Hs => &BHS_SETUP_INFO,
        BdiFamily::Bdi2000 => &B20_SETUP_INFO,
        BdiFamily::Bdi2000RevC => &B21_SETUP_INFO,
        BdiFamily::Bdi1000 => &B10_SETUP_INFO,
        BdiFamily::Bdi3000 => &B30_SETUP_INFO,
    }
}

static BHS_SETUP_INFO: [ArtifactEntry; 51] = [
    /* 00 */ entry(0x0000, 0, "BDIHSFW", "C32JEDHS"),
    /* 01 */ entry(0x1000, 0, NOT_SUPP, NOT_SUPP),
    /* 02 */ entry(0x2000, 0, NOT_SUPP, NOT_SUPP),
    /* 03 */ entry(0x3000, 0, NOT_SUPP, NOT_SUPP),
    /* 04 */ entry(0x4000, 0, NOT_SUPP, NOT_SUPP),
    /* 05 */ entry(0x5000, 1000, "BDIPPCFW", "PPCJEDHS"),
    /* 06 */ entry(0x6000, 5000, "BDIMCFFW", "MCFJEDHS"),
    /* 07 */ entry(0x7000, 3000, "BDIC12FW", "C12JEDHS"),
    /* 08 */ entry(0x8000, 0, NOT_SUPP, NOT_SUPP),
    /* 09 */ entry(0x9000, 0, NOT_SUPP, NOT_SUPP),
    /* 10 */ entry(0xA000, 0, NOT_SUPP, NOT_SUPP),
    /* 11 */ entry(0xB000, 0, NOT_SUPP, NOT_SUPP),
    /* 12 */ entry(0xCC00, 0, NOT_SUPP, NOT_SUPP),
    /* 13 */ entry(0xCD00, 1000, NOT_SUPP, NOT_SUPP),
    /* 14 */ entry(0xCE00, 8000, NOT_SUPP, NOT_SUPP),
    /* 15 */ entry(0xCF00, 4000, NOT_SUPP, NOT_SUPP),
    /* 16 */ entry(0xD000, 4000, NOT_SUPP, NOT_SUPP),
    /* 17 */ entry(0xD100, 7000, NOT_SUPP, NOT_SUPP),
    /* 18 */ entry(0xD200, 7000, NOT_SUPP, NOT_SUPP),
    /* 19 */ entry(0xD300, 7000, NOT_SUPP, NOT_SUPP),
    /* 20 */ entry(0xD400, 9000, NOT_SUPP, NOT_SUPP),
    /* 21 */ entry(0xD500, 9000, NOT_SUPP, NOT_SUPP),
    /* 22 */ entry(0xD600, 9000, NOT_SUPP, NOT_SUPP),
    /* 23 */ entry(0xD700, 6000, NOT_SUPP, NOT_SUPP),
    /* 24 */ entry(0xD800, 6000, NOT_SUPP, NOT_SUPP),
    /* 25 */ entry(0xD900, 5000, NOT_SUPP, NOT_SUPP),
    /* 26 */ entry(0xDA00, 5000, NOT_SUPP, NOT_SUPP),
    /* 27 */ entry(0xDB00, 7000, NOT_SUPP, NOT_SUPP),
    /* 28 */ entry(0xDC00, 7000, NOT_SUPP, NOT_SUPP),
    /* 29 */ entry(0xDD00, 7000, NOT_SUPP, NOT_SUPP),
    /* 30 */ entry(0xDE00, 7000, NOT_SUPP, NOT_SUPP),
    /* 31 */ entry(0xDF00, 7000, NOT_SUPP, NOT_SUPP),
    /* 32 */ entry(0xE000, 7000, NOT_SUPP, NOT_SUPP),
    /* 33 */ entry(0xE100, 7000, NOT_SUPP, NOT_SUPP),
    /* 34 */ entry(0xE200, 7000, NOT_SUPP, NOT_SUPP),
    /* 35 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 36 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 37 */ entry(0xE200, 7000, NOT_SUPP, NOT_SUPP),
    /* 38 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 39 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 40 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 41 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 42 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 43 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 44 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 45 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 46 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 47 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 48 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 49 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 50 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
];

static B20_SETUP_INFO: [ArtifactEntry; 51] = [
    /* 00 */ entry(0x0000, 0, "B20C32FW", "C32JED20"),
    /* 01 */ entry(0x1000, 0, "B20C32AA", "C32JED20"),
    /* 02 */ entry(0x2000, 0, "B20C32WR", "C32JED20"),
    /* 03 */ entry(0x3000, 1000, "B20PPCAA", "PPCJED20"),
    /* 04 */ entry(0x4000, 21000, "B20PPCWR", "PPCJWR20"),
    /* 05 */ entry(0x5000, 1000, "B20PPCFW", "PPCJED20"),
    /* 06 */ entry(0x6000, 5000, "B20MCFFW", "MCFJED20"),
    /* 07 */ entry(0x7000, 3000, "B20C12FW", "C12JED20"),
    /* 08 */ entry(0x8000, 4000, "B20MMCFW", "MMCJED20"),
    /* 09 */ entry(0x9000, 8000, "B20ARMWR", "ARMJED20"),
    /* 10 */ entry(0xA000, 8000, "B20ARMFW", "ARMJED20"),
    /* 11 */ entry(0xB000, 6000, "B20TRIFW", "TRIJED20"),
    /* 12 */ entry(0xCC00, 0, "B20C32GD", "C32JED20"),
    /* 13 */ entry(0xCD00, 1000, "B20PPCGD", "PPCJED20"),
    /* 14 */ entry(0xCE00, 8000, "B20ARMGD", "ARMJED20"),
    /* 15 */ entry(0xCF00, 4000, "B20MMCGD", "MMCJED20"),
    /* 16 */ entry(0xD000, 4000, "B20MMCWR", "MMCJED20"),
    /* 17 */ entry(0xD100, 7000, "B20COPFW", "COPJED20"),
    /* 18 */ entry(0xD200, 7000, "B20COPWR", "COPJED20"),
    /* 19 */ entry(0xD300, 7000, "B20COPGD", "COPJED20"),
    /* 20 */ entry(0xD400, 9000, "B20PP4FW", "PP4JED20"),
    /* 21 */ entry(0xD500, 9000, "B20PP4WR", "PP4JED20"),
    /* 22 */ entry(0xD600, 9000, "B20PP4GD", "PP4JED20"),
    /* 23 */ entry(0xD700, 7000, "B20QP4GD", "COPJED20"),
    /* 24 */ entry(0xD800, 6000, "B20TRIGD", "TRIJED20"),
    /* 25 */ entry(0xD900, 7000, "B20QP4FW", "COPJED20"),
    /* 26 */ entry(0xDA00, 5000, "B20MCFGD", "MCFJED20"),
    /* 27 */ entry(0xDB00, 7000, "B20PWSFW", "COPJED20"),
    /* 28 */ entry(0xDC00, 7000, "B20PWSWR", "COPJED20"),
    /* 29 */ entry(0xDD00, 7000, "B20PWSGD", "COPJED20"),
    /* 30 */ entry(0xDE00, 10000, "B20R4KFW", "R4KJED20"),
    /* 31 */ entry(0xDF00, 10000, "B20XLSGD", "XLSJED20"),
    /* 32 */ entry(0xE000, 10000, "B20R4KGD", "R4KJED20"),
    /* 33 */ entry(0xE100, 11000, "B20XSCFW", "XSCJED20"),
    /* 34 */ entry(0xE200, 8000, "B20AV8FW", "ARMJED20"),
    /* 35 */ entry(0xE300, 11000, "B20XSCGD", "XSCJED20"),
    /* 36 */ entry(0xE400, 10000, "B20R5KGD", "R5KJED20"),
    /* 37 */ entry(0xE500, 7000, "B20PQ3FW", "COPJED20"),
    /* 38 */ entry(0xE600, 8000, "B20AV8GD", "ARMJED20"),
    /* 39 */ entry(0xE700, 7000, "B20PQ3GD", "COPJED20"),
    /* 40 */ entry(0xE800, 8000, "B20A11FW", "ARMJED20"),
    /* 41 */ entry(0xE900, 8000, "B20A11GD", "ARMJED20"),
    /* 42 */ entry(0xEA00, 10000, "B20R5KFW", "R5KJED20"),
    /* 43 */ entry(0xEB00, 12000, "B20P55FW", "P55JED20"),
    /* 44 */ entry(0xEC00, 12000, "B20P55GD", "P55JED20"),
    /* 45 */ entry(0xED00, 13000, "B20PA6FW", "PA6JED20"),
    /* 46 */ entry(0xEE00, 13000, "B20PA6GD", "PA6JED20"),
    /* 47 */ entry(0xEF00, 14000, "B20SWDFW", "SWDJED20"),
    /* 48 */ entry(0xF000, 14000, "B20SWDGD", "SWDJED20"),
    /* 49 */ entry(0xF100, 14000, "B20SV8FW", "SWDJED20"),
    /* 50 */ entry(0xF200, 14000, "B20SV8GD", "SWDJED20"),
];

static B21_SETUP_INFO: [ArtifactEntry; 51] = [
    /* 00 */ entry(0x0000, 0, "B20C32FW", "C32JED21"),
    /* 01 */ entry(0x1000, 0, "B20C32AA", "C32JED21"),
    /* 02 */ entry(0x2000, 0, "B20C32WR", "C32JED21"),
    /* 03 */ entry(0x3000, 1000, "B20PPCAA", "PPCJED21"),
    /* 04 */ entry(0x4000, 21000, "B20PPCWR", "PPCJWR21"),
    /* 05 */ entry(0x5000, 1000, "B20PPCFW", "PPCJED21"),
    /* 06 */ entry(0x6000, 5000, "B20MCFFW", "MCFJED21"),
    /* 07 */ entry(0x7000, 3000, "B20C12FW", "C12JED21"),
    /* 08 */ entry(0x8000, 4000, "B20MMCFW", "MMCJED21"),
    /* 09 */ entry(0x9000, 8000, "B20ARMWR", "ARMJED21"),
    /* 10 */ entry(0xA000, 8000, "B20ARMFW", "ARMJED21"),
    /* 11 */ entry(0xB000, 6000, "B20TRIFW", "TRIJED21"),
    /* 12 */ entry(0xCC00, 0, "B20C32GD", "C32JED21"),
    /* 13 */ entry(0xCD00, 1000, "B20PPCGD", "PPCJED21"),
    /* 14 */ entry(0xCE00, 8000, "B20ARMGD", "ARMJED21"),
    /* 15 */ entry(0xCF00, 4000, "B20MMCGD", "MMCJED21"),
    /* 16 */ entry(0xD000, 4000, "B20MMCWR", "MMCJED21"),
    /* 17 */ entry(0xD100, 7000, "B20COPFW", "COPJED21"),
    /* 18 */ entry(0xD200, 7000, "B20COPWR", "COPJED21"),
    /* 19 */ entry(0xD300, 7000, "B20COPGD", "COPJED21"),
    /* 20 */ entry(0xD400, 9000, "B20PP4FW", "PP4JED21"),
    /* 21 */ entry(0xD500, 9000, "B20PP4WR", "PP4JED21"),
    /* 22 */ entry(0xD600, 9000, "B20PP4GD", "PP4JED21"),
    /* 23 */ entry(0xD700, 7000, "B20QP4GD", "COPJED21"),
    /* 24 */ entry(0xD800, 6000, "B20TRIGD", "TRIJED21"),
    /* 25 */ entry(0xD900, 7000, "B20QP4FW", "COPJED21"),
    /* 26 */ entry(0xDA00, 5000, "B20MCFGD", "MCFJED21"),
    /* 27 */ entry(0xDB00, 7000, "B20PWSFW", "COPJED21"),
    /* 28 */ entry(0xDC00, 7000, "B20PWSWR", "COPJED21"),
    /* 29 */ entry(0xDD00, 7000, "B20PWSGD", "COPJED21"),
    /* 30 */ entry(0xDE00, 10000, "B20R4KFW", "R4KJED21"),
    /* 31 */ entry(0xDF00, 10000, "B20XLSGD", "XLSJED21"),
    /* 32 */ entry(0xE000, 10000, "B20R4KGD", "R4KJED21"),
    /* 33 */ entry(0xE100, 11000, "B20XSCFW", "XSCJED21"),
    /* 34 */ entry(0xE200, 8000, "B20AV8FW", "ARMJED21"),
    /* 35 */ entry(0xE300, 11000, "B20XSCGD", "XSCJED21"),
    /* 36 */ entry(0xE400, 10000, "B20R5KGD", "R5KJED21"),
    /* 37 */ entry(0xE500, 7000, "B20PQ3FW", "COPJED21"),
    /* 38 */ entry(0xE600, 8000, "B20AV8GD", "ARMJED21"),
    /* 39 */ entry(0xE700, 7000, "B20PQ3GD", "COPJED21"),
    /* 40 */ entry(0xE800, 8000, "B20A11FW", "ARMJED21"),
    /* 41 */ entry(0xE900, 8000, "B20A11GD", "ARMJED21"),
    /* 42 */ entry(0xEA00, 10000, "B20R5KFW", "R5KJED21"),
    /* 43 */ entry(0xEB00, 12000, "B20P55FW", "P55JED21"),
    /* 44 */ entry(0xEC00, 12000, "B20P55GD", "P55JED21"),
    /* 45 */ entry(0xED00, 13000, "B20PA6FW", "PA6JED21"),
    /* 46 */ entry(0xEE00, 13000, "B20PA6GD", "PA6JED21"),
    /* 47 */ entry(0xEF00, 14000, "B20SWDFW", "SWDJED21"),
    /* 48 */ entry(0xF000, 14000, "B20SWDGD", "SWDJED21"),
    /* 49 */ entry(0xF100, 14000, "B20SV8FW", "SWDJED21"),
    /* 50 */ entry(0xF200, 14000, "B20SV8GD", "SWDJED21"),
];

static B10_SETUP_INFO: [ArtifactEntry; 51] = [
    /* 00 */ entry(0x0000, 0, "B10C32FW", "C32JED10"),
    /* 01 */ entry(0x1000, 0, "B10C32AA", "C32JED10"),
    /* 02 */ entry(0x2000, 0, "B10C32WR", "C32JED10"),
    /* 03 */ entry(0x3000, 1000, "B10PPCAA", "PPCJED10"),
    /* 04 */ entry(0x4000, 21000, "B10PPCWR", "PPCJWR10"),
    /* 05 */ entry(0x5000, 1000, "B10PPCFW", "PPCJED10"),
    /* 06 */ entry(0x6000, 5000, "B10MCFFW", "MCFJED10"),
    /* 07 */ entry(0x7000, 3000, "B10C12FW", "C12JED10"),
    /* 08 */ entry(0x8000, 4000, "B10MMCFW", "MMCJED10"),
    /* 09 */ entry(0x9000, 8000, "B10ARMWR", "ARMJED10"),
    /* 10 */ entry(0xA000, 8000, "B10ARMFW", "ARMJED10"),
    /* 11 */ entry(0xB000, 6000, "B10TRIFW", "TRIJED10"),
    /* 12 */ entry(0xCC00, 0, "B10C32GD", "C32JED10"),
    /* 13 */ entry(0xCD00, 1000, "B10PPCGD", "PPCJED10"),
    /* 14 */ entry(0xCE00, 8000, "B10ARMGD", "ARMJED10"),
    /* 15 */ entry(0xCF00, 4000, "B10MMCGD", "MMCJED10"),
    /* 16 */ entry(0xD000, 4000, "B10MMCWR", "MMCJED10"),
    /* 17 */ entry(0xD100, 7000, "B10COPFW", "COPJED10"),
    /* 18 */ entry(0xD200, 7000, "B10COPWR", "COPJED10"),
    /* 19 */ entry(0xD300, 7000, "B10COPGD", "COPJED10"),
    /* 20 */ entry(0xD400, 9000, "B10PP4FW", "PP4JED10"),
    /* 21 */ entry(0xD500, 9000, "B10PP4WR", "PP4JED10"),
    /* 22 */ entry(0xD600, 9000, "B10PP4GD", "PP4JED10"),
    /* 23 */ entry(0xD700, 6000, NOT_SUPP, NOT_SUPP),
    /* 24 */ entry(0xD800, 6000, "B10TRIGD", "TRIJED10"),
    /* 25 */ entry(0xD900, 5000, NOT_SUPP, NOT_SUPP),
    /* 26 */ entry(0xDA00, 5000, "B10MCFGD", "MCFJED10"),
    /* 27 */ entry(0xDB00, 7000, "B10PWSFW", "COPJED10"),
    /* 28 */ entry(0xDC00, 7000, "B10PWSWR", "COPJED10"),
    /* 29 */ entry(0xDD00, 7000, "B10PWSGD", "COPJED10"),
    /* 30 */ entry(0xDE00, 10000, "B10R4KFW", "R4KJED10"),
    /* 31 */ entry(0xDF00, 10000, "B10XLSGD", "XLSJED10"),
    /* 32 */ entry(0xE000, 10000, "B10R4KGD", "R4KJED10"),
    /* 33 */ entry(0xE100, 11000, "B10XSCFW", "XSCJED10"),
    /* 34 */ entry(0xE200, 11000, NOT_SUPP, NOT_SUPP),
    /* 35 */ entry(0xE300, 11000, "B10XSCGD", "XSCJED10"),
    /* 36 */ entry(0xE400, 10000, "B10R5KGD", "R5KJED10"),
    /* 37 */ entry(0xE500, 7000, "B10PQ3FW", "COPJED10"),
    /* 38 */ entry(0xE600, 7000, NOT_SUPP, NOT_SUPP),
    /* 39 */ entry(0xE700, 7000, "B10PQ3GD", "COPJED10"),
    /* 40 */ entry(0xE800, 8000, "B10A11FW", "ARMJED10"),
    /* 41 */ entry(0xE900, 8000, "B10A11GD", "ARMJED10"),
    /* 42 */ entry(0xEA00, 10000, "B10R5KFW", "R5KJED10"),
    /* 43 */ entry(0xEB00, 12000, "B10P55FW", "P55JED10"),
    /* 44 */ entry(0xEC00, 12000, "B10P55GD", "P55JED10"),
    /* 45 */ entry(0xED00, 13000, "B10PA6FW", "PA6JED10"),
    /* 46 */ entry(0xEE00, 13000, "B10PA6GD", "PA6JED10"),
    /* 47 */ entry(0xEF00, 13000, "B10SWDFW", "SWDJED10"),
    /* 48 */ entry(0xF000, 13000, "B10SWDGD", "SWDJED10"),
    /* 49 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
    /* 50 */ entry(0xE300, 7000, NOT_SUPP, NOT_SUPP),
];

static B30_SETUP_INFO: [ArtifactEntry; 51] = [
    /* 00 */ entry(0 << 8, 0, "B30C32FW", ""),
    /* 01 */ entry(1 << 8, 0, "B30C32AA", ""),
    /* 02 */ entry(2 << 8, 0, "B30C32WR", ""),
    /* 03 */ entry(3 << 8, 0, "B30PPCAA", ""),
    /* 04 */ entry(4 << 8, 0, "B30PPCWR", ""),
    /* 05 */ entry(5 << 8, 0, "B30PPCFW", ""),
    /* 06 */ entry(6 << 8, 0, "B30MCFFW", ""),
    /* 07 */ entry(7 << 8, 0, "B30C12FW", ""),
    /* 08 */ entry(8 << 8, 0, "B30MMCFW", ""),
    /* 09 */ entry(9 << 8, 0, "B30ARMWR", ""),
    /* 10 */ entry(10 << 8, 0, "B30ARMFW", ""),
    /* 11 */ entry(11 << 8, 0, "B30TRIFW", ""),
    /* 12 */ entry(12 << 8, 0, "B30C32GD", ""),
    /* 13 */ entry(13 << 8, 0, "B30PPCGD", ""),
    /* 14 */ entry(14 << 8, 0, "B30ARMGD", ""),
    /* 15 */ entry(15 << 8, 0, "B30MMCGD", ""),
    /* 16 */ entry(16 << 8, 0, "B30MMCWR", ""),
    /* 17 */ entry(17 << 8, 0, "B30COPFW", ""),
    /* 18 */ entry(18 << 8, 0, "B30COPWR", ""),
    /* 19 */ entry(19 << 8, 0, "B30COPGD", ""),
    /* 20 */ entry(20 << 8, 0, "B30PP4FW", ""),
    /* 21 */ entry(21 << 8, 0, "B30PP4WR", ""),
    /* 22 */ entry(22 << 8, 0, "B30PP4GD", ""),
    /* 23 */ entry(23 << 8, 0, "B30QP4GD", ""),
    /* 24 */ entry(24 << 8, 0, "B30TRIGD", ""),
    /* 25 */ entry(25 << 8, 0, "B30QP4FW", ""),
    /* 26 */ entry(26 << 8, 0, "B30MCFGD", ""),
    /* 27 */ entry(27 << 8, 0, "B30PWSFW", ""),
    /* 28 */ entry(28 << 8, 0, "B30PWSWR", ""),
    /* 29 */ entry(29 << 8, 0, "B30PWSGD", ""),
    /* 30 */ entry(30 << 8, 0, "B30R4KFW", ""),
    /* 31 */ entry(31 << 8, 0, "B30XLSGD", ""),
    /* 32 */ entry(32 << 8, 0, "B30R4KGD", ""),
    /* 33 */ entry(33 << 8, 0, "B30XSCFW", ""),
    /* 34 */ entry(34 << 8, 0, "B30AV8FW", ""),
    /* 35 */ entry(35 << 8, 0, "B30XSCGD", ""),
    /* 36 */ entry(36 << 8, 0, "B30R5KGD", ""),
    /* 37 */ entry(37 << 8, 0, "B30PQ3FW", ""),
    /* 38 */ entry(38 << 8, 0, "B30AV8GD", ""),
    /* 39 */ entry(39 << 8, 0, "B30PQ3GD", ""),
    /* 40 */ entry(40 << 8, 0, "B30A11FW", ""),
    /* 41 */ entry(41 << 8, 0, "B30A11GD", ""),
    /* 42 */ entry(42 << 8, 0, "B30R5KFW", ""),
    /* 43 */ entry(43 << 8, 0, "B30P55FW", ""),
    /* 44 */ entry(44 << 8, 0, "B30P55GD", ""),
    /* 45 */ entry(45 << 8, 0, "B30PA6FW", ""),
    /* 46 */ entry(46 << 8, 0, "B30PA6GD", ""),
    /* 47 */ entry(47 << 8, 0, "B30SWDFW", ""),
    /* 48 */ entry(48 << 8, 0, "B30SWDGD", ""),
    /* 49 */ entry(49 << 8, 0, "B30SV8FW", ""),
    /* 50 */ entry(50 << 8, 0, "B30SV8GD", ""),
];

/// Display names for the firmware-type index.
pub static FIRMWARE_TYPE_NAMES: [&str; 51] = [
    /* 00 */ "Firmware for CPU32",
    /* 01 */ "bdiAda for CPU32",
    /* 02 */ "bdiWind for CPU32",
    /* 03 */ "bdiAda for MPC8xx",
    /* 04 */ "bdiWind for MPC8xx",
    /* 05 */ "Firmware for MPC8xx/MPC5xx",
    /* 06 */ "Firmware for ColdFire",
    /* 07 */ "Firmware for HC12",
    /* 08 */ "Firmware for M-CORE",
    /* 09 */ "bdiWind for ARM7/9",
    /* 10 */ "Firmware for ARM7/9",
    /* 11 */ "Firmware for TriCore",
    /* 12 */ "bdiGDB for CPU32",
    /* 13 */ "bdiGDB for MPC8xx/MPC5xx",
    /* 14 */ "bdiGDB for ARM7/9",
    /* 15 */ "bdiGDB for M-CORE",
    /* 16 */ "bdiWind for M-CORE",
    /* 17 */ "Firmware for PPC6xx/PPC7xx",
    /* 18 */ "bdiWind for PPC6xx/PPC7xx",
    /* 19 */ "bdiGDB for PPC6xx/PPC7xx",
    /* 20 */ "Firmware for PPC400",
    /* 21 */ "bdiWind for PPC400",
    /* 22 */ "bdiGDB for PPC400",
    /* 23 */ "bdiGDB for QorIQ P3/P4/P5/T1/T2/T4",
    /* 24 */ "bdiGDB for TriCore",
    /* 25 */ "Firmware for QorIQ P3/P4/P5/T1/T2/T4",
    /* 26 */ "bdiGDB for ColdFire",
    /* 27 */ "Firmware for MPC7450",
    /* 28 */ "bdiWind for MPC7450",
    /* 29 */ "bdiGDB for MPC7450",
    /* 30 */ "Firmware for MIPS32",
    /* 31 */ "bdiGDB for XLS/XLR",
    /* 32 */ "bdiGDB for MIPS32",
    /* 33 */ "Firmware for XScale",
    /* 34 */ "Firmware for ARMV8",
    /* 35 */ "bdiGDB for XScale",
    /* 36 */ "bdiGDB for MIPS64",
    /* 37 */ "Firmware for MPC85xx",
    /* 38 */ "bdiGDB for ARMV8",
    /* 39 */ "bdiGDB for MPC85xx",
    /* 40 */ "Firmware for ARM11",
    /* 41 */ "bdiGDB for ARM11",
    /* 42 */ "Firmware for MIPS64",
    /* 43 */ "Firmware for MPC5500",
    /* 44 */ "bdiGDB for MPC5500",
    /* 45 */ "Firmware for PA6T",
    /* 46 */ "bdiGDB for PA6T",
    /* 47 */ "Firmware for ARM-SWD",
    /* 48 */ "bdiGDB for ARM-SWD",
    /* 49 */ "Firmware for ARMV8-SWD",
    /* 50 */ "bdiGDB for ARMV8-SWD",
];

/// Display names for the logic-type index (logic version / 1000).
pub static LOGIC_TYPE_NAMES: [&str; 22] = [
    /* 00 */ "CPU32/CPU16",
    /* 01 */ "MPC8xx/MPC5xx",
    /* 02 */ "ColdFire V2",
    /* 03 */ "HC12",
    /* 04 */ "M-CORE",
    /* 05 */ "ColdFire",
    /* 06 */ "TriCore",
    /* 07 */ "PPC6xx/PPC7xx",
    /* 08 */ "ARM",
    /* 09 */ "PPC400",
    /* 10 */ "MIPS32/MIPS64",
    /* 11 */ "XScale",
    /* 12 */ "MPC5500",
    /* 13 */ "PA6T",
    /* 14 */ "ARM-SWD",
    /* 15 */ "unknown 15",
    /* 16 */ "unknown 16",
    /* 17 */ "unknown 17",
    /* 18 */ "unknown 18",
    /* 19 */ "unknown 19",
    /* 20 */ "unknown 20",
    /* 21 */ "MPC8xx spez. for Tornado",
];

/// The debugger application the firmware embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Application {
    Gdb,
    Tornado,
    Ada,
    Access,
}

impl FromStr for Application {
    type Err = Error;

    fn from_str(s: &str) -> Result<Application, Error> {
        match s.to_ascii_uppercase().as_str() {
            "GDB" => Ok(Application::Gdb),
            "TOR" => Ok(Application::Tornado),
            "ADA" => Ok(Application::Ada),
            "ACC" | "STD" => Ok(Application::Access),
            _ => Err(Error::InvalidParameter),
        }
    }
}

/// The target CPU group the firmware talks to. Many user-facing CPU names
/// collapse onto one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCpu {
    Cpu32,
    Mpc800,
    Ppc600,
    Ppc400,
    Arm,
    Tricore,
    Coldfire,
    Hc12,
    Mcore,
    Mpc7450,
    Mips32,
    Xscale,
    Mips64,
    Mpc8500,
    Arm11,
    Mpc5500,
    Pa6t,
    ArmSwd,
    Xls,
    P4080,
    Armv8,
    Swdv8,
}

impl TargetCpu {
    fn index(self) -> usize {
        match self {
            TargetCpu::Cpu32 => 0,
            TargetCpu::Mpc800 => 1,
            TargetCpu::Ppc600 => 2,
            TargetCpu::Ppc400 => 3,
            TargetCpu::Arm => 4,
            TargetCpu::Tricore => 5,
            TargetCpu::Coldfire => 6,
            TargetCpu::Hc12 => 7,
            TargetCpu::Mcore => 8,
            TargetCpu::Mpc7450 => 9,
            TargetCpu::Mips32 => 10,
            TargetCpu::Xscale => 11,
            TargetCpu::Mips64 => 12,
            TargetCpu::Mpc8500 => 13,
            TargetCpu::Arm11 => 14,
            TargetCpu::Mpc5500 => 15,
            TargetCpu::Pa6t => 16,
            TargetCpu::ArmSwd => 17,
            TargetCpu::Xls => 18,
            TargetCpu::P4080 => 19,
            TargetCpu::Armv8 => 20,
            TargetCpu::Swdv8 => 21,
        }
    }
}

impl FromStr for TargetCpu {
    type Err = Error;

    fn from_str(s: &str) -> Result<TargetCpu, Error> {
        match s.to_ascii_uppercase().as_str() {
            "CPU32" => Ok(TargetCpu::Cpu32),
            "MPC500" | "MPC800" => Ok(TargetCpu::Mpc800),
            "PPC600" | "PPC700" | "MPC7400" | "MPC8200" | "MPC8300" => Ok(TargetCpu::Ppc600),
            "PPC400" => Ok(TargetCpu::Ppc400),
            "ARM" => Ok(TargetCpu::Arm),
            "TRICORE" => Ok(TargetCpu::Tricore),
            "MCF" => Ok(TargetCpu::Coldfire),
            "HC12" => Ok(TargetCpu::Hc12),
            "MCORE" => Ok(TargetCpu::Mcore),
            "MPC7450" | "MPC8641" => Ok(TargetCpu::Mpc7450),
            "MIPS" | "MIPS32" => Ok(TargetCpu::Mips32),
            "XSCALE" => Ok(TargetCpu::Xscale),
            "MIPS64" => Ok(TargetCpu::Mips64),
            "MPC8500" | "PQ3" | "P1020" | "P2020" => Ok(TargetCpu::Mpc8500),
            "ARM11" => Ok(TargetCpu::Arm11),
            "MPC5500" => Ok(TargetCpu::Mpc5500),
            "PA6T" => Ok(TargetCpu::Pa6t),
            "ARMSWD" => Ok(TargetCpu::ArmSwd),
            "XLS" | "XLR" => Ok(TargetCpu::Xls),
            "P3041" | "P4080" | "P5020" | "QP3" | "QP4" | "QP5" => Ok(TargetCpu::P4080),
            "ARMV8" => Ok(TargetCpu::Armv8),
            "SWDV8" => Ok(TargetCpu::Swdv8),
            _ => Err(Error::InvalidParameter),
        }
    }
}

/// Target index per (application, CPU group); `-1` marks combinations that
/// do not exist.
#[rustfmt::skip]
static APP_CPU_TO_TARGET: [[i8; 22]; 4] = [
    /*          C32 PPC COP PP4 ARM TRI MCF HC12 MCO 7450 R4K XSC R5K PQ3 A11 P55 PA6 SWD XLS QP4 AV8 SV8 */
    /* GDB */ [ 12, 13, 19, 22, 14, 24, 26, -1,  15, 29,  32, 35, 36, 39, 41, 44, 46, 48, 31, 23, 38, 50 ],
    /* TOR */ [  2,  4, 18, 21,  9, -1, 25, -1,  -1, -1,  -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1 ],
    /* ADA */ [  1,  3, -1, -1, -1, -1, -1, -1,  -1, -1,  -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1 ],
    /* ACC */ [  0,  5, 17, 20, 10, 11,  6,  7,   8, 27,  30, 33, 42, 37, 40, 43, 45, 47, -1, 25, 34, 49 ],
];

/// Resolves the artifact-table index for an application/CPU pair.
pub fn target_index(application: Application, cpu: TargetCpu) -> Option<usize> {
    let row = match application {
        Application::Gdb => 0,
        Application::Tornado => 1,
        Application::Ada => 2,
        Application::Access => 3,
    };
    match APP_CPU_TO_TARGET[row][cpu.index()] {
        index if index >= 0 => Some(index as usize),
        _ => None,
    }
}

/// Parses a `.NNN` version extension; anything else reads as version 0.
fn extension_version(extension: &str) -> u16 {
    let bytes = extension.as_bytes();
    if bytes.len() != 4 {
        return 0;
    }
    let mut version = 0u16;
    for &byte in &bytes[1..] {
        if !byte.is_ascii_digit() {
            return 0;
        }
        version = version * 10 + u16::from(byte - b'0');
    }
    version
}

/// Finds the newest revision of `base` in `directory`.
///
/// Matches are case-insensitive on the base name and require exactly a
/// four-character version extension. Returns the version and full path of
/// the winner.
pub fn find_newest(directory: &Path, base: &str) -> Option<(u16, PathBuf)> {
    let mut newest: Option<(u16, PathBuf)> = None;

    for dir_entry in fs::read_dir(directory).ok()? {
        let dir_entry = match dir_entry {
            Ok(dir_entry) => dir_entry,
            Err(_) => continue,
        };
        let name = dir_entry.file_name();
        let name = match name.to_str() {
            Some(name) => name,
            None => continue,
        };
        if name.len() != base.len() + 4 || !name[..base.len()].eq_ignore_ascii_case(base) {
            continue;
        }
        let version = extension_version(&name[base.len()..]);
        if version > newest.as_ref().map_or(0, |(newest, _)| *newest) {
            newest = Some((version, dir_entry.path()));
        }
    }

    newest
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn resolves_well_known_target_indexes() {
        assert_eq!(
            target_index(Application::Gdb, TargetCpu::Mpc800),
            Some(13)
        );
        assert_eq!(target_index(Application::Access, TargetCpu::Cpu32), Some(0));
        assert_eq!(target_index(Application::Gdb, TargetCpu::Swdv8), Some(50));
        assert_eq!(target_index(Application::Ada, TargetCpu::Arm), None);
        assert_eq!(target_index(Application::Tornado, TargetCpu::Tricore), None);
    }

    #[test]
    fn the_gdb_mpc800_row_names_the_expected_artifacts() {
        let entry = &setup_info(crate::loader::BdiFamily::Bdi2000)[13];
        assert_eq!(entry.firmware_type, 0xCD00);
        assert_eq!(entry.logic_type, 1000);
        assert_eq!(entry.firmware_name, "B20PPCGD");
        assert_eq!(entry.logic_name, "PPCJED20");
    }

    #[test]
    fn unsupported_rows_are_flagged() {
        assert!(!setup_info(crate::loader::BdiFamily::Hs)[13].is_supported());
        assert!(setup_info(crate::loader::BdiFamily::Bdi1000)[13].is_supported());
    }

    #[test]
    fn parses_version_extensions() {
        assert_eq!(extension_version(".120"), 120);
        assert_eq!(extension_version(".001"), 1);
        assert_eq!(extension_version(".12"), 0);
        assert_eq!(extension_version(".a20"), 0);
        assert_eq!(extension_version(""), 0);
    }

    #[test]
    fn picks_the_newest_revision_case_insensitively() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("bdisetup-catalog-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        for name in &["b20ppcgd.118", "B20PPCGD.120", "b20ppcgd.119", "b20ppcgd.bak"] {
            fs::write(dir.join(name), b"").unwrap();
        }

        let (version, path) = find_newest(&dir, "B20PPCGD").unwrap();
        assert_eq!(version, 120);
        assert_eq!(path.file_name().unwrap(), "B20PPCGD.120");

        assert!(find_newest(&dir, "B30PPCGD").is_none());
        fs::remove_dir_all(&dir).unwrap();
    }
}
