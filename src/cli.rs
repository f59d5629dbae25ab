//! Command line definitions.

use std::net::Ipv4Addr;

use structopt::StructOpt;

use crate::catalog::{Application, TargetCpu};
use crate::Error;

/// Connection parameters shared by every command.
#[derive(StructOpt, Debug)]
pub struct LinkOpts {
    /// Serial device, or host name/IP address of a networked probe
    #[structopt(short = "p", long = "port", default_value = "/dev/ttyS0")]
    pub port: String,

    /// Serial baudrate: 9, 19, 38, 57 or 115
    #[structopt(
        short = "b",
        long = "baudrate",
        default_value = "38",
        parse(try_from_str = parse_baudrate)
    )]
    pub baudrate: u32,
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Read the loaded loader/firmware/logic versions
    Version {
        #[structopt(flatten)]
        link: LinkOpts,

        /// Exit the loader and start the firmware afterwards
        #[structopt(short = "s", long)]
        start: bool,
    },
    /// Erase the firmware and the CPLD
    Erase {
        #[structopt(flatten)]
        link: LinkOpts,
    },
    /// Update the firmware and/or the CPLD from a directory of artifacts
    Update {
        #[structopt(flatten)]
        link: LinkOpts,

        /// Application type: STD, GDB, ADA, TOR or ACC
        #[structopt(short = "a", long, default_value = "GDB")]
        application: Application,

        /// Target CPU, e.g. MPC800, PPC600, ARM, MIPS, XSCALE
        #[structopt(short = "t", long, default_value = "MPC800")]
        target: TargetCpu,

        /// Directory with the firmware/logic files, or a BDI3000 firmware
        /// file
        #[structopt(short = "d", long, default_value = ".")]
        directory: String,
    },
    /// Program the network configuration
    Config {
        #[structopt(flatten)]
        link: LinkOpts,

        /// BDI IP address; 0.0.0.0 selects BOOTP
        #[structopt(short = "i", long = "ip", default_value = "0.0.0.0")]
        bdi_ip: Ipv4Addr,

        /// Host IP address serving the configuration file
        #[structopt(short = "H", long = "host", default_value = "255.255.255.255")]
        host_ip: Ipv4Addr,

        /// Subnet mask; 255.255.255.255 disables the gateway
        #[structopt(short = "m", long = "mask", default_value = "255.255.255.255")]
        subnet_mask: Ipv4Addr,

        /// Default gateway IP address
        #[structopt(short = "g", long = "gateway", default_value = "255.255.255.255")]
        gateway: Ipv4Addr,

        /// Configuration file name; without a host IP the file is burned
        /// into the probe's flash
        #[structopt(short = "f", long = "file", default_value = "")]
        config_file: String,
    },
}

#[derive(StructOpt, Debug)]
#[structopt(
    name = "bdisetup",
    about = "Update the firmware, CPLD and network configuration of Abatron BDI debug probes"
)]
pub struct Opts {
    #[structopt(subcommand)]
    pub command: Command,
}

fn parse_baudrate(value: &str) -> Result<u32, Error> {
    match value {
        "9" | "9600" => Ok(9600),
        "19" | "19200" => Ok(19_200),
        "38" | "38400" => Ok(38_400),
        "57" | "57600" => Ok(57_600),
        "115" | "115200" => Ok(115_200),
        _ => Err(Error::InvalidParameter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_short_and_full_baudrates() {
        assert_eq!(parse_baudrate("9").unwrap(), 9600);
        assert_eq!(parse_baudrate("115").unwrap(), 115_200);
        assert_eq!(parse_baudrate("57600").unwrap(), 57_600);
        assert!(parse_baudrate("4800").is_err());
    }

    #[test]
    fn parses_an_update_command() {
        let opts = Opts::from_iter(&[
            "bdisetup", "update", "-p", "/dev/ttyS1", "-b", "57", "-a", "GDB", "-t", "MPC800",
            "-d", "/tmp/fw",
        ]);
        match opts.command {
            Command::Update {
                link,
                application,
                target,
                directory,
            } => {
                assert_eq!(link.port, "/dev/ttyS1");
                assert_eq!(link.baudrate, 57_600);
                assert_eq!(application, Application::Gdb);
                assert_eq!(target, TargetCpu::Mpc800);
                assert_eq!(directory, "/tmp/fw");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
