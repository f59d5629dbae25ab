use std::net::Ipv4Addr;
use std::process;

use anyhow::Context;
use structopt::StructOpt;

use bdisetup::cli::{Command, LinkOpts, Opts};
use bdisetup::loader::{version_string, BdiFamily};
use bdisetup::{catalog, netcfg, update, Error};

fn main() {
    pretty_env_logger::init();
    let opts = Opts::from_args();

    if let Err(err) = run(opts) {
        eprintln!("Error: {:#}", err);
        // The exit status carries the stable error code.
        let code = err
            .downcast_ref::<Error>()
            .map(Error::code)
            .unwrap_or(-128);
        process::exit(code);
    }
}

fn run(opts: Opts) -> Result<(), anyhow::Error> {
    match opts.command {
        Command::Version { link, start } => display_version(&link, start)?,
        Command::Erase { link } => update::erase_firmware_logic(&link.port, link.baudrate)?,
        Command::Update {
            link,
            application,
            target,
            directory,
        } => {
            let target_index = catalog::target_index(application, target)
                .ok_or(Error::InvalidParameter)
                .context("this application/target combination does not exist")?;
            update::update_firmware_logic(
                &link.port,
                link.baudrate,
                &directory,
                target_index,
                update::UpdateMode::Auto,
            )?;
        }
        Command::Config {
            link,
            bdi_ip,
            host_ip,
            subnet_mask,
            gateway,
            config_file,
        } => {
            let (mut loader, version) = update::connect(&link.port, link.baudrate)?;
            let result = netcfg::update_config(
                &mut loader,
                &version,
                u32::from(bdi_ip),
                u32::from(subnet_mask),
                u32::from(gateway),
                u32::from(host_ip),
                &config_file,
            );
            match &result {
                Ok(()) => println!("Configuration passed"),
                Err(err) => println!("Configuration failed ({})", err.code()),
            }
            result?;
        }
    }
    Ok(())
}

/// The version command: print probe identity, versions and the stored
/// network configuration.
fn display_version(link: &LinkOpts, start: bool) -> Result<(), Error> {
    let (mut loader, version) = update::connect(&link.port, link.baudrate)?;

    if version.family == BdiFamily::Hs {
        println!("BDI Type : {}", version.family.name());
    } else {
        println!("BDI Type : {} (SN: {})", version.family.name(), version.serial);
    }
    println!("Loader   : V{}", version_string(version.loader));

    if version.firmware != 0 {
        let fw_type = catalog::FIRMWARE_TYPE_NAMES
            .get(version.firmware_type() as usize)
            .unwrap_or(&"unknown firmware type");
        println!(
            "Firmware : V{} {}",
            version_string(version.firmware & 0xFF),
            fw_type
        );
    } else {
        println!("Firmware : unknown");
    }

    if version.family.has_cpld() {
        if version.logic != 0 {
            let logic_type = catalog::LOGIC_TYPE_NAMES
                .get(version.logic as usize / 1000)
                .unwrap_or(&"unknown logic type");
            println!(
                "Logic    : V{} {}",
                version_string(version.logic % 1000),
                logic_type
            );
        } else {
            println!("Logic    : unknown");
        }
    }

    if let Some(network_addr) = netcfg::network_addr(version.family) {
        let mut record = [0u8; netcfg::NETWORK_RECORD_SIZE];
        match loader.read_memory(network_addr, &mut record) {
            Ok(()) => {
                println!(
                    "MAC      : {:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}",
                    record[0], record[1], record[2], record[3], record[4], record[5]
                );
                println!("IP Addr  : {}", ipv4(&record[8..12]));
                println!("Subnet   : {}", ipv4(&record[12..16]));
                println!("Gateway  : {}", ipv4(&record[16..20]));
                println!("Host IP  : {}", ipv4(&record[20..24]));
                println!("Config   : {}", config_name(&record[24..]));
            }
            Err(err) => {
                println!("Reading network configuration failed ({})", err.code());
                if start {
                    loader.exit()?;
                }
                return Err(err);
            }
        }
    }

    if start {
        loader.exit()?;
    }
    Ok(())
}

fn ipv4(bytes: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3])
}

fn config_name(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&byte| byte != 0)
        .map(|&byte| byte as char)
        .collect()
}
