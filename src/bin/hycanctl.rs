// hycan/src/bin/hycanctl.rs

//! Command-line client for the HyCAN daemon: query or change an interface's
//! state without writing any code against the library.

use anyhow::{anyhow, Result};
use clap::{arg, value_parser, Command};
use hycan::config::HyCanConfig;
use hycan::daemon_client;
use hycan::{CanFrame, Sender};
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn run(iface_name: &str, opts: &clap::ArgMatches) -> Result<()> {
    let config = HyCanConfig::default();

    if opts.subcommand_matches("up").is_some() {
        let sub_opts = opts.subcommand_matches("up").unwrap();
        let bitrate = *sub_opts.get_one::<u32>("bitrate").unwrap_or(&1_000_000);
        daemon_client::set_interface_state(&config, iface_name, true, bitrate)
            .map_err(|e| anyhow!("{}", e.message))?;
        println!("{iface_name} up at {bitrate} bps");
    } else if opts.subcommand_matches("down").is_some() {
        daemon_client::set_interface_state(&config, iface_name, false, 0)
            .map_err(|e| anyhow!("{}", e.message))?;
        println!("{iface_name} down");
    } else if opts.subcommand_matches("exists").is_some() {
        let exists = daemon_client::interface_exists(&config, iface_name).map_err(|e| anyhow!("{}", e.message))?;
        println!("{exists}");
    } else if opts.subcommand_matches("is-up").is_some() {
        let is_up = daemon_client::interface_is_up(&config, iface_name).map_err(|e| anyhow!("{}", e.message))?;
        println!("{is_up}");
    } else if opts.subcommand_matches("create-vcan").is_some() {
        daemon_client::create_vcan_interface(&config, iface_name).map_err(|e| anyhow!("{}", e.message))?;
        println!("{iface_name} created");
    } else if let Some(sub_opts) = opts.subcommand_matches("send") {
        let id = *sub_opts.get_one::<u16>("id").unwrap();
        let data: Vec<u8> = sub_opts
            .get_many::<u8>("data")
            .map(|values| values.copied().collect())
            .unwrap_or_default();
        let frame = CanFrame::new(id, &data).map_err(|e| anyhow!("{}", e.message))?;
        let mut sender = Sender::new(iface_name);
        sender.send(frame).map_err(|e| anyhow!("{}", e.message))?;
        println!("sent frame {:#05X} ({} bytes) on {iface_name}", id, data.len());
    } else {
        return Err(anyhow!("Need to specify a subcommand (--help for a list)."));
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let opts = Command::new("hycanctl")
        .version(VERSION)
        .about("Command line client for the HyCAN netlink daemon")
        .arg(
            arg!(<iface> "The CAN interface to operate on, like 'can0', 'vcan0', etc")
                .required(true)
                .index(1),
        )
        .subcommand(
            Command::new("up").about("Bring the interface up").arg(
                arg!(--bitrate <HZ> "Bit rate to apply before bringing the interface up")
                    .required(false)
                    .value_parser(value_parser!(u32)),
            ),
        )
        .subcommand(Command::new("down").about("Bring the interface down"))
        .subcommand(Command::new("exists").about("Check whether the interface exists"))
        .subcommand(Command::new("is-up").about("Check whether the interface is administratively up"))
        .subcommand(Command::new("create-vcan").about("Create the interface as a vcan device if missing"))
        .subcommand(
            Command::new("send")
                .about("Send one CAN frame")
                .arg(
                    arg!(<id> "CAN identifier, 0-2047")
                        .required(true)
                        .value_parser(value_parser!(u16)),
                )
                .arg(
                    arg!([data] ... "Data bytes, 0-8 of them")
                        .value_parser(value_parser!(u8)),
                ),
        )
        .get_matches();

    let iface_name = opts.get_one::<String>("iface").unwrap();

    if let Err(err) = run(iface_name, &opts) {
        eprintln!("{}", err);
        process::exit(1);
    }
}
