// hycan/src/bin/hycand.rs

//! The privileged HyCAN daemon: owns netlink access on behalf of
//! unprivileged clients so the rest of the library never needs
//! `CAP_NET_ADMIN` itself.

use anyhow::{anyhow, Result};
use clap::{arg, value_parser, Command};
use hycan::config::HyCanConfig;
use hycan::daemon::server::{require_root, DaemonServer};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const VERSION: &str = env!("CARGO_PKG_VERSION");

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_shutdown_signal(_: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Release);
}

fn install_signal_handlers() -> Result<()> {
    use nix::sys::signal::{self, SigHandler, Signal};

    unsafe {
        signal::signal(Signal::SIGINT, SigHandler::Handler(on_shutdown_signal))
            .map_err(|e| anyhow!("failed to install SIGINT handler: {e}"))?;
        signal::signal(Signal::SIGTERM, SigHandler::Handler(on_shutdown_signal))
            .map_err(|e| anyhow!("failed to install SIGTERM handler: {e}"))?;
    }
    Ok(())
}

fn run(opts: &clap::ArgMatches) -> Result<()> {
    require_root()?;
    install_signal_handlers()?;

    let mut config = HyCanConfig::default();
    if let Some(dir) = opts.get_one::<PathBuf>("socket-dir") {
        config.socket_dir = dir.clone();
    }

    log::info!("hycand starting, socket dir: {}", config.socket_dir.display());
    let server = Arc::new(DaemonServer::new(config));

    let watcher_server = Arc::clone(&server);
    thread::spawn(move || {
        while !SHUTDOWN_REQUESTED.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(200));
        }
        log::info!("shutdown signal received");
        watcher_server.stop();
    });

    server.run().map_err(|e| anyhow!("{}", e.message))
}

fn main() {
    env_logger::init();

    let opts = Command::new("hycand")
        .version(VERSION)
        .about("Privileged netlink daemon for HyCAN clients")
        .arg(
            arg!(--"socket-dir" <DIR> "Directory for the registration and session sockets (default: /run)")
                .required(false)
                .value_parser(value_parser!(PathBuf)),
        )
        .get_matches();

    if let Err(err) = run(&opts) {
        eprintln!("{}", err);
        process::exit(1);
    }
}
