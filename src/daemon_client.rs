// hycan/src/daemon_client.rs
//
// Client-side handshake with the privileged netlink daemon.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The Daemon Client component (E).
//!
//! A process-wide singleton: the first call to any of [`set_interface_state`],
//! [`interface_exists`], [`interface_is_up`], or [`create_vcan_interface`]
//! registers with the daemon over its well-known registration socket, which
//! hands back a per-process session socket name. Every later call reuses
//! that session rather than re-registering.
//!
//! If the daemon is unreachable or a request fails, [`set_interface_state`]
//! falls back to shelling out to `ip link` (gated behind the
//! `fallback-shell` feature, since spawning a setuid-adjacent subprocess is
//! a choice individual embedders should opt into, not a silent default).

use crate::config::HyCanConfig;
use crate::errors::{Error, ErrorKind};
use crate::ipc::{IpcStream, NetlinkOp, NetlinkRequest, NetlinkResponse, RegisterRequest, RegisterResponse};
use std::sync::OnceLock;
use std::sync::Mutex;

struct Session {
    channel_name: String,
}

static SESSION: OnceLock<Mutex<Option<Session>>> = OnceLock::new();

fn session_cell() -> &'static Mutex<Option<Session>> {
    SESSION.get_or_init(|| Mutex::new(None))
}

/// Register with the daemon if this process hasn't already, returning the
/// per-process session socket path.
fn ensure_registered(config: &HyCanConfig) -> Result<std::path::PathBuf, Error> {
    let mut guard = session_cell().lock().unwrap();
    if let Some(session) = guard.as_ref() {
        return Ok(config.session_socket_path(&session.channel_name));
    }

    let mut stream = IpcStream::connect(config.registration_socket_path())
        .map_err(|e| Error::new(ErrorKind::Ipc, format!("failed to reach daemon: {}", e.message)))?;

    let request = RegisterRequest {
        pid: std::process::id() as i32,
    };
    stream.send(&request)?;

    let response: RegisterResponse = stream.recv(config.response_timeout)?;
    if response.result != 0 {
        return Err(Error::new(ErrorKind::DaemonRequest, "daemon refused registration"));
    }

    let channel_name = response.channel_name();
    let path = config.session_socket_path(&channel_name);
    *guard = Some(Session { channel_name });
    Ok(path)
}

fn send_request(config: &HyCanConfig, request: NetlinkRequest) -> Result<NetlinkResponse, Error> {
    let path = ensure_registered(config)?;
    let mut stream = IpcStream::connect(&path)
        .map_err(|e| Error::new(ErrorKind::Ipc, format!("failed to reach session channel: {}", e.message)))?;
    stream.send(&request)?;
    stream.recv(config.response_timeout)
}

/// Shell out to `ip link` as a last resort when the daemon is unreachable.
#[cfg(feature = "fallback-shell")]
fn fallback_system_call(interface_name: &str, up: bool, bitrate: u32) -> Result<(), Error> {
    use std::process::Command;

    if up && interface_name.starts_with("can") {
        let status = Command::new("sudo")
            .args([
                "ip",
                "link",
                "set",
                interface_name,
                "type",
                "can",
                "bitrate",
                &bitrate.to_string(),
            ])
            .status()
            .map_err(|e| Error::from_io(ErrorKind::DaemonRequest, e))?;
        if !status.success() {
            return Err(Error::new(
                ErrorKind::NetlinkBringUp,
                format!("fallback bitrate command failed for '{interface_name}'"),
            ));
        }
    }

    let state = if up { "up" } else { "down" };
    let status = Command::new("sudo")
        .args(["ip", "link", "set", interface_name, state])
        .status()
        .map_err(|e| Error::from_io(ErrorKind::DaemonRequest, e))?;
    if !status.success() {
        let kind = if up {
            ErrorKind::NetlinkBringUp
        } else {
            ErrorKind::NetlinkBringDown
        };
        return Err(Error::new(kind, format!("fallback '{state}' command failed for '{interface_name}'")));
    }
    Ok(())
}

/// Ask the daemon to bring `interface_name` up or down, optionally setting a
/// bitrate and creating a missing vcan interface first. The vcan-create step
/// happens atomically on the daemon side as part of the same `SetState`
/// request, so a failure to create the interface is reported as the actual
/// failure rather than surfacing later as a generic state-change error.
/// Falls back to a shell command if the daemon request fails and
/// `fallback-shell` is enabled.
pub fn set_interface_state(
    config: &HyCanConfig,
    interface_name: &str,
    up: bool,
    bitrate: u32,
) -> Result<(), Error> {
    let is_can = interface_name.starts_with("can");
    let needs_vcan = interface_name.starts_with("vcan");

    let request = NetlinkRequest::with_vcan_create(
        NetlinkOp::SetState,
        interface_name,
        up,
        is_can && up,
        bitrate,
        needs_vcan && up,
    );

    match send_request(config, request) {
        Ok(response) if response.is_success() => Ok(()),
        Ok(response) => Err(Error::new(
            if up { ErrorKind::NetlinkBringUp } else { ErrorKind::NetlinkBringDown },
            format!("daemon failed to set state for '{interface_name}': {}", response.error_message()),
        )),
        Err(e) => {
            log::warn!("daemon request failed for '{interface_name}': {}", e.message);
            #[cfg(feature = "fallback-shell")]
            {
                return fallback_system_call(interface_name, up, bitrate);
            }
            #[cfg(not(feature = "fallback-shell"))]
            {
                Err(e)
            }
        }
    }
}

/// Ask the daemon whether `interface_name` currently exists.
pub fn interface_exists(config: &HyCanConfig, interface_name: &str) -> Result<bool, Error> {
    let request = NetlinkRequest::new(NetlinkOp::InterfaceExists, interface_name, false, false, 0);
    let response = send_request(config, request)?;
    if !response.is_success() {
        return Err(Error::new(
            ErrorKind::VcanCheck,
            format!("failed to check if '{interface_name}' exists: {}", response.error_message()),
        ));
    }
    Ok(response.exists != 0)
}

/// Ask the daemon whether `interface_name` is currently up.
pub fn interface_is_up(config: &HyCanConfig, interface_name: &str) -> Result<bool, Error> {
    let request = NetlinkRequest::new(NetlinkOp::InterfaceIsUp, interface_name, false, false, 0);
    let response = send_request(config, request)?;
    if !response.is_success() {
        return Err(Error::new(
            ErrorKind::NetlinkInterfaceNotFound,
            format!("failed to check if '{interface_name}' is up: {}", response.error_message()),
        ));
    }
    Ok(response.is_up != 0)
}

/// Ask the daemon to create a vcan interface named `interface_name` if one
/// doesn't already exist.
pub fn create_vcan_interface(config: &HyCanConfig, interface_name: &str) -> Result<(), Error> {
    let request = NetlinkRequest::new(NetlinkOp::CreateVcan, interface_name, false, false, 0);
    let response = send_request(config, request)?;
    if !response.is_success() {
        return Err(Error::new(
            ErrorKind::VcanCreate,
            format!("daemon failed to create '{interface_name}': {}", response.error_message()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_interface_state_without_daemon_errors_or_falls_back() {
        let config = HyCanConfig {
            socket_dir: std::env::temp_dir(),
            response_timeout: std::time::Duration::from_millis(100),
            ..HyCanConfig::default()
        };
        let result = set_interface_state(&config, "vcan_no_daemon_test", true, 500_000);
        #[cfg(not(feature = "fallback-shell"))]
        assert!(result.is_err());
        let _ = result;
    }
}
