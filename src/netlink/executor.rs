// hycan/src/netlink/executor.rs
//
// The four netlink operations the daemon's wire protocol exposes to clients.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The Netlink Executor component (H).
//!
//! Narrows [`super::CanInterface`]'s much broader surface down to the four
//! operations the daemon's wire protocol
//! ([`crate::ipc::NetlinkOp`]) actually performs: existence and
//! up/down checks, vcan creation, and bringing an interface up or down
//! (optionally with a new bitrate).
//!
//! [`NetlinkExecutor`] keeps a small cache of the last [`super::InterfaceDetails`]
//! seen per interface name, refreshed on every call. This is not a
//! persistent netlink cache object, just a refreshed-on-demand map: `neli`
//! queries are cheap one-shot round trips, so there's nothing to amortize
//! beyond avoiding a redundant query within the same call. The executor is
//! not internally synchronized; the daemon server serializes access to one
//! instance per session worker.

use super::{CanInterface, InterfaceDetails};
use crate::errors::{Error, ErrorKind};
use std::collections::HashMap;

/// Executes netlink operations on behalf of the daemon's session workers.
#[derive(Debug, Default)]
pub struct NetlinkExecutor {
    cache: HashMap<String, InterfaceDetails>,
}

impl NetlinkExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query the interface's current details, updating the cache. Returns
    /// `Ok(None)` if the interface does not exist (`ENODEV`), rather than
    /// treating a missing interface as an error.
    fn refresh(&mut self, name: &str) -> Result<Option<InterfaceDetails>, Error> {
        let iface = match CanInterface::open(name) {
            Ok(iface) => iface,
            Err(nix::errno::Errno::ENODEV) => {
                self.cache.remove(name);
                return Ok(None);
            }
            Err(e) => return Err(Error::new(ErrorKind::VcanCheck, e.to_string())),
        };

        match iface.details() {
            Ok(details) => {
                self.cache.insert(name.to_string(), details.clone());
                Ok(Some(details))
            }
            Err(e) => Err(Error::new(ErrorKind::NetlinkConnect, e.to_string())),
        }
    }

    /// Whether `name` currently exists.
    pub fn check_interface_exists(&mut self, name: &str) -> Result<bool, Error> {
        Ok(self.refresh(name)?.is_some())
    }

    /// Whether `name` exists and is administratively up.
    ///
    /// Fails with [`ErrorKind::NetlinkInterfaceNotFound`] if the interface
    /// doesn't exist; callers that just want existence should call
    /// [`check_interface_exists`](Self::check_interface_exists) first.
    pub fn check_interface_is_up(&mut self, name: &str) -> Result<bool, Error> {
        match self.refresh(name)? {
            Some(details) => Ok(details.is_up),
            None => Err(Error::new(
                ErrorKind::NetlinkInterfaceNotFound,
                format!("interface '{name}' not found"),
            )),
        }
    }

    /// Create a vcan interface named `name` if it doesn't already exist.
    /// A no-op if it does.
    pub fn create_vcan_if_missing(&mut self, name: &str) -> Result<(), Error> {
        if self.check_interface_exists(name)? {
            return Ok(());
        }

        CanInterface::create_vcan(name, None)
            .map_err(|e| Error::new(ErrorKind::VcanCreate, e.to_string()))?;
        self.refresh(name)?;
        Ok(())
    }

    /// Set `name`'s administrative state. If `create_vcan_if_needed` is set,
    /// a missing vcan interface is created first, atomically with the rest
    /// of the call; failure to create it aborts the whole operation rather
    /// than falling through to a state change against a nonexistent
    /// interface. If `set_bitrate` is set, the bitrate is applied before
    /// bringing the interface up; since the kernel rejects a bitrate change
    /// on a running interface, an interface that is currently up is first
    /// brought down for the change and then restored.
    pub fn set_state(
        &mut self,
        name: &str,
        up: bool,
        set_bitrate: bool,
        bitrate: u32,
        create_vcan_if_needed: bool,
    ) -> Result<(), Error> {
        if create_vcan_if_needed {
            self.create_vcan_if_missing(name)?;
        }

        let was_up = self.check_interface_is_up(name)?;
        let iface = CanInterface::open(name)
            .map_err(|e| Error::new(ErrorKind::NetlinkConnect, e.to_string()))?;

        if set_bitrate {
            if was_up {
                iface
                    .bring_down()
                    .map_err(|e| Error::new(ErrorKind::NetlinkBringDown, e.to_string()))?;
            }
            iface
                .set_bitrate(bitrate, None)
                .map_err(|e| Error::new(ErrorKind::NetlinkConnect, e.to_string()))?;
        }

        let currently_up = if set_bitrate { false } else { was_up };
        if currently_up != up {
            if up {
                iface
                    .bring_up()
                    .map_err(|e| Error::new(ErrorKind::NetlinkBringUp, e.to_string()))?;
            } else {
                iface
                    .bring_down()
                    .map_err(|e| Error::new(ErrorKind::NetlinkBringDown, e.to_string()))?;
            }
        }

        self.refresh(name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_interface_reports_not_found_for_up_check() {
        let mut executor = NetlinkExecutor::new();
        let err = executor
            .check_interface_is_up("hycan_test_missing_if")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NetlinkInterfaceNotFound);
    }

    #[test]
    #[cfg(feature = "vcan_tests")]
    fn create_vcan_is_idempotent() {
        let mut executor = NetlinkExecutor::new();
        executor.create_vcan_if_missing("vcan_exec_test").unwrap();
        assert!(executor
            .check_interface_exists("vcan_exec_test")
            .unwrap());
        executor.create_vcan_if_missing("vcan_exec_test").unwrap();
    }

    #[test]
    #[cfg(feature = "vcan_tests")]
    fn set_state_brings_interface_up_and_down() {
        let mut executor = NetlinkExecutor::new();
        executor.create_vcan_if_missing("vcan_exec_state").unwrap();

        executor
            .set_state("vcan_exec_state", true, false, 0, false)
            .unwrap();
        assert!(executor
            .check_interface_is_up("vcan_exec_state")
            .unwrap());

        executor
            .set_state("vcan_exec_state", false, false, 0, false)
            .unwrap();
        assert!(!executor
            .check_interface_is_up("vcan_exec_state")
            .unwrap());
    }

    #[test]
    #[cfg(feature = "vcan_tests")]
    fn set_state_creates_missing_vcan_when_asked() {
        let mut executor = NetlinkExecutor::new();
        assert!(!executor
            .check_interface_exists("vcan_exec_autocreate")
            .unwrap());

        executor
            .set_state("vcan_exec_autocreate", true, false, 0, true)
            .unwrap();
        assert!(executor
            .check_interface_is_up("vcan_exec_autocreate")
            .unwrap());
    }
}
