// hycan/src/interface.rs
//
// The top-level façade combining sender, dispatcher, and the daemon client.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The Interface Façade component (F).
//!
//! [`Interface<K>`] is generic over an [`InterfaceKind`] marker, mirroring
//! how callers distinguish a physical CAN interface (must already exist;
//! `up()` fails otherwise) from a virtual one (created on demand). Use the
//! [`CanInterface`] and [`VcanInterface`] aliases rather than naming the
//! marker types directly.

use crate::config::HyCanConfig;
use crate::daemon_client;
use crate::dispatcher::{Dispatcher, Handler};
use crate::errors::{Error, ErrorKind};
use crate::frame::CanFrame;
use crate::sender::Sender;
use std::marker::PhantomData;

#[cfg(feature = "latency-test")]
use crate::latency::LatencyStats;

mod private {
    pub trait Sealed {}
    impl Sealed for super::Can {}
    impl Sealed for super::Vcan {}
}

/// Distinguishes a physical CAN interface from a virtual one at the type
/// level. Sealed: [`Can`] and [`Vcan`] are the only implementors.
pub trait InterfaceKind: private::Sealed {
    /// Whether `up()` should create a missing interface rather than fail.
    const AUTO_CREATE: bool;
}

/// Marker for a physical CAN interface. `up()` requires it to already exist.
#[derive(Debug)]
pub struct Can;

/// Marker for a virtual CAN interface. `up()` creates it if missing.
#[derive(Debug)]
pub struct Vcan;

impl InterfaceKind for Can {
    const AUTO_CREATE: bool = false;
}

impl InterfaceKind for Vcan {
    const AUTO_CREATE: bool = true;
}

/// A handle to a physical CAN interface.
pub type CanInterface = Interface<Can>;

/// A handle to a virtual (vcan) CAN interface.
pub type VcanInterface = Interface<Vcan>;

/// Combines the frame socket pair (sender + dispatcher) used for traffic on
/// one interface with daemon-mediated control of that interface's state.
pub struct Interface<K: InterfaceKind> {
    interface_name: String,
    config: HyCanConfig,
    dispatcher: Dispatcher,
    sender: Sender,
    _kind: PhantomData<K>,
}

impl<K: InterfaceKind> Interface<K> {
    /// Create a handle for `interface_name` using the default configuration.
    /// Does not touch the network; call [`up`](Self::up) to bring traffic
    /// flowing.
    pub fn new(interface_name: impl Into<String>) -> Result<Self, Error> {
        Self::with_config(interface_name, HyCanConfig::default())
    }

    /// Create a handle using an explicit configuration.
    pub fn with_config(interface_name: impl Into<String>, config: HyCanConfig) -> Result<Self, Error> {
        let interface_name = interface_name.into();
        let dispatcher = Dispatcher::new(interface_name.clone())?;
        let sender = Sender::new(interface_name.clone());
        Ok(Self {
            interface_name,
            config,
            dispatcher,
            sender,
            _kind: PhantomData,
        })
    }

    /// The interface this handle is bound to.
    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    /// Bring the interface up at `bitrate` (ignored for interfaces that
    /// don't take one) via the daemon, then start the dispatcher's reader
    /// thread. A [`Can`] interface that doesn't exist yet fails rather than
    /// being created; a [`Vcan`] interface is created if missing.
    pub fn up(&mut self, bitrate: u32) -> Result<(), Error> {
        if !K::AUTO_CREATE && !daemon_client::interface_exists(&self.config, &self.interface_name)? {
            return Err(Error::new(
                ErrorKind::NetlinkInterfaceNotFound,
                format!("CAN interface '{}' does not exist", self.interface_name),
            ));
        }

        daemon_client::set_interface_state(&self.config, &self.interface_name, true, bitrate)?;
        self.dispatcher.start()
    }

    /// Stop the dispatcher's reader thread and bring the interface down via
    /// the daemon.
    pub fn down(&mut self) -> Result<(), Error> {
        self.dispatcher.stop()?;
        daemon_client::set_interface_state(&self.config, &self.interface_name, false, 0)
    }

    /// Whether the interface currently exists, per the daemon.
    pub fn exists(&self) -> Result<bool, Error> {
        daemon_client::interface_exists(&self.config, &self.interface_name)
    }

    /// Whether the interface is currently administratively up, per the daemon.
    pub fn is_up(&self) -> Result<bool, Error> {
        daemon_client::interface_is_up(&self.config, &self.interface_name)
    }

    /// Send one frame.
    pub fn send(&mut self, frame: CanFrame) -> Result<(), Error> {
        self.sender.send(frame)
    }

    /// Register `handler` to be invoked for every received frame whose
    /// identifier is in `ids`.
    pub fn register_callback(&self, ids: &[u16], handler: Handler) -> Result<(), Error> {
        self.dispatcher.register(ids, handler)
    }

    /// Latency statistics accumulated by the dispatcher's reader thread.
    #[cfg(feature = "latency-test")]
    pub fn latency_stats(&self) -> LatencyStats {
        self.dispatcher.latency_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_requires_preexisting_interface() {
        assert!(!Can::AUTO_CREATE);
        assert!(Vcan::AUTO_CREATE);
    }

    #[test]
    fn new_handle_reports_interface_name() {
        let iface: VcanInterface = Interface::new("vcan_iface_test").unwrap();
        assert_eq!(iface.interface_name(), "vcan_iface_test");
    }
}
