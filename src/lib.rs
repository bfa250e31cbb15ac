// hycan/src/lib.rs
//
// The main lib file for the Rust HyCAN library.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! High-throughput, low-latency user-space library and privileged netlink
//! daemon for Linux SocketCAN.
//!
//! A [`Sender`] and [`Dispatcher`] pair drive one raw CAN socket: sending is
//! a thin synchronous wrapper, receiving runs a dedicated reader thread that
//! fans frames out to registered callbacks by identifier. State changes that
//! require `CAP_NET_ADMIN` (bringing an interface up or down, creating a
//! vcan device, changing its bitrate) are never performed directly by this
//! process; they're requested from the privileged `hycand` daemon over a
//! local IPC channel and applied there via netlink. [`Interface`] combines
//! all of this into a single handle, generic over whether it names a
//! physical or virtual interface.
//!
//! # Crate Features
//!
//! * **netlink** (default) - CAN interface configuration via netlink
//!   ([neli](https://docs.rs/neli)). Required by the [`netlink`] module
//!   (used by the daemon side) and by the daemon binary itself.
//! * **daemon** (default) - Builds the `hycand` privileged daemon binary.
//! * **utils** (default) - Builds the `hycanctl` command-line client.
//! * **fallback-shell** - Lets the daemon client fall back to shelling out
//!   to `sudo ip link` when the daemon is unreachable. Off by default: a
//!   library embedder should opt into running a setuid-adjacent subprocess,
//!   not have it happen silently.
//! * **latency-test** - Enables the dispatcher's optional latency
//!   instrumentation accumulator ([`latency`] module).

#![deny(
    missing_copy_implementations,
    missing_debug_implementations,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    unsafe_op_in_unsafe_fn
)]

pub mod errors;
pub use errors::{Error, ErrorKind, Result};

pub mod constants;

pub mod frame;
pub use frame::CanFrame;

pub mod socket;
pub use socket::FrameSocket;

pub mod sender;
pub use sender::Sender;

pub mod dispatcher;
pub use dispatcher::{Dispatcher, DispatcherState, Handler};

#[cfg(feature = "latency-test")]
pub mod latency;
#[cfg(feature = "latency-test")]
pub use latency::{LatencyAccumulator, LatencyStats};

pub mod config;
pub use config::HyCanConfig;

pub mod ipc;

#[cfg(feature = "netlink")]
pub mod netlink;
#[cfg(feature = "netlink")]
pub use netlink::{CanCtrlMode, NetlinkExecutor};
#[cfg(feature = "netlink")]
pub use netlink::CanInterface as NetlinkInterface;

pub mod daemon_client;

pub mod interface;
pub use interface::{Can, CanInterface, Interface, InterfaceKind, Vcan};
pub use interface::VcanInterface;

#[cfg(feature = "netlink")]
pub mod daemon;
