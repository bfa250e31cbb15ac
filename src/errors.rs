// hycan/src/errors.rs
//
// Error taxonomy for the HyCAN library and daemon.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! HyCAN error types.
//!
//! Every client-visible operation returns either success or an [`Error`]
//! carrying one of the closed set of [`ErrorKind`] variants. Best-effort
//! operations (memory locking, real-time scheduling, CPU affinity, socket
//! permission changes) never produce one of these: they log and continue.

use std::io;

/// The closed set of error kinds a HyCAN operation can fail with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// Failed to check whether a vcan interface exists.
    #[error("vcan interface check failed")]
    VcanCheck,
    /// Failed to create a vcan interface.
    #[error("vcan interface creation failed")]
    VcanCreate,
    /// Failed to allocate a netlink socket.
    #[error("netlink socket allocation failed")]
    NetlinkSocketAlloc,
    /// Failed to connect a netlink socket.
    #[error("netlink connect failed")]
    NetlinkConnect,
    /// Failed to allocate a netlink link object.
    #[error("netlink link allocation failed")]
    NetlinkLinkAlloc,
    /// Failed to add a netlink link.
    #[error("netlink link add failed")]
    NetlinkLinkAdd,
    /// The named interface does not exist.
    #[error("netlink interface not found")]
    NetlinkInterfaceNotFound,
    /// Failed to bring an interface up.
    #[error("netlink bring-up failed")]
    NetlinkBringUp,
    /// Failed to bring an interface down.
    #[error("netlink bring-down failed")]
    NetlinkBringDown,
    /// Failed to create the raw CAN socket.
    #[error("CAN socket creation failed")]
    CanSocketCreate,
    /// Failed to resolve the interface name to an index.
    #[error("CAN interface index lookup failed")]
    CanInterfaceIndex,
    /// Failed to bind the raw CAN socket.
    #[error("CAN socket bind failed")]
    CanSocketBind,
    /// A write to the raw CAN socket failed.
    #[error("CAN socket write failed")]
    CanSocketWrite,
    /// The kernel's send buffer is full; retryable.
    #[error("CAN socket buffer full")]
    CanSocketBufferFull,
    /// An operation was attempted on a socket that isn't open.
    #[error("invalid CAN socket")]
    CanInvalidSocket,
    /// Draining buffered inbound frames failed.
    #[error("CAN socket flush failed")]
    CanFlush,
    /// An epoll operation failed.
    #[error("epoll operation failed")]
    Epoll,
    /// Requesting dispatcher shutdown failed.
    #[error("dispatcher stop failed")]
    DispatcherStop,
    /// Locking pages in memory failed.
    #[error("memory lock failed")]
    MemoryLock,
    /// Setting real-time scheduling failed.
    #[error("real-time scheduling failed")]
    RealTimeSched,
    /// Setting CPU affinity failed.
    #[error("CPU affinity failed")]
    CpuAffinity,
    /// A callback was registered with no handler.
    #[error("empty callback")]
    EmptyCallback,
    /// A CAN identifier outside of `[0, 2047]` was used, or a frame's data
    /// exceeded 8 bytes.
    #[error("invalid CAN identifier")]
    InvalidIdentifier,
    /// The IPC transport failed (connect/accept/send/recv).
    #[error("IPC transport error")]
    Ipc,
    /// The daemon-mediated operation failed, and any shell fallback either
    /// failed or is disabled.
    #[error("daemon request failed")]
    DaemonRequest,
}

/// A HyCAN error: a closed-set [`ErrorKind`] plus a human-readable message.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    /// The kind of failure.
    pub kind: ErrorKind,
    /// Additional context, such as the underlying `errno` description.
    pub message: String,
}

impl Error {
    /// Construct a new error from a kind and a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Construct an error from a kind and an `io::Error`, folding in its
    /// description.
    pub fn from_io(kind: ErrorKind, err: io::Error) -> Self {
        Self::new(kind, err.to_string())
    }
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
