// hycan/src/socket.rs
//
// Acquire, bind, and drain a raw CAN socket for one interface.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The Frame Socket component (A).
//!
//! Opens a raw CAN socket, resolves an interface name to its kernel index,
//! binds, and switches to non-blocking. Knows nothing about callbacks or
//! reader threads; [`crate::sender::Sender`] and [`crate::dispatcher::Dispatcher`]
//! each hold one.

use crate::constants::{AF_CAN, CAN_RAW, PF_CAN};
use crate::errors::{Error, ErrorKind};
use crate::frame::CanFrame;
use libc::{c_int, can_frame, sa_family_t, sockaddr_can};
use nix::net::if_::if_nametoindex;
use socket2::{Domain, Protocol, SockAddr, Socket as RawSocket, Type};
use std::fmt;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, RawFd};

fn can_sockaddr(ifindex: c_int) -> sockaddr_can {
    let mut addr: sockaddr_can = unsafe { mem::zeroed() };
    addr.can_family = AF_CAN as sa_family_t;
    addr.can_ifindex = ifindex;
    addr
}

/// Copies a `sockaddr_can` into a `socket2::SockAddr` so it can be handed to
/// `Socket::bind`. `sockaddr_can` is always smaller than `sockaddr_storage`.
fn can_sockaddr_to_sock_addr(addr: &sockaddr_can) -> SockAddr {
    let len = mem::size_of::<sockaddr_can>();
    unsafe {
        let mut storage: libc::sockaddr_storage = mem::zeroed();
        std::ptr::copy_nonoverlapping(
            addr as *const sockaddr_can as *const u8,
            &mut storage as *mut _ as *mut u8,
            len,
        );
        SockAddr::new(storage, len as libc::socklen_t)
    }
}

/// A raw CAN socket bound to one interface.
///
/// Move-only; [`Drop`] closes the descriptor if one is open. Does not own a
/// reader thread or a callback table.
pub struct FrameSocket {
    inner: Option<RawSocket>,
    interface_name: String,
}

impl FrameSocket {
    /// Create an unconnected socket for `interface_name`. Call
    /// [`ensure_connected`](Self::ensure_connected) before using it.
    pub fn new(interface_name: impl Into<String>) -> Self {
        Self {
            inner: None,
            interface_name: interface_name.into(),
        }
    }

    /// The interface this socket is bound (or will bind) to.
    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    /// True if a descriptor is currently open.
    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }

    /// The raw descriptor, if the socket is currently open.
    pub fn as_raw_fd(&self) -> Option<RawFd> {
        self.inner.as_ref().map(RawSocket::as_raw_fd)
    }

    /// Idempotent. Closes any existing descriptor, opens a fresh
    /// `AF_CAN`/`CAN_RAW` socket, resolves `interface_name` to a kernel
    /// index, binds, and switches to non-blocking.
    pub fn ensure_connected(&mut self) -> Result<(), Error> {
        self.inner = None;

        let socket = RawSocket::new(Domain::from(PF_CAN), Type::RAW, Some(Protocol::from(CAN_RAW)))
            .map_err(|e| {
                log::error!("failed to create CAN socket for '{}': {}", self.interface_name, e);
                Error::from_io(ErrorKind::CanSocketCreate, e)
            })?;

        let ifindex = if_nametoindex(self.interface_name.as_str()).map_err(|e| {
            log::error!(
                "failed to resolve CAN interface '{}' index: {}",
                self.interface_name, e
            );
            Error::new(ErrorKind::CanInterfaceIndex, e.to_string())
        })?;

        let addr = can_sockaddr(ifindex as c_int);
        socket.bind(&can_sockaddr_to_sock_addr(&addr)).map_err(|e| {
            log::error!("failed to bind CAN socket to '{}': {}", self.interface_name, e);
            Error::from_io(ErrorKind::CanSocketBind, e)
        })?;

        socket.set_nonblocking(true).map_err(|e| {
            log::error!("failed to set CAN socket non-blocking: {}", e);
            Error::from_io(ErrorKind::CanSocketBind, e)
        })?;

        self.inner = Some(socket);
        Ok(())
    }

    /// Non-blocking drain of any buffered inbound frames. Returns once the
    /// kernel reports would-block or the interface is down.
    pub fn flush(&self) -> Result<(), Error> {
        let fd = self
            .inner
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::CanInvalidSocket, "flush on unconnected socket"))?
            .as_raw_fd();

        let mut frame: can_frame = unsafe { mem::zeroed() };
        loop {
            let rv = unsafe {
                libc::read(
                    fd,
                    &mut frame as *mut can_frame as *mut libc::c_void,
                    mem::size_of::<can_frame>(),
                )
            };
            if rv >= 0 {
                continue;
            }
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::ENETDOWN) {
                return Ok(());
            }
            log::error!(
                "failed to flush CAN socket buffer for '{}': {}",
                self.interface_name, err
            );
            return Err(Error::from_io(ErrorKind::CanFlush, err));
        }
    }

    /// Read exactly one frame. Non-blocking; surfaces `WouldBlock` as an
    /// `io::Error` so callers (the dispatcher's reader loop) can distinguish
    /// "nothing to read" from a real failure.
    pub(crate) fn read_one(&self) -> io::Result<CanFrame> {
        let fd = self
            .inner
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?
            .as_raw_fd();

        let mut frame: can_frame = unsafe { mem::zeroed() };
        let rv = unsafe {
            libc::read(
                fd,
                &mut frame as *mut can_frame as *mut libc::c_void,
                mem::size_of::<can_frame>(),
            )
        };
        if rv < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(CanFrame::from_raw(frame))
    }

    /// Write one CAN frame. Returns the raw `io::Error` on failure so
    /// [`crate::sender::Sender`] can classify the `errno`.
    pub(crate) fn write_one(&self, frame: CanFrame) -> io::Result<()> {
        let fd = self
            .inner
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?
            .as_raw_fd();

        let raw = frame.to_raw();
        let rv = unsafe {
            libc::write(
                fd,
                &raw as *const can_frame as *const libc::c_void,
                mem::size_of::<can_frame>(),
            )
        };
        if rv < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Read exactly one frame from a raw descriptor. Used by the dispatcher's
/// reader thread, which only holds the fd number captured at `start()` time
/// rather than the whole [`FrameSocket`].
pub(crate) fn read_can_frame_from_fd(fd: RawFd) -> io::Result<CanFrame> {
    let mut frame: can_frame = unsafe { mem::zeroed() };
    let rv = unsafe {
        libc::read(
            fd,
            &mut frame as *mut can_frame as *mut libc::c_void,
            mem::size_of::<can_frame>(),
        )
    };
    if rv < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(CanFrame::from_raw(frame))
}

impl fmt::Debug for FrameSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSocket")
            .field("interface_name", &self.interface_name)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconnected_flush_is_invalid_socket() {
        let socket = FrameSocket::new("vcan_does_not_matter");
        let err = socket.flush().unwrap_err();
        assert_eq!(err.kind, ErrorKind::CanInvalidSocket);
    }

    #[test]
    fn new_socket_reports_interface_name() {
        let socket = FrameSocket::new("vcan0");
        assert_eq!(socket.interface_name(), "vcan0");
        assert!(!socket.is_connected());
    }

    #[test]
    #[cfg(feature = "vcan_tests")]
    fn connect_and_flush_on_vcan0() {
        let mut socket = FrameSocket::new("vcan0");
        socket.ensure_connected().expect("vcan0 must exist for this test");
        socket.flush().expect("flush on a freshly connected socket never fails");
    }
}
