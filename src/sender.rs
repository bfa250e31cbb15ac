// hycan/src/sender.rs
//
// Single-frame writes with errno classification and transparent reconnect.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The Sender component (B): a thin wrapper around [`FrameSocket`] that
//! retries once on a fatal socket error and distinguishes retryable buffer
//! pressure from everything else.

use crate::errors::{Error, ErrorKind};
use crate::frame::CanFrame;
use crate::socket::FrameSocket;
use std::io;

/// Writes frames to one interface, reconnecting the underlying socket at
/// most once per [`send`](Self::send) call.
#[derive(Debug)]
pub struct Sender {
    socket: FrameSocket,
}

impl Sender {
    /// Create a sender for `interface_name`. Does not connect.
    pub fn new(interface_name: impl Into<String>) -> Self {
        Self {
            socket: FrameSocket::new(interface_name),
        }
    }

    /// Send one frame.
    ///
    /// If the socket isn't open, connects first. On a fatal `errno`
    /// (`EBADF`, `ENETDOWN`, `EPIPE`, `ENXIO`, `ENODEV`), reopens the socket
    /// once and retries the write. `EAGAIN`/`EWOULDBLOCK`/`ENOBUFS` fail with
    /// [`ErrorKind::CanSocketBufferFull`], which callers may retry. Anything
    /// else fails with [`ErrorKind::CanSocketWrite`].
    pub fn send(&mut self, frame: CanFrame) -> Result<(), Error> {
        if !self.socket.is_connected() {
            self.socket.ensure_connected()?;
        }

        match self.socket.write_one(frame) {
            Ok(()) => Ok(()),
            Err(err) => match classify(&err) {
                Classification::Fatal => {
                    log::debug!(
                        "send to '{}' hit a fatal error ({}), reconnecting and retrying once",
                        self.socket.interface_name(),
                        err
                    );
                    self.socket.ensure_connected()?;
                    self.socket.write_one(frame).map_err(|err| {
                        log::warn!(
                            "retry after reconnect on '{}' still failed: {}",
                            self.socket.interface_name(),
                            err
                        );
                        Error::from_io(ErrorKind::CanSocketWrite, err)
                    })
                }
                Classification::BufferFull => Err(Error::from_io(ErrorKind::CanSocketBufferFull, err)),
                Classification::Other => Err(Error::from_io(ErrorKind::CanSocketWrite, err)),
            },
        }
    }

    /// The interface name this sender writes to.
    pub fn interface_name(&self) -> &str {
        self.socket.interface_name()
    }
}

enum Classification {
    Fatal,
    BufferFull,
    Other,
}

fn classify(err: &io::Error) -> Classification {
    match err.raw_os_error() {
        Some(libc::EBADF)
        | Some(libc::ENETDOWN)
        | Some(libc::EPIPE)
        | Some(libc::ENXIO)
        | Some(libc::ENODEV) => Classification::Fatal,
        Some(libc::ENOBUFS) => Classification::BufferFull,
        _ if err.kind() == io::ErrorKind::WouldBlock => Classification::BufferFull,
        _ => Classification::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ebadf_as_fatal() {
        let err = io::Error::from_raw_os_error(libc::EBADF);
        assert!(matches!(classify(&err), Classification::Fatal));
    }

    #[test]
    fn classifies_eagain_as_buffer_full() {
        let err = io::Error::from_raw_os_error(libc::EAGAIN);
        assert!(matches!(classify(&err), Classification::BufferFull));
    }

    #[test]
    fn classifies_enobufs_as_buffer_full() {
        let err = io::Error::from_raw_os_error(libc::ENOBUFS);
        assert!(matches!(classify(&err), Classification::BufferFull));
    }

    #[test]
    fn classifies_unmapped_errno_as_other() {
        let err = io::Error::from_raw_os_error(libc::EINVAL);
        assert!(matches!(classify(&err), Classification::Other));
    }
}
