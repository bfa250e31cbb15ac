// hycan/src/ipc.rs
//
// Fixed-record local IPC transport and the daemon wire protocol.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The Local IPC Transport component (D), plus the fixed-size `repr(C)`
//! request/response records that components E (daemon client) and G
//! (daemon server) exchange over it.
//!
//! Message boundaries are implicit: every record's `size_of` is the framing,
//! so there is no length prefix to read or write.

use crate::errors::{Error, ErrorKind};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io::{self, Read, Write};
use std::mem;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The netlink-request operation tag (spec.md §4.E/§6).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NetlinkOp {
    SetState = 0,
    InterfaceExists = 1,
    InterfaceIsUp = 2,
    CreateVcan = 3,
}

impl TryFrom<u8> for NetlinkOp {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self, Error> {
        match v {
            0 => Ok(NetlinkOp::SetState),
            1 => Ok(NetlinkOp::InterfaceExists),
            2 => Ok(NetlinkOp::InterfaceIsUp),
            3 => Ok(NetlinkOp::CreateVcan),
            other => Err(Error::new(ErrorKind::Ipc, format!("unknown request operation tag {other}"))),
        }
    }
}

/// Registration request: `{pid: i32}`.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct RegisterRequest {
    pub pid: i32,
}

/// Registration response: `{result: i32, channel_name: [u8; 64]}`.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct RegisterResponse {
    pub result: i32,
    pub channel_name: [u8; 64],
}

impl RegisterResponse {
    pub fn ok(channel_name: &str) -> Self {
        Self {
            result: 0,
            channel_name: str_to_fixed(channel_name),
        }
    }

    pub fn err() -> Self {
        Self {
            result: -1,
            channel_name: [0; 64],
        }
    }

    pub fn channel_name(&self) -> String {
        fixed_to_string(&self.channel_name)
    }
}

/// Netlink request: `{op, create_vcan_if_needed, name[16], up, set_bitrate, bitrate}`.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct NetlinkRequest {
    pub op: u8,
    pub create_vcan_if_needed: u8,
    pub name: [u8; 16],
    pub up: u8,
    pub set_bitrate: u8,
    pub bitrate: u32,
}

impl NetlinkRequest {
    pub fn new(op: NetlinkOp, name: &str, up: bool, set_bitrate: bool, bitrate: u32) -> Self {
        Self::with_vcan_create(op, name, up, set_bitrate, bitrate, false)
    }

    /// Like [`new`](Self::new), but also carries the `create_vcan_if_needed`
    /// flag a [`NetlinkOp::SetState`] request uses to ask the server to
    /// create a missing vcan interface before applying the state change.
    pub fn with_vcan_create(
        op: NetlinkOp,
        name: &str,
        up: bool,
        set_bitrate: bool,
        bitrate: u32,
        create_vcan_if_needed: bool,
    ) -> Self {
        Self {
            op: op as u8,
            create_vcan_if_needed: create_vcan_if_needed as u8,
            name: str_to_fixed(name),
            up: up as u8,
            set_bitrate: set_bitrate as u8,
            bitrate,
        }
    }

    pub fn name(&self) -> String {
        fixed_to_string(&self.name)
    }

    pub fn operation(&self) -> Result<NetlinkOp, Error> {
        NetlinkOp::try_from(self.op)
    }
}

/// Netlink response: `{result: i32, exists: bool, is_up: bool, error_message[256]}`.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct NetlinkResponse {
    pub result: i32,
    pub exists: u8,
    pub is_up: u8,
    _pad: [u8; 2],
    pub error_message: [u8; 256],
}

impl NetlinkResponse {
    pub fn success(exists: bool, is_up: bool) -> Self {
        Self {
            result: 0,
            exists: exists as u8,
            is_up: is_up as u8,
            _pad: [0; 2],
            error_message: [0; 256],
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            result: -1,
            exists: 0,
            is_up: 0,
            _pad: [0; 2],
            error_message: str_to_fixed(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == 0
    }

    pub fn error_message(&self) -> String {
        fixed_to_string(&self.error_message)
    }
}

fn str_to_fixed<const N: usize>(s: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    let bytes = s.as_bytes();
    let len = bytes.len().min(N - 1);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

fn fixed_to_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn wait_readable(fd: RawFd, timeout_ms: u64) -> Result<bool, Error> {
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];
    let timeout = PollTimeout::from(timeout_ms.min(u16::MAX as u64) as u16);
    match poll(&mut fds, timeout) {
        Ok(n) => Ok(n > 0),
        Err(nix::errno::Errno::EINTR) => Ok(false),
        Err(e) => Err(Error::new(ErrorKind::Ipc, format!("poll failed: {e}"))),
    }
}

/// A bound, listening server socket under `<dir>/hycan_<name>`.
pub struct IpcListener {
    listener: UnixListener,
    path: PathBuf,
}

impl IpcListener {
    /// Bind and listen with the given backlog. Widens permissions to
    /// `0666` afterwards so non-root clients can connect, removing any
    /// stale socket file left by a previous run first.
    pub fn bind(path: impl Into<PathBuf>, backlog: i32) -> Result<Self, Error> {
        let path = path.into();
        let _ = std::fs::remove_file(&path);

        let socket = socket2::Socket::new(socket2::Domain::UNIX, socket2::Type::STREAM, None)
            .map_err(|e| Error::from_io(ErrorKind::Ipc, e))?;
        let addr = socket2::SockAddr::unix(&path).map_err(|e| Error::from_io(ErrorKind::Ipc, e))?;
        socket.bind(&addr).map_err(|e| Error::from_io(ErrorKind::Ipc, e))?;
        socket.listen(backlog).map_err(|e| Error::from_io(ErrorKind::Ipc, e))?;

        if let Err(e) = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o666)) {
            log::warn!("failed to chmod 0666 on '{}': {}", path.display(), e);
        }

        log::info!("listening on '{}'", path.display());
        Ok(Self {
            listener: socket.into(),
            path,
        })
    }

    /// Wait up to `timeout_ms` for a connection. Returns `None` on timeout.
    pub fn accept(&self, timeout_ms: u64) -> Result<Option<IpcStream>, Error> {
        if !wait_readable(self.listener.as_raw_fd(), timeout_ms)? {
            return Ok(None);
        }
        match self.listener.accept() {
            Ok((stream, _addr)) => Ok(Some(IpcStream { stream })),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(Error::from_io(ErrorKind::Ipc, e)),
        }
    }
}

impl Drop for IpcListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// One connected end of the transport, either freshly accepted by a
/// [`IpcListener`] or produced by [`IpcStream::connect`].
pub struct IpcStream {
    stream: UnixStream,
}

impl IpcStream {
    /// Connect to a server socket at `path`.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, Error> {
        let stream = UnixStream::connect(path.as_ref()).map_err(|e| Error::from_io(ErrorKind::Ipc, e))?;
        Ok(Self { stream })
    }

    /// Send one fixed-size record.
    pub fn send<T: Copy>(&mut self, value: &T) -> Result<(), Error> {
        let bytes =
            unsafe { std::slice::from_raw_parts(value as *const T as *const u8, mem::size_of::<T>()) };
        self.stream
            .write_all(bytes)
            .map_err(|e| Error::from_io(ErrorKind::Ipc, e))
    }

    /// Receive one fixed-size record, bounded by `timeout`. A short read
    /// (connection closed early) surfaces as [`ErrorKind::Ipc`].
    pub fn recv<T: Copy>(&mut self, timeout: Duration) -> Result<T, Error> {
        self.stream
            .set_read_timeout(Some(timeout))
            .map_err(|e| Error::from_io(ErrorKind::Ipc, e))?;

        let mut buf = vec![0u8; mem::size_of::<T>()];
        self.stream.read_exact(&mut buf).map_err(|e| {
            if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut {
                Error::new(ErrorKind::Ipc, "timed out waiting for response")
            } else {
                Error::from_io(ErrorKind::Ipc, e)
            }
        })?;
        Ok(unsafe { std::ptr::read(buf.as_ptr() as *const T) })
    }
}

impl AsFd for IpcStream {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fixed_width_strings_round_trip() {
        let buf: [u8; 16] = str_to_fixed("vcan0");
        assert_eq!(fixed_to_string(&buf), "vcan0");
    }

    #[test]
    fn truncates_overlong_strings_and_stays_terminated() {
        let long = "x".repeat(100);
        let buf: [u8; 16] = str_to_fixed(&long);
        assert_eq!(buf[15], 0);
        assert_eq!(fixed_to_string(&buf).len(), 15);
    }

    #[test]
    fn netlink_request_round_trips_fields() {
        let req = NetlinkRequest::new(NetlinkOp::SetState, "vcan0", true, false, 500_000);
        assert_eq!(req.name(), "vcan0");
        assert_eq!(req.operation().unwrap(), NetlinkOp::SetState);
        assert_eq!(req.up, 1);
        assert_eq!(req.bitrate, 500_000);
    }

    #[test]
    fn listener_accepts_a_client_connection() {
        let path = std::env::temp_dir().join(format!("hycan_ipc_test_{}", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let listener = IpcListener::bind(&path, 5).unwrap();

        let connect_path = path.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            IpcStream::connect(&connect_path).unwrap();
        });

        let accepted = listener.accept(1000).unwrap();
        assert!(accepted.is_some());
        handle.join().unwrap();
    }

    #[test]
    fn accept_times_out_with_no_connection() {
        let path = std::env::temp_dir().join(format!("hycan_ipc_test_timeout_{}", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let listener = IpcListener::bind(&path, 5).unwrap();
        let accepted = listener.accept(50).unwrap();
        assert!(accepted.is_none());
    }
}
