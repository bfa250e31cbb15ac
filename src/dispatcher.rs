// hycan/src/dispatcher.rs
//
// Epoll-driven reader thread, id-to-callback table, start/stop lifecycle.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The Dispatcher component (C).
//!
//! Owns one [`FrameSocket`], one epoll instance, and one eventfd wake
//! channel. Demultiplexes inbound frames by CAN identifier to
//! user-registered callbacks on a single pinned, real-time reader thread.

use crate::constants::MAX_CAN_ID;
use crate::errors::{Error, ErrorKind};
use crate::frame::CanFrame;
use crate::socket::{self, FrameSocket};

#[cfg(feature = "latency-test")]
use crate::latency::{LatencyAccumulator, LatencyStats};

use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
use nix::sys::eventfd::EventFd;
use parking_lot::Mutex;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const MAX_EPOLL_EVENTS: usize = 16;

static THREAD_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A registered handler. Shared (not owned) so the same handler can occupy
/// more than one identifier slot cheaply.
pub type Handler = Arc<dyn Fn(CanFrame) + Send + Sync + 'static>;

/// The dispatcher's lifecycle state, per spec: `idle -> running -> stopping
/// -> idle`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DispatcherState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
}

impl From<u8> for DispatcherState {
    fn from(v: u8) -> Self {
        match v {
            1 => DispatcherState::Running,
            2 => DispatcherState::Stopping,
            _ => DispatcherState::Idle,
        }
    }
}

/// The fixed 2048-slot id-to-handler table. A single short-held lock guards
/// the whole array rather than one lock per slot (see DESIGN.md).
struct CallbackTable {
    slots: Mutex<Vec<Option<Handler>>>,
}

impl CallbackTable {
    fn new() -> Self {
        Self {
            slots: Mutex::new(vec![None; MAX_CAN_ID as usize]),
        }
    }

    fn set(&self, ids: &[u16], handler: Handler) -> Result<(), Error> {
        if let Some(&bad) = ids.iter().find(|&&id| id >= MAX_CAN_ID) {
            return Err(Error::new(
                ErrorKind::InvalidIdentifier,
                format!("CAN id {} exceeds maximum of {}", bad, MAX_CAN_ID - 1),
            ));
        }
        let mut slots = self.slots.lock();
        for &id in ids {
            slots[id as usize] = Some(Arc::clone(&handler));
        }
        Ok(())
    }

    fn dispatch(&self, frame: CanFrame) {
        let slots = self.slots.lock();
        if let Some(handler) = &slots[frame.id() as usize] {
            handler(frame);
        }
    }
}

fn cpu_count() -> usize {
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if n > 0 {
        n as usize
    } else {
        1
    }
}

fn make_real_time() {
    let param = libc::sched_param { sched_priority: 80 };
    let rv = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if rv != 0 {
        log::warn!(
            "failed to set SCHED_FIFO priority 80 on reader thread: {}",
            io_error_for(rv)
        );
    }
}

fn affinize_cpu(cpu: usize) {
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        let rv = libc::pthread_setaffinity_np(
            libc::pthread_self(),
            std::mem::size_of::<libc::cpu_set_t>(),
            &set,
        );
        if rv != 0 {
            log::warn!("failed to pin reader thread to cpu {}: {}", cpu, io_error_for(rv));
        }
    }
}

fn lock_memory_if_root() {
    if unsafe { libc::geteuid() } != 0 {
        return;
    }
    let rv = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
    if rv != 0 {
        log::warn!(
            "failed to lock reader thread memory: {}",
            std::io::Error::last_os_error()
        );
    }
}

fn io_error_for(errno: i32) -> std::io::Error {
    std::io::Error::from_raw_os_error(errno)
}

/// Owns the receive side of one CAN interface.
pub struct Dispatcher {
    interface_name: String,
    socket: FrameSocket,
    epoll: Arc<Epoll>,
    wake: Arc<EventFd>,
    cpu_core: usize,
    table: Arc<CallbackTable>,
    state: Arc<AtomicU8>,
    stop_requested: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    #[cfg(feature = "latency-test")]
    latency: Arc<LatencyAccumulator>,
}

impl Dispatcher {
    /// Create a dispatcher for `interface_name`. Builds the epoll set and
    /// registers the wake-fd; does not connect the socket or spawn a
    /// reader thread yet.
    pub fn new(interface_name: impl Into<String>) -> Result<Self, Error> {
        let interface_name = interface_name.into();

        let epoll = Epoll::new(EpollCreateFlags::empty())
            .map_err(|e| Error::new(ErrorKind::Epoll, format!("epoll_create failed: {e}")))?;
        let wake = EventFd::from_value(0)
            .map_err(|e| Error::new(ErrorKind::Epoll, format!("eventfd create failed: {e}")))?;

        epoll
            .add(
                &wake,
                EpollEvent::new(EpollFlags::EPOLLIN, wake.as_raw_fd() as u64),
            )
            .map_err(|e| Error::new(ErrorKind::Epoll, format!("failed to register wake-fd: {e}")))?;

        let cpu_core = THREAD_COUNTER.fetch_add(1, Ordering::AcqRel) % cpu_count();

        Ok(Self {
            interface_name: interface_name.clone(),
            socket: FrameSocket::new(interface_name),
            epoll: Arc::new(epoll),
            wake: Arc::new(wake),
            cpu_core,
            table: Arc::new(CallbackTable::new()),
            state: Arc::new(AtomicU8::new(DispatcherState::Idle as u8)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            reader: None,
            #[cfg(feature = "latency-test")]
            latency: Arc::new(LatencyAccumulator::new()),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DispatcherState {
        DispatcherState::from(self.state.load(Ordering::SeqCst))
    }

    /// The interface this dispatcher reads from.
    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    /// Register `handler` for every id in `ids`. May be called in any
    /// state. Rejects the whole batch if any id is >= 2048, leaving
    /// previously registered slots untouched.
    pub fn register(&self, ids: &[u16], handler: Handler) -> Result<(), Error> {
        self.table.set(ids, handler)
    }

    /// Optional latency accumulator, present only with the `latency-test`
    /// feature.
    #[cfg(feature = "latency-test")]
    pub fn latency_stats(&self) -> LatencyStats {
        self.latency.stats()
    }

    /// Connect (or reconnect) the socket, add it to the epoll set, drain
    /// stale frames, and spawn the reader thread if it isn't running.
    pub fn start(&mut self) -> Result<(), Error> {
        self.socket.ensure_connected()?;
        let fd = self
            .socket
            .as_raw_fd()
            .expect("ensure_connected succeeded, socket must be open");

        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        self.epoll
            .add(borrowed, EpollEvent::new(EpollFlags::EPOLLIN, fd as u64))
            .map_err(|e| Error::new(ErrorKind::Epoll, format!("failed to register CAN socket: {e}")))?;

        self.socket.flush()?;

        if self.reader.is_none() {
            self.stop_requested.store(false, Ordering::SeqCst);
            self.reader = Some(self.spawn_reader(fd));
        }

        self.state.store(DispatcherState::Running as u8, Ordering::SeqCst);
        Ok(())
    }

    fn spawn_reader(&self, sock_fd: RawFd) -> JoinHandle<()> {
        let epoll = Arc::clone(&self.epoll);
        let wake_fd = self.wake.as_raw_fd();
        let table = Arc::clone(&self.table);
        let stop_requested = Arc::clone(&self.stop_requested);
        let cpu_core = self.cpu_core;
        let interface_name = self.interface_name.clone();
        #[cfg(feature = "latency-test")]
        let latency = Arc::clone(&self.latency);

        thread::spawn(move || {
            make_real_time();
            affinize_cpu(cpu_core);
            lock_memory_if_root();

            let mut events = [EpollEvent::empty(); MAX_EPOLL_EVENTS];
            loop {
                let n = match epoll.wait(&mut events, EpollTimeout::NONE) {
                    Ok(n) => n,
                    Err(nix::errno::Errno::EINTR) | Err(nix::errno::Errno::EAGAIN) => {
                        if stop_requested.load(Ordering::SeqCst) {
                            return;
                        }
                        thread::sleep(Duration::from_millis(1));
                        continue;
                    }
                    Err(e) => {
                        if stop_requested.load(Ordering::SeqCst) {
                            return;
                        }
                        log::error!("epoll_wait failed on '{}': {}", interface_name, e);
                        return;
                    }
                };

                for event in &events[..n] {
                    let ready_fd = event.data() as RawFd;
                    if ready_fd == wake_fd {
                        if stop_requested.load(Ordering::SeqCst) {
                            return;
                        }
                        continue;
                    }
                    if ready_fd != sock_fd {
                        continue;
                    }
                    match socket::read_can_frame_from_fd(sock_fd) {
                        Ok(frame) => {
                            #[cfg(feature = "latency-test")]
                            if frame.len() == 8 {
                                latency.record(frame.raw_data());
                            }
                            table.dispatch(frame);
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                        Err(e) => {
                            log::debug!("read failed on '{}': {}", interface_name, e);
                        }
                    }
                }
            }
        })
    }

    /// Request cooperative termination of the reader thread and join it.
    /// Idempotent.
    pub fn stop(&mut self) -> Result<(), Error> {
        self.state.store(DispatcherState::Stopping as u8, Ordering::SeqCst);
        if let Some(reader) = self.reader.take() {
            self.stop_requested.store(true, Ordering::SeqCst);
            self.wake
                .write(1)
                .map_err(|e| Error::new(ErrorKind::DispatcherStop, format!("failed to wake reader: {e}")))?;
            let _ = reader.join();
        }
        self.state.store(DispatcherState::Idle as u8, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_rejects_out_of_range_id() {
        let table = CallbackTable::new();
        let handler: Handler = Arc::new(|_frame| {});
        let err = table.set(&[2048], handler).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidIdentifier);
    }

    #[test]
    fn dispatch_invokes_registered_handler_once() {
        use std::sync::atomic::AtomicUsize;

        let table = CallbackTable::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let handler: Handler = Arc::new(move |_frame| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        table.set(&[0x1A3], handler).unwrap();

        let frame = CanFrame::new(0x1A3, &[1, 2, 3]).unwrap();
        table.dispatch(frame);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_on_unregistered_id_is_a_noop() {
        let table = CallbackTable::new();
        let frame = CanFrame::new(0x42, &[]).unwrap();
        table.dispatch(frame);
    }

    #[test]
    fn new_dispatcher_starts_idle() {
        let dispatcher = Dispatcher::new("vcan_dispatcher_test").unwrap();
        assert_eq!(dispatcher.state(), DispatcherState::Idle);
    }
}
