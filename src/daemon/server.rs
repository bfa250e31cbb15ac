// hycan/src/daemon/server.rs
//
// Registration loop, per-client session workers, and idle/dead session reaping.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

use crate::config::HyCanConfig;
use crate::errors::{Error, ErrorKind};
use crate::ipc::{IpcListener, IpcStream, NetlinkOp, NetlinkRequest, NetlinkResponse, RegisterRequest, RegisterResponse};
use crate::netlink::NetlinkExecutor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

struct ClientSession {
    channel_name: String,
    last_activity: Mutex<Instant>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// The privileged daemon: owns the registration socket and the table of
/// per-client session workers.
///
/// Requires an explicit [`HyCanConfig`]; callers decide where the socket
/// directory lives (production runs as root against `/run`, tests against a
/// temp directory).
pub struct DaemonServer {
    config: HyCanConfig,
    running: Arc<AtomicBool>,
    sessions: Arc<Mutex<HashMap<i32, ClientSession>>>,
}

impl DaemonServer {
    pub fn new(config: HyCanConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(true)),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run the registration loop and block until [`stop`](Self::stop) is
    /// called (typically from a signal handler on another thread). Spawns
    /// the cleanup worker and, for each newly-registering PID, a session
    /// worker thread.
    pub fn run(&self) -> Result<(), Error> {
        let listener = IpcListener::bind(self.config.registration_socket_path(), self.config.registration_backlog)?;

        let cleanup_handle = {
            let running = Arc::clone(&self.running);
            let sessions = Arc::clone(&self.sessions);
            let config = self.config.clone();
            thread::spawn(move || cleanup_worker(running, sessions, config))
        };

        while self.running.load(Ordering::Acquire) {
            match listener.accept(1000) {
                Ok(Some(stream)) => self.handle_registration(stream),
                Ok(None) => continue,
                Err(e) => log::error!("registration accept failed: {}", e.message),
            }
        }

        self.shutdown_sessions();
        let _ = cleanup_handle.join();
        Ok(())
    }

    /// Signal [`run`](Self::run) to stop accepting new registrations, reap
    /// every session, and return. Safe to call from a signal handler thread.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn handle_registration(&self, mut stream: IpcStream) {
        let request: RegisterRequest = match stream.recv(self.config.response_timeout) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("malformed registration request: {}", e.message);
                return;
            }
        };

        let mut sessions = self.sessions.lock();
        let channel_name = if let Some(session) = sessions.get(&request.pid) {
            *session.last_activity.lock() = Instant::now();
            session.channel_name.clone()
        } else {
            let channel_name = format!("HyCAN_Client_{}", request.pid);
            let session_running = Arc::new(AtomicBool::new(true));
            let worker = {
                let running = Arc::clone(&session_running);
                let config = self.config.clone();
                let channel_name = channel_name.clone();
                thread::spawn(move || session_worker(config, channel_name, running))
            };
            sessions.insert(
                request.pid,
                ClientSession {
                    channel_name: channel_name.clone(),
                    last_activity: Mutex::new(Instant::now()),
                    running: session_running,
                    worker: Some(worker),
                },
            );
            log::info!("registered pid {} as '{}'", request.pid, channel_name);
            channel_name
        };
        drop(sessions);

        if let Err(e) = stream.send(&RegisterResponse::ok(&channel_name)) {
            log::warn!("failed to send registration response to pid {}: {}", request.pid, e.message);
        }
    }

    fn shutdown_sessions(&self) {
        let mut sessions = self.sessions.lock();
        for (pid, session) in sessions.drain() {
            log::info!("stopping session for pid {pid}");
            session.running.store(false, Ordering::Release);
            if let Some(handle) = session.worker {
                let _ = handle.join();
            }
        }
    }
}

fn session_worker(config: HyCanConfig, channel_name: String, running: Arc<AtomicBool>) {
    let listener = match IpcListener::bind(config.session_socket_path(&channel_name), config.registration_backlog) {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("session '{channel_name}' failed to bind: {}", e.message);
            return;
        }
    };

    let mut executor = NetlinkExecutor::new();
    while running.load(Ordering::Acquire) {
        match listener.accept(1000) {
            Ok(Some(mut stream)) => handle_session_request(&config, &mut stream, &mut executor),
            Ok(None) => continue,
            Err(e) => log::warn!("session '{channel_name}' accept failed: {}", e.message),
        }
    }
}

fn handle_session_request(config: &HyCanConfig, stream: &mut IpcStream, executor: &mut NetlinkExecutor) {
    let request: NetlinkRequest = match stream.recv(config.response_timeout) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("malformed session request: {}", e.message);
            return;
        }
    };

    let response = process_request(executor, &request);
    if let Err(e) = stream.send(&response) {
        log::warn!("failed to send session response: {}", e.message);
    }
}

fn process_request(executor: &mut NetlinkExecutor, request: &NetlinkRequest) -> NetlinkResponse {
    let name = request.name();
    let op = match request.operation() {
        Ok(op) => op,
        Err(e) => return NetlinkResponse::failure(&e.message),
    };

    match op {
        NetlinkOp::InterfaceExists => match executor.check_interface_exists(&name) {
            Ok(exists) => NetlinkResponse::success(exists, false),
            Err(e) => NetlinkResponse::failure(&e.message),
        },
        NetlinkOp::InterfaceIsUp => match executor.check_interface_is_up(&name) {
            Ok(is_up) => NetlinkResponse::success(true, is_up),
            Err(e) => NetlinkResponse::failure(&e.message),
        },
        NetlinkOp::CreateVcan => match executor.create_vcan_if_missing(&name) {
            Ok(()) => NetlinkResponse::success(true, false),
            Err(e) => NetlinkResponse::failure(&e.message),
        },
        NetlinkOp::SetState => {
            match executor.set_state(
                &name,
                request.up != 0,
                request.set_bitrate != 0,
                request.bitrate,
                request.create_vcan_if_needed != 0,
            ) {
                Ok(()) => NetlinkResponse::success(true, request.up != 0),
                Err(e) => NetlinkResponse::failure(&e.message),
            }
        }
    }
}

fn cleanup_worker(running: Arc<AtomicBool>, sessions: Arc<Mutex<HashMap<i32, ClientSession>>>, config: HyCanConfig) {
    while running.load(Ordering::Acquire) {
        thread::sleep(config.cleanup_interval);
        if !running.load(Ordering::Acquire) {
            break;
        }

        let mut sessions = sessions.lock();
        sessions.retain(|pid, session| {
            let idle = session.last_activity.lock().elapsed() > config.idle_timeout;
            let alive = process_is_alive(*pid);
            if !alive || idle {
                log::info!("reaping session for pid {pid} (alive={alive}, idle={idle})");
                session.running.store(false, Ordering::Release);
                if let Some(handle) = session.worker.take() {
                    let _ = handle.join();
                }
                false
            } else {
                true
            }
        });
    }
}

fn process_is_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid), None).is_ok()
}

/// Fail if not running as root. The daemon needs `CAP_NET_ADMIN` to create
/// and reconfigure interfaces; requiring euid 0 rather than checking the
/// capability directly matches how the privileged side of this split has
/// always been deployed.
pub fn require_root() -> Result<(), Error> {
    if !nix::unistd::geteuid().is_root() {
        return Err(Error::new(ErrorKind::DaemonRequest, "hycand must run as root"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_server_starts_in_running_state() {
        let server = DaemonServer::new(HyCanConfig::default());
        assert!(server.running.load(Ordering::Acquire));
        server.stop();
        assert!(!server.running.load(Ordering::Acquire));
    }
}
