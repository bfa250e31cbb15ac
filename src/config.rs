// hycan/src/config.rs
//
// Runtime configuration for the daemon and its clients.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Overridable defaults for the constants spec.md §9 leaves as "open
//! questions": socket directory, cleanup period, idle timeout, and the
//! various timeouts on the IPC path.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable used to override [`HyCanConfig::socket_dir`].
pub const RUN_DIR_ENV_VAR: &str = "HYCAN_RUN_DIR";

/// Runtime configuration shared by the daemon and daemon client.
#[derive(Clone, Debug)]
pub struct HyCanConfig {
    /// Directory holding the registration and per-session socket files.
    /// Defaults to `/run`, overridable via `HYCAN_RUN_DIR`.
    pub socket_dir: PathBuf,
    /// How often the daemon's cleanup worker scans the session table.
    pub cleanup_interval: Duration,
    /// How long a session may sit idle before the cleanup worker reaps it.
    pub idle_timeout: Duration,
    /// `listen()` backlog for the registration and per-session sockets.
    pub registration_backlog: i32,
    /// How long a daemon client waits for a response before giving up.
    pub response_timeout: Duration,
}

impl HyCanConfig {
    /// Path to the well-known registration socket: `<socket_dir>/hycan_daemon`.
    pub fn registration_socket_path(&self) -> PathBuf {
        self.socket_dir.join("hycan_daemon")
    }

    /// Path to a per-session socket: `<socket_dir>/hycan_<channel_name>`.
    pub fn session_socket_path(&self, channel_name: &str) -> PathBuf {
        self.socket_dir.join(format!("hycan_{channel_name}"))
    }
}

impl Default for HyCanConfig {
    fn default() -> Self {
        let socket_dir = std::env::var_os(RUN_DIR_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/run"));

        Self {
            socket_dir,
            cleanup_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(5 * 60),
            registration_backlog: 5,
            response_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_socket_dir_is_run() {
        std::env::remove_var(RUN_DIR_ENV_VAR);
        let config = HyCanConfig::default();
        assert_eq!(config.socket_dir, PathBuf::from("/run"));
    }

    #[test]
    fn session_socket_path_is_prefixed() {
        let config = HyCanConfig {
            socket_dir: PathBuf::from("/run"),
            ..HyCanConfig::default()
        };
        assert_eq!(
            config.session_socket_path("HyCAN_Client_1234"),
            PathBuf::from("/run/hycan_HyCAN_Client_1234")
        );
    }
}
