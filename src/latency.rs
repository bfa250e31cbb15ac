// hycan/src/latency.rs
//
// Optional latency-instrumentation hook for the dispatcher's reader thread.
//
// This file is part of the Rust 'hycan' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Gated behind the `latency-test` feature. When a frame's payload is a
//! full 8 bytes and those bytes hold a sender-side timestamp (nanoseconds
//! since the Unix epoch, native byte order), the reader thread's latency is
//! sampled and accumulated here for later inspection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Running totals of measured one-way latency.
#[derive(Debug, Default)]
pub struct LatencyAccumulator {
    total_latency_ns: AtomicU64,
    message_count: AtomicU64,
}

/// A snapshot of [`LatencyAccumulator`]'s counters.
#[derive(Copy, Clone, Debug)]
pub struct LatencyStats {
    pub total_latency_ns: u64,
    pub message_count: u64,
    pub average_latency_us: f64,
}

impl LatencyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame's latency. Negative (future-dated) samples are
    /// dropped rather than wrapping.
    pub fn record(&self, data: &[u8; 8]) {
        let send_ns = u64::from_ne_bytes(*data);
        let now_ns = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_nanos() as u64,
            Err(_) => return,
        };
        if now_ns < send_ns {
            return;
        }
        self.total_latency_ns
            .fetch_add(now_ns - send_ns, Ordering::Relaxed);
        self.message_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the current totals.
    pub fn stats(&self) -> LatencyStats {
        let total_latency_ns = self.total_latency_ns.load(Ordering::Relaxed);
        let message_count = self.message_count.load(Ordering::Relaxed);
        let average_latency_us = if message_count > 0 {
            total_latency_ns as f64 / message_count as f64 / 1000.0
        } else {
            0.0
        };
        LatencyStats {
            total_latency_ns,
            message_count,
            average_latency_us,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_nonnegative_latency() {
        let acc = LatencyAccumulator::new();
        let now_ns = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos() as u64;
        let data = (now_ns - 1_000_000).to_ne_bytes();
        acc.record(&data);
        let stats = acc.stats();
        assert_eq!(stats.message_count, 1);
        assert!(stats.total_latency_ns >= 900_000);
    }

    #[test]
    fn ignores_future_timestamps() {
        let acc = LatencyAccumulator::new();
        acc.record(&u64::MAX.to_ne_bytes());
        assert_eq!(acc.stats().message_count, 0);
    }
}
