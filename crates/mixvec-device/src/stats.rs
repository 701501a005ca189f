//! Transfer and allocation counters.
//!
//! [`TransferStats`] is updated by [`Platform`](crate::Platform) on every
//! non-empty blocking copy and every non-empty device allocation. Tests
//! use it to verify that redundant synchronizations are skipped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters shared by everything using one platform.
#[derive(Debug, Default)]
pub struct TransferStats {
    host_to_device: AtomicU64,
    device_to_host: AtomicU64,
    bytes_to_device: AtomicU64,
    bytes_to_host: AtomicU64,
    allocations: AtomicU64,
    frees: AtomicU64,
}

/// A point-in-time copy of [`TransferStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferSnapshot {
    /// Completed host→device copies.
    pub host_to_device: u64,
    /// Completed device→host copies.
    pub device_to_host: u64,
    /// Bytes moved host→device.
    pub bytes_to_device: u64,
    /// Bytes moved device→host.
    pub bytes_to_host: u64,
    /// Device allocations performed.
    pub allocations: u64,
    /// Device allocations released.
    pub frees: u64,
}

impl TransferStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read all counters.
    pub fn snapshot(&self) -> TransferSnapshot {
        TransferSnapshot {
            host_to_device: self.host_to_device.load(Ordering::Relaxed),
            device_to_host: self.device_to_host.load(Ordering::Relaxed),
            bytes_to_device: self.bytes_to_device.load(Ordering::Relaxed),
            bytes_to_host: self.bytes_to_host.load(Ordering::Relaxed),
            allocations: self.allocations.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_upload(&self, bytes: usize) {
        self.host_to_device.fetch_add(1, Ordering::Relaxed);
        self.bytes_to_device
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_download(&self, bytes: usize) {
        self.device_to_host.fetch_add(1, Ordering::Relaxed);
        self.bytes_to_host.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_allocation(&self) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_free(&self) {
        self.frees.fetch_add(1, Ordering::Relaxed);
    }
}

impl TransferSnapshot {
    /// Counter deltas between `earlier` and `self`.
    pub fn since(&self, earlier: &TransferSnapshot) -> TransferSnapshot {
        TransferSnapshot {
            host_to_device: self.host_to_device.saturating_sub(earlier.host_to_device),
            device_to_host: self.device_to_host.saturating_sub(earlier.device_to_host),
            bytes_to_device: self.bytes_to_device.saturating_sub(earlier.bytes_to_device),
            bytes_to_host: self.bytes_to_host.saturating_sub(earlier.bytes_to_host),
            allocations: self.allocations.saturating_sub(earlier.allocations),
            frees: self.frees.saturating_sub(earlier.frees),
        }
    }

    /// Total copies in either direction.
    pub fn transfers(&self) -> u64 {
        self.host_to_device + self.device_to_host
    }

    /// Allocations not yet released.
    pub fn live_allocations(&self) -> u64 {
        self.allocations.saturating_sub(self.frees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let stats = TransferStats::new();
        assert_eq!(stats.snapshot(), TransferSnapshot::default());
    }

    #[test]
    fn record_updates_counts_and_bytes() {
        let stats = TransferStats::new();
        stats.record_upload(64);
        stats.record_upload(16);
        stats.record_download(8);
        let snap = stats.snapshot();
        assert_eq!(snap.host_to_device, 2);
        assert_eq!(snap.bytes_to_device, 80);
        assert_eq!(snap.device_to_host, 1);
        assert_eq!(snap.bytes_to_host, 8);
        assert_eq!(snap.transfers(), 3);
    }

    #[test]
    fn since_computes_deltas() {
        let stats = TransferStats::new();
        stats.record_allocation();
        let before = stats.snapshot();
        stats.record_allocation();
        stats.record_free();
        stats.record_upload(4);
        let delta = stats.snapshot().since(&before);
        assert_eq!(delta.allocations, 1);
        assert_eq!(delta.frees, 1);
        assert_eq!(delta.host_to_device, 1);
        assert_eq!(stats.snapshot().live_allocations(), 1);
    }
}
