// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Statistics sink: counters and timings for engine operations.
//!
//! All updates are non-blocking; collection is gated by a boolean on the
//! engine config. Timings are opaque tick units (nanoseconds from a
//! monotonic clock).

use std::sync::atomic::{AtomicU64, Ordering};

/// Narrow interface the engine publishes counters and timings through.
///
/// Implementations must never block; the engine calls these on every
/// operation when collection is enabled.
pub trait StatisticsSink: Send + Sync {
    fn record_copy(&self, ticks: u64);
    fn record_serialization(&self, ticks: u64);
    fn record_deserialization(&self, ticks: u64);
    fn record_fallback_copy(&self, ticks: u64);
    fn record_fallback_serialization(&self, ticks: u64);
    fn record_fallback_deserialization(&self, ticks: u64);

    /// An allocation crossed the large-object threshold. Advisory only.
    fn large_object_allocation(&self, _bytes: usize) {}
}

/// Point-in-time view of the default sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    pub copies: u64,
    pub serializations: u64,
    pub deserializations: u64,
    pub fallback_copies: u64,
    pub fallback_serializations: u64,
    pub fallback_deserializations: u64,
    pub copy_ticks: u64,
    pub ser_ticks: u64,
    pub deser_ticks: u64,
    pub fallback_copy_ticks: u64,
    pub fallback_ser_ticks: u64,
    pub fallback_deser_ticks: u64,
    pub large_object_allocations: u64,
}

/// Default sink: relaxed atomic counters.
#[derive(Debug, Default)]
pub struct AtomicStatistics {
    copies: AtomicU64,
    serializations: AtomicU64,
    deserializations: AtomicU64,
    fallback_copies: AtomicU64,
    fallback_serializations: AtomicU64,
    fallback_deserializations: AtomicU64,
    copy_ticks: AtomicU64,
    ser_ticks: AtomicU64,
    deser_ticks: AtomicU64,
    fallback_copy_ticks: AtomicU64,
    fallback_ser_ticks: AtomicU64,
    fallback_deser_ticks: AtomicU64,
    large_object_allocations: AtomicU64,
}

impl AtomicStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            copies: self.copies.load(Ordering::Relaxed),
            serializations: self.serializations.load(Ordering::Relaxed),
            deserializations: self.deserializations.load(Ordering::Relaxed),
            fallback_copies: self.fallback_copies.load(Ordering::Relaxed),
            fallback_serializations: self.fallback_serializations.load(Ordering::Relaxed),
            fallback_deserializations: self.fallback_deserializations.load(Ordering::Relaxed),
            copy_ticks: self.copy_ticks.load(Ordering::Relaxed),
            ser_ticks: self.ser_ticks.load(Ordering::Relaxed),
            deser_ticks: self.deser_ticks.load(Ordering::Relaxed),
            fallback_copy_ticks: self.fallback_copy_ticks.load(Ordering::Relaxed),
            fallback_ser_ticks: self.fallback_ser_ticks.load(Ordering::Relaxed),
            fallback_deser_ticks: self.fallback_deser_ticks.load(Ordering::Relaxed),
            large_object_allocations: self.large_object_allocations.load(Ordering::Relaxed),
        }
    }
}

impl StatisticsSink for AtomicStatistics {
    fn record_copy(&self, ticks: u64) {
        self.copies.fetch_add(1, Ordering::Relaxed);
        self.copy_ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    fn record_serialization(&self, ticks: u64) {
        self.serializations.fetch_add(1, Ordering::Relaxed);
        self.ser_ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    fn record_deserialization(&self, ticks: u64) {
        self.deserializations.fetch_add(1, Ordering::Relaxed);
        self.deser_ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    fn record_fallback_copy(&self, ticks: u64) {
        self.fallback_copies.fetch_add(1, Ordering::Relaxed);
        self.fallback_copy_ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    fn record_fallback_serialization(&self, ticks: u64) {
        self.fallback_serializations.fetch_add(1, Ordering::Relaxed);
        self.fallback_ser_ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    fn record_fallback_deserialization(&self, ticks: u64) {
        self.fallback_deserializations.fetch_add(1, Ordering::Relaxed);
        self.fallback_deser_ticks.fetch_add(ticks, Ordering::Relaxed);
    }

    fn large_object_allocation(&self, _bytes: usize) {
        self.large_object_allocations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = AtomicStatistics::new();
        stats.record_serialization(100);
        stats.record_serialization(50);
        stats.record_fallback_deserialization(7);

        let snap = stats.snapshot();
        assert_eq!(snap.serializations, 2);
        assert_eq!(snap.ser_ticks, 150);
        assert_eq!(snap.fallback_deserializations, 1);
        assert_eq!(snap.fallback_deser_ticks, 7);
        assert_eq!(snap.copies, 0);
    }

    #[test]
    fn test_large_object_counter() {
        let stats = AtomicStatistics::new();
        stats.large_object_allocation(100_000);
        assert_eq!(stats.snapshot().large_object_allocations, 1);
    }

    #[test]
    fn test_concurrent_increments() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(AtomicStatistics::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let s = stats.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.record_copy(1);
                }
            }));
        }
        for h in handles {
            h.join().expect("thread should complete");
        }
        let snap = stats.snapshot();
        assert_eq!(snap.copies, 800);
        assert_eq!(snap.copy_ticks, 800);
    }
}
