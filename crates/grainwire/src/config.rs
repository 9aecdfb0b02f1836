// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine configuration.
//!
//! One small value owned by the engine; no global state. Thresholds here
//! never change wire semantics; they gate warnings and guard recursion.

/// Default large-object warning threshold in bytes.
pub const DEFAULT_LARGE_OBJECT_THRESHOLD: usize = 85_000;

/// Default bound on codec recursion depth.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Tunables for a [`SerializationEngine`](crate::engine::SerializationEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Allocations at or above this size report a large-object warning to
    /// the statistics sink. Semantics are unchanged either way.
    pub large_object_threshold: usize,
    /// Gate for counter and timing collection.
    pub collect_statistics: bool,
    /// Recursion bound; exceeding it is a stream format error rather than
    /// a stack overflow.
    pub max_serialization_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            large_object_threshold: DEFAULT_LARGE_OBJECT_THRESHOLD,
            collect_statistics: true,
            max_serialization_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
