// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tick-based date/time wire values.
//!
//! Both values travel as a 64-bit tick count (100 ns units); [`DateTime`]
//! carries an extra kind byte. The engine defines these itself because the
//! wire demands this exact layout on both endpoints.

use std::fmt;

/// Interpretation of a [`DateTime`] tick count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DateTimeKind {
    Unspecified = 0,
    Utc = 1,
    Local = 2,
}

impl DateTimeKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unspecified),
            1 => Some(Self::Utc),
            2 => Some(Self::Local),
            _ => None,
        }
    }
}

/// Point in time: 100 ns ticks since the epoch plus a kind byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub ticks: i64,
    pub kind: DateTimeKind,
}

impl DateTime {
    pub fn new(ticks: i64, kind: DateTimeKind) -> Self {
        Self { ticks, kind }
    }

    pub fn utc(ticks: i64) -> Self {
        Self::new(ticks, DateTimeKind::Utc)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ticks ({:?})", self.ticks, self.kind)
    }
}

/// Duration: signed 100 ns ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeSpan {
    pub ticks: i64,
}

impl TimeSpan {
    pub const TICKS_PER_SECOND: i64 = 10_000_000;

    pub fn from_ticks(ticks: i64) -> Self {
        Self { ticks }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            ticks: seconds * Self::TICKS_PER_SECOND,
        }
    }
}
