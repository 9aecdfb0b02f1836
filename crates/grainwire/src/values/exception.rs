// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synthetic error envelope.
//!
//! When an error value reaches the end of the codec tie-break order, the
//! engine substitutes a [`CarriedException`] holding the original message,
//! type name, and source-chain text: an error must never itself become a
//! non-transmittable error.

use std::fmt;

/// Transportable stand-in for an error value with no codec of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarriedException {
    pub type_name: String,
    pub message: String,
    pub stack: String,
}

impl CarriedException {
    pub fn new(
        type_name: impl Into<String>,
        message: impl Into<String>,
        stack: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack: stack.into(),
        }
    }

    /// Capture an error's message, type name, and source chain.
    pub fn from_error<E: std::error::Error + 'static>(err: &E) -> Self {
        let mut stack = String::new();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            if !stack.is_empty() {
                stack.push('\n');
            }
            stack.push_str("caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            type_name: std::any::type_name::<E>().to_string(),
            message: err.to_string(),
            stack,
        }
    }
}

impl fmt::Display for CarriedException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)?;
        if !self.stack.is_empty() {
            write!(f, "\n{}", self.stack)?;
        }
        Ok(())
    }
}

impl std::error::Error for CarriedException {}
