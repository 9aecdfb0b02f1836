// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine error taxonomy.
//!
//! Every failure surfaces through [`SerializationError`]; nothing is
//! swallowed. Registration problems abort engine construction, operation
//! problems abort the current serialize/deserialize/copy, and user codec
//! errors propagate unchanged through the `User` variant.

use std::fmt;

/// Errors surfaced by the serialization engine.
#[derive(Debug)]
pub enum SerializationError {
    /// Serializer registered without deserializer (or vice versa), or a
    /// registration that carries no usable methods at all.
    RegistrationInconsistency { type_key: String, reason: String },
    /// Encode or decode exhausted the codec tie-break order.
    NoCodecFound { type_key: String },
    /// The type-name resolver exhausted its rules for this key.
    UnresolvableTypeName { key: String },
    /// Malformed stream: unexpected token at a structural position,
    /// unknown keyed-serializer id, or a truncated buffer.
    StreamFormat { offset: usize, reason: String },
    /// Fault injected by a user codec; propagated unchanged.
    User(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistrationInconsistency { type_key, reason } => {
                write!(f, "inconsistent registration for '{}': {}", type_key, reason)
            }
            Self::NoCodecFound { type_key } => {
                write!(
                    f,
                    "no codec found for '{}' (is the type registered on both endpoints?)",
                    type_key
                )
            }
            Self::UnresolvableTypeName { key } => {
                write!(f, "cannot resolve type name '{}'", key)
            }
            Self::StreamFormat { offset, reason } => {
                write!(f, "stream format error at offset {}: {}", offset, reason)
            }
            Self::User(e) => write!(f, "user codec error: {}", e),
        }
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::User(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl SerializationError {
    /// Shorthand for a stream format error.
    pub fn stream(offset: usize, reason: impl Into<String>) -> Self {
        Self::StreamFormat {
            offset,
            reason: reason.into(),
        }
    }

    /// Shorthand for a missing codec error.
    pub fn no_codec(type_key: impl Into<String>) -> Self {
        Self::NoCodecFound {
            type_key: type_key.into(),
        }
    }
}

pub type SerResult<T> = Result<T, SerializationError>;
