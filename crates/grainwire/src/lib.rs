// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # grainwire - Polymorphic binary serialization for the grain runtime
//!
//! A serialization engine for a distributed grain (virtual actor)
//! runtime: it encodes heterogeneous, potentially cyclic object graphs
//! into a compact token stream, reconstructs them in another address
//! space, and deep-copies them in-process without touching the wire
//! format. Both endpoints run the same engine with matching registries.
//!
//! ## Quick Start
//!
//! ```rust
//! use grainwire::SerializationEngine;
//! use grainwire::values::object;
//!
//! # fn main() -> grainwire::SerResult<()> {
//! let engine = SerializationEngine::builder().build()?;
//!
//! // Primitives take the fastpath: one token plus the payload.
//! let bytes = engine.serialize(Some(&object(42i32)))?;
//! let back: i32 = engine.deserialize_as(&bytes)?;
//! assert_eq!(back, 42);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                       Dispatcher (engine)                     |
//! |  serialize / deserialize / deep_copy, normative codec order   |
//! +---------------------------------------------------------------+
//! |   Type Registry   |  Back-Reference   |  Type-Name Resolver   |
//! |  keys <-> codecs  |  identity tables  |  generics and arrays  |
//! +---------------------------------------------------------------+
//! |                  Token Stream Codec (stream)                  |
//! |   single-byte tokens, LE payloads, length-prefixed strings    |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SerializationEngine`] | Entry point: serialize, deserialize, deep-copy |
//! | [`EngineBuilder`] | Construction-time registry feed and validation |
//! | [`Registration`](registry::Registration) | One type's codecs, key, and flags |
//! | [`TypeRegistry`](registry::TypeRegistry) | Runtime types <-> keys <-> codec triples |
//! | [`ResolvedType`](type_key::ResolvedType) | Runtime type handle (key + shape) |
//! | [`ObjectRef`](values::ObjectRef) | Type-erased shared object handle |
//!
//! ## Codec order
//!
//! Encoding tries, in order: the simple-value fastpath, enums, the bare
//! object sentinel, arrays, external serializers, registered codecs,
//! keyed serializers, and the fallback serializer. Error values that
//! exhaust the order are substituted with a transportable envelope so an
//! error never itself becomes a non-transmittable error.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod registry;
pub mod stats;
pub mod stream;
pub mod token;
pub mod type_key;
pub mod values;

pub use config::EngineConfig;
pub use engine::{EngineBuilder, SerializationEngine};
pub use error::{SerResult, SerializationError};
pub use registry::{Registration, SerializerId};
pub use type_key::{ResolvedType, TypeKey};
